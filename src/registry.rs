//! Name to factory lookup, built explicitly and passed around.

use std::{collections::BTreeMap, sync::Arc};

use tracing::debug;

use crate::{
    errors::RegistryError,
    project::{
        ClasspathProjectFactory, CompiledProjectFactory, HdlProjectFactory,
        InterpretedProjectFactory, MakefileProjectFactory, ProjectFactory, VerilogProjectFactory,
        VhdlProjectFactory,
    },
    sandbox::SandboxRunner,
};

const JAVA7_BOOTCLASSPATH: &str = "/usr/lib/jvm/java-1.7.0-openjdk/jre/lib/rt.jar";

/// A registered backend.
#[derive(Clone)]
pub enum BackendFactory {
    Program(Arc<dyn ProjectFactory>),
    Hdl(Arc<dyn HdlProjectFactory>),
}

impl std::fmt::Debug for BackendFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendFactory::Program(_) => f.write_str("Program(..)"),
            BackendFactory::Hdl(_) => f.write_str("Hdl(..)"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FactoryRegistry {
    factories: BTreeMap<String, BackendFactory>,
}

impl FactoryRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in backend, all running through `runner`.
    pub fn with_defaults(runner: Arc<dyn SandboxRunner>) -> Self {
        fn program<F: ProjectFactory + 'static>(factory: F) -> BackendFactory {
            BackendFactory::Program(Arc::new(factory))
        }
        fn hdl<F: HdlProjectFactory + 'static>(factory: F) -> BackendFactory {
            BackendFactory::Hdl(Arc::new(factory))
        }
        let r = || Arc::clone(&runner);

        let mut registry = Self::new();
        registry.register("python2", program(InterpretedProjectFactory::new(r(), "python2")));
        registry.register("python3", program(InterpretedProjectFactory::new(r(), "python3")));
        registry.register(
            "java7",
            program(ClasspathProjectFactory::new(r(), "1.7").with_bootclasspath(JAVA7_BOOTCLASSPATH)),
        );
        registry.register("java8", program(ClasspathProjectFactory::new(r(), "1.8")));
        registry.register("cpp", program(CompiledProjectFactory::cpp(r()).with_flags(["-O2"])));
        registry.register(
            "cpp11",
            program(CompiledProjectFactory::cpp(r()).with_flags(["-std=c++11", "-O2"])),
        );
        registry.register("c", program(CompiledProjectFactory::c(r()).with_flags(["-O2"])));
        registry.register(
            "c11",
            program(CompiledProjectFactory::c(r()).with_flags(["-std=c11", "-O2"])),
        );
        registry.register("make", program(MakefileProjectFactory::new(r())));
        registry.register("verilog", hdl(VerilogProjectFactory::new(r())));
        registry.register("vhdl", hdl(VhdlProjectFactory::new(r())));
        registry
    }

    /// Registers `factory` under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, factory: BackendFactory) {
        let name = name.into();
        debug!("registering factory {name}");
        self.factories.insert(name, factory);
    }

    /// # Errors
    /// [`RegistryError::UnknownFactory`] when nothing is registered under `name`.
    pub fn get_factory(&self, name: &str) -> Result<BackendFactory, RegistryError> {
        self.factories
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownFactory(name.to_string()))
    }

    pub fn program_factory(&self, name: &str) -> Result<Arc<dyn ProjectFactory>, RegistryError> {
        match self.get_factory(name)? {
            BackendFactory::Program(factory) => Ok(factory),
            BackendFactory::Hdl(_) => Err(RegistryError::WrongKind {
                name: name.to_string(),
                expected: "program",
            }),
        }
    }

    pub fn hdl_factory(&self, name: &str) -> Result<Arc<dyn HdlProjectFactory>, RegistryError> {
        match self.get_factory(name)? {
            BackendFactory::Hdl(factory) => Ok(factory),
            BackendFactory::Program(_) => Err(RegistryError::WrongKind {
                name: name.to_string(),
                expected: "hardware description",
            }),
        }
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::stub::StubRunner;

    fn registry() -> FactoryRegistry {
        FactoryRegistry::with_defaults(Arc::new(StubRunner::new()))
    }

    #[test]
    fn default_names() {
        let registry = registry();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(
            names,
            vec![
                "c", "c11", "cpp", "cpp11", "java7", "java8", "make", "python2", "python3",
                "verilog", "vhdl"
            ]
        );
    }

    #[test]
    fn every_registered_name_resolves() {
        let registry = registry();
        for name in registry.names() {
            assert!(registry.get_factory(name).is_ok(), "{name}");
        }
        assert!(registry.program_factory("python3").is_ok());
        assert!(registry.hdl_factory("vhdl").is_ok());
    }

    #[test]
    fn unknown_name_is_an_error() {
        let registry = registry();
        assert_eq!(
            registry.get_factory("cobol").unwrap_err(),
            RegistryError::UnknownFactory("cobol".to_string())
        );
        assert!(FactoryRegistry::new().get_factory("python3").is_err());
    }

    #[test]
    fn wrong_kind() {
        let registry = registry();
        assert!(matches!(
            registry.program_factory("verilog"),
            Err(RegistryError::WrongKind { .. })
        ));
        assert!(matches!(
            registry.hdl_factory("cpp"),
            Err(RegistryError::WrongKind { .. })
        ));
    }

    #[test]
    fn registered_factory_builds_projects() {
        let runner = Arc::new(StubRunner::new());
        let registry = FactoryRegistry::with_defaults(runner.clone());
        let factory = registry.program_factory("cpp11").unwrap();
        let mut project = factory.create_from_code(b"int main() {}").unwrap();
        project.build().unwrap();
        assert_eq!(
            runner.calls()[0].command,
            ["g++", "main.cpp", "-o", "main", "-std=c++11", "-O2"]
        );
    }

    #[test]
    fn c_factories_optimize() {
        for (name, expected) in [
            ("c", vec!["gcc", "main.c", "-o", "main", "-O2"]),
            ("c11", vec!["gcc", "main.c", "-o", "main", "-std=c11", "-O2"]),
        ] {
            let runner = Arc::new(StubRunner::new());
            let registry = FactoryRegistry::with_defaults(runner.clone());
            let mut project = registry
                .program_factory(name)
                .unwrap()
                .create_from_code(b"int main(void) { return 0; }")
                .unwrap();
            project.build().unwrap();
            assert_eq!(runner.calls()[0].command, expected, "{name}");
        }
    }
}
