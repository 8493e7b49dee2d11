use std::collections::{HashMap, HashSet};

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::trace;

/// Samples the resident memory of a process and all its descendants.
pub(super) struct TreeProfiler {
    system: System,
    root: Pid,
    peak: Option<u64>,
}

impl TreeProfiler {
    pub fn new(root_pid: u32) -> Self {
        Self {
            system: System::new(),
            root: Pid::from_u32(root_pid),
            peak: None,
        }
    }

    /// Current memory of the tree in bytes, `None` once the root is gone.
    pub fn sample(&mut self) -> Option<u64> {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );
        let entries = self
            .system
            .processes()
            .iter()
            .map(|(pid, process)| (*pid, process.parent(), process.memory()));
        let total = tree_memory(entries, self.root);
        match total {
            Some(total) => {
                self.peak = Some(self.peak.map_or(total, |peak| peak.max(total)));
            }
            None => trace!("process {} vanished before sampling", self.root),
        }
        total
    }

    pub fn peak(&self) -> Option<u64> {
        self.peak
    }
}

/// Sums the memory of `root` and its descendants out of `(pid, parent, memory)` entries.
fn tree_memory(
    entries: impl IntoIterator<Item = (Pid, Option<Pid>, u64)>,
    root: Pid,
) -> Option<u64> {
    let mut memory = HashMap::new();
    let mut children: HashMap<Pid, Vec<Pid>> = HashMap::new();
    for (pid, parent, bytes) in entries {
        memory.insert(pid, bytes);
        if let Some(parent) = parent {
            children.entry(parent).or_default().push(pid);
        }
    }
    memory.get(&root)?;

    let mut total = 0u64;
    let mut seen = HashSet::new();
    let mut stack = vec![root];
    while let Some(pid) = stack.pop() {
        if !seen.insert(pid) {
            continue;
        }
        // a descendant may exit between listing and lookup
        total = total.saturating_add(memory.get(&pid).copied().unwrap_or(0));
        if let Some(kids) = children.get(&pid) {
            stack.extend(kids.iter().copied());
        }
    }
    Some(total)
}
