//! Line diff between an expected and a produced output.

/// Above this many table cells the diff only reports the first differing line.
const MAX_LCS_CELLS: usize = 4_000_000;

/// Unchanged lines kept around each change.
const CONTEXT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op<'a> {
    Same(&'a str),
    Removed(&'a str),
    Added(&'a str),
}

/// Diff of `expected` against `actual`, one line per entry: `-` for expected lines missing
/// from the output, `+` for unexpected lines, and two spaces for context.
///
/// Returns an empty string when both texts have the same lines.
pub fn line_diff(expected: &str, actual: &str) -> String {
    let expected: Vec<&str> = expected.lines().collect();
    let actual: Vec<&str> = actual.lines().collect();
    if expected == actual {
        return String::new();
    }

    if expected.len().saturating_mul(actual.len()) > MAX_LCS_CELLS {
        return first_difference(&expected, &actual);
    }
    render(&lcs_ops(&expected, &actual))
}

fn lcs_ops<'a>(a: &[&'a str], b: &[&'a str]) -> Vec<Op<'a>> {
    let width = b.len() + 1;
    // lengths[i * width + j] = LCS of a[i..] and b[j..]
    let mut lengths = vec![0u32; (a.len() + 1) * width];
    for i in (0..a.len()).rev() {
        for j in (0..b.len()).rev() {
            lengths[i * width + j] = if a[i] == b[j] {
                lengths[(i + 1) * width + j + 1] + 1
            } else {
                lengths[(i + 1) * width + j].max(lengths[i * width + j + 1])
            };
        }
    }

    let mut ops = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] == b[j] {
            ops.push(Op::Same(a[i]));
            i += 1;
            j += 1;
        } else if lengths[(i + 1) * width + j] >= lengths[i * width + j + 1] {
            ops.push(Op::Removed(a[i]));
            i += 1;
        } else {
            ops.push(Op::Added(b[j]));
            j += 1;
        }
    }
    ops.extend(a[i..].iter().map(|l| Op::Removed(*l)));
    ops.extend(b[j..].iter().map(|l| Op::Added(*l)));
    ops
}

fn render(ops: &[Op<'_>]) -> String {
    let changed: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| !matches!(op, Op::Same(_)))
        .map(|(i, _)| i)
        .collect();

    let mut out = String::new();
    let mut last_printed: Option<usize> = None;
    for (i, op) in ops.iter().enumerate() {
        let near_change = changed
            .iter()
            .any(|&c| c.abs_diff(i) <= CONTEXT);
        if !near_change {
            continue;
        }
        if last_printed.is_some_and(|last| last + 1 != i) {
            out.push_str("...\n");
        }
        let (prefix, line) = match op {
            Op::Same(l) => ("  ", l),
            Op::Removed(l) => ("- ", l),
            Op::Added(l) => ("+ ", l),
        };
        out.push_str(prefix);
        out.push_str(line);
        out.push('\n');
        last_printed = Some(i);
    }
    out
}

fn first_difference(expected: &[&str], actual: &[&str]) -> String {
    let index = expected
        .iter()
        .zip(actual)
        .position(|(e, a)| e != a)
        .unwrap_or(expected.len().min(actual.len()));
    let mut out = format!("first difference at line {}\n", index + 1);
    if let Some(line) = expected.get(index) {
        out.push_str(&format!("- {line}\n"));
    }
    if let Some(line) = actual.get(index) {
        out.push_str(&format!("+ {line}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_outputs_have_no_diff() {
        assert_eq!(line_diff("a\nb\n", "a\nb"), "");
    }

    #[test]
    fn changed_line() {
        assert_eq!(line_diff("1\n2\n3\n", "1\n5\n3\n"), "  1\n- 2\n+ 5\n  3\n");
    }

    #[test]
    fn missing_and_extra_lines() {
        assert_eq!(line_diff("a\nb\n", "a\n"), "  a\n- b\n");
        assert_eq!(line_diff("", "x\n"), "+ x\n");
    }

    #[test]
    fn far_context_is_elided() {
        let expected: String = (0..20).map(|i| format!("{i}\n")).collect();
        let actual = expected.replace("10\n", "ten\n");
        assert_eq!(line_diff(&expected, &actual), "  8\n  9\n- 10\n+ ten\n  11\n  12\n");

        let actual = actual.replace("0\n1\n", "zero\n1\n");
        let diff = line_diff(&expected, &actual);
        assert!(diff.starts_with("- 0\n+ zero\n  1\n  2\n...\n"));
    }

    #[test]
    fn huge_outputs_fall_back_to_first_difference() {
        let expected: String = (0..3000).map(|i| format!("{i}\n")).collect();
        let actual = expected.replace("1500\n", "x\n");
        assert_eq!(
            line_diff(&expected, &actual),
            "first difference at line 1501\n- 1500\n+ x\n"
        );
    }
}
