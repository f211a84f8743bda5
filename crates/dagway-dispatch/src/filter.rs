//! Startup-noise filtering for CLI output.

/// Strip the orchestrator's loading messages from `stdout`.
///
/// Finds the last line starting with `[` (the orchestrator prefixes its log
/// lines with a bracketed timestamp) and drops it together with every line
/// before it. Without such a line the input is returned unchanged.
///
/// This is a heuristic. Real output that starts with `[`, or log lines
/// printed after real output, cause the real output to be dropped.
pub fn filter_loading_messages(stdout: &str) -> String {
    let lines: Vec<&str> = stdout.split('\n').collect();
    match lines.iter().rposition(|line| line.starts_with('[')) {
        Some(last) => lines[last + 1..].join("\n"),
        None => stdout.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_everything_up_to_last_bracket_line() {
        let stdout = "[ts1] info\n[ts2] info\nreal output";
        assert_eq!(filter_loading_messages(stdout), "real output");
    }

    #[test]
    fn test_no_bracket_lines_is_a_no_op() {
        let stdout = "line one\nline two\n";
        assert_eq!(filter_loading_messages(stdout), stdout);
    }

    #[test]
    fn test_idempotent() {
        let stdout = "[2017-04-19 10:04:34,927] {models.py:154} INFO - Filling up the DagBag\nexample_dag\nother_dag\n";
        let once = filter_loading_messages(stdout);
        assert_eq!(once, "example_dag\nother_dag\n");
        assert_eq!(filter_loading_messages(&once), once);
    }

    #[test]
    fn test_only_noise_leaves_nothing() {
        assert_eq!(filter_loading_messages("[a] x\n[b] y"), "");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(filter_loading_messages(""), "");
    }

    // Known limitation: output that itself begins with '[' is treated as noise,
    // along with everything before it.
    #[test]
    fn test_bracketed_real_output_is_misclassified() {
        let stdout = "[ts] INFO - loading\n['task_a', 'task_b']\nsummary";
        assert_eq!(filter_loading_messages(stdout), "summary");
    }

    // Known limitation: a log line printed after the real output hides it.
    #[test]
    fn test_trailing_noise_hides_real_output() {
        let stdout = "real output\n[ts] INFO - shutting down";
        assert_eq!(filter_loading_messages(stdout), "");
    }
}
