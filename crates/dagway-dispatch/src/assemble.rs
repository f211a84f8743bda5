//! Command-line assembly.
//!
//! Turns a descriptor plus resolved argument values into the token vector for
//! the orchestrator CLI:
//!
//! ```text
//! <program> <operation> [--flag [value...]]... [--fixed [value...]]... [positional...] [>> log] [&]
//! ```
//!
//! Free-text flag values are split on whitespace, so `set=KEY VALUE` becomes
//! `--set KEY VALUE`. A value that legitimately contains spaces is therefore
//! passed as several tokens; operations such as `variables --set` rely on this.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::arguments::ResolvedArguments;
use crate::registry::{ApiDescriptor, InputKind};

/// Token that sends the shell command to the background.
pub const DETACH_MARKER: &str = "&";

/// Argument that, when supplied, replaces the default background log redirect.
pub const LOG_FILE_ARGUMENT: &str = "log-file";

const REDIRECT_PREFIX: &str = ">> ";

/// Environment the assembler needs beyond the request itself.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyContext<'a> {
    /// Orchestrator executable name or path.
    pub program: &'a str,
    /// Directory that receives `<operation>.log` for background operations.
    pub log_folder: &'a Path,
}

/// An ordered command line ready for execution.
///
/// `tokens` is the argv. The background log redirect and detach marker are
/// kept out of it so no request value can be mistaken for shell syntax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandVector {
    tokens: Vec<String>,
    background: bool,
    log_redirect: Option<PathBuf>,
}

impl CommandVector {
    pub fn new(tokens: Vec<String>, background: bool) -> Self {
        Self {
            tokens,
            background,
            log_redirect: None,
        }
    }

    /// Append the command's output to `path` when run in the background.
    pub(crate) fn with_log_redirect(mut self, path: PathBuf) -> Self {
        self.log_redirect = Some(path);
        self
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// The executable, i.e. the first token.
    pub fn program(&self) -> &str {
        self.tokens.first().map(String::as_str).unwrap_or_default()
    }

    /// Everything after the executable.
    pub fn args(&self) -> &[String] {
        self.tokens.get(1..).unwrap_or_default()
    }

    /// Whether the command must be handed to a shell and detached.
    pub fn is_background(&self) -> bool {
        self.background
    }

    /// File the background command's output is appended to.
    pub fn log_redirect(&self) -> Option<&Path> {
        self.log_redirect.as_deref()
    }

    /// Tokens joined with single spaces, as echoed back to callers.
    pub fn display(&self) -> String {
        let mut line = self.tokens.join(" ");
        if let Some(ref path) = self.log_redirect {
            line.push_str(&format!(" {}{}", REDIRECT_PREFIX, path.display()));
        }
        if self.background {
            line.push(' ');
            line.push_str(DETACH_MARKER);
        }
        line
    }

    /// The command as a shell script line.
    ///
    /// Every token is quoted. Only the redirect operator and the detach
    /// marker are emitted as shell syntax.
    pub fn to_shell_command(&self) -> String {
        let mut line = shell_words::join(&self.tokens);
        if let Some(ref path) = self.log_redirect {
            let target = path.to_string_lossy();
            line.push_str(&format!(" {}{}", REDIRECT_PREFIX, shell_words::quote(&target)));
        }
        if self.background {
            line.push(' ');
            line.push_str(DETACH_MARKER);
        }
        line
    }
}

/// Build the command line for `descriptor`.
///
/// Flag arguments follow registry order; positional arguments are emitted
/// after all flags, ordered by their `end_position`. Optional arguments with
/// no value, or a blank one, are skipped.
pub fn assemble(
    descriptor: &ApiDescriptor,
    args: &ResolvedArguments,
    ctx: &AssemblyContext<'_>,
) -> CommandVector {
    let mut tokens = vec![ctx.program.to_string(), descriptor.name.to_string()];
    let mut positional: Vec<Option<String>> = vec![None; descriptor.max_end_position()];

    for spec in &descriptor.arguments {
        let Some(value) = args.get(spec.name) else {
            continue;
        };

        // A boolean switch is on whenever present; anything else needs text.
        if spec.input_kind != InputKind::Flag && value.trim().is_empty() {
            continue;
        }

        if let Some(position) = spec.end_position {
            positional[position - 1] = Some(value.to_string());
        } else {
            tokens.push(format!("--{}", spec.name));
            if spec.input_kind != InputKind::Flag {
                tokens.extend(value.split_whitespace().map(String::from));
            }
        }
    }

    for fixed in &descriptor.fixed_arguments {
        tokens.push(format!("--{}", fixed.name));
        tokens.extend(fixed.value.split_whitespace().map(String::from));
    }

    tokens.extend(positional.into_iter().flatten());

    let mut command = CommandVector::new(tokens, descriptor.background_mode);
    if descriptor.background_mode && !args.contains(LOG_FILE_ARGUMENT) {
        command = command.with_log_redirect(ctx.log_folder.join(format!("{}.log", descriptor.name)));
    }

    tracing::debug!(operation = descriptor.name, command = %command.display(), "Assembled command");

    command
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ApiRegistry;
    use proptest::prelude::*;
    use std::path::PathBuf;

    fn ctx(log_folder: &Path) -> AssemblyContext<'_> {
        AssemblyContext {
            program: "airflow",
            log_folder,
        }
    }

    fn resolved(pairs: &[(&str, &str)]) -> ResolvedArguments {
        pairs.iter().copied().collect()
    }

    fn assemble_named(name: &str, pairs: &[(&str, &str)]) -> Vec<String> {
        let registry = ApiRegistry::builtin();
        let descriptor = registry.lookup(name).unwrap();
        let logs = PathBuf::from("/var/log/airflow");
        assemble(descriptor, &resolved(pairs), &ctx(&logs)).tokens().to_vec()
    }

    #[test]
    fn test_single_positional() {
        assert_eq!(
            assemble_named("pause", &[("dag_id", "sample_dag")]),
            vec!["airflow", "pause", "sample_dag"]
        );
    }

    #[test]
    fn test_positionals_follow_flags_in_slot_order() {
        let tokens = assemble_named(
            "test",
            &[
                ("execution_date", "2017-01-02T03:04:05"),
                ("dry_run", ""),
                ("task_id", "extract"),
                ("subdir", "/dags/etl"),
                ("dag_id", "etl"),
            ],
        );
        assert_eq!(
            tokens,
            vec![
                "airflow",
                "test",
                "--subdir",
                "/dags/etl",
                "--dry_run",
                "etl",
                "extract",
                "2017-01-02T03:04:05"
            ]
        );
    }

    #[test]
    fn test_flag_values_are_split_on_whitespace() {
        assert_eq!(
            assemble_named("variables", &[("set", "my_key  my value")]),
            vec!["airflow", "variables", "--set", "my_key", "my", "value"]
        );
    }

    #[test]
    fn test_flag_kind_ignores_value() {
        assert_eq!(
            assemble_named("list_tasks", &[("dag_id", "d"), ("tree", "yes please")]),
            vec!["airflow", "list_tasks", "--tree", "d"]
        );
    }

    #[test]
    fn test_blank_text_values_are_skipped() {
        assert_eq!(
            assemble_named("variables", &[("get", "")]),
            vec!["airflow", "variables"]
        );
        // Blank optional inputs from the admin form must not swallow the positional.
        assert_eq!(
            assemble_named(
                "list_tasks",
                &[("dag_id", "sample_dag"), ("subdir", ""), ("tree", "")]
            ),
            vec!["airflow", "list_tasks", "--tree", "sample_dag"]
        );
        assert_eq!(
            assemble_named("list_tasks", &[("dag_id", "sample_dag"), ("subdir", "   ")]),
            vec!["airflow", "list_tasks", "sample_dag"]
        );
    }

    #[test]
    fn test_fixed_arguments_precede_positionals() {
        assert_eq!(
            assemble_named("clear", &[("dag_id", "etl"), ("only_failed", "")]),
            vec!["airflow", "clear", "--only_failed", "--no_confirm", "etl"]
        );
    }

    fn assemble_command(name: &str, pairs: &[(&str, &str)]) -> CommandVector {
        let registry = ApiRegistry::builtin();
        let logs = PathBuf::from("/var/log/airflow");
        assemble(registry.lookup(name).unwrap(), &resolved(pairs), &ctx(&logs))
    }

    #[test]
    fn test_background_mode_appends_log_redirect_and_detach_marker() {
        let cmd = assemble_command("scheduler", &[("num_runs", "5")]);
        assert_eq!(cmd.tokens(), &["airflow", "scheduler", "--num_runs", "5"]);
        assert_eq!(
            cmd.log_redirect(),
            Some(Path::new("/var/log/airflow/scheduler.log"))
        );
        assert_eq!(
            cmd.display(),
            "airflow scheduler --num_runs 5 >> /var/log/airflow/scheduler.log &"
        );
        assert!(cmd.display().ends_with(DETACH_MARKER));
    }

    #[test]
    fn test_background_mode_respects_explicit_log_file() {
        let cmd = assemble_command("worker", &[("log-file", "/tmp/w.log")]);
        assert_eq!(cmd.tokens(), &["airflow", "worker", "--log-file", "/tmp/w.log"]);
        assert!(cmd.log_redirect().is_none());
        assert_eq!(cmd.to_shell_command(), "airflow worker --log-file /tmp/w.log &");
    }

    #[test]
    fn test_no_arguments() {
        let registry = ApiRegistry::builtin();
        let logs = PathBuf::from("/logs");
        let cmd = assemble(registry.lookup("serve_logs").unwrap(), &resolved(&[]), &ctx(&logs));
        assert!(cmd.is_background());
        assert_eq!(cmd.program(), "airflow");
        assert_eq!(cmd.args(), &["serve_logs"]);
        assert_eq!(cmd.display(), "airflow serve_logs >> /logs/serve_logs.log &");
    }

    #[test]
    fn test_display_and_shell_command() {
        let cmd = CommandVector::new(
            vec![
                "airflow".into(),
                "trigger_dag".into(),
                "--conf".into(),
                "{\"a\":1}".into(),
            ],
            true,
        )
        .with_log_redirect(PathBuf::from("/my logs/x.log"));
        assert_eq!(cmd.display(), "airflow trigger_dag --conf {\"a\":1} >> /my logs/x.log &");
        assert_eq!(
            cmd.to_shell_command(),
            "airflow trigger_dag --conf '{\"a\":1}' >> '/my logs/x.log' &"
        );
    }

    #[test]
    fn test_shell_syntax_in_values_is_quoted() {
        // As a whitespace-split text flag value.
        let cmd = assemble_command("worker", &[("queues", "& touch /tmp/x ;")]);
        assert_eq!(
            cmd.to_shell_command(),
            "airflow worker --queues '&' touch /tmp/x ';' >> /var/log/airflow/worker.log &"
        );

        let cmd = assemble_command("worker", &[("queues", ">> /etc/x")]);
        let script = cmd.to_shell_command();
        assert!(script.starts_with("airflow worker --queues '>>' /etc/x >> "));

        // As a positional, where the value stays one token.
        let cmd = assemble_command("kerberos", &[("principal", ">> /etc/x")]);
        let script = cmd.to_shell_command();
        assert!(script.starts_with("airflow kerberos '>> /etc/x' >> "), "{script}");
        assert!(script.ends_with(" &"));
        assert_eq!(script.matches('&').count(), 1);

        let cmd = assemble_command("kerberos", &[("principal", "&")]);
        assert!(cmd.to_shell_command().starts_with("airflow kerberos '&' >> "));
    }

    proptest! {
        #[test]
        fn prop_assembly_is_deterministic_and_positions_are_stable(
            dag in "[a-z_]{1,12}",
            task in "[a-z_]{1,12}",
            date in "20[0-9]{2}-0[1-9]-1[0-9]",
            reverse in any::<bool>(),
        ) {
            let mut pairs = vec![
                ("dag_id", dag.as_str()),
                ("task_id", task.as_str()),
                ("execution_date", date.as_str()),
            ];
            if reverse {
                pairs.reverse();
            }
            let first = assemble_named("task_state", &pairs);
            let second = assemble_named("task_state", &pairs);
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(&first[2..], &[dag.clone(), task.clone(), date.clone()][..]);
        }
    }
}
