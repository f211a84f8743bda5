//! The operation registry.
//!
//! Every exposed operation is described by an [`ApiDescriptor`]: its name, HTTP
//! method, argument schema, fixed arguments, and how it is dispatched. The
//! registry is built once at startup and is read-only afterwards.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::{DispatchError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Descriptor types
// ─────────────────────────────────────────────────────────────────────────────

/// How an argument is entered on the admin page and rendered on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// Free text. Rendered as `--name value...`.
    Text,
    /// Boolean switch. Rendered as a bare `--name`.
    Flag,
    /// Uploaded file (POST only).
    File,
}

/// HTTP method an operation is meant to be called with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// In-process handlers that replace generic command-line execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerId {
    Version,
    PluginVersion,
    Pause,
    Unpause,
    TriggerDag,
    DagState,
    TaskState,
    ListDags,
    Pool,
    DeployDag,
    RefreshDag,
}

/// How a validated request is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "handler", rename_all = "snake_case")]
pub enum Dispatch {
    /// Assemble a command line from the descriptor and run it.
    GenericCommandLine,
    /// Call the named in-process handler.
    Custom(HandlerId),
}

/// One argument accepted by an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgumentSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
    pub input_kind: InputKind,
    /// 1-based slot among the trailing positional arguments, if positional.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_position: Option<usize>,
}

impl ArgumentSpec {
    /// An optional free-text argument.
    pub const fn text(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            required: false,
            input_kind: InputKind::Text,
            end_position: None,
        }
    }

    /// An optional boolean switch.
    pub const fn flag(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            required: false,
            input_kind: InputKind::Flag,
            end_position: None,
        }
    }

    /// An uploaded file.
    pub const fn file(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            required: false,
            input_kind: InputKind::File,
            end_position: None,
        }
    }

    /// Mark the argument as required.
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Place the argument's value at the given trailing position.
    pub const fn at_end(mut self, position: usize) -> Self {
        self.end_position = Some(position);
        self
    }

    /// A required positional argument, the common shape for identifiers.
    pub const fn positional(name: &'static str, description: &'static str, position: usize) -> Self {
        Self::text(name, description).required().at_end(position)
    }
}

/// An argument that is always passed and cannot be changed by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixedArgument {
    pub name: &'static str,
    pub description: &'static str,
    /// Value tokens; empty for a bare switch.
    pub value: &'static str,
}

/// Metadata describing one exposed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    /// Orchestrator release the operation first appeared in.
    pub available_since: &'static str,
    pub http_method: HttpMethod,
    pub arguments: Vec<ArgumentSpec>,
    pub fixed_arguments: Vec<FixedArgument>,
    pub post_arguments: Vec<ArgumentSpec>,
    pub background_mode: bool,
    pub dispatch: Dispatch,
}

impl ApiDescriptor {
    fn new(name: &'static str, description: &'static str, available_since: &'static str) -> Self {
        Self {
            name,
            description,
            available_since,
            http_method: HttpMethod::Get,
            arguments: Vec::new(),
            fixed_arguments: Vec::new(),
            post_arguments: Vec::new(),
            background_mode: false,
            dispatch: Dispatch::GenericCommandLine,
        }
    }

    fn args(mut self, arguments: Vec<ArgumentSpec>) -> Self {
        self.arguments = arguments;
        self
    }

    fn fixed(mut self, fixed_arguments: Vec<FixedArgument>) -> Self {
        self.fixed_arguments = fixed_arguments;
        self
    }

    fn post(mut self, post_arguments: Vec<ArgumentSpec>) -> Self {
        self.http_method = HttpMethod::Post;
        self.post_arguments = post_arguments;
        self
    }

    fn background(mut self) -> Self {
        self.background_mode = true;
        self
    }

    fn custom(mut self, handler: HandlerId) -> Self {
        self.dispatch = Dispatch::Custom(handler);
        self
    }

    /// Look up an argument spec by name.
    pub fn argument(&self, name: &str) -> Option<&ArgumentSpec> {
        self.arguments.iter().find(|a| a.name == name)
    }

    /// Largest declared `end_position`, or 0 when the operation has none.
    pub fn max_end_position(&self) -> usize {
        self.arguments
            .iter()
            .filter_map(|a| a.end_position)
            .max()
            .unwrap_or(0)
    }

    /// Check the per-descriptor invariants: unique argument names and a dense
    /// `1..=N` range of end positions.
    pub fn check_integrity(&self) -> Result<()> {
        let mut names = HashSet::new();
        for arg in self.arguments.iter().chain(self.post_arguments.iter()) {
            if !names.insert(arg.name) {
                return Err(DispatchError::Registry(format!(
                    "'{}' declares argument '{}' more than once",
                    self.name, arg.name
                )));
            }
        }

        let mut positions: Vec<usize> = self
            .arguments
            .iter()
            .filter_map(|a| a.end_position)
            .collect();
        positions.sort_unstable();
        for (index, position) in positions.iter().enumerate() {
            if *position != index + 1 {
                return Err(DispatchError::Registry(format!(
                    "'{}' end positions {:?} are not a contiguous 1..N range",
                    self.name, positions
                )));
            }
        }

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Ordered, immutable collection of operation descriptors.
#[derive(Debug, Clone)]
pub struct ApiRegistry {
    descriptors: Vec<ApiDescriptor>,
}

impl ApiRegistry {
    /// Build a registry, rejecting duplicate names and malformed descriptors.
    pub fn new(descriptors: Vec<ApiDescriptor>) -> Result<Self> {
        let registry = Self { descriptors };
        registry.check_integrity()?;
        Ok(registry)
    }

    /// The built-in table of orchestrator operations.
    pub fn builtin() -> Self {
        Self {
            descriptors: builtin_descriptors(),
        }
    }

    /// Find a descriptor by name. Matching trims and ignores case.
    pub fn lookup(&self, name: &str) -> Option<&ApiDescriptor> {
        let wanted = name.trim().to_lowercase();
        self.descriptors.iter().find(|d| d.name == wanted)
    }

    /// Iterate descriptors in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &ApiDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Check registry-wide invariants.
    pub fn check_integrity(&self) -> Result<()> {
        let mut names = HashSet::new();
        for descriptor in &self.descriptors {
            if !names.insert(descriptor.name) {
                return Err(DispatchError::Registry(format!(
                    "operation '{}' is declared more than once",
                    descriptor.name
                )));
            }
            descriptor.check_integrity()?;
        }
        Ok(())
    }
}

impl Default for ApiRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Built-in table
// ─────────────────────────────────────────────────────────────────────────────

const DAG_ID: &str = "The id of the dag";
const TASK_ID: &str = "The id of the task";
const EXECUTION_DATE: &str = "The execution date of the DAG (Example: 2017-01-02T03:04:05)";
const SUBDIR: &str = "File location or directory from which to look for the dag";
const PID: &str = "PID file location";
const DAEMON: &str = "Daemonize instead of running in the foreground";
const STDOUT: &str = "Redirect stdout to this file";
const STDERR: &str = "Redirect stderr to this file";
const LOG_FILE: &str = "Location of the log file";
const DO_PICKLE: &str = "Attempt to pickle the DAG object to send over to the workers, instead of letting workers run their version of the code.";

fn task_instance_args() -> Vec<ArgumentSpec> {
    vec![
        ArgumentSpec::positional("dag_id", DAG_ID, 1),
        ArgumentSpec::positional("task_id", TASK_ID, 2),
        ArgumentSpec::positional("execution_date", EXECUTION_DATE, 3),
        ArgumentSpec::text("subdir", SUBDIR),
    ]
}

fn daemon_args() -> [ArgumentSpec; 4] {
    [
        ArgumentSpec::flag("daemon", DAEMON),
        ArgumentSpec::text("stdout", STDOUT),
        ArgumentSpec::text("stderr", STDERR),
        ArgumentSpec::text("log-file", LOG_FILE),
    ]
}

fn builtin_descriptors() -> Vec<ApiDescriptor> {
    use ArgumentSpec as A;

    vec![
        ApiDescriptor::new("version", "Displays the version of Airflow you're using", "1.0.0 or greater")
            .custom(HandlerId::Version),
        ApiDescriptor::new(
            "rest_api_plugin_version",
            "Displays the version of this REST API Plugin you're using",
            "None - Custom API",
        )
        .custom(HandlerId::PluginVersion),
        ApiDescriptor::new("render", "Render a task instance's template(s)", "1.7.0 or greater")
            .args(task_instance_args()),
        ApiDescriptor::new("variables", "CRUD operations on variables", "1.7.1 or greater").args(vec![
            A::text("set", "Set a variable. Expected input in the form: KEY VALUE."),
            A::text("get", "Get value of a variable"),
            A::flag("json", "Deserialize JSON variable"),
            A::text("default", "Default value returned if variable does not exist"),
            A::text("import", "Import variables from JSON file"),
            A::text("export", "Export variables to JSON file"),
            A::text("delete", "Delete a variable"),
        ]),
        ApiDescriptor::new("connections", "List/Add/Delete connections", "1.8.0 or greater").args(vec![
            A::flag("list", "List all connections"),
            A::flag("add", "Add a connection"),
            A::flag("delete", "Delete a connection"),
            A::text("conn_id", "Connection id, required to add/delete a connection"),
            A::text("conn_uri", "Connection URI, required to add a connection"),
            A::text("conn_extra", "Connection 'Extra' field, optional when adding a connection"),
        ]),
        ApiDescriptor::new("pause", "Pauses a DAG", "1.7.0 or greater")
            .args(vec![A::positional("dag_id", DAG_ID, 1), A::text("subdir", SUBDIR)])
            .custom(HandlerId::Pause),
        ApiDescriptor::new("unpause", "Unpauses a DAG", "1.7.0 or greater")
            .args(vec![A::positional("dag_id", DAG_ID, 1), A::text("subdir", SUBDIR)])
            .custom(HandlerId::Unpause),
        ApiDescriptor::new(
            "task_failed_deps",
            "Returns the unmet dependencies for a task instance from the perspective of the scheduler. In other words, why a task instance doesn't get scheduled and then queued by the scheduler, and then run by an executor).",
            "1.8.0 or greater",
        )
        .args(task_instance_args()),
        ApiDescriptor::new("trigger_dag", "Trigger a DAG run", "1.6.0 or greater")
            .args(vec![
                A::positional("dag_id", DAG_ID, 1),
                A::text("subdir", SUBDIR),
                A::text("run_id", "Helps to identify this run"),
                A::text("conf", "JSON string that gets pickled into the DagRun's conf attribute"),
                A::text("exec_date", "The execution date of the DAG"),
            ])
            .custom(HandlerId::TriggerDag),
        ApiDescriptor::new(
            "test",
            "Test a task instance. This will run a task without checking for dependencies or recording it's state in the database.",
            "0.1 or greater",
        )
        .args({
            let mut args = task_instance_args();
            args.push(A::flag("dry_run", "Perform a dry run"));
            args.push(A::text("task_params", "Sends a JSON params dict to the task"));
            args
        }),
        ApiDescriptor::new("dag_state", "Get the status of a dag run", "1.8.0 or greater")
            .args(vec![
                A::positional("dag_id", DAG_ID, 1),
                A::positional("execution_date", EXECUTION_DATE, 2),
                A::text("subdir", SUBDIR),
            ])
            .custom(HandlerId::DagState),
        ApiDescriptor::new("run", "Run a single task instance", "1.0.0 or greater").args({
            let mut args = task_instance_args();
            args.extend([
                A::flag("mark_success", "Mark jobs as succeeded without running them"),
                A::flag("force", "Ignore previous task instance state, rerun regardless if task already succeeded"),
                A::text("pool", "Resource pool to use"),
                A::text("cfg_path", "Path to config file to use instead of airflow.cfg"),
                A::flag("local", "Run the task using the LocalExecutor"),
                A::flag("ignore_all_dependencies", "Ignores all non-critical dependencies, including ignore_ti_state and ignore_task_deps"),
                A::flag("ignore_dependencies", "Ignore task-specific dependencies, e.g. upstream, depends_on_past, and retry delay dependencies"),
                A::flag("ignore_depends_on_past", "Ignore depends_on_past dependencies (but respect upstream dependencies)"),
                A::flag("ship_dag", "Pickles (serializes) the DAG and ships it to the worker"),
                A::text("pickle", "Serialized pickle object of the entire dag (used internally)"),
            ]);
            args
        }),
        ApiDescriptor::new("list_tasks", "List the tasks within a DAG", "0.1 or greater").args(vec![
            A::positional("dag_id", DAG_ID, 1),
            A::flag("tree", "Tree view"),
            A::text("subdir", SUBDIR),
        ]),
        ApiDescriptor::new("backfill", "Run subsections of a DAG for a specified date range", "0.1 or greater")
            .args(vec![
                A::positional("dag_id", DAG_ID, 1),
                A::text("task_regex", "The regex to filter specific task_ids to backfill (optional)"),
                A::text("start_date", "Override start_date YYYY-MM-DD. Either this or the end_date needs to be provided."),
                A::text("end_date", "Override end_date YYYY-MM-DD. Either this or the start_date needs to be provided."),
                A::flag("mark_success", "Mark jobs as succeeded without running them"),
                A::flag("local", "Run the task using the LocalExecutor"),
                A::flag("donot_pickle", "Do not attempt to pickle the DAG object to send over to the workers, just tell the workers to run their version of the code."),
                A::flag("include_adhoc", "Include dags with the adhoc argument."),
                A::flag("ignore_dependencies", "Ignore task-specific dependencies, e.g. upstream, depends_on_past, and retry delay dependencies"),
                A::flag("ignore_first_depends_on_past", "Ignores depends_on_past dependencies for the first set of tasks only (subsequent executions in the backfill DO respect depends_on_past)."),
                A::text("subdir", SUBDIR),
                A::text("pool", "Resource pool to use"),
                A::flag("dry_run", "Perform a dry run"),
            ]),
        ApiDescriptor::new("list_dags", "List all the DAGs", "0.1 or greater")
            .args(vec![
                A::text("subdir", SUBDIR),
                A::flag("report", "Show DagBag loading report"),
            ])
            .custom(HandlerId::ListDags),
        ApiDescriptor::new("kerberos", "Start a kerberos ticket renewer", "1.6.0 or greater")
            .args({
                let mut args = vec![
                    A::positional("principal", "kerberos principal", 1),
                    A::text("keytab", "keytab"),
                    A::text("pid", PID),
                ];
                args.extend(daemon_args());
                args
            })
            .background(),
        ApiDescriptor::new("worker", "Start a Celery worker node", "0.1 or greater")
            .args({
                let mut args = vec![
                    A::flag("do_pickle", DO_PICKLE),
                    A::text("queues", "Comma delimited list of queues to serve"),
                    A::text("concurrency", "The number of worker processes"),
                    A::text("pid", PID),
                ];
                args.extend(daemon_args());
                args
            })
            .background(),
        ApiDescriptor::new("flower", "Start a Celery Flower", "1.0.0 or greater")
            .args({
                let mut args = vec![
                    A::text("hostname", "Set the hostname on which to run the server"),
                    A::text("port", "The port on which to run the server"),
                    A::text("flower_conf", "Configuration file for flower"),
                    A::text("broker_api", "Broker api"),
                    A::text("pid", PID),
                ];
                args.extend(daemon_args());
                args
            })
            .background(),
        ApiDescriptor::new("scheduler", "Start a scheduler instance", "1.0.0 or greater")
            .args({
                let mut args = vec![
                    A::text("dag_id", DAG_ID),
                    A::text("subdir", SUBDIR),
                    A::text("run-duration", "Set number of seconds to execute before exiting"),
                    A::text("num_runs", "Set the number of runs to execute before exiting"),
                    A::flag("do_pickle", DO_PICKLE),
                    A::text("pid", PID),
                ];
                args.extend(daemon_args());
                args
            })
            .background(),
        ApiDescriptor::new("task_state", "Get the status of a task instance", "1.0.0 or greater")
            .args(task_instance_args())
            .custom(HandlerId::TaskState),
        ApiDescriptor::new("pool", "CRUD operations on pools", "1.8.0 or greater")
            .args(vec![
                A::text("set", "Set pool slot count and description, respectively. Expected input in the form: NAME SLOT_COUNT POOL_DESCRIPTION."),
                A::text("get", "Get pool info"),
                A::text("delete", "Delete a pool"),
            ])
            .custom(HandlerId::Pool),
        ApiDescriptor::new("serve_logs", "Serve logs generate by worker", "0.1 or greater").background(),
        ApiDescriptor::new("clear", "Clear a set of task instance, as if they never ran", "0.1 or greater")
            .args(vec![
                A::positional("dag_id", DAG_ID, 1),
                A::text("task_regex", "The regex to filter specific task_ids to clear (optional)"),
                A::text("start_date", "Override start_date YYYY-MM-DD"),
                A::text("end_date", "Override end_date YYYY-MM-DD"),
                A::text("subdir", SUBDIR),
                A::flag("upstream", "Include upstream tasks"),
                A::flag("downstream", "Include downstream tasks"),
                A::flag("only_failed", "Only failed jobs"),
                A::flag("only_running", "Only running jobs"),
                A::flag("exclude_subdags", "Exclude subdags"),
            ])
            .fixed(vec![FixedArgument {
                name: "no_confirm",
                description: "Do not request confirmation",
                value: "",
            }]),
        ApiDescriptor::new("deploy_dag", "Deploy a new DAG File to the DAGs directory", "None - Custom API")
            .post(vec![
                A::file("dag_file", "Python file to upload and deploy").required(),
                A::flag("force", "Whether to forcefully upload the file if the file already exists or not"),
                A::flag("pause", "The DAG will be forced to be paused when created and override the 'dags_are_paused_at_creation' config."),
                A::flag("unpause", "The DAG will be forced to be unpaused when created and override the 'dags_are_paused_at_creation' config."),
            ])
            .custom(HandlerId::DeployDag),
        ApiDescriptor::new("refresh_dag", "Refresh a DAG in the Web Server", "None - Custom API")
            .args(vec![A::text("dag_id", DAG_ID).required()])
            .custom(HandlerId::RefreshDag),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_is_well_formed() {
        let registry = ApiRegistry::builtin();
        registry.check_integrity().unwrap();
        assert_eq!(registry.len(), 25);
    }

    #[test]
    fn test_end_positions_are_dense_for_every_descriptor() {
        for descriptor in ApiRegistry::builtin().iter() {
            let mut positions: Vec<usize> = descriptor
                .arguments
                .iter()
                .filter_map(|a| a.end_position)
                .collect();
            positions.sort_unstable();
            let expected: Vec<usize> = (1..=positions.len()).collect();
            assert_eq!(positions, expected, "descriptor '{}'", descriptor.name);
            assert_eq!(descriptor.max_end_position(), positions.len());
        }
    }

    #[test]
    fn test_lookup_is_trimmed_and_case_insensitive() {
        let registry = ApiRegistry::builtin();
        assert_eq!(registry.lookup("  Trigger_DAG ").unwrap().name, "trigger_dag");
        assert!(registry.lookup("nope").is_none());
        assert!(registry.lookup("").is_none());
    }

    #[test]
    fn test_registry_rejects_duplicate_names() {
        let dup = vec![
            ApiDescriptor::new("pause", "a", "x"),
            ApiDescriptor::new("pause", "b", "x"),
        ];
        let err = ApiRegistry::new(dup).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_descriptor_rejects_position_gap() {
        let gappy = ApiDescriptor::new("gappy", "d", "x").args(vec![
            ArgumentSpec::positional("a", "", 1),
            ArgumentSpec::positional("b", "", 3),
        ]);
        assert!(ApiRegistry::new(vec![gappy]).is_err());
    }

    #[test]
    fn test_descriptor_rejects_duplicate_argument() {
        let dup = ApiDescriptor::new("dup", "d", "x").args(vec![
            ArgumentSpec::text("a", ""),
            ArgumentSpec::flag("a", ""),
        ]);
        assert!(dup.check_integrity().is_err());
    }

    #[test]
    fn test_background_and_fixed_entries() {
        let registry = ApiRegistry::builtin();
        let background: Vec<&str> = registry
            .iter()
            .filter(|d| d.background_mode)
            .map(|d| d.name)
            .collect();
        assert_eq!(
            background,
            vec!["kerberos", "worker", "flower", "scheduler", "serve_logs"]
        );

        let clear = registry.lookup("clear").unwrap();
        assert_eq!(clear.fixed_arguments.len(), 1);
        assert_eq!(clear.fixed_arguments[0].name, "no_confirm");
    }

    #[test]
    fn test_deploy_dag_is_post_with_file() {
        let deploy = ApiRegistry::builtin().lookup("deploy_dag").cloned().unwrap();
        assert_eq!(deploy.http_method, HttpMethod::Post);
        assert_eq!(deploy.post_arguments[0].input_kind, InputKind::File);
        assert!(deploy.post_arguments[0].required);
        assert_eq!(deploy.dispatch, Dispatch::Custom(HandlerId::DeployDag));
    }

    #[test]
    fn test_descriptor_serializes_dispatch() {
        let pause = ApiRegistry::builtin().lookup("pause").cloned().unwrap();
        let json = serde_json::to_value(&pause).unwrap();
        assert_eq!(json["dispatch"]["kind"], "custom");
        assert_eq!(json["dispatch"]["handler"], "pause");
        assert_eq!(json["http_method"], "GET");
    }
}
