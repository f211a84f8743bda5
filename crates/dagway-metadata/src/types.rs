use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A workflow (DAG) known to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub dag_id: String,
    pub is_paused: bool,
    pub is_active: bool,
    /// Definition file the workflow was loaded from.
    pub fileloc: Option<String>,
    pub owners: Option<String>,
}

impl Workflow {
    pub fn new(dag_id: impl Into<String>) -> Self {
        Self {
            dag_id: dag_id.into(),
            is_paused: false,
            is_active: true,
            fileloc: None,
            owners: None,
        }
    }

    pub fn with_fileloc(mut self, fileloc: impl Into<String>) -> Self {
        self.fileloc = Some(fileloc.into());
        self
    }

    pub fn paused(mut self, is_paused: bool) -> Self {
        self.is_paused = is_paused;
        self
    }
}

/// One run of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: i64,
    pub dag_id: String,
    pub run_id: String,
    pub execution_date: NaiveDateTime,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub state: Option<String>,
    pub external_trigger: bool,
    pub conf: Option<serde_json::Value>,
}

/// Values for a run about to be created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRun {
    pub dag_id: String,
    pub run_id: String,
    pub execution_date: NaiveDateTime,
    pub state: String,
    pub external_trigger: bool,
    pub conf: Option<serde_json::Value>,
}

/// State of a single task within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInstance {
    pub dag_id: String,
    pub task_id: String,
    pub execution_date: NaiveDateTime,
    pub state: Option<String>,
    pub try_number: i64,
    pub hostname: Option<String>,
}

/// A named limit on concurrently running tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub id: i64,
    pub pool: String,
    pub slots: i64,
    pub description: Option<String>,
}
