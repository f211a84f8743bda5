//! Workflow-level operations backed by the metadata database.

use chrono::{Local, NaiveDateTime, Timelike};
use dagway_dispatch::WorkflowCatalog;
use dagway_metadata::NewRun;

use super::dates::{isoformat, parse_execution_date};
use super::{HandlerContext, HandlerError, HandlerResult};
use crate::envelope::HandlerOutput;

const RUNNING: &str = "running";

fn python_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

/// `pause` / `unpause`.
pub fn set_paused(ctx: &HandlerContext<'_>, is_paused: bool) -> HandlerResult {
    let dag_id = ctx.dag_id()?;
    let workflow = ctx.state.metadata.set_paused(dag_id, is_paused)?;
    Ok(HandlerOutput::new(format!(
        "Dag: {}, paused: {}",
        workflow.dag_id,
        python_bool(workflow.is_paused)
    )))
}

/// Sorted ids of every workflow in the catalog.
pub fn list_dags(ctx: &HandlerContext<'_>) -> HandlerResult {
    let mut ids = ctx.state.metadata.workflow_ids()?;
    ids.sort();
    Ok(HandlerOutput::new(ids))
}

/// Create a running, externally triggered run.
///
/// `exec_date` defaults to now; both are truncated to whole seconds. `run_id`
/// defaults to `manual__<execution date>`.
pub fn trigger_dag(ctx: &HandlerContext<'_>) -> HandlerResult {
    let dag_id = ctx.dag_id()?;

    let execution_date = match ctx.args.non_empty("exec_date") {
        Some(value) => parse_execution_date(value)?,
        None => Local::now().naive_local(),
    };
    let execution_date = truncate_to_seconds(execution_date);

    let run_id = ctx
        .args
        .non_empty("run_id")
        .map(String::from)
        .unwrap_or_else(|| format!("manual__{}", isoformat(&execution_date)));

    let conf = ctx
        .args
        .non_empty("conf")
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()
        .map_err(|e| HandlerError::BadRequest(format!("conf is not valid JSON: {}", e)))?;

    let run = ctx.state.metadata.create_run(&NewRun {
        dag_id: dag_id.to_string(),
        run_id,
        execution_date,
        state: RUNNING.to_string(),
        external_trigger: true,
        conf,
    })?;

    tracing::info!(dag_id, run_id = %run.run_id, "Triggered workflow run");

    let output = serde_json::to_value(&run)
        .map_err(|e| HandlerError::Internal(format!("Failed to encode run: {}", e)))?;
    Ok(HandlerOutput::new(output))
}

/// State of the run at `execution_date`, or null.
pub fn dag_state(ctx: &HandlerContext<'_>) -> HandlerResult {
    let dag_id = ctx.dag_id()?;
    let execution_date = required_date(ctx)?;

    let state = ctx
        .state
        .metadata
        .find_run(dag_id, &execution_date)?
        .and_then(|run| run.state);
    Ok(HandlerOutput::new(state))
}

/// State of one task instance, or null.
pub fn task_state(ctx: &HandlerContext<'_>) -> HandlerResult {
    let dag_id = ctx.dag_id()?;
    let task_id = ctx
        .args
        .non_empty("task_id")
        .ok_or_else(|| HandlerError::BadRequest("task_id should be provided".to_string()))?;
    let execution_date = required_date(ctx)?;

    let state = ctx
        .state
        .metadata
        .task_state(dag_id, task_id, &execution_date)?;
    Ok(HandlerOutput::new(state))
}

/// `execution_date`, truncated the same way `trigger_dag` stores it.
fn required_date(ctx: &HandlerContext<'_>) -> Result<NaiveDateTime, HandlerError> {
    parse_execution_date(ctx.args.get("execution_date").unwrap_or_default()).map(truncate_to_seconds)
}

fn truncate_to_seconds(dt: NaiveDateTime) -> NaiveDateTime {
    dt.with_nanosecond(0).unwrap_or(dt)
}
