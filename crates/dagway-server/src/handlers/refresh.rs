//! `refresh_dag`: ask the orchestrator webserver to reload a workflow.

use super::{HandlerContext, HandlerError, HandlerResult};
use crate::envelope::HandlerOutput;

/// Webserver endpoint that reloads one workflow.
pub const REFRESH_PATH: &str = "/admin/airflow/refresh";

pub async fn refresh_dag(ctx: &HandlerContext<'_>) -> HandlerResult {
    let dag_id = ctx.dag_id()?;
    if dag_id.contains(' ') {
        return Err(HandlerError::BadRequest(
            "dag_id contains spaces and is therefore an illegal argument".to_string(),
        ));
    }

    let url = format!(
        "{}{}",
        ctx.state.config.webserver_base_url.trim_end_matches('/'),
        REFRESH_PATH
    );
    tracing::info!(dag_id, %url, "Refreshing workflow");

    let result = ctx
        .state
        .http
        .get(&url)
        .query(&[("dag_id", dag_id)])
        .send()
        .await
        .and_then(|response| response.error_for_status());

    match result {
        Ok(_) => Ok(HandlerOutput::new(format!(
            "DAG [{}] is now fresh as a daisy",
            dag_id
        ))),
        Err(e) => Err(HandlerError::Internal(format!(
            "An error occurred while trying to Refresh the DAG '{}': {}",
            dag_id, e
        ))),
    }
}
