//! Request validation.

use crate::arguments::RequestArguments;
use crate::error::{DispatchError, Result};
use crate::registry::{ApiDescriptor, ApiRegistry};

/// Name of the argument that identifies a workflow.
pub const WORKFLOW_ID_ARGUMENT: &str = "dag_id";

/// Read access to the orchestrator's set of known workflows.
pub trait WorkflowCatalog: Send + Sync {
    /// Whether a workflow with this id is currently loaded.
    fn contains_workflow(&self, workflow_id: &str) -> Result<bool>;

    /// All known workflow ids.
    fn workflow_ids(&self) -> Result<Vec<String>>;
}

/// Resolve the requested operation and check its arguments.
///
/// Required arguments are checked in full before failing, so the error names
/// every missing one. When the operation takes a workflow id and one is
/// supplied, it must exist in `catalog`.
pub fn validate<'r>(
    operation: Option<&str>,
    registry: &'r ApiRegistry,
    args: &RequestArguments,
    catalog: &dyn WorkflowCatalog,
) -> Result<&'r ApiDescriptor> {
    let name = operation
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or(DispatchError::MissingOperation)?;

    let descriptor = registry
        .lookup(name)
        .ok_or_else(|| DispatchError::UnknownOperation(name.to_lowercase()))?;

    let missing: Vec<String> = descriptor
        .arguments
        .iter()
        .filter(|spec| spec.required && args.non_empty(spec.name).is_none())
        .map(|spec| spec.name.to_string())
        .collect();
    if !missing.is_empty() {
        tracing::warn!(operation = descriptor.name, ?missing, "Missing required arguments");
        return Err(DispatchError::MissingRequiredArguments(missing));
    }

    if descriptor.argument(WORKFLOW_ID_ARGUMENT).is_some()
        && let Some(workflow_id) = args.get(WORKFLOW_ID_ARGUMENT).map(str::trim)
        && !workflow_id.is_empty()
        && !catalog.contains_workflow(workflow_id)?
    {
        tracing::info!(operation = descriptor.name, workflow_id, "Workflow not in catalog");
        return Err(DispatchError::UnknownWorkflow(workflow_id.to_string()));
    }

    Ok(descriptor)
}
