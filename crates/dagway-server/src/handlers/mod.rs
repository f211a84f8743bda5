//! Operation handlers.
//!
//! [`dispatch`] routes a validated descriptor either to one of the in-process
//! handlers below or to [`run_command_line`], which assembles and executes
//! the orchestrator CLI.

pub mod dates;
pub mod deploy;
pub mod pool;
pub mod refresh;
pub mod version;
pub mod workflows;

use dagway_dispatch::{
    ApiDescriptor, Dispatch, DispatchError, HandlerId, RequestArguments, ResolvedArguments,
    assemble,
};
use dagway_metadata::MetadataError;
use thiserror::Error;

use crate::envelope::HandlerOutput;
use crate::error::ServerError;
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Failure of a single operation.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The caller supplied something unusable (bad date, unknown record, ...).
    #[error("{0}")]
    BadRequest(String),

    /// The operation could not be carried out.
    #[error("{0}")]
    Internal(String),
}

impl From<MetadataError> for HandlerError {
    fn from(e: MetadataError) -> Self {
        match e {
            MetadataError::NotFound(msg) | MetadataError::Duplicate(msg) => {
                HandlerError::BadRequest(msg)
            }
            other => HandlerError::Internal(other.to_string()),
        }
    }
}

impl From<DispatchError> for HandlerError {
    fn from(e: DispatchError) -> Self {
        if e.is_validation() {
            HandlerError::BadRequest(e.to_string())
        } else {
            HandlerError::Internal(e.to_string())
        }
    }
}

impl From<HandlerError> for ServerError {
    fn from(e: HandlerError) -> Self {
        match e {
            HandlerError::BadRequest(msg) => ServerError::BadRequest(msg),
            HandlerError::Internal(msg) => ServerError::Internal(msg),
        }
    }
}

pub type HandlerResult = std::result::Result<HandlerOutput, HandlerError>;

// ─────────────────────────────────────────────────────────────────────────────
// Request context
// ─────────────────────────────────────────────────────────────────────────────

/// A file received in a multipart body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Form field the file arrived under.
    pub field: String,
    /// Client-supplied file name, if any.
    pub file_name: Option<String>,
    pub contents: Vec<u8>,
}

/// Decoded POST body: plain fields plus any uploaded files.
#[derive(Debug, Clone, Default)]
pub struct PostBody {
    pub fields: RequestArguments,
    pub files: Vec<UploadedFile>,
}

impl PostBody {
    /// First file uploaded under `field`.
    pub fn file(&self, field: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|f| f.field == field)
    }
}

/// Everything a handler may look at.
pub struct HandlerContext<'a> {
    pub state: &'a AppState,
    pub descriptor: &'a ApiDescriptor,
    pub args: &'a RequestArguments,
    pub post: &'a PostBody,
}

impl HandlerContext<'_> {
    /// Trimmed workflow id; validation guarantees it for operations that
    /// require one.
    fn dag_id(&self) -> Result<&str, HandlerError> {
        self.args
            .non_empty("dag_id")
            .map(str::trim)
            .ok_or_else(|| HandlerError::BadRequest("dag_id should be provided".to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dispatch
// ─────────────────────────────────────────────────────────────────────────────

/// Run the operation a validated descriptor names.
pub async fn dispatch(ctx: &HandlerContext<'_>) -> HandlerResult {
    match ctx.descriptor.dispatch {
        Dispatch::GenericCommandLine => run_command_line(ctx).await,
        Dispatch::Custom(handler) => {
            tracing::info!(operation = ctx.descriptor.name, ?handler, "Executing custom handler");
            match handler {
                HandlerId::Version => version::version(ctx).await,
                HandlerId::PluginVersion => version::plugin_version(ctx),
                HandlerId::Pause => workflows::set_paused(ctx, true),
                HandlerId::Unpause => workflows::set_paused(ctx, false),
                HandlerId::TriggerDag => workflows::trigger_dag(ctx),
                HandlerId::DagState => workflows::dag_state(ctx),
                HandlerId::TaskState => workflows::task_state(ctx),
                HandlerId::ListDags => workflows::list_dags(ctx),
                HandlerId::Pool => pool::pool(ctx),
                HandlerId::DeployDag => deploy::deploy_dag(ctx).await,
                HandlerId::RefreshDag => refresh::refresh_dag(ctx).await,
            }
        }
    }
}

/// Assemble the descriptor's command line, execute it, and report the
/// captured output along with the command that ran.
pub async fn run_command_line(ctx: &HandlerContext<'_>) -> HandlerResult {
    let resolved = ResolvedArguments::resolve(ctx.descriptor, ctx.args);
    let command = assemble(ctx.descriptor, &resolved, &ctx.state.assembly_context());

    tracing::info!(
        operation = ctx.descriptor.name,
        background = command.is_background(),
        "Executing command line operation"
    );

    let mut output = ctx.state.executor.execute(&command).await?;
    if ctx.state.config.filter_loading_messages {
        output = output.without_loading_messages();
    }

    let output = serde_json::to_value(&output)
        .map_err(|e| HandlerError::Internal(format!("Failed to encode process output: {}", e)))?;

    Ok(HandlerOutput::new(output).with_command(command.display()))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::ServerConfig;
    use dagway_metadata::{MetadataStore, Workflow};

    /// State over an in-memory store holding `sample_dag`.
    pub fn state_with(config: ServerConfig) -> AppState {
        let store = MetadataStore::open_in_memory().unwrap();
        store
            .register_workflow(&Workflow::new("sample_dag").with_fileloc("/dags/sample.py"))
            .unwrap();
        AppState::new(config, store)
    }

    /// Write an executable shell script standing in for the orchestrator CLI.
    pub fn fake_program(dir: &std::path::Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("fake-airflow");
        std::fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    pub fn args(pairs: &[(&str, &str)]) -> RequestArguments {
        pairs.iter().copied().collect()
    }

    /// Run `operation` through [`dispatch`] with the given query arguments.
    pub async fn run(state: &AppState, operation: &str, pairs: &[(&str, &str)]) -> HandlerResult {
        run_with_post(state, operation, pairs, PostBody::default()).await
    }

    pub async fn run_with_post(
        state: &AppState,
        operation: &str,
        pairs: &[(&str, &str)],
        post: PostBody,
    ) -> HandlerResult {
        let descriptor = state.registry.lookup(operation).unwrap();
        let args = args(pairs);
        let ctx = HandlerContext {
            state,
            descriptor,
            args: &args,
            post: &post,
        };
        dispatch(&ctx).await
    }
}
