//! `deploy_dag`: write an uploaded workflow definition into the dags folder.

use std::io::{self, ErrorKind};
use std::path::Path;

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use super::{HandlerContext, HandlerError, HandlerResult};
use crate::envelope::HandlerOutput;

/// Multipart field carrying the workflow file.
pub const DAG_FILE_FIELD: &str = "dag_file";

/// Save the upload, then optionally pause or unpause the workflows the
/// orchestrator has registered from that file.
///
/// Problems setting the paused state are reported as a warning; the upload
/// itself still succeeds.
pub async fn deploy_dag(ctx: &HandlerContext<'_>) -> HandlerResult {
    let upload = ctx
        .post
        .file(DAG_FILE_FIELD)
        .filter(|f| f.file_name.as_deref().is_some_and(|n| !n.is_empty()))
        .ok_or_else(|| {
            HandlerError::BadRequest("The dag_file argument wasn't provided".to_string())
        })?;

    // Only the final component is kept so uploads cannot escape the folder.
    let file_name = upload
        .file_name
        .as_deref()
        .and_then(|n| Path::new(n).file_name())
        .and_then(|n| n.to_str())
        .filter(|n| n.ends_with(".py"))
        .ok_or_else(|| HandlerError::BadRequest("dag_file is not a *.py file".to_string()))?;

    let force = ctx.post.fields.contains("force");
    let pause = ctx.post.fields.contains("pause");
    let unpause = ctx.post.fields.contains("unpause");

    let save_path = ctx.state.config.dags_folder.join(file_name);
    tracing::info!(path = %save_path.display(), bytes = upload.contents.len(), "Saving workflow file");
    save_upload(&save_path, &upload.contents, force)
        .await
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => {
                tracing::warn!(path = %save_path.display(), "File to upload already exists");
                HandlerError::BadRequest(format!(
                    "The file '{}' already exists",
                    save_path.display()
                ))
            }
            _ => HandlerError::Internal(format!(
                "Failed to save '{}': {}",
                save_path.display(),
                e
            )),
        })?;

    let warning = match (pause, unpause) {
        (true, true) => Some(
            "Both options pause and unpause were given. Skipping setting the state \
             (pause, unpause) of the DAG."
                .to_string(),
        ),
        (false, false) => None,
        (is_paused, _) => apply_paused_state(ctx, &save_path, is_paused).err(),
    };
    if let Some(ref w) = warning {
        tracing::warn!(warning = %w, "Deployed without changing paused state");
    }

    Ok(HandlerOutput::new(format!("DAG File [{}] has been uploaded", file_name))
        .with_warning(warning))
}

/// Write `contents` to `path`. Without `force` the file must not exist yet;
/// the check and the create are a single open call.
async fn save_upload(path: &Path, contents: &[u8], force: bool) -> io::Result<()> {
    if force {
        return tokio::fs::write(path, contents).await;
    }
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(contents).await?;
    file.flush().await
}

/// Set the paused flag of every workflow loaded from `path`. Returns the
/// warning text on failure.
fn apply_paused_state(ctx: &HandlerContext<'_>, path: &Path, is_paused: bool) -> Result<(), String> {
    let fileloc = path.display().to_string();
    let failed = |reason: String| {
        format!("Failed to set the state (pause, unpause) of the DAG: {}", reason)
    };

    let workflows = ctx
        .state
        .metadata
        .workflows_for_file(&fileloc)
        .map_err(|e| failed(e.to_string()))?;
    if workflows.is_empty() {
        return Err(failed(format!("no DAG is registered from '{}' yet", fileloc)));
    }

    for workflow in workflows {
        ctx.state
            .metadata
            .set_paused(&workflow.dag_id, is_paused)
            .map_err(|e| failed(e.to_string()))?;
    }
    Ok(())
}
