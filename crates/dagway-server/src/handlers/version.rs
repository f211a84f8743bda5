//! `version` and `rest_api_plugin_version`.

use dagway_dispatch::{CommandVector, filter_loading_messages};

use super::{HandlerContext, HandlerError, HandlerResult};
use crate::envelope::HandlerOutput;

/// Ask the orchestrator CLI for its version.
///
/// The last non-empty line of the filtered output is taken as the version;
/// banners printed before it are ignored.
pub async fn version(ctx: &HandlerContext<'_>) -> HandlerResult {
    let command = CommandVector::new(
        vec![ctx.state.config.program.clone(), "version".to_string()],
        false,
    );
    let output = ctx.state.executor.execute(&command).await?;
    let stdout = filter_loading_messages(&output.stdout);

    let version = stdout
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .map(|line| line.trim_start_matches('v'))
        .ok_or_else(|| {
            HandlerError::Internal(format!(
                "Unable to determine the orchestrator version: {}",
                output.stderr.trim()
            ))
        })?;

    Ok(HandlerOutput::new(format!("v{}", version)))
}

/// Version of this gateway.
pub fn plugin_version(_ctx: &HandlerContext<'_>) -> HandlerResult {
    Ok(HandlerOutput::new(format!("v{}", env!("CARGO_PKG_VERSION"))))
}

#[cfg(test)]
mod tests {
    use crate::config::ServerConfig;
    use crate::handlers::HandlerError;
    use crate::handlers::test_support::*;

    #[tokio::test]
    async fn test_version_from_cli() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_program(
            dir.path(),
            "echo '[2017-04-19 10:04:34,927] {__init__.py:57} INFO - Using executor SequentialExecutor'\n\
             echo '  ____________       _____________'\n\
             echo '  v1.8.0'\n",
        );
        let state = state_with(ServerConfig::default().with_program(program));
        let outcome = run(&state, "version", &[]).await.unwrap();
        assert_eq!(outcome.output, "v1.8.0");
        assert!(outcome.command.is_none());
    }

    #[tokio::test]
    async fn test_version_without_output() {
        let state = state_with(ServerConfig::default().with_program("true"));
        let err = run(&state, "version", &[]).await.unwrap_err();
        assert!(matches!(err, HandlerError::Internal(_)));
    }

    #[tokio::test]
    async fn test_plugin_version() {
        let state = state_with(ServerConfig::default());
        let outcome = run(&state, "rest_api_plugin_version", &[]).await.unwrap();
        assert_eq!(outcome.output, format!("v{}", env!("CARGO_PKG_VERSION")));
    }
}
