//! The JSON envelope every API response is wrapped in.
//!
//! ```json
//! {
//!   "status": "OK",
//!   "http_response_code": 200,
//!   "call_time": "2017-04-19T10:04:34.927+00:00",
//!   "response_time": "2017-04-19T10:04:35.101+00:00",
//!   "arguments": {"api": "pause", "dag_id": "sample_dag"},
//!   "post_arguments": {},
//!   "output": "Dag: sample_dag, paused: True",
//!   "command": "airflow ...",
//!   "warning": "..."
//! }
//! ```
//!
//! `command` appears only for command-line operations, `warning` only when a
//! handler raised one, and the argument echoes are left out of authentication
//! failures.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Local};
use dagway_dispatch::RequestArguments;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Overall outcome of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
    Error,
}

/// Serialized response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub status: Status,
    pub http_response_code: u16,
    pub call_time: DateTime<Local>,
    pub response_time: DateTime<Local>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_arguments: Option<Value>,
    pub output: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl IntoResponse for ResponseEnvelope {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_response_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// What a successful operation produced.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerOutput {
    pub output: Value,
    pub command: Option<String>,
    pub warning: Option<String>,
}

impl HandlerOutput {
    pub fn new(output: impl Into<Value>) -> Self {
        Self {
            output: output.into(),
            command: None,
            warning: None,
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_warning(mut self, warning: Option<String>) -> Self {
        self.warning = warning;
        self
    }
}

/// The request-scoped half of an envelope, captured when the call starts.
#[derive(Debug, Clone)]
pub struct EnvelopeBase {
    call_time: DateTime<Local>,
    arguments: Option<Value>,
    post_arguments: Option<Value>,
}

impl EnvelopeBase {
    /// Start an envelope that echoes the request's arguments.
    pub fn new(arguments: &RequestArguments, post_arguments: &RequestArguments) -> Self {
        Self {
            call_time: Local::now(),
            arguments: Some(arguments.to_json()),
            post_arguments: Some(post_arguments.to_json()),
        }
    }

    /// Start an envelope that echoes nothing.
    pub fn without_arguments() -> Self {
        Self {
            call_time: Local::now(),
            arguments: None,
            post_arguments: None,
        }
    }

    pub fn success(self, outcome: HandlerOutput) -> ResponseEnvelope {
        tracing::info!(output = %outcome.output, "Returning a 200 response");
        ResponseEnvelope {
            status: Status::Ok,
            http_response_code: StatusCode::OK.as_u16(),
            call_time: self.call_time,
            response_time: Local::now(),
            arguments: self.arguments,
            post_arguments: self.post_arguments,
            output: outcome.output,
            command: outcome.command,
            warning: outcome.warning,
        }
    }

    pub fn failure(self, status: StatusCode, message: impl Into<String>) -> ResponseEnvelope {
        ResponseEnvelope {
            status: Status::Error,
            http_response_code: status.as_u16(),
            call_time: self.call_time,
            response_time: Local::now(),
            arguments: self.arguments,
            post_arguments: self.post_arguments,
            output: Value::String(message.into()),
            command: None,
            warning: None,
        }
    }
}
