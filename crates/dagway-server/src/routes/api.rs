//! The multiplexed API endpoint.
//!
//! `GET|POST /admin/rest_api/api?api=<operation>&<arguments...>`
//!
//! The operation and its arguments always come from the query string. A POST
//! body, urlencoded or multipart, supplies the post arguments (and, for
//! `deploy_dag`, the uploaded file).

use axum::{
    Form,
    extract::{FromRequest, Multipart, Query, Request, State},
    http::{Method, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use dagway_dispatch::{RequestArguments, validate};

use crate::envelope::EnvelopeBase;
use crate::error::ServerError;
use crate::handlers::{self, HandlerContext, PostBody, UploadedFile};
use crate::state::AppState;

/// Query parameter selecting the operation.
pub const OPERATION_PARAM: &str = "api";

/// Accepted alias for [`OPERATION_PARAM`].
pub const OPERATION_ALIAS: &str = "operation";

pub async fn api_handler(
    State(state): State<AppState>,
    method: Method,
    Query(query): Query<Vec<(String, String)>>,
    request: Request,
) -> Response {
    let args = RequestArguments::new(query);

    let post = if method == Method::POST {
        match read_post_body(request, &state).await {
            Ok(post) => post,
            Err(e) => {
                let base = EnvelopeBase::new(&args, &RequestArguments::default());
                return e.into_envelope(base).into_response();
            }
        }
    } else {
        PostBody::default()
    };

    let base = EnvelopeBase::new(&args, &post.fields);
    match run_operation(&state, &args, &post).await {
        Ok(outcome) => base.success(outcome).into_response(),
        Err(e) => e.into_envelope(base).into_response(),
    }
}

async fn run_operation(
    state: &AppState,
    args: &RequestArguments,
    post: &PostBody,
) -> Result<crate::envelope::HandlerOutput, ServerError> {
    let operation = args.get(OPERATION_PARAM).or_else(|| args.get(OPERATION_ALIAS));
    tracing::info!(operation = ?operation, "API called");

    let descriptor = validate(operation, &state.registry, args, state.metadata.as_ref())?;

    let ctx = HandlerContext {
        state,
        descriptor,
        args,
        post,
    };
    Ok(handlers::dispatch(&ctx).await?)
}

/// Decode a POST body by content type. Anything other than multipart or
/// urlencoded is ignored.
async fn read_post_body(request: Request, state: &AppState) -> Result<PostBody, ServerError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| ServerError::BadRequest(e.body_text()))?;
        read_multipart(multipart).await
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(pairs) = Form::<Vec<(String, String)>>::from_request(request, state)
            .await
            .map_err(|e| ServerError::BadRequest(e.body_text()))?;
        Ok(PostBody {
            fields: RequestArguments::new(pairs),
            files: Vec::new(),
        })
    } else {
        Ok(PostBody::default())
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<PostBody, ServerError> {
    let mut fields = Vec::new();
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(String::from) {
            Some(file_name) => {
                let contents = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(e.body_text()))?;
                files.push(UploadedFile {
                    field: name,
                    file_name: Some(file_name),
                    contents: contents.to_vec(),
                });
            }
            None => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(e.body_text()))?;
                fields.push((name, value));
            }
        }
    }

    Ok(PostBody {
        fields: RequestArguments::new(fields),
        files,
    })
}
