use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use relay_core::{AppState, DispatchOutcome, Dispatcher, ProcessError};
use relay_protocol::sse::{encode_data, encode_done};
use relay_provider_core::{ChunkStream, ClientApiError};
use serde_json::{Value, json};

use crate::auth::bearer_auth;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/cancel", post(cancel))
        .route("/v1/models", get(list_models))
        .layer(middleware::from_fn_with_state(state.clone(), bearer_auth))
        .with_state(state)
}

async fn chat_completions(State(state): State<Arc<AppState>>, Json(body): Json<Value>) -> Response {
    let dispatcher = Dispatcher::new(state);
    match dispatcher.process_request(body).await {
        Ok(DispatchOutcome::Stream(chunks)) => sse_response(canonical_sse_bytes(chunks)),
        Ok(DispatchOutcome::Final(response)) => Json(response).into_response(),
        Ok(DispatchOutcome::RawStream(bytes)) => sse_response(bytes),
        Ok(DispatchOutcome::RawFinal(value)) => Json(value).into_response(),
        Err(err) => error_response(err),
    }
}

/// Normalizes a chunk stream into `data: <json>\n\n` frames, appending the
/// `[DONE]` terminator only when the upstream stream ends cleanly — an
/// error is the last frame instead, with no terminator after it (spec.md
/// §4.4's "a caller disconnect or fatal error never emits a synthetic
/// close").
fn canonical_sse_bytes(
    mut chunks: ChunkStream,
) -> impl Stream<Item = Result<Bytes, ClientApiError>> + Send + 'static {
    async_stream::stream! {
        let mut ended_with_error = false;
        while let Some(item) = chunks.next().await {
            match item {
                Ok(chunk) => {
                    let json = serde_json::to_string(&chunk).unwrap_or_default();
                    yield Ok(encode_data(&json));
                }
                Err(err) => {
                    ended_with_error = true;
                    yield Err(err);
                }
            }
        }
        if !ended_with_error {
            yield Ok(encode_done());
        }
    }
}

fn sse_response<S>(stream: S) -> Response
where
    S: Stream<Item = Result<Bytes, ClientApiError>> + Send + 'static,
{
    let body = Body::from_stream(stream);
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header("x-accel-buffering", "no")
        .body(body)
        .unwrap_or_else(|_| (StatusCode::INTERNAL_SERVER_ERROR, "response_build_failed").into_response())
}

async fn cancel(State(state): State<Arc<AppState>>, Json(body): Json<Value>) -> Response {
    let Some(chat_id) = body.get("chat_id").and_then(Value::as_str) else {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "chat_id is required"}))).into_response();
    };
    let dispatcher = Dispatcher::new(state);
    if dispatcher.cancel_request(chat_id).await {
        (StatusCode::OK, Json(json!({"cancelled": true}))).into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(json!({"cancelled": false}))).into_response()
    }
}

/// `created`/`owned_by` are fixed constants, matching the exact shape the
/// gateway has always returned here (including the nested `permission`
/// object rather than OpenAI's array).
const MODEL_LIST_CREATED: i64 = 1_740_268_800;
const MODEL_LIST_OWNER: &str = "deepclaude";

async fn list_models(State(state): State<Arc<AppState>>) -> Response {
    let models = match state.storage.list_models().await {
        Ok(models) => models,
        Err(err) => return error_response(ProcessError::from(err)),
    };
    let composites = match state.storage.list_composites().await {
        Ok(composites) => composites,
        Err(err) => return error_response(ProcessError::from(err)),
    };

    let mut data: Vec<Value> = Vec::new();
    for model in models.iter().filter(|m| m.valid) {
        data.push(model_entry(&model.name));
    }
    for composite in composites.iter().filter(|c| c.valid) {
        data.push(model_entry(&composite.name));
    }

    Json(json!({ "object": "list", "data": data })).into_response()
}

fn model_entry(id: &str) -> Value {
    json!({
        "id": id,
        "object": "model",
        "created": MODEL_LIST_CREATED,
        "owned_by": MODEL_LIST_OWNER,
        "permission": {
            "id": format!("modelperm-{id}"),
            "object": "model_permission",
            "created": MODEL_LIST_CREATED,
            "allow_create_engine": false,
            "allow_sampling": true,
            "allow_logprobs": true,
            "allow_search_indices": false,
            "allow_view": true,
            "allow_fine_tuning": false,
            "organization": "*",
            "group": Value::Null,
            "is_blocking": false,
        },
        "root": MODEL_LIST_OWNER,
        "parent": Value::Null,
    })
}

fn error_response(err: ProcessError) -> Response {
    let status = err.status();
    let message = err.message();
    let detail = err.detail();
    (status, Json(json!({ "error": message, "detail": detail }))).into_response()
}
