use std::time::Duration;

use async_stream::try_stream;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use http::HeaderMap;
use relay_protocol::{CanonicalChoice, CanonicalChunk};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use relay_provider_core::ClientApiError;

use crate::normalize::NormalizedEvent;

/// Documents spec.md §4.2's "fixed-size windows (default 8 KiB)" read
/// loop. `wreq::Response::bytes_stream()` already yields socket-sized
/// windows close to this; we don't re-chunk, only test `cancel` before
/// consuming each one, matching the spec's cancellation-check contract.
pub const READ_WINDOW_BYTES: usize = 8192;

#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub total: Duration,
    pub connect: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            total: Duration::from_secs(600),
            connect: Duration::from_secs(10),
        }
    }
}

/// One-shot POST against the shared connector. Non-2xx responses are
/// translated into a `ClientApiError` carrying the substring-derived hint;
/// the session itself is never retained past this call.
pub(crate) async fn send(
    client: &wreq::Client,
    url: &str,
    headers: HeaderMap,
    body: Value,
    timeouts: Timeouts,
) -> Result<wreq::Response, ClientApiError> {
    let response = client
        .post(url)
        .headers(headers)
        .timeout(timeouts.total)
        .json(&body)
        .send()
        .await
        .map_err(|err| ClientApiError::transport(err.to_string()))?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(ClientApiError::from_upstream_body(
            status,
            extract_error_message(&text),
        ));
    }
    Ok(response)
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

/// Wraps a response body into a cancellation-aware byte stream: `cancel`
/// is tested before each window is consumed; on cancel the response is
/// dropped and the stream ends without a synthetic terminator or error.
pub(crate) fn cancellable_byte_stream(
    response: wreq::Response,
    cancel: CancellationToken,
) -> BoxStream<'static, Result<Bytes, ClientApiError>> {
    let mut inner = response.bytes_stream();
    Box::pin(try_stream! {
        loop {
            if cancel.is_cancelled() {
                break;
            }
            match inner.next().await {
                Some(Ok(bytes)) => yield bytes,
                Some(Err(err)) => Err(ClientApiError::transport(err.to_string()))?,
                None => break,
            }
        }
    })
}

pub(crate) fn build_chunk(
    id: &str,
    created: i64,
    model: &str,
    event: NormalizedEvent,
) -> CanonicalChunk {
    let mut chunk = CanonicalChunk::new(
        id.to_string(),
        created,
        model.to_string(),
        vec![CanonicalChoice {
            index: event.index,
            delta: event.delta.unwrap_or_default(),
            finish_reason: event.finish_reason,
        }],
    );
    chunk.provider_chat_id = event.provider_chat_id;
    chunk.usage = event.usage;
    chunk
}
