use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use http::HeaderMap;
use relay_common::ParamMap;
use relay_protocol::{CanonicalChunk, CanonicalResponse};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::ClientApiError;

pub type ChunkStream = BoxStream<'static, Result<CanonicalChunk, ClientApiError>>;
pub type ByteStream = BoxStream<'static, Result<Bytes, ClientApiError>>;

/// One chat message as the caller sent it: `{role, content, ...}`. Kept as
/// raw JSON rather than a typed struct since formatters only ever need to
/// re-serialize it (and, for anthropic, lift the leading `system` message
/// out), never interpret its fields.
pub type Message = Value;

/// Per-family request builder + response normalizer, duck-typed the same
/// way the source's clients are (stream_chat/chat/original_stream_chat/
/// original_chat/format_data), expressed here as a Rust trait so the
/// dispatcher can hold any of the three behind one `Arc<dyn UpstreamClient>`.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Canonical streaming call. The returned stream is finite, not
    /// restartable, and ends (without a synthetic terminator) the moment
    /// `cancel` fires, the upstream signals end-of-stream, or a fatal error
    /// occurs (in which case the last item is `Err`).
    async fn stream_chat(
        &self,
        chat_id: &str,
        messages: Vec<Message>,
        model: &str,
        model_args: ParamMap,
        cancel: CancellationToken,
    ) -> ChunkStream;

    /// Canonical single-shot call.
    async fn chat(
        &self,
        chat_id: &str,
        messages: Vec<Message>,
        model: &str,
        model_args: ParamMap,
    ) -> Result<CanonicalResponse, ClientApiError>;

    /// Verbatim pass-through streaming call for `origin_output=true` models:
    /// the upstream's own SSE bytes, unnormalized.
    async fn original_stream_chat(
        &self,
        headers: HeaderMap,
        body: Value,
        cancel: CancellationToken,
    ) -> ByteStream;

    /// Verbatim pass-through single-shot call for `origin_output=true`.
    async fn original_chat(
        &self,
        headers: HeaderMap,
        body: Value,
    ) -> Result<Value, ClientApiError>;
}
