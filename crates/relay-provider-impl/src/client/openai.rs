use async_stream::try_stream;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use http::HeaderMap;
use relay_common::ParamMap;
use relay_protocol::{CanonicalResponse, SseFramer};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use relay_provider_core::client::Message;
use relay_provider_core::{ByteStream, ChunkStream, ClientApiError, UpstreamClient};

use crate::format::format_openai;
use crate::normalize::openai;

use super::shared::{Timeouts, build_chunk, cancellable_byte_stream, send};

/// openai-family upstream: already-canonical wire shape, no reasoning
/// extraction or typed-event mapping needed (spec.md §4.2).
pub struct OpenAiClient {
    api_key: String,
    api_url: String,
    http: wreq::Client,
    timeouts: Timeouts,
}

impl OpenAiClient {
    pub fn new(api_key: String, api_url: String, http: wreq::Client) -> Self {
        Self {
            api_key,
            api_url,
            http,
            timeouts: Timeouts::default(),
        }
    }
}

#[async_trait]
impl UpstreamClient for OpenAiClient {
    async fn stream_chat(
        &self,
        chat_id: &str,
        messages: Vec<Message>,
        model: &str,
        model_args: ParamMap,
        cancel: CancellationToken,
    ) -> ChunkStream {
        let (headers, body) = format_openai(&self.api_key, model, messages, true, &model_args);
        let http = self.http.clone();
        let url = self.api_url.clone();
        let timeouts = self.timeouts;
        let chat_id = chat_id.to_string();
        let model = model.to_string();
        let created = relay_common::clock::unix_seconds();

        Box::pin(try_stream! {
            let response = send(&http, &url, headers, body, timeouts).await?;
            let mut bytes_stream = cancellable_byte_stream(response, cancel);
            let mut framer = SseFramer::new();

            'outer: while let Some(item) = bytes_stream.next().await {
                let bytes: Bytes = item?;
                for event in framer.push_bytes(&bytes) {
                    if event.data.trim() == "[DONE]" {
                        break 'outer;
                    }
                    let json: Value = match serde_json::from_str(&event.data) {
                        Ok(v) => v,
                        Err(_) => continue,
                    };
                    if let Some(normalized) = openai::process(&json) {
                        yield build_chunk(&chat_id, created, &model, normalized);
                    }
                }
            }
        })
    }

    async fn chat(
        &self,
        chat_id: &str,
        messages: Vec<Message>,
        model: &str,
        model_args: ParamMap,
    ) -> Result<CanonicalResponse, ClientApiError> {
        let (headers, body) = format_openai(&self.api_key, model, messages, false, &model_args);
        let response = send(&self.http, &self.api_url, headers, body, self.timeouts).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ClientApiError::transport(err.to_string()))?;
        let json: Value = serde_json::from_slice(&bytes)
            .map_err(|err| ClientApiError::transport(err.to_string()))?;

        let (message, finish_reason, usage, provider_chat_id) = openai::decode_final(&json)
            .ok_or_else(|| ClientApiError::transport("missing choices in upstream response"))?;

        let created = relay_common::clock::unix_seconds();
        let mut response = CanonicalResponse::new(
            chat_id.to_string(),
            created,
            model.to_string(),
            message,
            finish_reason,
        );
        response.provider_chat_id = provider_chat_id;
        response.usage = usage;
        Ok(response)
    }

    async fn original_stream_chat(
        &self,
        headers: HeaderMap,
        body: Value,
        cancel: CancellationToken,
    ) -> ByteStream {
        match send(&self.http, &self.api_url, headers, body, self.timeouts).await {
            Ok(response) => cancellable_byte_stream(response, cancel),
            Err(err) => Box::pin(futures_util::stream::once(async move { Err(err) })),
        }
    }

    async fn original_chat(&self, headers: HeaderMap, body: Value) -> Result<Value, ClientApiError> {
        let response = send(&self.http, &self.api_url, headers, body, self.timeouts).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ClientApiError::transport(err.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|err| ClientApiError::transport(err.to_string()))
    }
}
