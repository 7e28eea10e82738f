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

use crate::format::format_reasoner;
use crate::normalize::reasoner::{Fragment, ThinkExtractor};

use super::shared::{Timeouts, build_chunk, cancellable_byte_stream, send};

/// A reasoner-family upstream. `origin_reasoning` is a property of the
/// *model* this client instance was built for, captured at construction
/// since the dispatcher builds a fresh client per request anyway.
pub struct ReasonerClient {
    api_key: String,
    api_url: String,
    http: wreq::Client,
    origin_reasoning: bool,
    timeouts: Timeouts,
}

impl ReasonerClient {
    pub fn new(api_key: String, api_url: String, http: wreq::Client, origin_reasoning: bool) -> Self {
        Self {
            api_key,
            api_url,
            http,
            origin_reasoning,
            timeouts: Timeouts::default(),
        }
    }
}

#[async_trait]
impl UpstreamClient for ReasonerClient {
    async fn stream_chat(
        &self,
        chat_id: &str,
        messages: Vec<Message>,
        model: &str,
        model_args: ParamMap,
        cancel: CancellationToken,
    ) -> ChunkStream {
        let (headers, body) = format_reasoner(&self.api_key, model, messages, true, &model_args);
        let http = self.http.clone();
        let url = self.api_url.clone();
        let timeouts = self.timeouts;
        let chat_id = chat_id.to_string();
        let model = model.to_string();
        let origin_reasoning = self.origin_reasoning;
        let created = relay_common::clock::unix_seconds();

        Box::pin(try_stream! {
            let response = send(&http, &url, headers, body, timeouts).await?;
            let mut bytes_stream = cancellable_byte_stream(response, cancel);
            let mut framer = SseFramer::new();
            let mut extractor = ThinkExtractor::new();

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
                    if origin_reasoning {
                        if let Some(normalized) = crate::normalize::reasoner::process_origin_reasoning(&json) {
                            yield build_chunk(&chat_id, created, &model, normalized);
                        }
                        continue;
                    }

                    let Some(choice) = json.get("choices").and_then(|c| c.get(0)) else { continue };
                    let Some(content) = choice
                        .get("delta")
                        .and_then(|d| d.get("content"))
                        .and_then(Value::as_str)
                    else {
                        // No content in this record (e.g. a role-only or
                        // finish_reason-only delta) — still surface finish
                        // reason/usage if present.
                        if let Some(normalized) = crate::normalize::openai::process(&json) {
                            yield build_chunk(&chat_id, created, &model, normalized);
                        }
                        continue;
                    };

                    for fragment in extractor.push(content) {
                        let normalized = match fragment {
                            Fragment::Reasoning(text) => crate::normalize::NormalizedEvent {
                                delta: Some(relay_protocol::CanonicalDelta::reasoning(text)),
                                ..Default::default()
                            },
                            Fragment::Content(text) => crate::normalize::NormalizedEvent {
                                delta: Some(relay_protocol::CanonicalDelta::content(text)),
                                ..Default::default()
                            },
                        };
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
        let (headers, body) = format_reasoner(&self.api_key, model, messages, false, &model_args);
        let response = send(&self.http, &self.api_url, headers, body, self.timeouts).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ClientApiError::transport(err.to_string()))?;
        let json: Value = serde_json::from_slice(&bytes)
            .map_err(|err| ClientApiError::transport(err.to_string()))?;

        let decoded = if self.origin_reasoning {
            crate::normalize::reasoner::decode_final_origin_reasoning(&json)
        } else {
            crate::normalize::openai::decode_final(&json)
        };
        let (message, finish_reason, usage, provider_chat_id) = decoded
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
