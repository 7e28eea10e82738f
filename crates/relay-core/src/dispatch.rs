use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::Stream;
use futures_util::stream::BoxStream;
use relay_common::{ModelType, ProviderFormat, extract_params};
use relay_protocol::CanonicalResponse;
use relay_provider_core::{CancelRegistry, ChunkStream, ClientApiError, UpstreamClient};
use relay_provider_impl::composite::CompositeParams;
use relay_provider_impl::{AnthropicClient, CompositeOrchestrator, OpenAiClient, ReasonerClient};
use relay_storage::{CompositeRecord, ModelRecord, ProviderRecord, SettingValue, setting_keys};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{DispatchError, ProcessError};
use crate::state::{self, AppState};

const FIRST_CLASS_FIELDS: &[&str] = &["messages", "model", "stream", "model_type"];

/// What `Dispatcher::process_request` hands back to the edge handler. The
/// `Raw*` variants carry an `origin_output=true` model's untouched upstream
/// bytes; the canonical variants carry normalized chunks/responses.
pub enum DispatchOutcome {
    Stream(ChunkStream),
    Final(CanonicalResponse),
    RawStream(BoxStream<'static, Result<Bytes, ClientApiError>>),
    RawFinal(Value),
}

pub struct Dispatcher {
    state: Arc<AppState>,
}

impl Dispatcher {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// `cancel_request(chat_id) -> bool` (spec.md §4.4): sets the registered
    /// signal if present, returns whether one existed.
    pub async fn cancel_request(&self, chat_id: &str) -> bool {
        self.state.cancel_registry.cancel(chat_id).await
    }

    pub async fn process_request(&self, body: Value) -> Result<DispatchOutcome, ProcessError> {
        let obj = body
            .as_object()
            .ok_or_else(|| DispatchError::new("request body must be a JSON object"))?;

        let messages = obj
            .get("messages")
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| DispatchError::new("messages is required"))?;
        if messages.is_empty() {
            return Err(DispatchError::new("messages must not be empty"));
        }

        let model_name = obj
            .get("model")
            .and_then(Value::as_str)
            .ok_or_else(|| DispatchError::new("model is required"))?
            .to_string();

        let stream = obj.get("stream").and_then(Value::as_bool).unwrap_or(false);
        let model_type = obj.get("model_type").and_then(Value::as_str).unwrap_or("");
        if !matches!(model_type, "" | "reasoner" | "general" | "composite") {
            return Err(DispatchError::new(format!("unknown model_type: {model_type}")));
        }

        let model_args = extract_params(obj, FIRST_CLASS_FIELDS);
        let chat_id = self.generate_chat_id().await;

        match model_type {
            "composite" => {
                let composite = self.lookup_composite(&model_name).await?;
                self.dispatch_composite(chat_id, messages, composite, model_args).await
            }
            "reasoner" | "general" => {
                let model = self.lookup_model(&model_name).await?;
                self.dispatch_direct(chat_id, messages, model, model_args, stream).await
            }
            _ => {
                if let Some(model) = self.state.storage.get_model_by_name(&model_name).await?.filter(|m| m.valid) {
                    self.dispatch_direct(chat_id, messages, model, model_args, stream).await
                } else {
                    let composite = self.lookup_composite(&model_name).await?;
                    self.dispatch_composite(chat_id, messages, composite, model_args).await
                }
            }
        }
    }

    async fn lookup_model(&self, name: &str) -> Result<ModelRecord, DispatchError> {
        self.state
            .storage
            .get_model_by_name(name)
            .await?
            .filter(|m| m.valid)
            .ok_or_else(|| DispatchError::new(format!("unknown or invalid model: {name}")))
    }

    async fn lookup_composite(&self, name: &str) -> Result<CompositeRecord, DispatchError> {
        self.state
            .storage
            .get_composite_by_name(name)
            .await?
            .filter(|c| c.valid)
            .ok_or_else(|| DispatchError::new(format!("unknown or invalid composite model: {name}")))
    }

    /// Generates `chatcmpl-<hex(microseconds)>`, retrying on a registry
    /// collision (spec.md §4.4).
    async fn generate_chat_id(&self) -> String {
        loop {
            let candidate = format!("chatcmpl-{:x}", relay_common::clock::unix_micros());
            if !self.state.cancel_registry.contains(&candidate).await {
                return candidate;
            }
        }
    }

    async fn proxy_address_setting(&self) -> Option<SettingValue> {
        self.state
            .storage
            .get_setting(setting_keys::PROXY_ADDRESS)
            .await
            .ok()
            .flatten()
    }

    async fn build_client(&self, provider: &ProviderRecord, origin_reasoning: bool) -> Result<Arc<dyn UpstreamClient>, ProcessError> {
        let proxy_setting = self.proxy_address_setting().await;
        let proxy = state::proxy_for_provider(provider, proxy_setting.as_ref());
        let http = self.state.http_client_for_proxy(proxy.as_deref()).await;
        let api_url = format!("{}/{}", provider.base_url.trim_end_matches('/'), provider.request_path.trim_start_matches('/'));

        let client: Arc<dyn UpstreamClient> = match provider.format {
            ProviderFormat::Reasoner => Arc::new(ReasonerClient::new(provider.api_key.clone(), api_url, http, origin_reasoning)),
            ProviderFormat::Anthropic => Arc::new(AnthropicClient::new(provider.api_key.clone(), api_url, http)),
            ProviderFormat::Openai => Arc::new(OpenAiClient::new(provider.api_key.clone(), api_url, http)),
        };
        Ok(client)
    }

    async fn dispatch_direct(
        &self,
        chat_id: String,
        messages: Vec<Value>,
        model: ModelRecord,
        model_args: relay_common::ParamMap,
        stream: bool,
    ) -> Result<DispatchOutcome, ProcessError> {
        let provider = self
            .state
            .storage
            .get_provider(model.provider_id)
            .await?
            .filter(|p| p.valid)
            .ok_or_else(|| DispatchError::new(format!("provider for model '{}' is missing or invalid", model.name)))?;

        let client = self.build_client(&provider, model.origin_reasoning).await?;
        let cancel = CancellationToken::new();

        if model.origin_output {
            let (headers, body) = format_request(&provider.format, &provider.api_key, &model.model_id, messages, stream, &model_args);
            return Ok(if stream {
                DispatchOutcome::RawStream(client.original_stream_chat(headers, body, cancel).await)
            } else {
                DispatchOutcome::RawFinal(client.original_chat(headers, body).await?)
            });
        }

        if stream {
            Ok(DispatchOutcome::Stream(client.stream_chat(&chat_id, messages, &model.model_id, model_args, cancel).await))
        } else {
            Ok(DispatchOutcome::Final(client.chat(&chat_id, messages, &model.model_id, model_args).await?))
        }
    }

    /// Composite responses are always streamed regardless of the caller's
    /// `stream` field (spec.md §4.4 step 5).
    async fn dispatch_composite(
        &self,
        chat_id: String,
        messages: Vec<Value>,
        composite: CompositeRecord,
        model_args: relay_common::ParamMap,
    ) -> Result<DispatchOutcome, ProcessError> {
        let reasoning_model = self
            .state
            .storage
            .get_model(composite.reasoner_model_id)
            .await?
            .filter(|m| m.valid)
            .ok_or_else(|| DispatchError::new("composite's reasoning model is missing or invalid"))?;
        let target_model = self
            .state
            .storage
            .get_model(composite.general_model_id)
            .await?
            .filter(|m| m.valid)
            .ok_or_else(|| DispatchError::new("composite's target model is missing or invalid"))?;

        let reasoning_provider = self
            .state
            .storage
            .get_provider(reasoning_model.provider_id)
            .await?
            .filter(|p| p.valid)
            .ok_or_else(|| DispatchError::new("reasoning model's provider is missing or invalid"))?;
        let target_provider = self
            .state
            .storage
            .get_provider(target_model.provider_id)
            .await?
            .filter(|p| p.valid)
            .ok_or_else(|| DispatchError::new("target model's provider is missing or invalid"))?;

        let reasoning_client = self.build_client(&reasoning_provider, reasoning_model.origin_reasoning).await?;
        let target_client = self.build_client(&target_provider, target_model.origin_reasoning).await?;

        let orchestrator = CompositeOrchestrator::new(reasoning_client, target_client);
        let params = CompositeParams {
            reasoning_model: reasoning_model.model_id,
            target_model: target_model.model_id,
            reasoning_args: model_args.clone(),
            target_args: model_args,
        };

        let cancel = self.state.cancel_registry.register(chat_id.clone()).await;
        let inner = orchestrator.stream_chat(chat_id.clone(), messages, params, cancel);
        Ok(DispatchOutcome::Stream(Box::pin(TrackedStream::new(
            chat_id,
            self.state.cancel_registry.clone(),
            inner,
        ))))
    }
}

fn format_request(
    format: &ProviderFormat,
    api_key: &str,
    model_id: &str,
    messages: Vec<Value>,
    stream: bool,
    model_args: &relay_common::ParamMap,
) -> (http::HeaderMap, Value) {
    match format {
        ProviderFormat::Reasoner => relay_provider_impl::format::format_reasoner(api_key, model_id, messages, stream, model_args),
        ProviderFormat::Anthropic => relay_provider_impl::format::format_anthropic(api_key, model_id, messages, stream, model_args),
        ProviderFormat::Openai => relay_provider_impl::format::format_openai(api_key, model_id, messages, stream, model_args),
    }
}

/// Wraps a chunk stream so the `CancelRegistry` entry for `chat_id` is
/// removed once the stream ends — by reaching its natural end, by erroring,
/// or by simply being dropped (a caller disconnect mid-stream never leaves
/// behind an orphaned registry entry; spec.md §9's flagged gap).
struct TrackedStream<S> {
    inner: S,
    chat_id: String,
    registry: CancelRegistry,
    done: bool,
}

impl<S> TrackedStream<S> {
    fn new(chat_id: String, registry: CancelRegistry, inner: S) -> Self {
        Self {
            inner,
            chat_id,
            registry,
            done: false,
        }
    }

    fn mark_done(&mut self) {
        if !self.done {
            self.done = true;
            let chat_id = self.chat_id.clone();
            let registry = self.registry.clone();
            tokio::spawn(async move { registry.remove(&chat_id).await });
        }
    }
}

impl<S: Stream + Unpin> Stream for TrackedStream<S> {
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let poll = Pin::new(&mut self.inner).poll_next(cx);
        if let Poll::Ready(None) = poll {
            self.mark_done();
        }
        poll
    }
}

impl<S> Drop for TrackedStream<S> {
    fn drop(&mut self) {
        self.mark_done();
    }
}
