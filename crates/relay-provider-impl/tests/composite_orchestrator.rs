use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use http::HeaderMap;
use relay_common::ParamMap;
use relay_protocol::{CanonicalChoice, CanonicalChunk, CanonicalDelta, CanonicalResponse};
use relay_provider_core::client::Message;
use relay_provider_core::{ByteStream, ChunkStream, ClientApiError, UpstreamClient};
use relay_provider_impl::composite::{CompositeOrchestrator, CompositeParams};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// Replays a fixed chunk sequence and records whether it was ever invoked,
/// so tests can assert the target stage never starts when it shouldn't.
struct FakeClient {
    chunks: Vec<CanonicalChunk>,
    invoked: Arc<AtomicBool>,
}

#[async_trait]
impl UpstreamClient for FakeClient {
    async fn stream_chat(
        &self,
        _chat_id: &str,
        _messages: Vec<Message>,
        _model: &str,
        _model_args: ParamMap,
        _cancel: CancellationToken,
    ) -> ChunkStream {
        self.invoked.store(true, Ordering::SeqCst);
        Box::pin(stream::iter(self.chunks.clone().into_iter().map(Ok)))
    }

    async fn chat(
        &self,
        _chat_id: &str,
        _messages: Vec<Message>,
        _model: &str,
        _model_args: ParamMap,
    ) -> Result<CanonicalResponse, ClientApiError> {
        unimplemented!("not exercised by composite orchestrator tests")
    }

    async fn original_stream_chat(&self, _headers: HeaderMap, _body: Value, _cancel: CancellationToken) -> ByteStream {
        unimplemented!("not exercised by composite orchestrator tests")
    }

    async fn original_chat(&self, _headers: HeaderMap, _body: Value) -> Result<Value, ClientApiError> {
        unimplemented!("not exercised by composite orchestrator tests")
    }
}

fn chunk(delta: CanonicalDelta) -> CanonicalChunk {
    CanonicalChunk::new(
        "chatcmpl-test".into(),
        0,
        "m".into(),
        vec![CanonicalChoice { index: 0, delta, finish_reason: None }],
    )
}

fn user_messages() -> Vec<Value> {
    vec![json!({"role": "user", "content": "hello"})]
}

fn params() -> CompositeParams {
    CompositeParams {
        reasoning_model: "r-model".into(),
        target_model: "t-model".into(),
        reasoning_args: ParamMap::new(),
        target_args: ParamMap::new(),
    }
}

#[tokio::test]
async fn stage_ordering_all_reasoning_chunks_precede_target_chunks() {
    let reasoning_invoked = Arc::new(AtomicBool::new(false));
    let target_invoked = Arc::new(AtomicBool::new(false));

    let reasoning_chunks = vec![
        chunk(CanonicalDelta::reasoning("step one. ")),
        chunk(CanonicalDelta::reasoning("step two.")),
        chunk(CanonicalDelta::content("x")),
    ];
    let target_chunks = vec![chunk(CanonicalDelta::content("final answer"))];

    let reasoning_client = Arc::new(FakeClient { chunks: reasoning_chunks, invoked: reasoning_invoked.clone() });
    let target_client = Arc::new(FakeClient { chunks: target_chunks, invoked: target_invoked.clone() });
    let orchestrator = CompositeOrchestrator::new(reasoning_client, target_client);

    let stream = orchestrator.stream_chat("chat-1".into(), user_messages(), params(), CancellationToken::new());
    let results: Vec<CanonicalChunk> = stream.collect::<Vec<_>>().await.into_iter().map(Result::unwrap).collect();

    assert_eq!(results.len(), 4);
    assert!(results[0].choices[0].delta.reasoning_content.is_some());
    assert!(results[1].choices[0].delta.reasoning_content.is_some());
    assert_eq!(results[2].choices[0].delta.content.as_deref(), Some("x"));
    assert_eq!(results[3].choices[0].delta.content.as_deref(), Some("final answer"));
    assert!(reasoning_invoked.load(Ordering::SeqCst));
    assert!(target_invoked.load(Ordering::SeqCst));
}

#[tokio::test]
async fn cancel_set_before_boundary_never_starts_target_stage() {
    let reasoning_invoked = Arc::new(AtomicBool::new(false));
    let target_invoked = Arc::new(AtomicBool::new(false));

    let reasoning_chunks = vec![chunk(CanonicalDelta::reasoning("partial"))];
    let target_chunks = vec![chunk(CanonicalDelta::content("unused"))];
    let reasoning_client = Arc::new(FakeClient { chunks: reasoning_chunks, invoked: reasoning_invoked.clone() });
    let target_client = Arc::new(FakeClient { chunks: target_chunks, invoked: target_invoked.clone() });
    let orchestrator = CompositeOrchestrator::new(reasoning_client, target_client);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let stream = orchestrator.stream_chat("chat-2".into(), user_messages(), params(), cancel);
    let results: Vec<_> = stream.collect::<Vec<_>>().await;

    assert!(results.is_empty());
    assert!(reasoning_invoked.load(Ordering::SeqCst));
    assert!(!target_invoked.load(Ordering::SeqCst));
}

#[tokio::test]
async fn empty_reasoning_buffer_fails_before_target_stage() {
    let target_invoked = Arc::new(AtomicBool::new(false));
    let reasoning_chunks = vec![chunk(CanonicalDelta::content("straight to answer"))];
    let target_chunks = vec![chunk(CanonicalDelta::content("ignored"))];
    let reasoning_client = Arc::new(FakeClient { chunks: reasoning_chunks, invoked: Arc::new(AtomicBool::new(false)) });
    let target_client = Arc::new(FakeClient { chunks: target_chunks, invoked: target_invoked.clone() });
    let orchestrator = CompositeOrchestrator::new(reasoning_client, target_client);

    let stream = orchestrator.stream_chat("chat-3".into(), user_messages(), params(), CancellationToken::new());
    let results: Vec<_> = stream.collect::<Vec<_>>().await;

    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    let err = results[1].as_ref().unwrap_err();
    assert_eq!(err.status, http::StatusCode::BAD_REQUEST);
    assert!(err.error.contains("no valid reasoning content"));
    assert!(!target_invoked.load(Ordering::SeqCst));
}

#[tokio::test]
async fn non_user_last_message_is_rejected() {
    let reasoning_chunks = vec![
        chunk(CanonicalDelta::reasoning("ok")),
        chunk(CanonicalDelta::content("go")),
    ];
    let target_chunks = vec![chunk(CanonicalDelta::content("ignored"))];
    let target_invoked = Arc::new(AtomicBool::new(false));
    let reasoning_client = Arc::new(FakeClient { chunks: reasoning_chunks, invoked: Arc::new(AtomicBool::new(false)) });
    let target_client = Arc::new(FakeClient { chunks: target_chunks, invoked: target_invoked.clone() });
    let orchestrator = CompositeOrchestrator::new(reasoning_client, target_client);

    let messages = vec![json!({"role": "assistant", "content": "hi"})];
    let stream = orchestrator.stream_chat("chat-4".into(), messages, params(), CancellationToken::new());
    let results: Vec<_> = stream.collect::<Vec<_>>().await;

    let err = results.last().unwrap().as_ref().unwrap_err();
    assert!(err.error.contains("no valid user message"));
    assert!(!target_invoked.load(Ordering::SeqCst));
}
