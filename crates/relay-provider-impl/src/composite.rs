//! The reasoning-composite pipeline: Idle -> Reasoning -> Rewrite -> Target
//! -> Done, all inside one `try_stream!` body. Each arrow in the state
//! diagram is a point where the loop below either forwards a chunk,
//! switches upstream, or returns early.

use std::sync::Arc;

use async_stream::try_stream;
use relay_common::ParamMap;
use relay_protocol::CanonicalChoice;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use relay_provider_core::{ChunkStream, ClientApiError, UpstreamClient};

/// `other_params` as spec.md §4.3 defines it: which models and per-model
/// args to use for each stage, plus whether stage 1 is origin-reasoning
/// (unused here directly — that flag already shaped which `UpstreamClient`
/// the dispatcher constructed for the reasoning side).
pub struct CompositeParams {
    pub reasoning_model: String,
    pub target_model: String,
    pub reasoning_args: ParamMap,
    pub target_args: ParamMap,
}

pub struct CompositeOrchestrator {
    reasoning_client: Arc<dyn UpstreamClient>,
    target_client: Arc<dyn UpstreamClient>,
}

impl CompositeOrchestrator {
    pub fn new(reasoning_client: Arc<dyn UpstreamClient>, target_client: Arc<dyn UpstreamClient>) -> Self {
        Self {
            reasoning_client,
            target_client,
        }
    }

    /// Streams the whole composite sequence: stage 1's chunks verbatim,
    /// then (after a silent rewrite step) stage 2's chunks. No chunk from
    /// stage 2 is ever emitted before stage 1 ends.
    pub fn stream_chat(
        &self,
        chat_id: String,
        messages: Vec<Value>,
        params: CompositeParams,
        cancel: CancellationToken,
    ) -> ChunkStream {
        let reasoning_client = self.reasoning_client.clone();
        let target_client = self.target_client.clone();

        Box::pin(try_stream! {
            let r_cancel = cancel.child_token();
            let mut reasoning_stream = reasoning_client
                .stream_chat(&chat_id, messages.clone(), &params.reasoning_model, params.reasoning_args, r_cancel.clone())
                .await;

            let mut reasoning_buffer = String::new();
            let mut boundary_crossed = false;

            use futures_util::StreamExt;
            while let Some(item) = reasoning_stream.next().await {
                if cancel.is_cancelled() {
                    r_cancel.cancel();
                    return;
                }
                let chunk = item?;
                for choice in &chunk.choices {
                    if let Some(reasoning) = &choice.delta.reasoning_content {
                        reasoning_buffer.push_str(reasoning);
                    }
                }
                let content_seen = chunk
                    .choices
                    .iter()
                    .any(|c: &CanonicalChoice| c.delta.content.as_deref().is_some_and(|s| !s.is_empty()));
                yield chunk;
                if content_seen {
                    boundary_crossed = true;
                    r_cancel.cancel();
                    break;
                }
            }
            if !boundary_crossed {
                r_cancel.cancel();
            }
            drop(reasoning_stream);

            if reasoning_buffer.is_empty() {
                Err(ClientApiError::new(
                    http::StatusCode::BAD_REQUEST,
                    "no valid reasoning content",
                ))?;
            }

            if cancel.is_cancelled() {
                return;
            }

            let mut rewritten = messages;
            let last = rewritten
                .last_mut()
                .ok_or_else(|| ClientApiError::new(http::StatusCode::BAD_REQUEST, "no valid user message"))?;
            if last.get("role").and_then(Value::as_str) != Some("user") {
                Err(ClientApiError::new(http::StatusCode::BAD_REQUEST, "no valid user message"))?;
            }
            let original_content = last
                .get("content")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            last["content"] = Value::String(compose_rewritten_content(&original_content, &reasoning_buffer));

            let t_cancel = cancel.child_token();
            let mut target_stream = target_client
                .stream_chat(&chat_id, rewritten, &params.target_model, params.target_args, t_cancel.clone())
                .await;

            while let Some(item) = target_stream.next().await {
                if cancel.is_cancelled() {
                    t_cancel.cancel();
                    return;
                }
                yield item?;
            }
        })
    }
}

/// The normative rewrite template (spec.md §4.3). Reproduced character for
/// character, including the surrounding whitespace — prompt behavior
/// depends on it.
pub fn compose_rewritten_content(original: &str, reasoning: &str) -> String {
    format!(
        "Here's my original input:\n\
{original}\n\
\n\
                ******The above is user information*****\n\
                The following is the reasoning process of another model:****\n\
{reasoning}\n\
\n\
 ****\n\
                Based on this reasoning, combined with your knowledge,\n\
                when the current reasoning conflicts with your knowledge,\n\
                you are more confident that you can adopt your own knowledge,\n\
                which is completely acceptable. Please provide the user with a complete answer directly.\n\
                ***Notice, Here is your settings: SELF_TALK: off REASONING: off THINKING: off PLANNING: off THINKING_BUDGET: < 100 tokens ***:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrite_template_matches_normative_text_exactly() {
        let rendered = compose_rewritten_content("hi", "because");
        assert!(rendered.starts_with("Here's my original input:\nhi\n"));
        assert!(rendered.contains("******The above is user information*****"));
        assert!(rendered.contains("\nbecause\n"));
        assert!(rendered.ends_with("THINKING_BUDGET: < 100 tokens ***:"));
    }
}
