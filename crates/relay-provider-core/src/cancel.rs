use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Maps chat id to a one-shot cancellation signal. Registered at dispatch,
/// removed on stream completion, error, or explicit cancel — never left to
/// grow unbounded (spec.md §9's flagged gap).
#[derive(Clone, Default)]
pub struct CancelRegistry {
    inner: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl CancelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fresh token for `chat_id`, returning it for the
    /// dispatcher to hand to the client/orchestrator it just built.
    pub async fn register(&self, chat_id: impl Into<String>) -> CancellationToken {
        let token = CancellationToken::new();
        self.inner.lock().await.insert(chat_id.into(), token.clone());
        token
    }

    /// Cancels and deregisters the token for `chat_id`. Returns whether one
    /// existed (so `/v1/cancel` can report 200 vs 404).
    pub async fn cancel(&self, chat_id: &str) -> bool {
        match self.inner.lock().await.remove(chat_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Deregisters without cancelling — called once a stream ends on its
    /// own (success or error) so the entry doesn't outlive its stream.
    pub async fn remove(&self, chat_id: &str) {
        self.inner.lock().await.remove(chat_id);
    }

    /// Whether `chat_id` is currently registered, used by chat-id
    /// generation to retry on a collision before registering.
    pub async fn contains(&self, chat_id: &str) -> bool {
        self.inner.lock().await.contains_key(chat_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancel_returns_false_when_unregistered() {
        let registry = CancelRegistry::new();
        assert!(!registry.cancel("nope").await);
    }

    #[tokio::test]
    async fn cancel_fires_token_and_is_idempotent_on_removal() {
        let registry = CancelRegistry::new();
        let token = registry.register("chat-1").await;
        assert!(!token.is_cancelled());
        assert!(registry.cancel("chat-1").await);
        assert!(token.is_cancelled());
        assert!(!registry.cancel("chat-1").await);
    }

    #[tokio::test]
    async fn remove_deregisters_without_cancelling() {
        let registry = CancelRegistry::new();
        let token = registry.register("chat-2").await;
        registry.remove("chat-2").await;
        assert!(!token.is_cancelled());
        assert!(!registry.cancel("chat-2").await);
    }
}
