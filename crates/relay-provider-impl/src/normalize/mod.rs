//! Per-family response normalization: provider-native wire JSON in,
//! canonical chunk fragments out (spec.md §4.2's "Normalization rules").

pub mod anthropic;
pub mod openai;
pub mod reasoner;

use relay_protocol::{CanonicalDelta, Usage};

/// One normalized upstream event, before the caller wraps it into a
/// `CanonicalChunk` with the stream's shared `id`/`created`/`model`.
#[derive(Debug, Clone, Default)]
pub struct NormalizedEvent {
    pub provider_chat_id: Option<String>,
    pub delta: Option<CanonicalDelta>,
    pub index: u32,
    pub finish_reason: Option<String>,
    pub usage: Option<Usage>,
}

impl NormalizedEvent {
    fn is_empty(&self) -> bool {
        self.provider_chat_id.is_none()
            && self.delta.is_none()
            && self.finish_reason.is_none()
            && self.usage.is_none()
    }
}
