//! Shared upstream-client abstractions: the canonical `UpstreamClient`
//! trait, the uniform `ClientApiError` type, and the chat-id-keyed
//! cancellation registry. No concrete HTTP client lives here — that's
//! `relay-provider-impl`.

pub mod cancel;
pub mod client;
pub mod error;

pub use cancel::CancelRegistry;
pub use client::{ByteStream, ChunkStream, Message, UpstreamClient};
pub use error::ClientApiError;
