//! Concrete per-family `UpstreamClient` implementations. `shared` holds the
//! POST/byte-stream plumbing every family reuses.

mod anthropic;
mod openai;
mod reasoner;
mod shared;

pub use anthropic::AnthropicClient;
pub use openai::OpenAiClient;
pub use reasoner::ReasonerClient;
