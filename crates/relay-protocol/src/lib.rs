pub mod chunk;
pub mod response;
pub mod sse;

pub use chunk::{CanonicalChoice, CanonicalChunk, CanonicalDelta, Usage, UsageDetails};
pub use response::{CanonicalMessage, CanonicalResponse};
pub use sse::{SseEvent, SseFramer};
