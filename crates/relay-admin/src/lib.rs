//! CRUD admin surface for providers/models/composites/system settings,
//! gated by a cookie-based JWT session rather than the gateway's own
//! bearer token (spec.md §6).

mod jwt;
mod router;

pub use jwt::JwtSettings;
pub use router::router;
