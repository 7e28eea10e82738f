//! The public `/v1/*` HTTP surface: chat completions (streaming and
//! single-shot), cancellation, and the model listing. Bearer-token auth is
//! the only middleware layered here — everything else is `relay-core`'s
//! `Dispatcher` doing the actual work.

mod auth;
mod proxy;

pub use proxy::router;
