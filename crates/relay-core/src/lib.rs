pub mod auth;
pub mod bootstrap;
pub mod dispatch;
pub mod error;
pub mod state;

pub use bootstrap::{Bootstrap, CliArgs, bootstrap, bootstrap_from_env};
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use error::{DispatchError, ProcessError};
pub use state::AppState;
