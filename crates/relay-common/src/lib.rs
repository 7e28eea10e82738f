pub mod clock;
pub mod domain;
pub mod error_hint;
pub mod param;

pub use domain::{ModelType, ProviderFormat};
pub use param::{ParamMap, ParamValue, extract_params};
