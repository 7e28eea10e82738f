use http::StatusCode;

/// Request-shape validation failures from `Dispatcher::process_request`:
/// missing/empty `messages`, missing `model`, unknown model/composite name.
/// Always surfaces as HTTP 400 with a human message (spec.md §4.4, §7).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct DispatchError {
    pub message: String,
}

impl DispatchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

impl From<relay_storage::StorageError> for DispatchError {
    fn from(err: relay_storage::StorageError) -> Self {
        DispatchError::new(err.to_string())
    }
}

/// The full failure space of `Dispatcher::process_request`: a validation
/// failure (always 400) or an upstream-originated failure (status carried
/// on the error itself, §7's error taxonomy).
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProcessError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Upstream(#[from] relay_provider_core::ClientApiError),
}

impl From<relay_storage::StorageError> for ProcessError {
    fn from(err: relay_storage::StorageError) -> Self {
        ProcessError::Dispatch(DispatchError::from(err))
    }
}

impl ProcessError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProcessError::Dispatch(err) => err.status(),
            ProcessError::Upstream(err) => err.status,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ProcessError::Dispatch(err) => err.message.clone(),
            ProcessError::Upstream(err) => err.error.clone(),
        }
    }

    /// The heuristic hint carried on an upstream error (spec.md §4.2/§6);
    /// always absent for a validation failure.
    pub fn detail(&self) -> Option<String> {
        match self {
            ProcessError::Dispatch(_) => None,
            ProcessError::Upstream(err) => err.detail.clone(),
        }
    }
}
