use http::StatusCode;

/// Uniform upstream error shape. `status` is propagated as the gateway's own
/// HTTP status for direct calls; `detail` carries the heuristic hint derived
/// from known substrings in the upstream's own error message (spec.md §4.2).
#[derive(Debug, Clone, thiserror::Error)]
#[error("upstream error ({status}): {error}")]
pub struct ClientApiError {
    pub status: StatusCode,
    pub error: String,
    pub detail: Option<String>,
}

impl ClientApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Builds the error from an upstream's non-2xx body, attaching the
    /// substring-derived hint from `relay_common::error_hint`.
    pub fn from_upstream_body(status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        let detail = relay_common::error_hint::detail_hint(&message).map(str::to_string);
        Self {
            status,
            error: message,
            detail,
        }
    }

    /// A transport-level failure (timeout, connect error, malformed JSON on
    /// a wire chunk) — always a 500, never carries a detail hint.
    pub fn transport(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: error.into(),
            detail: None,
        }
    }
}
