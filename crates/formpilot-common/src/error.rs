use crate::plan::FieldKind;

/// Errors surfaced by a browser backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("Backend not launched")]
    NotReady,

    #[error("Not supported by this backend: {0}")]
    NotSupported(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Failure modes of a single fill action.
///
/// `NotFound`, `NotInteractable` and `VerificationMismatch` are retried up
/// to the per-action retry budget and then surfaced as a failed status.
/// `UnsupportedKind`, `Decode` and `Io` are surfaced immediately: retrying
/// cannot help them.
#[derive(Debug, thiserror::Error)]
pub enum FillError {
    #[error("Element not found within wait window: {0}")]
    NotFound(String),

    #[error("Element not interactable: {0}")]
    NotInteractable(String),

    #[error("Verification failed: {0}")]
    VerificationMismatch(String),

    #[error("No executor registered for field kind '{0}'")]
    UnsupportedKind(FieldKind),

    #[error("Malformed inline file payload: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl FillError {
    /// Whether another attempt could plausibly change the outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FillError::NotFound(_)
                | FillError::NotInteractable(_)
                | FillError::VerificationMismatch(_)
                | FillError::Backend(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryability_split() {
        assert!(FillError::NotFound("#x".into()).is_retryable());
        assert!(FillError::VerificationMismatch("mismatch".into()).is_retryable());
        assert!(!FillError::UnsupportedKind(FieldKind::Click).is_retryable());
        assert!(!FillError::Decode("bad base64".into()).is_retryable());
    }
}
