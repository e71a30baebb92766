// Error taxonomy for the moderation pipeline.
//
// Caller-facing failures are typed so a transport can map bad input and
// failed retrieval to a client-error class and `Internal` to a server-error
// class. Provider failures never
// reach the caller as errors: the scheduler folds them into the result's
// error list and evaluation carries on without that provider's signals.

use thiserror::Error;

/// Errors surfaced directly to whoever submitted the content.
#[derive(Debug, Error)]
pub enum ModerationError {
    /// Unsupported format, bad URL, missing or conflicting fields.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Remote content retrieval failed before any provider ran.
    #[error("content retrieval failed: {0}")]
    Fetch(#[from] FetchError),

    /// The service could not process otherwise valid content.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ModerationError {
    pub fn validation(message: impl Into<String>) -> Self {
        ModerationError::Validation(message.into())
    }
}

/// Why a remote fetch was rejected.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("URL must use http:// or https://: {0}")]
    InvalidUrl(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("server returned HTTP {0}")]
    Status(u16),

    #[error("URL does not point to an image or video (content-type: {0})")]
    UnsupportedContentType(String),

    #[error("content exceeds the {limit} byte limit")]
    TooLarge { limit: usize },
}

/// One provider's failure during a fan-out.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{provider}: {kind}")]
pub struct ProviderError {
    pub provider: String,
    pub kind: ProviderErrorKind,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderErrorKind {
    /// The provider returned an error (or a result carrying one).
    #[error("{0}")]
    Failed(String),
    /// The provider did not finish before its deadline.
    #[error("timed out")]
    TimedOut,
    /// The provider's task panicked.
    #[error("panicked: {0}")]
    Panicked(String),
}

impl ProviderError {
    pub fn failed(provider: &str, message: impl Into<String>) -> Self {
        Self {
            provider: provider.to_string(),
            kind: ProviderErrorKind::Failed(message.into()),
        }
    }

    pub fn timed_out(provider: &str) -> Self {
        Self {
            provider: provider.to_string(),
            kind: ProviderErrorKind::TimedOut,
        }
    }

    pub fn panicked(provider: &str, message: impl Into<String>) -> Self {
        Self {
            provider: provider.to_string(),
            kind: ProviderErrorKind::Panicked(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_display_names_the_provider() {
        assert_eq!(
            ProviderError::failed("patterns", "boom").to_string(),
            "patterns: boom"
        );
        assert_eq!(
            ProviderError::timed_out("texture").to_string(),
            "texture: timed out"
        );
        assert_eq!(
            ProviderError::panicked("objects", "detector crashed").to_string(),
            "objects: panicked: detector crashed"
        );
    }

    #[test]
    fn fetch_error_converts_into_moderation_error() {
        let err: ModerationError = FetchError::Status(404).into();
        assert!(matches!(err, ModerationError::Fetch(FetchError::Status(404))));
        assert_eq!(
            err.to_string(),
            "content retrieval failed: server returned HTTP 404"
        );
    }
}
