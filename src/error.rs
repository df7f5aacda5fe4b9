use crate::retry::RetryPolicy;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the durable stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed.
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The in-memory mapping could not be encoded, or the written file
    /// could not be decoded again.
    #[error("serialization error on {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The reloaded file does not hold the number of entries that was written.
    #[error("verification failed for {path}: wrote {expected} entries, read back {found}")]
    Verification {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    /// A preference did not survive the write/reload cycle.
    #[error("preference for user {user_id} was not persisted")]
    PreferenceMismatch { user_id: String },

    /// The blocking save task panicked or was cancelled.
    #[error("save task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn serialization(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Serialization {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised while talking to the chat platform's REST API.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Transport failure (connection refused, timeout, TLS). The platform
    /// may or may not have acted on the request.
    #[error("chat request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform answered with a non-success status.
    #[error("chat API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// HTTP 429, with the wait the platform asked for when it sent one.
    #[error("chat API rate limited (retry after {retry_after:?}): {body}")]
    RateLimited {
        retry_after: Option<Duration>,
        body: String,
    },

    #[error("invalid chat API URL: {0}")]
    InvalidUrl(String),
}

impl ChatError {
    /// Only answers that came back asking for another attempt are retried:
    /// rate limits and server errors. A transport failure may have reached
    /// the platform already, so repeating a message create could post twice.
    pub fn is_retryable(&self) -> bool {
        match self {
            ChatError::RateLimited { .. } => true,
            ChatError::Api { status, .. } => *status >= 500,
            ChatError::Http(_) | ChatError::InvalidUrl(_) => false,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            ChatError::RateLimited {
                retry_after: Some(delay),
                ..
            } => RetryPolicy::After(*delay),
            e if e.is_retryable() => RetryPolicy::Backoff,
            _ => RetryPolicy::Stop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_retryable_statuses() {
        let rate_limited = ChatError::RateLimited {
            retry_after: None,
            body: String::new(),
        };
        let server_error = ChatError::Api {
            status: 502,
            body: String::new(),
        };
        let forbidden = ChatError::Api {
            status: 403,
            body: "Missing Permissions".to_string(),
        };

        assert!(rate_limited.is_retryable());
        assert!(server_error.is_retryable());
        assert!(!forbidden.is_retryable());
        assert!(!ChatError::InvalidUrl("x".to_string()).is_retryable());
    }

    #[test]
    fn test_chat_error_retry_policy() {
        let told_to_wait = ChatError::RateLimited {
            retry_after: Some(Duration::from_millis(1500)),
            body: String::new(),
        };
        let server_error = ChatError::Api {
            status: 503,
            body: String::new(),
        };
        let not_found = ChatError::Api {
            status: 404,
            body: String::new(),
        };

        assert_eq!(
            told_to_wait.retry_policy(),
            RetryPolicy::After(Duration::from_millis(1500))
        );
        assert_eq!(server_error.retry_policy(), RetryPolicy::Backoff);
        assert_eq!(not_found.retry_policy(), RetryPolicy::Stop);
    }

    #[test]
    fn test_verification_error_message() {
        let err = StoreError::Verification {
            path: PathBuf::from("languages.json"),
            expected: 3,
            found: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("languages.json"));
        assert!(msg.contains("wrote 3"));
        assert!(msg.contains("read back 2"));
    }
}
