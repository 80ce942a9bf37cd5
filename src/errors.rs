//! Error types shared by storage, auth, transports and the options page.
//! Nothing here is fatal: every error ends a single submission or handler.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Stored value for '{key}' could not be decoded: {message}")]
    Decode { key: String, message: String },

    #[error("Value for '{key}' could not be encoded: {message}")]
    Encode { key: String, message: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Auth provider error: {0}")]
    Provider(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HttpError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("request could not be built: {0}")]
    Build(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SendError {
    // ---------------------------
    // Configuration
    // ---------------------------
    #[error("No Google Sheet or webhook configured")]
    ConfigurationMissing,

    #[error("Invalid Sheet URL: {0}")]
    InvalidSheetUrl(String),

    #[error("Invalid webhook URL: {0}")]
    InvalidWebhookUrl(String),

    // ---------------------------
    // Transport
    // ---------------------------
    #[error("auth failed: {0}")]
    Auth(#[from] AuthError),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("network failure: {0}")]
    Network(#[from] HttpError),

    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("operation not supported by the {0} transport")]
    Unsupported(&'static str),
}

impl SendError {
    /// Failures worth queueing for a later retry
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SendError::Auth(_) | SendError::Http { .. } | SendError::Network(_)
        )
    }

    /// Whether the cached OAuth token should be dropped
    pub fn is_auth_failure(&self) -> bool {
        match self {
            SendError::Auth(_) => true,
            SendError::Http { status: 401, .. } => true,
            // Case-sensitive: sheet names such as "Authors" echoed in API errors must not match
            other => {
                let message = other.to_string();
                message.contains("401") || message.contains("auth") || message.contains("UNAUTHENTICATED")
            }
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptionsError {
    #[error("Please enter a Google Sheet URL")]
    MissingSheetUrl,

    #[error(transparent)]
    Send(#[from] SendError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
