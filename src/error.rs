//! Error types for parasara-chat.

use crate::conversation::ConversationStage;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Backend request errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("Backend returned {status} for {endpoint}: {message}")]
    Status {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("Malformed JSON from {endpoint}: {reason}")]
    MalformedJson { endpoint: String, reason: String },

    #[error("Authentication required for {endpoint}")]
    MissingToken { endpoint: String },
}

impl ApiError {
    /// Text suitable for the user-visible error banner.
    ///
    /// Backend-provided `error` messages are shown as-is; everything else
    /// falls back to the full error text.
    pub fn banner_text(&self) -> String {
        match self {
            Self::Status { message, .. } if !message.is_empty() => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Rejected user actions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversationError {
    #[error("A request is already in flight")]
    Busy,

    #[error("Message is empty")]
    EmptyMessage,

    #[error("Topic choices are not available during {stage}")]
    TopicsUnavailable { stage: ConversationStage },

    #[error("Topic choices are not shown right now")]
    TopicsHidden,

    #[error("Cannot transition from {from} to {to}")]
    InvalidTransition {
        from: ConversationStage,
        to: ConversationStage,
    },
}
