/**
 * Backend Error Types
 *
 * This module defines the error type used by the store, the chat service and
 * the HTTP handlers. Every variant maps to an HTTP status code so handlers can
 * return `Result<_, BackendError>` directly.
 *
 * # Error Categories
 *
 * ## Surfaced to the caller
 *
 * - `Validation` - message content or request body violates an invariant
 * - `NotFound` - room, project or user is absent
 * - `Forbidden` - caller is not a member of the room or project
 * - `Auth` - missing, malformed or unverifiable identity token
 *
 * ## Recovered locally
 *
 * - `Provider` - a push provider failed; the notification service records it
 *   in the delivery report and never lets it escape `notify`
 *
 * ## Internal
 *
 * - `Database` - sqlx failures
 * - `Serialization` - JSON failures
 */

use axum::http::StatusCode;
use thiserror::Error;

use crate::shared::SharedError;

/// Backend-specific error types
///
/// # Usage
///
/// ```rust
/// use sentinel_chat::backend::error::BackendError;
///
/// let err = BackendError::forbidden("Not a member of this room");
/// assert_eq!(err.status_code().as_u16(), 403);
/// ```
#[derive(Debug, Error)]
pub enum BackendError {
    /// Input violates a content or request invariant
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable error message
        message: String,
    },

    /// Referenced entity does not exist
    #[error("Not found: {message}")]
    NotFound {
        /// Human-readable error message
        message: String,
    },

    /// Caller lacks access to the referenced entity
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Human-readable error message
        message: String,
    },

    /// Identity could not be established
    #[error("Authentication error: {message}")]
    Auth {
        /// Human-readable error message
        message: String,
    },

    /// Push provider failure (unreachable, misconfigured, rejected credentials)
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Human-readable error message
        message: String,
    },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Shared error (from shared module)
    #[error(transparent)]
    Shared(#[from] SharedError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BackendError {
    /// Create a new validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a new forbidden error
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Create a new authentication error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a new provider error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    ///
    /// # Status Code Mapping
    ///
    /// - `Validation` - 400 Bad Request
    /// - `NotFound` - 404 Not Found
    /// - `Forbidden` - 403 Forbidden
    /// - `Auth` - 401 Unauthorized
    /// - `Provider` - 502 Bad Gateway
    /// - `Database` / `Serialization` - 500 Internal Server Error
    /// - `Shared` - 400 for validation, 500 for serialization
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::Auth { .. } => StatusCode::UNAUTHORIZED,
            Self::Provider { .. } => StatusCode::BAD_GATEWAY,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Shared(err) => match err {
                SharedError::SerializationError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                SharedError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            },
            Self::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error message
    ///
    /// Database details are not exposed to clients.
    pub fn message(&self) -> String {
        match self {
            Self::Validation { message }
            | Self::NotFound { message }
            | Self::Forbidden { message }
            | Self::Auth { message } => message.clone(),
            Self::Provider { provider, message } => format!("{}: {}", provider, message),
            Self::Database(_) => "Internal database error".to_string(),
            Self::Shared(err) => match err {
                SharedError::ValidationError { message, .. } => message.clone(),
                other => other.to_string(),
            },
            Self::Serialization(err) => err.to_string(),
        }
    }

    /// Whether this error is the caller's fault
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}
