//! Error Types

use thiserror::Error;

/// Result type alias for identity operations
pub type Result<T> = std::result::Result<T, AuthError>;

/// Authentication and profile lookup errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// No credentials, or the provider rejected them
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Authenticated user has no profile row
    #[error("Profile not found for user {0}")]
    ProfileNotFound(String),

    /// Auth provider answered with an unexpected status
    #[error("Auth provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    /// Request to the auth provider failed
    #[error("Network error: {0}")]
    Network(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// Whether the caller should be told to sign in again
    pub const fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Unauthenticated(_))
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthenticated(_) => "Unauthorized".into(),
            Self::ProfileNotFound(_) => "Profile not found".into(),
            _ => "Internal server error".into(),
        }
    }
}
