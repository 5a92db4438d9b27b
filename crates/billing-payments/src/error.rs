//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Plan identifier outside the fixed plan set
    #[error("Invalid plan type: {0}")]
    InvalidPlan(String),

    /// Price ID does not match the vendor format
    #[error("Invalid price ID: {0}")]
    InvalidPriceId(String),

    /// Vendor API answered with a non-2xx status
    #[error("Vendor error ({status}): {message}")]
    Vendor { status: u16, message: String },

    /// Request to the vendor failed before a response arrived
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Checkout refused because the user is already subscribed
    #[error("User already has an active subscription")]
    ActiveSubscription,

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    WebhookSignature(String),

    /// Webhook payload parsing failed
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PaymentError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Storage(_))
    }

    /// Errors caused by the request or relayed from the vendor (400-class)
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidPlan(_) | Self::Vendor { .. } | Self::ActiveSubscription
        )
    }

    /// Message safe to return to the caller
    ///
    /// Vendor messages are passed through verbatim.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidPlan(_) => "Invalid plan type".into(),
            Self::Vendor { message, .. } => message.clone(),
            Self::ActiveSubscription => self.to_string(),
            Self::Config(_) => "Payment service configuration error".into(),
            _ => "Internal server error".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_message_passthrough() {
        let err = PaymentError::Vendor {
            status: 400,
            message: "price pri_x is archived".into(),
        };
        assert!(err.is_client_error());
        assert_eq!(err.user_message(), "price pri_x is archived");
    }

    #[test]
    fn test_internal_errors_are_generic() {
        let err = PaymentError::Storage("lock poisoned".into());
        assert!(!err.is_client_error());
        assert!(err.is_retryable());
        assert_eq!(err.user_message(), "Internal server error");
    }

    #[test]
    fn test_active_subscription_message() {
        assert_eq!(
            PaymentError::ActiveSubscription.user_message(),
            "User already has an active subscription"
        );
    }
}
