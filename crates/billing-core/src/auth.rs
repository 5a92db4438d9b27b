//! Authentication Capability
//!
//! The checkout flow never talks to the identity backend directly. It goes
//! through [`AuthProvider`], so Supabase can be swapped for a fake in tests or
//! another backend later.

use async_trait::async_trait;

use crate::error::{AuthError, Result};
use crate::identity::{Credentials, Profile, User};

/// Identity backend (Strategy pattern)
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolve the user behind the presented credentials
    ///
    /// Fails with [`AuthError::Unauthenticated`] when the token is missing,
    /// expired or rejected.
    async fn current_user(&self, credentials: &Credentials) -> Result<User>;

    /// Look up the profile row for a user; `Ok(None)` when there is none
    async fn profile(&self, user_id: &str) -> Result<Option<Profile>>;

    /// Provider name for logs and health output
    fn name(&self) -> &str;
}

/// Provider used when no identity backend is configured; rejects everyone
#[derive(Debug, Default, Clone, Copy)]
pub struct DenyAllAuthProvider;

#[async_trait]
impl AuthProvider for DenyAllAuthProvider {
    async fn current_user(&self, _credentials: &Credentials) -> Result<User> {
        tracing::warn!("Auth provider not configured, rejecting request");
        Err(AuthError::Unauthenticated("authentication is not configured".into()))
    }

    async fn profile(&self, user_id: &str) -> Result<Option<Profile>> {
        Err(AuthError::ProfileNotFound(user_id.to_string()))
    }

    fn name(&self) -> &str {
        "deny-all"
    }
}
