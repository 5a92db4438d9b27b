//! Supabase Auth Provider
//!
//! Implementation of `AuthProvider` backed by Supabase: `/auth/v1/user` for
//! token validation and the `profiles` table for profile rows.

use async_trait::async_trait;
use billing_core::{AuthError, AuthProvider, Credentials, Profile, Result, User};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

/// Supabase connection settings
#[derive(Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://abcd.supabase.co`
    pub url: String,

    /// Public anon key, sent as `apikey` on every request
    pub anon_key: String,

    /// Service role key used for profile reads when set
    pub service_role_key: Option<String>,
}

impl SupabaseConfig {
    /// Read `NEXT_PUBLIC_SUPABASE_URL`, `NEXT_PUBLIC_SUPABASE_ANON_KEY` and
    /// the optional `SUPABASE_SERVICE_ROLE_KEY`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with an injectable variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let url = lookup("NEXT_PUBLIC_SUPABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| AuthError::Config("NEXT_PUBLIC_SUPABASE_URL not set".into()))?;
        let anon_key = lookup("NEXT_PUBLIC_SUPABASE_ANON_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| AuthError::Config("NEXT_PUBLIC_SUPABASE_ANON_KEY not set".into()))?;
        let service_role_key =
            lookup("SUPABASE_SERVICE_ROLE_KEY").filter(|v| !v.trim().is_empty());

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key,
            service_role_key,
        })
    }
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("anon_key", &self.anon_key)
            .field(
                "service_role_key",
                &self.service_role_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// Supabase-backed identity provider
pub struct SupabaseAuthProvider {
    client: Client,
    config: SupabaseConfig,
}

impl SupabaseAuthProvider {
    pub fn new(config: SupabaseConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(SupabaseConfig::from_env()?))
    }

    fn profile_key(&self) -> &str {
        self.config
            .service_role_key
            .as_deref()
            .unwrap_or(&self.config.anon_key)
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuthProvider {
    async fn current_user(&self, credentials: &Credentials) -> Result<User> {
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.config.url))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(credentials.access_token())
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AuthError::Unauthenticated(format!(
                "token rejected ({})",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AuthError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let user: GoTrueUser = response
            .json()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        tracing::debug!(user_id = %user.id, "Resolved Supabase user");

        Ok(User {
            id: user.id,
            email: user.email,
        })
    }

    async fn profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let key = self.profile_key();
        let response = self
            .client
            .get(format!("{}/rest/v1/profiles", self.config.url))
            .query(&[
                ("id", format!("eq.{user_id}")),
                ("select", "id,email,full_name".to_string()),
            ])
            .header("apikey", key)
            .bearer_auth(key)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AuthError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let rows: Vec<Profile> = response
            .json()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        Ok(rows.into_iter().next())
    }

    fn name(&self) -> &str {
        "Supabase"
    }
}
