//! # billing-auth
//!
//! Identity backends for the billing service.
//!
//! ## Providers
//!
//! - **Supabase** (default): GoTrue user lookup plus the `profiles` table over
//!   PostgREST
//!
//! ## Usage
//!
//! ```rust,ignore
//! use billing_auth::SupabaseAuthProvider;
//!
//! let auth = SupabaseAuthProvider::from_env()?;
//! let user = auth.current_user(&credentials).await?;
//! ```

#[cfg(feature = "supabase")]
pub mod supabase;

#[cfg(feature = "supabase")]
pub use supabase::{SupabaseAuthProvider, SupabaseConfig};

// Re-export core types for convenience
pub use billing_core::{AuthError, AuthProvider, Credentials, DenyAllAuthProvider, Profile, Result, User};
