//! # billing-core
//!
//! Identity types and the authentication capability consumed by the checkout
//! flow.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐    current_user()    ┌──────────────────────┐
//! │ Checkout handler │─────────────────────▶│    AuthProvider      │
//! │ (billing-server) │◀─────────────────────│    (Strategy)        │
//! └──────────────────┘   profile(user_id)   └──────────────────────┘
//!                                                     │
//!                                   ┌─────────────────┴──────────────┐
//!                                   │ Supabase (billing-auth), fakes │
//!                                   └────────────────────────────────┘
//! ```
//!
//! User accounts are owned by the external auth provider. This crate only
//! reads `id`, `email` and `full_name`.

pub mod auth;
pub mod error;
pub mod identity;

pub use auth::{AuthProvider, DenyAllAuthProvider};
pub use error::{AuthError, Result};
pub use identity::{Credentials, Profile, User};
