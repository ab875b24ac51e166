//! # Authentication Module
//!
//! Login state for the streaming client.
//!
//! ## Overview
//!
//! The backend issues a signed JWT at login. This crate keeps that token as
//! the bearer credential for authenticated calls, reads the user id and
//! email out of its payload, and announces sign-in and sign-out on the
//! [`EventBus`](core_runtime::events::EventBus).
//!
//! ## Features
//!
//! - [`AuthSession`]: shared, cloneable login handle
//! - [`CredentialProvider`]: the seam HTTP callers read credentials through
//! - [`StaticCredentials`]: fixed credentials for hosts and tests
//! - Credentials are redacted from `Debug` output

pub mod error;
pub mod provider;
pub mod session;
pub mod types;

pub use error::{AuthError, Result};
pub use provider::{CredentialProvider, StaticCredentials};
pub use session::AuthSession;
pub use types::{Credential, TokenClaims, UserProfile};
