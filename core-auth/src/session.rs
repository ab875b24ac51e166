//! # Auth Session
//!
//! Holds the signed-in user and their bearer credential for the lifetime of
//! a login, and announces login and logout on the event bus.
//!
//! ## Usage
//!
//! ```no_run
//! use core_auth::AuthSession;
//! use core_runtime::events::EventBus;
//!
//! # fn main() -> Result<(), core_auth::AuthError> {
//! let session = AuthSession::new(EventBus::new(100));
//! let profile = session.sign_in("header.eyJpZCI6MX0.sig", "Ada", false)?;
//! assert_eq!(profile.id, "1");
//!
//! // Listeners such as the playback lifecycle binder see `SignedOut`
//! // after the credential is already gone.
//! session.sign_out();
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::provider::CredentialProvider;
use crate::types::{Credential, TokenClaims, UserProfile};
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug)]
struct SignedIn {
    credential: Credential,
    profile: UserProfile,
}

/// Shared handle to the current login. Clones observe the same session.
#[derive(Clone)]
pub struct AuthSession {
    inner: Arc<RwLock<Option<SignedIn>>>,
    event_bus: EventBus,
}

impl AuthSession {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            inner: Arc::new(RwLock::new(None)),
            event_bus,
        }
    }

    /// Start a session from a token issued by the login endpoint.
    ///
    /// The token payload supplies the user id and email; the display name and
    /// admin flag come from the login response. Signing in while already
    /// signed in replaces the previous session without a `SignedOut`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] or [`AuthError::MalformedClaims`]
    /// when the payload cannot be read. An `AuthError` event is emitted and
    /// the existing session, if any, is left untouched.
    #[instrument(skip(self, token, name))]
    pub fn sign_in(&self, token: &str, name: &str, is_admin: bool) -> Result<UserProfile> {
        let claims = match TokenClaims::decode(token) {
            Ok(claims) => claims,
            Err(err) => {
                warn!(error = %err, "Rejected login token");
                let _ = self.event_bus.emit(CoreEvent::Auth(AuthEvent::AuthError {
                    message: err.to_string(),
                }));
                return Err(err);
            }
        };

        let profile = UserProfile::from_claims(claims, name, is_admin);
        let user_id = profile.id.clone();

        *self.inner.write() = Some(SignedIn {
            credential: Credential::new(token),
            profile: profile.clone(),
        });

        info!(user_id = %user_id, "Signed in");
        let _ = self
            .event_bus
            .emit(CoreEvent::Auth(AuthEvent::SignedIn { user_id }));

        Ok(profile)
    }

    /// End the session. The credential is cleared before `SignedOut` is
    /// emitted. Signing out when nobody is signed in still emits the event.
    #[instrument(skip(self))]
    pub fn sign_out(&self) {
        let previous = self.inner.write().take();
        let user_id = previous.map(|s| s.profile.id);

        match &user_id {
            Some(id) => info!(user_id = %id, "Signed out"),
            None => debug!("Sign-out without an active session"),
        }

        let _ = self
            .event_bus
            .emit(CoreEvent::Auth(AuthEvent::SignedOut { user_id }));
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.inner.read().as_ref().map(|s| s.profile.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.read().is_some()
    }

    /// The credential, or [`AuthError::NotAuthenticated`].
    pub fn require_credential(&self) -> Result<Credential> {
        self.bearer_token().ok_or(AuthError::NotAuthenticated)
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}

impl CredentialProvider for AuthSession {
    fn bearer_token(&self) -> Option<Credential> {
        self.inner.read().as_ref().map(|s| s.credential.clone())
    }

    fn user_id(&self) -> Option<String> {
        self.inner.read().as_ref().map(|s| s.profile.id.clone())
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("user", &self.user_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    fn token(id: u64) -> String {
        let payload = format!(r#"{{"id":{},"email":"user{}@example.com"}}"#, id, id);
        format!("h.{}.s", URL_SAFE_NO_PAD.encode(payload))
    }

    #[tokio::test]
    async fn test_sign_in_stores_credential_and_emits() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let session = AuthSession::new(bus);

        let profile = session.sign_in(&token(3), "Ada", true).unwrap();
        assert_eq!(profile.id, "3");
        assert!(profile.is_admin);
        assert_eq!(session.bearer_token().unwrap().expose(), token(3));
        assert_eq!(session.user_id().as_deref(), Some("3"));

        assert_eq!(
            rx.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::SignedIn {
                user_id: "3".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_sign_out_clears_before_emitting() {
        let bus = EventBus::new(8);
        let session = AuthSession::new(bus.clone());
        session.sign_in(&token(4), "Ada", false).unwrap();

        let mut rx = bus.subscribe();
        session.sign_out();

        assert!(!session.is_authenticated());
        assert!(session.bearer_token().is_none());
        assert_eq!(
            rx.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::SignedOut {
                user_id: Some("4".to_string())
            })
        );
    }

    #[tokio::test]
    async fn test_invalid_token_keeps_existing_session() {
        let bus = EventBus::new(8);
        let session = AuthSession::new(bus.clone());
        session.sign_in(&token(1), "Ada", false).unwrap();

        let mut rx = bus.subscribe();
        let err = session.sign_in("garbage", "Eve", false).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
        assert_eq!(session.user_id().as_deref(), Some("1"));
        assert!(matches!(
            rx.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::AuthError { .. })
        ));
    }

    #[test]
    fn test_require_credential_when_signed_out() {
        let session = AuthSession::new(EventBus::new(8));
        assert_eq!(
            session.require_credential().unwrap_err(),
            AuthError::NotAuthenticated
        );
        // No subscribers; sign-out must not panic.
        session.sign_out();
    }

    #[test]
    fn test_clones_share_state() {
        let session = AuthSession::new(EventBus::new(8));
        let other = session.clone();
        session.sign_in(&token(8), "Ada", false).unwrap();
        assert_eq!(other.current_user().unwrap().name, "Ada");
    }
}
