//! Credential lookup seam used by authenticated HTTP callers.

use crate::types::Credential;

/// Supplies the bearer credential for outgoing requests.
///
/// Callers read the credential at the moment they build a request. `None`
/// means nobody is signed in and the caller should skip the request.
pub trait CredentialProvider: Send + Sync {
    fn bearer_token(&self) -> Option<Credential>;

    fn user_id(&self) -> Option<String>;
}

/// A fixed credential, for hosts that manage login themselves and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    token: Option<Credential>,
    user_id: Option<String>,
}

impl StaticCredentials {
    pub fn new(token: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            token: Some(Credential::new(token)),
            user_id: Some(user_id.into()),
        }
    }

    /// No credential at all. Every authenticated call becomes a no-op.
    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl CredentialProvider for StaticCredentials {
    fn bearer_token(&self) -> Option<Credential> {
        self.token.clone()
    }

    fn user_id(&self) -> Option<String> {
        self.user_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_credentials() {
        let creds = StaticCredentials::new("tok", "5");
        assert_eq!(creds.bearer_token().unwrap().expose(), "tok");
        assert_eq!(creds.user_id().as_deref(), Some("5"));
    }

    #[test]
    fn test_anonymous_has_nothing() {
        let creds = StaticCredentials::anonymous();
        assert!(creds.bearer_token().is_none());
        assert!(creds.user_id().is_none());
    }
}
