use crate::error::{AuthError, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Opaque bearer credential issued by the backend at login.
///
/// The raw value never appears in `Debug` output.
///
/// # Examples
///
/// ```
/// use core_auth::Credential;
///
/// let credential = Credential::new("header.payload.signature");
/// assert_eq!(credential.expose(), "header.payload.signature");
/// assert!(!format!("{:?}", credential).contains("payload"));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building an `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&"[REDACTED]").finish()
    }
}

/// Claims carried in the token payload segment.
///
/// The backend issues numeric ids; older tokens carry strings. Both are
/// normalised to a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

fn id_as_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

impl TokenClaims {
    /// Decode the claims from the middle segment of a JWT.
    ///
    /// The signature is not verified; the backend does that on every call.
    /// Both the URL-safe and the standard base64 alphabets are accepted.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidToken`] when the token is not three segments or
    ///   the payload is not base64
    /// - [`AuthError::MalformedClaims`] when the payload is not the expected
    ///   JSON object
    pub fn decode(token: &str) -> Result<Self> {
        let mut segments = token.split('.');
        let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
            (Some(_), Some(payload), Some(_), None) if !payload.is_empty() => payload,
            _ => {
                return Err(AuthError::InvalidToken(
                    "expected three dot-separated segments".to_string(),
                ))
            }
        };

        let normalized: String = payload
            .trim_end_matches('=')
            .chars()
            .map(|c| match c {
                '+' => '-',
                '/' => '_',
                other => other,
            })
            .collect();

        let bytes = URL_SAFE_NO_PAD
            .decode(normalized.as_bytes())
            .map_err(|e| AuthError::InvalidToken(format!("payload is not base64: {}", e)))?;

        serde_json::from_slice(&bytes).map_err(|e| AuthError::MalformedClaims(e.to_string()))
    }
}

/// The signed-in user as the rest of the client sees them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: Option<String>,
    pub name: String,
    /// Admin approval is granted server-side; new accounts start as regular users.
    #[serde(default)]
    pub is_admin: bool,
}

impl UserProfile {
    pub fn from_claims(claims: TokenClaims, name: impl Into<String>, is_admin: bool) -> Self {
        Self {
            id: claims.id,
            email: claims.email,
            name: name.into(),
            is_admin,
        }
    }
}
