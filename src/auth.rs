use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Doctor,
    Donor,
}

impl Role {
    #[cfg(test)]
    pub const ALL: [Role; 3] = [Role::Admin, Role::Doctor, Role::Donor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Doctor => "Doctor",
            Role::Donor => "Donor",
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Doctor)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims the portal reads from the backend-issued credential.
/// The signature is not checked here: the backend verifies every call.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    pub role: Role,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl Claims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("credential is not a three-part token")]
    Malformed,
    #[error("credential expired")]
    Expired,
    #[error("credential rejected: {0}")]
    Rejected(jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidToken => TokenError::Malformed,
            _ => TokenError::Rejected(err),
        }
    }
}

/// Reads the claims without checking the signature; the backend verifies
/// every call it receives. `exp` is optional but enforced when present.
fn claims_validation() -> Validation {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.required_spec_claims.clear();
    validation.validate_aud = false;
    validation.leeway = 0;
    validation
}

pub fn decode_claims(token: &str) -> Result<Claims, TokenError> {
    let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &claims_validation())?;
    Ok(data.claims)
}

/// Short SHA-256 fingerprint of a credential, used to key per-session state
/// and to correlate log lines without writing the token itself.
pub fn token_fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let out = hasher.finalize();
    hex::encode(&out[..8])
}

#[cfg(test)]
pub(crate) mod test_tokens {
    use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};

    /// Signed-looking token with an arbitrary JSON payload.
    pub fn token_with(payload: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{header}.{body}.c2lnbmF0dXJl")
    }

    pub fn token_for(role: &str) -> String {
        token_with(serde_json::json!({ "sub": 7, "role": role, "username": "donor@example.com" }))
    }
}
