use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use headers::{Authorization, Cookie, HeaderMapExt, authorization::Bearer};

use crate::auth::{Claims, Role, TokenError, decode_claims, token_fingerprint};
use crate::error::ApiError;
use crate::models::{LoginResponse, User};

pub const TOKEN_COOKIE: &str = "token";

/// A signed-in user, as far as the portal knows.
///
/// Built from the login response (`establish`) or from a credential on an
/// incoming request (`from_token`); dropped on logout, on expiry, or when
/// the backend stops accepting the credential.
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
    fingerprint: String,
    role: Role,
    user: Option<User>,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn establish(resp: LoginResponse) -> Result<Self, ApiError> {
        let claims = decode_claims(&resp.access_token).map_err(|e| {
            ApiError::Internal(format!("backend issued an unreadable credential: {e}"))
        })?;
        if claims.role != resp.user.role {
            tracing::warn!(
                claim = %claims.role,
                profile = %resp.user.role,
                "role in credential differs from profile, using credential"
            );
        }
        Ok(Self::from_claims(resp.access_token, claims, Some(resp.user)))
    }

    pub fn from_token(token: String) -> Result<Self, TokenError> {
        let claims = decode_claims(&token)?;
        Ok(Self::from_claims(token, claims, None))
    }

    fn from_claims(token: String, claims: Claims, user: Option<User>) -> Self {
        Self {
            fingerprint: token_fingerprint(&token),
            role: claims.role,
            expires_at: claims.expires_at(),
            user,
            token,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn bearer(&self) -> Option<String> {
        Some(self.token.clone())
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

pub fn ensure_role(session: &Session, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&session.role()) {
        Ok(())
    } else {
        let names: Vec<&str> = allowed.iter().map(Role::as_str).collect();
        Err(ApiError::Forbidden(
            "FORBIDDEN",
            format!("Only {} can do this", names.join("/")),
        ))
    }
}

/// Bearer header first, then the `token` cookie the navigation gate reads.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(authz) = headers.typed_get::<Authorization<Bearer>>() {
        let token = authz.token().trim();
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }
    headers
        .typed_get::<Cookie>()
        .and_then(|jar| jar.get(TOKEN_COOKIE).map(str::to_string))
        .filter(|t| !t.is_empty())
}

pub fn token_cookie(token: &str, max_age_secs: i64) -> String {
    format!("{TOKEN_COOKIE}={token}; Path=/; Max-Age={max_age_secs}; HttpOnly; SameSite=Lax")
}

pub fn clear_token_cookie() -> String {
    format!("{TOKEN_COOKIE}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_tokens::{token_for, token_with};
    use axum::http::{HeaderValue, header};
    use chrono::Duration;

    fn login_response(token: String, role: Role) -> LoginResponse {
        LoginResponse {
            access_token: token,
            user: User {
                id: 7,
                username: "donor@example.com".into(),
                name: Some("Donor".into()),
                role,
                avatar_url: None,
                donor_profile: None,
            },
        }
    }

    #[test]
    fn test_establish_populates_session() {
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        let token = token_with(serde_json::json!({ "role": "Donor", "exp": exp }));
        let session = Session::establish(login_response(token.clone(), Role::Donor)).unwrap();

        assert_eq!(session.role(), Role::Donor);
        assert_eq!(session.token(), token);
        assert_eq!(session.user().unwrap().id, 7);
        assert_eq!(session.expires_at().unwrap().timestamp(), exp);
    }

    #[test]
    fn test_establish_rejects_unreadable_credential() {
        let err = Session::establish(login_response("opaque".into(), Role::Donor)).unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[test]
    fn test_credential_role_wins() {
        let session = Session::establish(login_response(token_for("Doctor"), Role::Donor)).unwrap();
        assert_eq!(session.role(), Role::Doctor);
    }

    #[test]
    fn test_token_from_bearer_then_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; token=from-cookie"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("from-cookie"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("from-header"));

        assert_eq!(token_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn test_empty_cookie_is_no_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("token="));
        assert_eq!(token_from_headers(&headers), None);
    }

    #[test]
    fn test_cookie_strings() {
        assert_eq!(
            token_cookie("abc", 3600),
            "token=abc; Path=/; Max-Age=3600; HttpOnly; SameSite=Lax"
        );
        assert!(clear_token_cookie().contains("Max-Age=0"));
    }

    #[test]
    fn test_ensure_role() {
        let session = Session::from_token(token_for("Donor")).unwrap();
        assert!(ensure_role(&session, &[Role::Donor]).is_ok());
        let err = ensure_role(&session, &[Role::Admin, Role::Doctor]).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_, ref m) if m == "Only Admin/Doctor can do this"));
    }
}
