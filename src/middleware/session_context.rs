use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::auth::TokenError;
use crate::error::ApiError;
use crate::models::AppState;
use crate::session::{Session, token_from_headers};

/// Signed-in session for the request; rejects with `AuthError` otherwise.
#[derive(Debug, Clone)]
pub struct SessionContext(pub Session);

/// Session when the request carries a usable credential.
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<Session>);

fn session_from_parts(parts: &Parts) -> Result<Option<Session>, ApiError> {
    let Some(token) = token_from_headers(&parts.headers) else {
        return Ok(None);
    };

    match Session::from_token(token) {
        Ok(session) => Ok(Some(session)),
        Err(TokenError::Expired) => Err(ApiError::session_expired()),
        Err(e) => {
            tracing::debug!(error = %e, "unreadable credential");
            Err(ApiError::Auth("INVALID_CREDENTIAL", "Please sign in again".into()))
        }
    }
}

impl FromRequestParts<AppState> for SessionContext {
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let result = session_from_parts(parts)
            .and_then(|session| session.ok_or_else(ApiError::not_signed_in))
            .map(SessionContext);
        async move { result }
    }
}

impl FromRequestParts<AppState> for MaybeSession {
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        // A broken credential is treated as signed out here; the gate in
        // front of the screens already cleared it.
        let result = Ok(MaybeSession(session_from_parts(parts).unwrap_or(None)));
        async move { result }
    }
}
