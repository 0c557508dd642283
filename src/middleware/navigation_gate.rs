use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::auth::decode_claims;
use crate::navigation::{Credential, NavDecision, evaluate};
use crate::session::{clear_token_cookie, token_from_headers};

fn credential_of(req: &Request) -> Credential {
    let Some(token) = token_from_headers(req.headers()) else {
        return Credential::Missing;
    };
    match decode_claims(&token) {
        Ok(claims) => Credential::Valid(claims.role),
        Err(e) => {
            tracing::debug!(error = %e, "credential rejected at navigation");
            Credential::Invalid
        }
    }
}

/// Screen-router middleware: redirect before the screen handler runs.
pub async fn require_navigation(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let credential = credential_of(&req);

    match evaluate(credential, &path) {
        NavDecision::Allow => next.run(req).await,
        NavDecision::Redirect {
            to,
            clear_credential,
        } => {
            tracing::debug!(%path, %to, ?credential, "navigation redirected");
            if clear_credential {
                (
                    [(header::SET_COOKIE, clear_token_cookie())],
                    Redirect::temporary(&to),
                )
                    .into_response()
            } else {
                Redirect::temporary(&to).into_response()
            }
        }
    }
}
