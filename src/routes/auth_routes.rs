use axum::{
    Json, Router,
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
};

use crate::{
    error::ApiError,
    middleware::session_context::{MaybeSession, SessionContext},
    models::*,
    navigation::home_for,
    services::AuthService,
    session::{Session, clear_token_cookie, token_cookie},
    validation::{
        validate_forgot_password, validate_reset_password, validate_sign_in, validate_sign_up,
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/logout", post(logout))
        .route("/profile", get(profile))
}

fn redirect_ok(to: &str) -> Json<ApiOk<OkData>> {
    Json(ApiOk {
        data: OkData {
            ok: true,
            redirect_to: Some(to.to_string()),
        },
    })
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_sign_in(&req.username, &req.password)?;
    let username = req.username.trim();
    let _slot = state.inflight.try_begin("anonymous", "login", username)?;

    let resp = AuthService::new(state.api.clone(), None)
        .login(username, &req.password)
        .await?;
    let session = Session::establish(resp)?;
    tracing::info!(session = session.fingerprint(), role = %session.role(), "signed in");

    let cookie = token_cookie(session.token(), state.token_cookie_max_age_secs);
    let result = LoginResult {
        access_token: session.token().to_string(),
        expires_at: session.expires_at(),
        user: session.user().cloned(),
        redirect_to: home_for(session.role()),
    };
    Ok(([(header::SET_COOKIE, cookie)], Json(ApiOk { data: result })))
}

async fn register(
    State(state): State<AppState>,
    Json(form): Json<SignUpForm>,
) -> Result<Json<ApiOk<OkData>>, ApiError> {
    validate_sign_up(&form)?;
    let username = form.username.trim();
    let _slot = state.inflight.try_begin("anonymous", "register", username)?;

    AuthService::new(state.api.clone(), None)
        .register(form.name.trim(), username, &form.password)
        .await?;
    Ok(redirect_ok("/signin"))
}

async fn forgot_password(
    State(state): State<AppState>,
    Json(form): Json<ForgotPasswordForm>,
) -> Result<Json<ApiOk<OkData>>, ApiError> {
    validate_forgot_password(&form.email)?;
    let email = form.email.trim();
    let _slot = state.inflight.try_begin("anonymous", "forgot_password", email)?;

    AuthService::new(state.api.clone(), None)
        .forgot_password(email)
        .await?;
    Ok(Json(OkData::ok()))
}

async fn reset_password(
    State(state): State<AppState>,
    Json(form): Json<ResetPasswordForm>,
) -> Result<Json<ApiOk<OkData>>, ApiError> {
    validate_reset_password(&form)?;
    let token = form.token.trim();
    let _slot = state.inflight.try_begin("anonymous", "reset_password", token)?;

    AuthService::new(state.api.clone(), None)
        .reset_password(token, &form.password)
        .await?;
    Ok(redirect_ok("/signin"))
}

/// Always succeeds; there is nothing to revoke on the backend.
async fn logout(State(state): State<AppState>, MaybeSession(session): MaybeSession) -> impl IntoResponse {
    if let Some(session) = session {
        state.notifications.forget(session.fingerprint());
        tracing::info!(session = session.fingerprint(), "signed out");
    }
    (
        [(header::SET_COOKIE, clear_token_cookie())],
        redirect_ok("/signin"),
    )
}

async fn profile(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
) -> Result<Json<ApiOk<User>>, ApiError> {
    let user = AuthService::new(state.api.clone(), session.bearer())
        .profile()
        .await?;
    Ok(Json(ApiOk { data: user }))
}
