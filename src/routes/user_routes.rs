use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};

use crate::{
    auth::Role,
    error::ApiError,
    middleware::session_context::SessionContext,
    models::*,
    services::UserService,
    session::{Session, ensure_role},
    validation::validate_user_form,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{user_id}", put(update_user).delete(delete_user))
}

pub(crate) fn users_for(state: &AppState, session: &Session) -> Result<UserService, ApiError> {
    ensure_role(session, &[Role::Admin])?;
    Ok(UserService::new(state.api.clone(), session.bearer()))
}

async fn list_users(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
) -> Result<Json<ApiOk<Vec<User>>>, ApiError> {
    let users = users_for(&state, &session)?.list().await?;
    Ok(Json(ApiOk { data: users }))
}

/// Every mutation answers with the reloaded list.
async fn create_user(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
    Json(form): Json<UserForm>,
) -> Result<(StatusCode, Json<ApiOk<Vec<User>>>), ApiError> {
    let users = users_for(&state, &session)?;
    let payload = validate_user_form(&form, true)?;
    let username = payload.username.clone().unwrap_or_default();
    let _slot = state
        .inflight
        .try_begin(session.fingerprint(), "create_user", &username)?;

    users.create(&payload).await?;
    tracing::info!(session = session.fingerprint(), %username, role = %payload.role, "user created");
    Ok((StatusCode::CREATED, Json(ApiOk { data: users.list().await? })))
}

async fn update_user(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
    Path(user_id): Path<i64>,
    Json(form): Json<UserForm>,
) -> Result<Json<ApiOk<Vec<User>>>, ApiError> {
    let users = users_for(&state, &session)?;
    let payload = validate_user_form(&form, false)?;
    let _slot = state
        .inflight
        .try_begin(session.fingerprint(), "update_user", user_id)?;

    users.update(user_id, &payload).await?;
    tracing::info!(session = session.fingerprint(), user_id, role = %payload.role, "user updated");
    Ok(Json(ApiOk { data: users.list().await? }))
}

async fn delete_user(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiOk<Vec<User>>>, ApiError> {
    let users = users_for(&state, &session)?;
    let _slot = state
        .inflight
        .try_begin(session.fingerprint(), "delete_user", user_id)?;

    users.remove(user_id).await?;
    tracing::info!(session = session.fingerprint(), user_id, "user deleted");
    Ok(Json(ApiOk { data: users.list().await? }))
}
