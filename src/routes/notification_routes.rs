use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};

use crate::{
    error::ApiError,
    middleware::session_context::SessionContext,
    models::*,
    notifications::{self, NotificationFeedView},
    services::NotificationService,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/{notification_id}/read", post(mark_read))
}

async fn list_notifications(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
) -> Result<Json<ApiOk<NotificationFeedView>>, ApiError> {
    let service = NotificationService::new(state.api.clone(), session.bearer());
    let feed = notifications::refresh(
        &state.notifications,
        &service,
        session.fingerprint(),
        session.expires_at(),
    )
    .await?;
    Ok(Json(ApiOk { data: feed }))
}

async fn mark_read(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
    Path(notification_id): Path<i64>,
) -> Result<Json<ApiOk<NotificationFeedView>>, ApiError> {
    let _slot = state
        .inflight
        .try_begin(session.fingerprint(), "mark_read", notification_id)?;
    let service = NotificationService::new(state.api.clone(), session.bearer());
    let feed = notifications::mark_read(
        &state.notifications,
        &service,
        session.fingerprint(),
        notification_id,
    )
    .await?;
    Ok(Json(ApiOk { data: feed }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::{Method, StatusCode};
    use serde_json::{Value, json};

    use crate::auth::test_tokens::*;
    use crate::backend::fake::FakeTransport;
    use crate::routes::test_support::*;

    fn feed() -> Value {
        json!([
            { "id": 1, "title": "Confirmed", "message": "See you", "type": "SUCCESS", "isRead": false, "createdAt": "2026-05-01T08:00:00Z" },
            { "id": 2, "title": "Thanks", "message": "Donation done", "type": "INFO", "isRead": true, "createdAt": "2026-04-01T08:00:00Z" }
        ])
    }

    #[tokio::test]
    async fn test_list_counts_unread() {
        let fake = Arc::new(FakeTransport::new());
        fake.json(Method::GET, "/notifications", feed());
        let (app, _) = app(&fake);
        let token = token_for("Donor");

        let reply = send(&app, request(Method::GET, "/api/notifications", Some(&token), None)).await;

        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.json["data"]["unread_count"], 1);
        assert_eq!(reply.json["data"]["items"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_read_mark_rolls_back() {
        let fake = Arc::new(FakeTransport::new());
        fake.json(Method::GET, "/notifications", feed());
        fake.fail(Method::PATCH, "/notifications/1/read", 503, "maintenance");
        let (app, state) = app(&fake);
        let token = token_for("Donor");
        send(&app, request(Method::GET, "/api/notifications", Some(&token), None)).await;

        let reply = send(&app, request(Method::POST, "/api/notifications/1/read", Some(&token), None)).await;

        assert_eq!(reply.status, StatusCode::BAD_GATEWAY);
        assert!(reply.json["error"]["reference"].is_string());
        let session = crate::session::Session::from_token(token).unwrap();
        assert_eq!(state.notifications.view(session.fingerprint()).unread_count, 1);
    }

    #[tokio::test]
    async fn test_read_mark_applies_locally() {
        let fake = Arc::new(FakeTransport::new());
        fake.json(Method::GET, "/notifications", feed());
        fake.json(Method::PATCH, "/notifications/1/read", Value::Null);
        let (app, _) = app(&fake);
        let token = token_for("Doctor");
        send(&app, request(Method::GET, "/api/notifications", Some(&token), None)).await;

        let reply = send(&app, request(Method::POST, "/api/notifications/1/read", Some(&token), None)).await;

        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.json["data"]["unread_count"], 0);
    }
}
