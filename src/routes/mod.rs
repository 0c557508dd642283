use axum::{Json, Router, extract::State, http::Uri, middleware, routing::get};
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::middleware::navigation_gate::require_navigation;
use crate::models::AppState;

pub mod appointment_routes;
pub mod auth_routes;
pub mod inventory_routes;
pub mod notification_routes;
pub mod page_routes;
pub mod site_routes;
pub mod user_routes;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", auth_routes::router())
        .merge(appointment_routes::router())
        .merge(inventory_routes::router())
        .merge(notification_routes::router())
        .merge(site_routes::router())
        .merge(user_routes::router())
        .fallback(unknown_endpoint);

    // `layer` rather than `route_layer`: paths without a screen are gated too.
    Router::new()
        .nest("/api", api)
        .merge(page_routes::router().layer(middleware::from_fn(require_navigation)))
        .route("/health", get(health))
        .with_state(state)
}

async fn unknown_endpoint(uri: Uri) -> ApiError {
    ApiError::NotFound("NOT_FOUND", format!("No endpoint at {}", uri.path()))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok", "in_flight": state.inflight.pending_count() }))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::{
        Router,
        body::Body,
        http::{HeaderMap, Method, Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::backend::fake::FakeTransport;
    use crate::models::AppState;

    pub fn app(fake: &Arc<FakeTransport>) -> (Router, AppState) {
        let state = AppState::new(fake.clone(), 3600);
        (super::router(state.clone()), state)
    }

    pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    pub fn with_cookie(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::COOKIE, format!("token={token}"))
            .body(Body::empty())
            .unwrap()
    }

    pub struct Reply {
        pub status: StatusCode,
        pub headers: HeaderMap,
        pub json: Value,
    }

    pub async fn send(app: &Router, req: Request<Body>) -> Reply {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        Reply {
            status,
            headers,
            json,
        }
    }

    impl Reply {
        pub fn cookie(&self) -> Option<&str> {
            self.headers
                .get(header::SET_COOKIE)
                .and_then(|v| v.to_str().ok())
        }

        pub fn location(&self) -> Option<&str> {
            self.headers
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok())
        }
    }
}
