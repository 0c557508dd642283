use std::sync::Arc;

use serde_json::json;

use super::Caller;
use crate::backend::{ApiRequest, ApiTransport, ClientError};
use crate::models::{LoginResponse, User};

#[derive(Clone)]
pub struct AuthService {
    caller: Caller,
}

impl AuthService {
    pub fn new(api: Arc<dyn ApiTransport>, bearer: Option<String>) -> Self {
        Self {
            caller: Caller::new(api, bearer),
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ClientError> {
        self.caller
            .call(ApiRequest::post(
                "/auth/login",
                json!({ "username": username, "password": password }),
            ))
            .await
    }

    pub async fn register(&self, name: &str, username: &str, password: &str) -> Result<(), ClientError> {
        self.caller
            .call_unit(ApiRequest::post(
                "/auth/register",
                json!({ "name": name, "username": username, "password": password }),
            ))
            .await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<(), ClientError> {
        self.caller
            .call_unit(ApiRequest::post("/auth/forgot-password", json!({ "email": email })))
            .await
    }

    pub async fn reset_password(&self, token: &str, password: &str) -> Result<(), ClientError> {
        self.caller
            .call_unit(ApiRequest::post(
                "/auth/reset-password",
                json!({ "token": token, "password": password }),
            ))
            .await
    }

    pub async fn profile(&self) -> Result<User, ClientError> {
        self.caller.call(ApiRequest::get("/auth/profile")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::FakeTransport;
    use axum::http::Method;

    #[tokio::test]
    async fn test_login_decodes_token_and_user() {
        let fake = Arc::new(FakeTransport::new());
        fake.json(
            Method::POST,
            "/auth/login",
            json!({
                "access_token": "a.b.c",
                "user": { "id": 1, "username": "doc@example.com", "name": "Dr. Minh", "role": "Doctor" }
            }),
        );
        let service = AuthService::new(fake.clone(), None);

        let resp = service.login("doc@example.com", "secret").await.unwrap();
        assert_eq!(resp.access_token, "a.b.c");
        assert_eq!(resp.user.role, crate::auth::Role::Doctor);
        assert_eq!(
            fake.calls()[0].body,
            Some(json!({ "username": "doc@example.com", "password": "secret" }))
        );
    }

    #[tokio::test]
    async fn test_profile_unauthorized() {
        let fake = Arc::new(FakeTransport::new());
        fake.fail(Method::GET, "/auth/profile", 401, "jwt expired");
        let service = AuthService::new(fake, Some("old".into()));

        assert!(matches!(
            service.profile().await,
            Err(ClientError::Unauthorized { .. })
        ));
    }
}
