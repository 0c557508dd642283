use std::sync::Arc;

use serde_json::{Value, json};

use super::Caller;
use crate::backend::{ApiRequest, ApiTransport, ClientError};
use crate::models::{User, UserPayload};

/// Account administration. The backend only accepts these from an Admin.
#[derive(Clone)]
pub struct UserService {
    caller: Caller,
}

impl UserService {
    pub fn new(api: Arc<dyn ApiTransport>, bearer: Option<String>) -> Self {
        Self {
            caller: Caller::new(api, bearer),
        }
    }

    pub async fn list(&self) -> Result<Vec<User>, ClientError> {
        self.caller.call(ApiRequest::get("/users")).await
    }

    pub async fn create(&self, payload: &UserPayload) -> Result<Value, ClientError> {
        self.caller
            .raw(ApiRequest::post("/users", json!(payload)))
            .await
    }

    pub async fn update(&self, id: i64, payload: &UserPayload) -> Result<Value, ClientError> {
        self.caller
            .raw(ApiRequest::patch(format!("/users/{id}")).with_body(json!(payload)))
            .await
    }

    pub async fn remove(&self, id: i64) -> Result<(), ClientError> {
        self.caller
            .call_unit(ApiRequest::delete(format!("/users/{id}")))
            .await
    }
}
