use std::sync::Arc;

use super::Caller;
use crate::backend::{ApiRequest, ApiTransport, ClientError};
use crate::models::Notification;

#[derive(Clone)]
pub struct NotificationService {
    caller: Caller,
}

impl NotificationService {
    pub fn new(api: Arc<dyn ApiTransport>, bearer: Option<String>) -> Self {
        Self {
            caller: Caller::new(api, bearer),
        }
    }

    pub async fn mine(&self) -> Result<Vec<Notification>, ClientError> {
        self.caller.call(ApiRequest::get("/notifications")).await
    }

    pub async fn mark_read(&self, id: i64) -> Result<(), ClientError> {
        self.caller
            .call_unit(ApiRequest::patch(format!("/notifications/{id}/read")))
            .await
    }
}
