use std::sync::Arc;

use serde_json::Value;

use super::Caller;
use crate::backend::{ApiRequest, ApiTransport, ClientError};

#[derive(Clone)]
pub struct ReportService {
    caller: Caller,
}

impl ReportService {
    pub fn new(api: Arc<dyn ApiTransport>, bearer: Option<String>) -> Self {
        Self {
            caller: Caller::new(api, bearer),
        }
    }

    pub async fn dashboard(&self) -> Result<Value, ClientError> {
        self.caller.raw(ApiRequest::get("/reports/dashboard")).await
    }
}
