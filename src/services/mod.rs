//! One wrapper per backend resource. Each method maps to exactly one
//! endpoint; nothing here retries, caches or batches.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::backend::{ApiRequest, ApiTransport, ClientError, decode};

pub mod appointment_service;
pub mod auth_service;
pub mod inventory_service;
pub mod location_service;
pub mod notification_service;
pub mod report_service;
pub mod user_service;

pub use appointment_service::AppointmentService;
pub use auth_service::AuthService;
pub use inventory_service::InventoryService;
pub use location_service::LocationService;
pub use notification_service::NotificationService;
pub use report_service::ReportService;
pub use user_service::UserService;

#[derive(Clone)]
pub(crate) struct Caller {
    api: Arc<dyn ApiTransport>,
    bearer: Option<String>,
}

impl Caller {
    pub(crate) fn new(api: Arc<dyn ApiTransport>, bearer: Option<String>) -> Self {
        Self { api, bearer }
    }

    pub(crate) async fn raw(&self, req: ApiRequest) -> Result<Value, ClientError> {
        self.api.send(req.with_bearer(self.bearer.as_deref())).await
    }

    pub(crate) async fn call<T: DeserializeOwned>(&self, req: ApiRequest) -> Result<T, ClientError> {
        decode(self.raw(req).await?)
    }

    /// For endpoints whose body the UI never reads.
    pub(crate) async fn call_unit(&self, req: ApiRequest) -> Result<(), ClientError> {
        self.raw(req).await.map(|_| ())
    }
}

/// `encodeURIComponent` for a path segment such as `A+`.
pub(crate) fn segment(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}
