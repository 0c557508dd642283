use std::sync::Arc;

use serde_json::{Value, json};

use super::{Caller, segment};
use crate::backend::{ApiRequest, ApiTransport, ClientError};
use crate::models::{BloodUnit, BloodUnitPayload};

#[derive(Clone)]
pub struct InventoryService {
    caller: Caller,
}

impl InventoryService {
    pub fn new(api: Arc<dyn ApiTransport>, bearer: Option<String>) -> Self {
        Self {
            caller: Caller::new(api, bearer),
        }
    }

    /// Per-type totals; the row shape is owned by the backend.
    pub async fn summary(&self) -> Result<Value, ClientError> {
        self.caller.raw(ApiRequest::get("/blood-inventory/summary")).await
    }

    pub async fn by_type(&self, blood_type: &str) -> Result<Vec<BloodUnit>, ClientError> {
        self.caller
            .call(ApiRequest::get(format!(
                "/blood-inventory/type/{}",
                segment(blood_type)
            )))
            .await
    }

    /// Records a unit. With `appointment_id` set the backend also completes
    /// the appointment.
    pub async fn record(&self, payload: &BloodUnitPayload) -> Result<Value, ClientError> {
        self.caller
            .raw(ApiRequest::post("/blood-inventory/record", json!(payload)))
            .await
    }

    pub async fn update(&self, id: i64, payload: &BloodUnitPayload) -> Result<Value, ClientError> {
        self.caller
            .raw(ApiRequest::put(format!("/blood-inventory/{id}"), json!(payload)))
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ClientError> {
        self.caller
            .call_unit(ApiRequest::delete(format!("/blood-inventory/{id}")))
            .await
    }

    pub async fn delete_type(&self, blood_type: &str) -> Result<(), ClientError> {
        self.caller
            .call_unit(ApiRequest::delete(format!(
                "/blood-inventory/type/{}",
                segment(blood_type)
            )))
            .await
    }

    pub async fn rename_type(&self, old_type: &str, new_type: &str) -> Result<(), ClientError> {
        self.caller
            .call_unit(ApiRequest::put(
                format!("/blood-inventory/type/{}", segment(old_type)),
                json!({ "newType": new_type }),
            ))
            .await
    }
}
