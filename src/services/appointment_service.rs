use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;

use super::Caller;
use crate::backend::{ApiRequest, ApiTransport, ClientError};
use crate::models::{Appointment, HealthCheckPayload, NewAppointment};
use crate::status::AppointmentStatus;

#[derive(Clone)]
pub struct AppointmentService {
    caller: Caller,
}

impl AppointmentService {
    pub fn new(api: Arc<dyn ApiTransport>, bearer: Option<String>) -> Self {
        Self {
            caller: Caller::new(api, bearer),
        }
    }

    pub async fn create(&self, form: &NewAppointment) -> Result<Appointment, ClientError> {
        self.caller
            .call(ApiRequest::post("/appointments", json!(form)))
            .await
    }

    pub async fn my_history(&self) -> Result<Vec<Appointment>, ClientError> {
        self.caller.call(ApiRequest::get("/appointments/my-history")).await
    }

    pub async fn get(&self, id: i64) -> Result<Appointment, ClientError> {
        self.caller.call(ApiRequest::get(format!("/appointments/{id}"))).await
    }

    pub async fn all(&self) -> Result<Vec<Appointment>, ClientError> {
        self.caller.call(ApiRequest::get("/appointments")).await
    }

    pub async fn pending(&self) -> Result<Vec<Appointment>, ClientError> {
        self.caller.call(ApiRequest::get("/appointments/pending")).await
    }

    pub async fn by_status(&self, status: &AppointmentStatus) -> Result<Vec<Appointment>, ClientError> {
        self.caller
            .call(ApiRequest::get("/appointments/filter").with_query("status", status.as_str()))
            .await
    }

    pub async fn range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Appointment>, ClientError> {
        self.caller
            .call(
                ApiRequest::get("/appointments/range")
                    .with_query("start", start.format("%Y-%m-%d").to_string())
                    .with_query("end", end.format("%Y-%m-%d").to_string()),
            )
            .await
    }

    pub async fn update_status(&self, id: i64, status: &AppointmentStatus) -> Result<(), ClientError> {
        self.caller
            .call_unit(
                ApiRequest::patch(format!("/appointments/{id}/status"))
                    .with_body(json!({ "status": status.as_str() })),
            )
            .await
    }

    pub async fn cancel(&self, id: i64) -> Result<(), ClientError> {
        self.update_status(id, &AppointmentStatus::Cancelled).await
    }

    /// Setting a time slot also confirms the appointment on the backend.
    pub async fn update_time_slot(&self, id: i64, time_slot: &str) -> Result<(), ClientError> {
        self.caller
            .call_unit(
                ApiRequest::patch(format!("/appointments/{id}/time"))
                    .with_body(json!({ "timeSlot": time_slot })),
            )
            .await
    }

    pub async fn submit_health_check(
        &self,
        id: i64,
        payload: &HealthCheckPayload,
    ) -> Result<(), ClientError> {
        self.caller
            .call_unit(ApiRequest::post(
                format!("/appointments/{id}/health-check"),
                json!(payload),
            ))
            .await
    }
}
