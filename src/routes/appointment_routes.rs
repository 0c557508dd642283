use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
};
use chrono::Utc;

use crate::{
    auth::Role,
    error::ApiError,
    inflight::InFlightGuard,
    middleware::session_context::SessionContext,
    models::*,
    services::{AppointmentService, InventoryService},
    session::{Session, ensure_role},
    status::{AppointmentAction, Screen, action_available},
    validation::{parse_time_slot, validate_blood_unit, validate_donation, validate_health_check},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/appointments", post(register_donation))
        .route("/appointments/{appointment_id}/cancel", post(cancel))
        .route("/appointments/{appointment_id}/confirm", post(confirm))
        .route("/appointments/{appointment_id}/reject", post(reject))
        .route("/appointments/{appointment_id}/time-slot", put(set_time_slot))
        .route("/appointments/{appointment_id}/health-check", post(record_health_check))
        .route("/appointments/{appointment_id}/blood-unit", post(record_blood_unit))
}

type ViewResult = Result<Json<ApiOk<AppointmentView>>, ApiError>;

fn actor_for(action: AppointmentAction) -> Role {
    match action {
        AppointmentAction::Cancel => Role::Donor,
        AppointmentAction::Confirm
        | AppointmentAction::Reject
        | AppointmentAction::SetTimeSlot
        | AppointmentAction::RecordHealthCheck
        | AppointmentAction::RecordBloodUnit => Role::Doctor,
    }
}

/// An action that passed its checks and holds the in-flight slot.
struct Claimed {
    service: AppointmentService,
    appointment: Appointment,
    _slot: InFlightGuard,
}

async fn claim(
    state: &AppState,
    session: &Session,
    appointment_id: i64,
    action: AppointmentAction,
) -> Result<Claimed, ApiError> {
    ensure_role(session, &[actor_for(action)])?;
    // Claimed before the status read.
    let slot = state
        .inflight
        .try_begin(session.fingerprint(), action.as_str(), appointment_id)?;

    let service = AppointmentService::new(state.api.clone(), session.bearer());
    let appointment = service.get(appointment_id).await?;
    if !action_available(&appointment.status, session.role(), action) {
        return Err(ApiError::Conflict(
            "ACTION_NOT_AVAILABLE",
            format!(
                "Cannot {} an appointment that is {}",
                action.as_str().replace('_', " "),
                appointment.status
            ),
        ));
    }

    tracing::info!(
        session = session.fingerprint(),
        appointment_id,
        action = action.as_str(),
        from = %appointment.status,
        "appointment action started"
    );
    Ok(Claimed {
        service,
        appointment,
        _slot: slot,
    })
}

/// Re-reads after a change so the caller renders what the backend stored.
async fn fresh_view(service: &AppointmentService, appointment_id: i64, role: Role) -> ViewResult {
    let appointment = service.get(appointment_id).await?;
    Ok(Json(ApiOk {
        data: AppointmentView::new(appointment, Screen::default_for(role), role),
    }))
}

async fn register_donation(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
    Json(form): Json<DonationForm>,
) -> Result<(StatusCode, Json<ApiOk<AppointmentView>>), ApiError> {
    ensure_role(&session, &[Role::Donor])?;
    let new_appointment = validate_donation(&form, Utc::now().date_naive())?;
    let _slot = state
        .inflight
        .try_begin(session.fingerprint(), "register", "new")?;

    let created = AppointmentService::new(state.api.clone(), session.bearer())
        .create(&new_appointment)
        .await?;
    tracing::info!(
        session = session.fingerprint(),
        appointment_id = created.id,
        site = new_appointment.donation_site_id,
        "donation registered"
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiOk {
            data: AppointmentView::new(created, Screen::DonorHistory, session.role()),
        }),
    ))
}

async fn cancel(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
    Path(appointment_id): Path<i64>,
) -> ViewResult {
    let claimed = claim(&state, &session, appointment_id, AppointmentAction::Cancel).await?;
    claimed.service.cancel(appointment_id).await?;
    fresh_view(&claimed.service, appointment_id, session.role()).await
}

async fn decide(
    state: &AppState,
    session: &Session,
    appointment_id: i64,
    action: AppointmentAction,
) -> ViewResult {
    let claimed = claim(state, session, appointment_id, action).await?;
    let target = action
        .target_status()
        .filter(|target| claimed.appointment.status.can_transition_to(target))
        .ok_or_else(|| {
            ApiError::Conflict(
                "ACTION_NOT_AVAILABLE",
                format!("Cannot {} this appointment", action.as_str()),
            )
        })?;
    claimed.service.update_status(appointment_id, &target).await?;
    fresh_view(&claimed.service, appointment_id, session.role()).await
}

async fn confirm(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
    Path(appointment_id): Path<i64>,
) -> ViewResult {
    decide(&state, &session, appointment_id, AppointmentAction::Confirm).await
}

async fn reject(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
    Path(appointment_id): Path<i64>,
) -> ViewResult {
    decide(&state, &session, appointment_id, AppointmentAction::Reject).await
}

async fn set_time_slot(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
    Path(appointment_id): Path<i64>,
    Json(form): Json<TimeSlotForm>,
) -> ViewResult {
    let time_slot = parse_time_slot(&form.time_slot)?;
    let claimed = claim(&state, &session, appointment_id, AppointmentAction::SetTimeSlot).await?;
    claimed
        .service
        .update_time_slot(appointment_id, &time_slot)
        .await?;
    fresh_view(&claimed.service, appointment_id, session.role()).await
}

async fn record_health_check(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
    Path(appointment_id): Path<i64>,
    Json(form): Json<HealthCheckForm>,
) -> ViewResult {
    let payload = validate_health_check(&form)?;
    let claimed = claim(
        &state,
        &session,
        appointment_id,
        AppointmentAction::RecordHealthCheck,
    )
    .await?;
    claimed
        .service
        .submit_health_check(appointment_id, &payload)
        .await?;
    tracing::info!(appointment_id, approved = payload.is_normal, "health check recorded");
    fresh_view(&claimed.service, appointment_id, session.role()).await
}

async fn record_blood_unit(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
    Path(appointment_id): Path<i64>,
    Json(mut form): Json<BloodUnitForm>,
) -> ViewResult {
    let claimed = claim(
        &state,
        &session,
        appointment_id,
        AppointmentAction::RecordBloodUnit,
    )
    .await?;

    if form.blood_type.as_deref().is_none_or(|t| t.trim().is_empty()) {
        form.blood_type = claimed.appointment.blood_type.clone();
    }
    let payload = validate_blood_unit(&form, Some(appointment_id), Utc::now().date_naive())?;

    InventoryService::new(state.api.clone(), session.bearer())
        .record(&payload)
        .await?;
    tracing::info!(appointment_id, volume = payload.volume, "blood unit recorded");
    fresh_view(&claimed.service, appointment_id, session.role()).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::{Method, StatusCode};
    use serde_json::{Value, json};

    use crate::auth::test_tokens::*;
    use crate::backend::fake::FakeTransport;
    use crate::routes::test_support::*;

    fn apt(id: i64, status: &str) -> Value {
        json!({
            "id": id, "name": "Nguyen Van A", "bloodType": "O+",
            "appointmentDate": "2026-11-02T08:00:00Z", "status": status
        })
    }

    #[tokio::test]
    async fn test_donor_cancels_pending_appointment() {
        let fake = Arc::new(FakeTransport::new());
        fake.json(Method::GET, "/appointments/5", apt(5, "Pending"));
        fake.json(Method::GET, "/appointments/5", apt(5, "Cancelled"));
        fake.json(Method::PATCH, "/appointments/5/status", Value::Null);
        let (app, state) = app(&fake);
        let token = token_for("Donor");

        let reply = send(&app, request(Method::POST, "/api/appointments/5/cancel", Some(&token), None)).await;

        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.json["data"]["status"], "Cancelled");
        assert_eq!(reply.json["data"]["presentation"]["actions"], json!([]));
        assert_eq!(
            fake.calls_to(Method::PATCH, "/appointments/5/status")[0].body,
            Some(json!({ "status": "Cancelled" }))
        );
        assert_eq!(state.inflight.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_refused_once_completed() {
        let fake = Arc::new(FakeTransport::new());
        fake.json(Method::GET, "/appointments/5", apt(5, "Completed"));
        let (app, _) = app(&fake);
        let token = token_for("Donor");

        let reply = send(&app, request(Method::POST, "/api/appointments/5/cancel", Some(&token), None)).await;

        assert_eq!(reply.status, StatusCode::CONFLICT);
        assert_eq!(reply.json["error"]["code"], "ACTION_NOT_AVAILABLE");
        assert!(fake.calls_to(Method::PATCH, "/appointments/5/status").is_empty());
    }

    #[tokio::test]
    async fn test_doctor_actions_are_forbidden_to_donors_and_admins() {
        let fake = Arc::new(FakeTransport::new());
        fake.json(Method::GET, "/appointments/5", apt(5, "Pending"));
        let (app, _) = app(&fake);

        for role in ["Donor", "Admin"] {
            let token = token_for(role);
            let reply = send(&app, request(Method::POST, "/api/appointments/5/confirm", Some(&token), None)).await;
            assert_eq!(reply.status, StatusCode::FORBIDDEN, "{role}");
        }
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_doctor_confirms_and_gets_queue_view() {
        let fake = Arc::new(FakeTransport::new());
        fake.json(Method::GET, "/appointments/8", apt(8, "Pending"));
        fake.json(Method::GET, "/appointments/8", apt(8, "Confirmed"));
        fake.json(Method::PATCH, "/appointments/8/status", Value::Null);
        let (app, _) = app(&fake);
        let token = token_for("Doctor");

        let reply = send(&app, request(Method::POST, "/api/appointments/8/confirm", Some(&token), None)).await;

        assert_eq!(reply.status, StatusCode::OK);
        let presentation = &reply.json["data"]["presentation"];
        assert_eq!(presentation["badge"], "info");
        assert_eq!(presentation["actions"], json!(["set_time_slot", "record_health_check"]));
    }

    #[tokio::test]
    async fn test_duplicate_action_is_rejected_while_in_flight() {
        let fake = Arc::new(FakeTransport::new());
        fake.json(Method::GET, "/appointments/8", apt(8, "Pending"));
        let (app, state) = app(&fake);
        let token = token_for("Doctor");
        let session = crate::session::Session::from_token(token.clone()).unwrap();
        let _held = state
            .inflight
            .try_begin(session.fingerprint(), "reject", 8)
            .unwrap();

        let reply = send(&app, request(Method::POST, "/api/appointments/8/reject", Some(&token), None)).await;

        assert_eq!(reply.status, StatusCode::CONFLICT);
        assert_eq!(reply.json["error"]["code"], "REQUEST_IN_FLIGHT");
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_refused_action_releases_its_slot() {
        let fake = Arc::new(FakeTransport::new());
        fake.json(Method::GET, "/appointments/8", apt(8, "Completed"));
        let (app, state) = app(&fake);
        let token = token_for("Donor");

        let reply = send(&app, request(Method::POST, "/api/appointments/8/cancel", Some(&token), None)).await;

        assert_eq!(reply.status, StatusCode::CONFLICT);
        assert_eq!(reply.json["error"]["code"], "ACTION_NOT_AVAILABLE");
        assert_eq!(state.inflight.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_time_slot_is_validated_before_loading() {
        let fake = Arc::new(FakeTransport::new());
        let (app, _) = app(&fake);
        let token = token_for("Doctor");
        let body = json!({ "timeSlot": "25:00" });

        let reply = send(&app, request(Method::PUT, "/api/appointments/8/time-slot", Some(&token), Some(body))).await;

        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_time_slot_patches_backend() {
        let fake = Arc::new(FakeTransport::new());
        fake.json(Method::GET, "/appointments/8", apt(8, "Pending"));
        fake.json(Method::PATCH, "/appointments/8/time", Value::Null);
        let (app, _) = app(&fake);
        let token = token_for("Doctor");
        let body = json!({ "timeSlot": "09:30" });

        let reply = send(&app, request(Method::PUT, "/api/appointments/8/time-slot", Some(&token), Some(body))).await;

        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(
            fake.calls_to(Method::PATCH, "/appointments/8/time")[0].body,
            Some(json!({ "timeSlot": "09:30" }))
        );
    }

    #[tokio::test]
    async fn test_health_check_only_when_confirmed() {
        let fake = Arc::new(FakeTransport::new());
        fake.json(Method::GET, "/appointments/8", apt(8, "Pending"));
        let (app, _) = app(&fake);
        let token = token_for("Doctor");
        let body = json!({
            "weight": 60.0, "bloodPressure": "120/80", "heartRate": 72,
            "temperature": 36.6, "isNormal": true
        });

        let reply = send(&app, request(Method::POST, "/api/appointments/8/health-check", Some(&token), Some(body))).await;

        assert_eq!(reply.status, StatusCode::CONFLICT);
        assert!(fake.calls_to(Method::POST, "/appointments/8/health-check").is_empty());
    }

    #[tokio::test]
    async fn test_blood_unit_uses_appointment_blood_type() {
        let fake = Arc::new(FakeTransport::new());
        fake.json(Method::GET, "/appointments/8", apt(8, "ReadyToDonate"));
        fake.json(Method::GET, "/appointments/8", apt(8, "Completed"));
        fake.json(Method::POST, "/blood-inventory/record", json!({ "id": 40 }));
        let (app, _) = app(&fake);
        let token = token_for("Doctor");

        let reply = send(
            &app,
            request(Method::POST, "/api/appointments/8/blood-unit", Some(&token), Some(json!({ "volume": 350 }))),
        )
        .await;

        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.json["data"]["status"], "Completed");
        let sent = fake.calls_to(Method::POST, "/blood-inventory/record")[0].body.clone().unwrap();
        assert_eq!(sent, json!({ "appointmentId": 8, "volume": 350, "bloodType": "O", "rhType": "+" }));
    }

    #[tokio::test]
    async fn test_register_donation() {
        let fake = Arc::new(FakeTransport::new());
        fake.json(Method::POST, "/appointments", apt(21, "Pending"));
        let (app, _) = app(&fake);
        let token = token_for("Donor");
        let date = (chrono::Utc::now().date_naive() + chrono::Duration::days(7))
            .format("%Y-%m-%d")
            .to_string();
        let body = json!({
            "name": "Nguyen Van A", "email": "a@example.com", "phone": "0912345678",
            "dob": "1990-01-01", "bloodType": "O+", "appointmentDate": date, "location": "3"
        });

        let reply = send(&app, request(Method::POST, "/api/appointments", Some(&token), Some(body))).await;

        assert_eq!(reply.status, StatusCode::CREATED);
        assert_eq!(reply.json["data"]["presentation"]["label"], "Pending Approval");
        let sent = fake.calls_to(Method::POST, "/appointments")[0].body.clone().unwrap();
        assert_eq!(sent["donationSiteId"], 3);
        assert_eq!(sent["appointmentDate"], format!("{date}T08:00:00Z"));
    }

    #[tokio::test]
    async fn test_register_rejects_underage_donor() {
        let fake = Arc::new(FakeTransport::new());
        let (app, _) = app(&fake);
        let token = token_for("Donor");
        let date = (chrono::Utc::now().date_naive() + chrono::Duration::days(7))
            .format("%Y-%m-%d")
            .to_string();
        let dob = (chrono::Utc::now().date_naive() - chrono::Duration::days(365 * 10))
            .format("%Y-%m-%d")
            .to_string();
        let body = json!({
            "name": "Kid", "phone": "0912345678", "dob": dob,
            "appointmentDate": date, "location": "3"
        });

        let reply = send(&app, request(Method::POST, "/api/appointments", Some(&token), Some(body))).await;

        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert!(fake.calls().is_empty());
    }
}
