use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use chrono::Utc;
use serde_json::Value;

use crate::{
    auth::Role,
    error::ApiError,
    middleware::session_context::SessionContext,
    models::*,
    services::InventoryService,
    session::{Session, ensure_role},
    validation::{validate_blood_unit, validate_type_name},
};

const STAFF: [Role; 2] = [Role::Admin, Role::Doctor];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/blood-inventory", post(add_unit))
        .route("/blood-inventory/{unit_id}", put(update_unit).delete(delete_unit))
        .route(
            "/blood-inventory/type/{blood_type}",
            get(units_of_type).put(rename_type).delete(delete_type),
        )
}

fn inventory_for(state: &AppState, session: &Session) -> Result<InventoryService, ApiError> {
    ensure_role(session, &STAFF)?;
    Ok(InventoryService::new(state.api.clone(), session.bearer()))
}

async fn add_unit(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
    Json(form): Json<BloodUnitForm>,
) -> Result<(StatusCode, Json<ApiOk<Value>>), ApiError> {
    let inventory = inventory_for(&state, &session)?;
    let payload = validate_blood_unit(&form, None, Utc::now().date_naive())?;
    let _slot = state
        .inflight
        .try_begin(session.fingerprint(), "add_unit", "new")?;

    let created = inventory.record(&payload).await?;
    tracing::info!(
        session = session.fingerprint(),
        blood_type = %payload.blood_type,
        rh = %payload.rh_type,
        volume = payload.volume,
        "blood unit added"
    );
    Ok((StatusCode::CREATED, Json(ApiOk { data: created })))
}

async fn update_unit(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
    Path(unit_id): Path<i64>,
    Json(form): Json<BloodUnitForm>,
) -> Result<Json<ApiOk<Value>>, ApiError> {
    let inventory = inventory_for(&state, &session)?;
    let payload = validate_blood_unit(&form, None, Utc::now().date_naive())?;
    let _slot = state
        .inflight
        .try_begin(session.fingerprint(), "update_unit", unit_id)?;

    let updated = inventory.update(unit_id, &payload).await?;
    Ok(Json(ApiOk { data: updated }))
}

async fn delete_unit(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
    Path(unit_id): Path<i64>,
) -> Result<Json<ApiOk<OkData>>, ApiError> {
    let inventory = inventory_for(&state, &session)?;
    let _slot = state
        .inflight
        .try_begin(session.fingerprint(), "delete_unit", unit_id)?;

    inventory.delete(unit_id).await?;
    tracing::info!(session = session.fingerprint(), unit_id, "blood unit deleted");
    Ok(Json(OkData::ok()))
}

async fn units_of_type(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
    Path(blood_type): Path<String>,
) -> Result<Json<ApiOk<Vec<BloodUnitView>>>, ApiError> {
    let units = inventory_for(&state, &session)?.by_type(&blood_type).await?;
    Ok(Json(ApiOk {
        data: units.into_iter().map(BloodUnitView::from).collect(),
    }))
}

async fn rename_type(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
    Path(blood_type): Path<String>,
    Json(form): Json<RenameTypeForm>,
) -> Result<Json<ApiOk<OkData>>, ApiError> {
    let inventory = inventory_for(&state, &session)?;
    let new_type = validate_type_name(&form.new_type)?;
    let _slot = state
        .inflight
        .try_begin(session.fingerprint(), "rename_type", &blood_type)?;

    inventory.rename_type(&blood_type, &new_type).await?;
    tracing::info!(from = %blood_type, to = %new_type, "blood type renamed");
    Ok(Json(OkData::ok()))
}

async fn delete_type(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
    Path(blood_type): Path<String>,
) -> Result<Json<ApiOk<OkData>>, ApiError> {
    let inventory = inventory_for(&state, &session)?;
    let _slot = state
        .inflight
        .try_begin(session.fingerprint(), "delete_type", &blood_type)?;

    inventory.delete_type(&blood_type).await?;
    tracing::info!(blood_type = %blood_type, "blood type removed");
    Ok(Json(OkData::ok()))
}
