//! Screens. Each returns the data its page renders; role redirects already
//! happened in the navigation gate in front of this router.

use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::Uri,
    routing::get,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    auth::Role,
    error::ApiError,
    middleware::session_context::{MaybeSession, SessionContext},
    models::*,
    services::{AppointmentService, AuthService, InventoryService, LocationService, ReportService},
    session::Session,
    status::{AppointmentStatus, Screen, default_time_slot},
    validation::{month_range, validate_schedule_range},
};

use super::user_routes::users_for;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/signin", get(sign_in_screen))
        .route("/signup", get(public_screen))
        .route("/forgot-password", get(public_screen))
        .route("/reset-password", get(reset_password_screen))
        .route("/history", get(history))
        .route("/history/{appointment_id}", get(history_detail))
        .route("/donation", get(donation_screen))
        .route("/appointments", get(open_appointments))
        .route("/register-confirmation", get(pending_queue))
        .route("/health-check", get(health_check_queue))
        .route("/record-donation", get(record_donation_queue))
        .route("/work-schedule", get(work_schedule))
        .route("/admin-appointment", get(admin_appointments))
        .route("/admin-blood-inventory", get(blood_inventory))
        .route("/admin-report", get(report))
        .route("/adminDashboard", get(report))
        .route("/admin-user-management", get(user_management))
        .fallback(unknown_screen)
}

type Screenful<T> = Result<Json<ApiOk<T>>, ApiError>;

/// Reached only after the gate let the path through.
async fn unknown_screen(uri: Uri) -> ApiError {
    ApiError::NotFound("SCREEN_NOT_FOUND", format!("No screen at {}", uri.path()))
}

fn screen<T>(data: T) -> Screenful<T> {
    Ok(Json(ApiOk { data }))
}

fn appointments_for(state: &AppState, session: &Session) -> AppointmentService {
    AppointmentService::new(state.api.clone(), session.bearer())
}

fn views(appointments: Vec<Appointment>, screen: Screen, role: Role) -> Vec<AppointmentView> {
    appointments
        .into_iter()
        .map(|apt| AppointmentView::new(apt, screen, role))
        .collect()
}

/* ============================================================
   Public & home
   ============================================================ */

#[derive(Debug, Serialize)]
pub struct HomeScreen {
    pub signed_in: bool,
    pub role: Option<Role>,
    pub user: Option<User>,
}

async fn home(State(state): State<AppState>, MaybeSession(session): MaybeSession) -> Screenful<HomeScreen> {
    let Some(session) = session else {
        return screen(HomeScreen {
            signed_in: false,
            role: None,
            user: None,
        });
    };
    let user = AuthService::new(state.api.clone(), session.bearer())
        .profile()
        .await?;
    screen(HomeScreen {
        signed_in: true,
        role: Some(session.role()),
        user: Some(user),
    })
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PublicScreen {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

async fn sign_in_screen(Query(q): Query<PublicScreen>) -> Screenful<PublicScreen> {
    screen(PublicScreen {
        from: q.from.filter(|from| from.starts_with('/')),
        token: None,
    })
}

async fn public_screen() -> Screenful<PublicScreen> {
    screen(PublicScreen::default())
}

async fn reset_password_screen(Query(q): Query<PublicScreen>) -> Screenful<PublicScreen> {
    screen(PublicScreen {
        from: None,
        token: q.token,
    })
}

/* ============================================================
   Donor screens
   ============================================================ */

async fn history(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
) -> Screenful<Vec<AppointmentView>> {
    let mut items = appointments_for(&state, &session).my_history().await?;
    items.sort_by(|a, b| b.appointment_date.cmp(&a.appointment_date));
    screen(views(items, Screen::DonorHistory, session.role()))
}

async fn history_detail(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
    Path(appointment_id): Path<i64>,
) -> Screenful<AppointmentView> {
    let apt = appointments_for(&state, &session).get(appointment_id).await?;
    screen(AppointmentView::new(apt, Screen::DonorHistory, session.role()))
}

async fn open_appointments(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
) -> Screenful<Vec<AppointmentView>> {
    let mut items: Vec<Appointment> = appointments_for(&state, &session)
        .my_history()
        .await?
        .into_iter()
        .filter(|apt| {
            matches!(
                apt.status,
                AppointmentStatus::Pending | AppointmentStatus::Confirmed
            )
        })
        .collect();
    items.sort_by_key(|apt| apt.appointment_date);
    screen(views(items, Screen::DonorHistory, session.role()))
}

#[derive(Debug, Serialize)]
pub struct DonationScreen {
    pub sites: Vec<SiteOption>,
    pub prefill: DonationForm,
}

fn prefill_from(user: &User) -> DonationForm {
    let profile = user.donor_profile.as_ref();
    let blood_type = profile
        .and_then(|p| {
            let group = p.blood_type.as_deref()?;
            Some(format!("{group}{}", p.rh_type.as_deref().unwrap_or("")))
        })
        .unwrap_or_default();
    DonationForm {
        name: user.name.clone().unwrap_or_default(),
        email: user.username.clone(),
        phone: profile.and_then(|p| p.phone.clone()).unwrap_or_default(),
        dob: profile
            .and_then(|p| p.date_of_birth.as_deref())
            .map(|d| d.split('T').next().unwrap_or(d).to_string())
            .unwrap_or_default(),
        blood_type,
        ..DonationForm::default()
    }
}

async fn donation_screen(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
) -> Screenful<DonationScreen> {
    let sites = LocationService::new(state.api.clone(), session.bearer())
        .active_sites()
        .await?;
    let user = AuthService::new(state.api.clone(), session.bearer())
        .profile()
        .await?;
    screen(DonationScreen {
        sites: sites.iter().map(SiteOption::from).collect(),
        prefill: prefill_from(&user),
    })
}

/* ============================================================
   Doctor queues & schedule
   ============================================================ */

async fn queue(
    state: &AppState,
    session: &Session,
    status: AppointmentStatus,
) -> Screenful<Vec<AppointmentView>> {
    let service = appointments_for(state, session);
    let mut items = match status {
        AppointmentStatus::Pending => service.pending().await?,
        other => service.by_status(&other).await?,
    };
    items.sort_by_key(|apt| apt.appointment_date);
    screen(views(items, Screen::DoctorQueue, session.role()))
}

async fn pending_queue(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
) -> Screenful<Vec<AppointmentView>> {
    queue(&state, &session, AppointmentStatus::Pending).await
}

async fn health_check_queue(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
) -> Screenful<Vec<AppointmentView>> {
    queue(&state, &session, AppointmentStatus::Confirmed).await
}

async fn record_donation_queue(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
) -> Screenful<Vec<AppointmentView>> {
    queue(&state, &session, AppointmentStatus::ReadyToDonate).await
}

#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    /// YYYY-MM; the current month when absent.
    pub month: Option<String>,
    /// Explicit YYYY-MM-DD bounds, both or neither. Takes precedence over `month`.
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScheduleItem {
    #[serde(flatten)]
    pub view: AppointmentView,
    pub time_slot: String,
}

#[derive(Debug, Serialize)]
pub struct ScheduleScreen {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub items: Vec<ScheduleItem>,
}

async fn work_schedule(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
    Query(q): Query<ScheduleQuery>,
) -> Screenful<ScheduleScreen> {
    let (start, end) = match (q.start.as_deref(), q.end.as_deref()) {
        (Some(start), Some(end)) => validate_schedule_range(start, end)?,
        (None, None) => {
            let month = q
                .month
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| Utc::now().format("%Y-%m").to_string());
            month_range(&month)?
        }
        _ => return Err(ApiError::invalid("start and end must be given together")),
    };

    let mut appointments = appointments_for(&state, &session).range(start, end).await?;
    appointments.sort_by_key(|apt| apt.appointment_date);
    let items = appointments
        .into_iter()
        .map(|apt| {
            let time_slot = default_time_slot(&apt.status, apt.appointment_date);
            ScheduleItem {
                view: AppointmentView::new(apt, Screen::WorkSchedule, session.role()),
                time_slot,
            }
        })
        .collect();
    screen(ScheduleScreen { start, end, items })
}

/* ============================================================
   Admin screens
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct AdminAppointmentQuery {
    pub status: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdminAppointmentScreen {
    pub total: usize,
    pub counts: BTreeMap<String, usize>,
    pub items: Vec<AppointmentView>,
}

async fn admin_appointments(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
    Query(query): Query<AdminAppointmentQuery>,
) -> Screenful<AdminAppointmentScreen> {
    let mut all = appointments_for(&state, &session).all().await?;
    all.sort_by(|a, b| b.appointment_date.cmp(&a.appointment_date));

    let mut counts: BTreeMap<String, usize> = AppointmentStatus::recognized()
        .iter()
        .map(|status| (status.as_str().to_string(), 0))
        .collect();
    for apt in &all {
        *counts.entry(apt.status.as_str().to_string()).or_insert(0) += 1;
    }
    let total = all.len();

    let status = query
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("all"))
        .map(AppointmentStatus::from_wire);
    let needle = query.q.unwrap_or_default();
    let filtered = all
        .into_iter()
        .filter(|apt| status.as_ref().is_none_or(|s| &apt.status == s))
        .filter(|apt| apt.matches_search(&needle))
        .collect();

    screen(AdminAppointmentScreen {
        total,
        counts,
        items: views(filtered, Screen::AdminAppointments, session.role()),
    })
}

#[derive(Debug, Deserialize)]
pub struct InventoryQuery {
    #[serde(rename = "type")]
    pub blood_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InventoryScreen {
    pub summary: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<Vec<BloodUnitView>>,
}

/// Keeps summary rows whose type contains `needle`, case-insensitively.
fn filter_summary(summary: Value, needle: &str) -> Value {
    let needle = needle.to_lowercase();
    match summary {
        Value::Array(rows) => Value::Array(
            rows.into_iter()
                .filter(|row| {
                    ["type", "bloodType"]
                        .iter()
                        .filter_map(|key| row.get(key).and_then(Value::as_str))
                        .any(|t| t.to_lowercase().contains(&needle))
                })
                .collect(),
        ),
        other => other,
    }
}

async fn blood_inventory(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
    Query(q): Query<InventoryQuery>,
) -> Screenful<InventoryScreen> {
    let inventory = InventoryService::new(state.api.clone(), session.bearer());
    let summary = inventory.summary().await?;

    let Some(blood_type) = q.blood_type.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) else {
        return screen(InventoryScreen {
            summary,
            units: None,
        });
    };
    let units = inventory.by_type(&blood_type).await?;
    screen(InventoryScreen {
        summary: filter_summary(summary, &blood_type),
        units: Some(units.into_iter().map(BloodUnitView::from).collect()),
    })
}

async fn report(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
) -> Screenful<Value> {
    let dashboard = ReportService::new(state.api.clone(), session.bearer())
        .dashboard()
        .await?;
    screen(dashboard)
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserManagementScreen {
    pub total: usize,
    pub users: Vec<User>,
}

fn user_matches(user: &User, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    needle.is_empty()
        || [
            user.name.as_deref().unwrap_or(""),
            user.username.as_str(),
            user.role.as_str(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

async fn user_management(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
    Query(query): Query<UserQuery>,
) -> Screenful<UserManagementScreen> {
    let all = users_for(&state, &session)?.list().await?;
    let total = all.len();
    let needle = query.q.unwrap_or_default();
    screen(UserManagementScreen {
        total,
        users: all.into_iter().filter(|u| user_matches(u, &needle)).collect(),
    })
}
