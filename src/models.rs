use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::backend::ApiTransport;
use crate::inflight::InFlight;
use crate::notifications::NotificationFeeds;
use crate::status::{
    AppointmentStatus, BloodUnitPresentation, BloodUnitStatus, Screen, StatusPresentation, present,
    present_unit,
};

#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn ApiTransport>,
    pub inflight: InFlight,
    pub notifications: NotificationFeeds,
    pub token_cookie_max_age_secs: i64,
}

impl AppState {
    pub fn new(api: Arc<dyn ApiTransport>, token_cookie_max_age_secs: i64) -> Self {
        Self {
            api,
            inflight: InFlight::default(),
            notifications: NotificationFeeds::default(),
            token_cookie_max_age_secs,
        }
    }
}

/* -------------------------
   Response envelopes
--------------------------*/

#[derive(Debug, Serialize)]
pub struct ApiOk<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct OkData {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

impl OkData {
    pub fn ok() -> ApiOk<OkData> {
        ApiOk {
            data: OkData {
                ok: true,
                redirect_to: None,
            },
        }
    }
}

/* -------------------------
   Users & auth DTOs
--------------------------*/

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub name: Option<String>,
    pub role: Role,
    pub avatar_url: Option<String>,
    pub donor_profile: Option<DonorProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorProfile {
    pub id: i64,
    pub phone: Option<String>,
    pub blood_type: Option<String>,
    pub rh_type: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Backend login payload.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct LoginResult {
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: Option<User>,
    pub redirect_to: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpForm {
    pub name: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub agree_terms: bool,
}

/// Admin's create or edit user form. An empty password on edit keeps the
/// current one; the username cannot be changed after creation.
#[derive(Debug, Default, Deserialize)]
pub struct UserForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserPayload {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordForm {
    #[serde(default)]
    pub token: String,
    pub password: String,
    pub confirm_password: String,
}

/* -------------------------
   Appointments
--------------------------*/

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub dob: Option<String>,
    pub blood_type: Option<String>,
    pub appointment_date: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub donation_site_id: Option<i64>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub user: Option<AppointmentUser>,
}

impl Appointment {
    pub fn donor_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| self.user.as_ref().and_then(|u| u.name.as_deref()))
            .unwrap_or("Unknown")
    }

    /// Case-insensitive match on donor name, email or phone.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let email = self
            .email
            .as_deref()
            .or_else(|| self.user.as_ref().and_then(|u| u.email.as_deref()));
        [Some(self.donor_name()), email, self.phone.as_deref()]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub donor_name: String,
    pub presentation: StatusPresentation,
}

impl AppointmentView {
    pub fn new(appointment: Appointment, screen: Screen, role: Role) -> Self {
        let presentation = present(&appointment.status, screen, role);
        let donor_name = appointment.donor_name().to_string();
        Self {
            appointment,
            donor_name,
            presentation,
        }
    }
}

/// Donation registration as typed into the form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    /// YYYY-MM-DD
    #[serde(default)]
    pub dob: String,
    #[serde(default)]
    pub blood_type: String,
    /// YYYY-MM-DD
    #[serde(default)]
    pub appointment_date: String,
    /// Donation site id, as selected.
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub notes: String,
}

/// Registration payload sent to `POST /appointments`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub dob: NaiveDate,
    pub blood_type: String,
    pub appointment_date: DateTime<Utc>,
    pub location: String,
    pub donation_site_id: i64,
    pub notes: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlotForm {
    pub time_slot: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckForm {
    pub weight: Option<f64>,
    pub blood_pressure: Option<String>,
    pub heart_rate: Option<u32>,
    pub temperature: Option<f64>,
    pub is_normal: Option<bool>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckPayload {
    pub weight: f64,
    pub blood_pressure: String,
    pub heart_rate: u32,
    pub temperature: f64,
    pub is_normal: bool,
    pub notes: String,
}

/* -------------------------
   Inventory
--------------------------*/

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BloodUnit {
    pub id: i64,
    pub blood_type: String,
    pub rh_type: String,
    pub volume: u32,
    pub collection_date: String,
    pub expiry_date: String,
    pub storage_location: Option<String>,
    pub status: BloodUnitStatus,
    pub appointment_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BloodUnitView {
    #[serde(flatten)]
    pub unit: BloodUnit,
    pub presentation: BloodUnitPresentation,
}

impl From<BloodUnit> for BloodUnitView {
    fn from(unit: BloodUnit) -> Self {
        let presentation = present_unit(&unit.status);
        Self { unit, presentation }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BloodUnitForm {
    pub volume: Option<u32>,
    pub blood_type: Option<String>,
    pub rh_type: Option<String>,
    /// YYYY-MM-DD
    pub collection_date: Option<String>,
    /// YYYY-MM-DD
    pub expiry_date: Option<String>,
    pub storage_location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BloodUnitPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<i64>,
    pub volume: u32,
    pub blood_type: String,
    pub rh_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_location: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameTypeForm {
    pub new_type: String,
}

/* -------------------------
   Notifications & sites
--------------------------*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationSite {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub is_active: bool,
}

/// Option entry for the site picker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteOption {
    pub value: String,
    pub label: String,
}

impl From<&DonationSite> for SiteOption {
    fn from(site: &DonationSite) -> Self {
        Self {
            value: site.id.to_string(),
            label: format!("{} - {}", site.name, site.address),
        }
    }
}
