//! Appointment and blood-unit status: lifecycle, and how each screen shows it.
//!
//! Statuses arrive from the backend as strings. Anything the portal does not
//! recognise is kept verbatim in `Unknown` so it can be rendered with the
//! neutral fallback and written back unchanged.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::Role;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    ReadyToDonate,
    Completed,
    Cancelled,
    Rejected,
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown appointment status: {0:?}")]
pub struct UnknownStatus(pub String);

impl AppointmentStatus {
    pub fn recognized() -> [AppointmentStatus; 6] {
        [
            AppointmentStatus::Pending,
            AppointmentStatus::Confirmed,
            AppointmentStatus::ReadyToDonate,
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::Rejected,
        ]
    }

    pub fn parse(raw: &str) -> Result<Self, UnknownStatus> {
        match raw {
            "Pending" => Ok(AppointmentStatus::Pending),
            "Confirmed" => Ok(AppointmentStatus::Confirmed),
            "ReadyToDonate" => Ok(AppointmentStatus::ReadyToDonate),
            "Completed" => Ok(AppointmentStatus::Completed),
            "Cancelled" => Ok(AppointmentStatus::Cancelled),
            "Rejected" => Ok(AppointmentStatus::Rejected),
            other => Err(UnknownStatus(other.to_string())),
        }
    }

    pub fn from_wire(raw: &str) -> Self {
        Self::parse(raw).unwrap_or_else(|UnknownStatus(raw)| AppointmentStatus::Unknown(raw))
    }

    pub fn as_str(&self) -> &str {
        match self {
            AppointmentStatus::Pending => "Pending",
            AppointmentStatus::Confirmed => "Confirmed",
            AppointmentStatus::ReadyToDonate => "ReadyToDonate",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Cancelled => "Cancelled",
            AppointmentStatus::Rejected => "Rejected",
            AppointmentStatus::Unknown(raw) => raw,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, AppointmentStatus::Unknown(_))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::Rejected
        )
    }

    /// Statuses the backend may move an appointment to from this one.
    pub fn next_statuses(&self) -> Vec<AppointmentStatus> {
        use AppointmentStatus::*;
        match self {
            Pending => vec![Confirmed, Rejected, Cancelled],
            Confirmed => vec![ReadyToDonate, Rejected, Cancelled],
            ReadyToDonate => vec![Completed],
            Completed | Cancelled | Rejected | Unknown(_) => vec![],
        }
    }

    pub fn can_transition_to(&self, next: &AppointmentStatus) -> bool {
        self.next_statuses().contains(next)
    }
}

impl FromStr for AppointmentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for AppointmentStatus {
    fn from(raw: String) -> Self {
        match Self::parse(&raw) {
            Ok(status) => status,
            Err(_) => AppointmentStatus::Unknown(raw),
        }
    }
}

impl From<AppointmentStatus> for String {
    fn from(status: AppointmentStatus) -> Self {
        match status {
            AppointmentStatus::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// Badge colour token. The UI maps each token to its own palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeTone {
    Neutral,
    Warning,
    Info,
    Success,
    Progress,
    Danger,
}

/// Screens that show an appointment status, each with its own wording and
/// colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    DonorHistory,
    WorkSchedule,
    AdminAppointments,
    DoctorQueue,
}

impl Screen {
    pub fn default_for(role: Role) -> Self {
        match role {
            Role::Donor => Screen::DonorHistory,
            Role::Doctor => Screen::DoctorQueue,
            Role::Admin => Screen::AdminAppointments,
        }
    }

    pub fn label(&self, status: &AppointmentStatus) -> String {
        use AppointmentStatus::*;
        let label = match (self, status) {
            (_, Unknown(raw)) if raw.trim().is_empty() => "Unknown",
            (_, Unknown(raw)) => raw.as_str(),
            (Screen::DonorHistory, Pending) => "Pending Approval",
            (Screen::DonorHistory, Confirmed) => "Confirmed - Please arrive on time",
            (Screen::DonorHistory | Screen::WorkSchedule | Screen::DoctorQueue, ReadyToDonate) => {
                "Screening Passed"
            }
            (_, known) => known.as_str(),
        };
        label.to_string()
    }

    pub fn badge(&self, status: &AppointmentStatus) -> BadgeTone {
        use AppointmentStatus::*;
        match (self, status) {
            (_, Unknown(_)) => BadgeTone::Neutral,

            (Screen::DonorHistory, Pending) => BadgeTone::Warning,
            (Screen::DonorHistory, Confirmed) => BadgeTone::Info,
            (Screen::DonorHistory, ReadyToDonate) => BadgeTone::Progress,
            (Screen::DonorHistory, Completed) => BadgeTone::Success,
            (Screen::DonorHistory, Cancelled) => BadgeTone::Neutral,
            (Screen::DonorHistory, Rejected) => BadgeTone::Danger,

            (Screen::WorkSchedule, Confirmed) => BadgeTone::Success,
            (Screen::WorkSchedule, ReadyToDonate) => BadgeTone::Progress,
            (Screen::WorkSchedule, Pending) => BadgeTone::Warning,
            (Screen::WorkSchedule, Completed | Cancelled | Rejected) => BadgeTone::Neutral,

            (Screen::AdminAppointments | Screen::DoctorQueue, Confirmed) => BadgeTone::Info,
            (Screen::AdminAppointments | Screen::DoctorQueue, Completed | ReadyToDonate) => {
                BadgeTone::Success
            }
            (Screen::AdminAppointments | Screen::DoctorQueue, Pending) => BadgeTone::Warning,
            (Screen::AdminAppointments | Screen::DoctorQueue, Cancelled | Rejected) => {
                BadgeTone::Danger
            }
        }
    }

    /// Whether the screen treats the appointment as having a fixed time.
    pub fn time_is_set(&self, status: &AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        match self {
            Screen::WorkSchedule => matches!(status, Confirmed | Completed | ReadyToDonate),
            Screen::DoctorQueue => matches!(status, Confirmed),
            Screen::DonorHistory | Screen::AdminAppointments => {
                matches!(status, Confirmed | ReadyToDonate | Completed)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentAction {
    Cancel,
    Confirm,
    Reject,
    SetTimeSlot,
    RecordHealthCheck,
    RecordBloodUnit,
}

impl AppointmentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentAction::Cancel => "cancel",
            AppointmentAction::Confirm => "confirm",
            AppointmentAction::Reject => "reject",
            AppointmentAction::SetTimeSlot => "set_time_slot",
            AppointmentAction::RecordHealthCheck => "record_health_check",
            AppointmentAction::RecordBloodUnit => "record_blood_unit",
        }
    }

    /// Status the action asks the backend for. A health check resolves to
    /// `ReadyToDonate` or `Rejected` depending on its outcome.
    pub fn target_status(&self) -> Option<AppointmentStatus> {
        match self {
            AppointmentAction::Cancel => Some(AppointmentStatus::Cancelled),
            AppointmentAction::Confirm | AppointmentAction::SetTimeSlot => {
                Some(AppointmentStatus::Confirmed)
            }
            AppointmentAction::Reject => Some(AppointmentStatus::Rejected),
            AppointmentAction::RecordHealthCheck => None,
            AppointmentAction::RecordBloodUnit => Some(AppointmentStatus::Completed),
        }
    }
}

pub fn available_actions(status: &AppointmentStatus, role: Role) -> Vec<AppointmentAction> {
    use AppointmentAction::*;
    use AppointmentStatus as S;
    match (role, status) {
        (Role::Donor, S::Pending | S::Confirmed) => vec![Cancel],
        (Role::Donor, _) => vec![],

        (Role::Doctor, S::Pending) => vec![Confirm, Reject, SetTimeSlot],
        (Role::Doctor, S::Confirmed) => vec![SetTimeSlot, RecordHealthCheck],
        (Role::Doctor, S::ReadyToDonate) => vec![RecordBloodUnit],
        (Role::Doctor, S::Completed | S::Cancelled | S::Rejected | S::Unknown(_)) => vec![],

        (Role::Admin, _) => vec![],
    }
}

pub fn action_available(status: &AppointmentStatus, role: Role, action: AppointmentAction) -> bool {
    available_actions(status, role).contains(&action)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusPresentation {
    pub status: String,
    pub label: String,
    pub badge: BadgeTone,
    pub actions: Vec<AppointmentAction>,
    pub time_is_set: bool,
    pub terminal: bool,
    pub recognized: bool,
}

pub fn present(status: &AppointmentStatus, screen: Screen, role: Role) -> StatusPresentation {
    if let AppointmentStatus::Unknown(raw) = status {
        tracing::warn!(status = %raw, ?screen, "unrecognised appointment status, using fallback badge");
    }

    StatusPresentation {
        status: status.as_str().to_string(),
        label: screen.label(status),
        badge: screen.badge(status),
        actions: available_actions(status, role),
        time_is_set: screen.time_is_set(status),
        terminal: status.is_terminal(),
        recognized: status.is_recognized(),
    }
}

/// Time offered in the set-time dialog: a fresh request starts at 08:00,
/// anything already scheduled keeps its own time.
pub fn default_time_slot(status: &AppointmentStatus, appointment_date: DateTime<Utc>) -> String {
    match status {
        AppointmentStatus::Pending => "08:00".to_string(),
        _ => appointment_date.format("%H:%M").to_string(),
    }
}

/* -------------------------
   Blood units
--------------------------*/

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BloodUnitStatus {
    Available,
    AboutToExpire,
    Expired,
    Used,
    Unknown(String),
}

impl BloodUnitStatus {
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "Available" => BloodUnitStatus::Available,
            "About to expire" => BloodUnitStatus::AboutToExpire,
            "Expired" => BloodUnitStatus::Expired,
            "Used" => BloodUnitStatus::Used,
            other => BloodUnitStatus::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            BloodUnitStatus::Available => "Available",
            BloodUnitStatus::AboutToExpire => "About to expire",
            BloodUnitStatus::Expired => "Expired",
            BloodUnitStatus::Used => "Used",
            BloodUnitStatus::Unknown(raw) => raw,
        }
    }

    pub fn badge(&self) -> BadgeTone {
        match self {
            BloodUnitStatus::Available => BadgeTone::Success,
            BloodUnitStatus::AboutToExpire => BadgeTone::Warning,
            BloodUnitStatus::Expired => BadgeTone::Danger,
            BloodUnitStatus::Used | BloodUnitStatus::Unknown(_) => BadgeTone::Neutral,
        }
    }

    pub fn is_usable(&self) -> bool {
        matches!(self, BloodUnitStatus::Available | BloodUnitStatus::AboutToExpire)
    }
}

impl From<String> for BloodUnitStatus {
    fn from(raw: String) -> Self {
        match BloodUnitStatus::from_wire(&raw) {
            BloodUnitStatus::Unknown(_) => BloodUnitStatus::Unknown(raw),
            known => known,
        }
    }
}

impl From<BloodUnitStatus> for String {
    fn from(status: BloodUnitStatus) -> Self {
        match status {
            BloodUnitStatus::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BloodUnitPresentation {
    pub status: String,
    pub label: String,
    pub badge: BadgeTone,
    pub usable: bool,
}

pub fn present_unit(status: &BloodUnitStatus) -> BloodUnitPresentation {
    let label = match status {
        BloodUnitStatus::Unknown(raw) if raw.trim().is_empty() => "Unknown".to_string(),
        other => other.as_str().to_string(),
    };
    BloodUnitPresentation {
        status: status.as_str().to_string(),
        label,
        badge: status.badge(),
        usable: status.is_usable(),
    }
}
