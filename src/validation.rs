//! Form checks run before anything is sent to the backend. They catch what
//! the user can fix on the spot; the backend still has the final word.

use std::sync::LazyLock;

use chrono::{Datelike, Months, NaiveDate, NaiveTime};
use regex::Regex;
use thiserror::Error;

use crate::auth::Role;
use crate::error::ApiError;
use crate::models::{
    BloodUnitForm, BloodUnitPayload, DonationForm, HealthCheckForm, HealthCheckPayload,
    NewAppointment, ResetPasswordForm, SignUpForm, UserForm, UserPayload,
};

pub const MIN_DONOR_AGE: i32 = 18;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const DEFAULT_UNIT_VOLUME_ML: u32 = 250;
pub const MAX_UNIT_VOLUME_ML: u32 = 1000;

const BLOOD_GROUPS: [&str; 4] = ["A", "B", "AB", "O"];

/// Vietnamese mobile numbers, optional leading zero.
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(0?)(3[2-9]|5[689]|7[06-9]|8[0-689]|9[0-46-9])[0-9]{7}$")
        .unwrap_or_else(|e| panic!("phone pattern does not compile: {e}"))
});

static BLOOD_PRESSURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{2,3})\s*/\s*(\d{2,3})$")
        .unwrap_or_else(|e| panic!("blood pressure pattern does not compile: {e}"))
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::invalid(err.message)
    }
}

type Checked<T> = Result<T, ValidationError>;

fn required<'a>(value: &'a str, field: &'static str, message: &str) -> Checked<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        Err(ValidationError::new(field, message))
    } else {
        Ok(value)
    }
}

pub fn parse_date(raw: &str, field: &'static str) -> Checked<NaiveDate> {
    // Date pickers sometimes hand over a full ISO timestamp.
    let day = raw.trim().split('T').next().unwrap_or_default();
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|_| ValidationError::new(field, format!("{field} must be a date (YYYY-MM-DD)")))
}

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

/// Whole years between `dob` and `on`.
pub fn age_on(dob: NaiveDate, on: NaiveDate) -> i32 {
    let mut years = on.year() - dob.year();
    if (on.month(), on.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    years
}

/// Splits "O+" into ("O", Some("+")); a bare group has no Rh part.
fn split_blood_type(raw: &str) -> (String, Option<String>) {
    let raw = raw.trim().to_uppercase();
    match raw.strip_suffix('+').or_else(|| raw.strip_suffix('-')) {
        Some(group) => {
            let rh = raw[group.len()..].to_string();
            (group.trim().to_string(), Some(rh))
        }
        None => (raw, None),
    }
}

fn check_blood_group(group: &str) -> Checked<()> {
    if BLOOD_GROUPS.contains(&group) {
        Ok(())
    } else {
        Err(ValidationError::new("bloodType", "Blood type must be A, B, AB or O."))
    }
}

fn check_rh(rh: &str) -> Checked<()> {
    if rh == "+" || rh == "-" {
        Ok(())
    } else {
        Err(ValidationError::new("rhType", "Rh type must be + or -."))
    }
}

pub fn validate_donation(form: &DonationForm, today: NaiveDate) -> Checked<NewAppointment> {
    let date = required(&form.appointment_date, "appointmentDate", "Please select an appointment date.")?;
    let date = parse_date(date, "appointmentDate")?;
    if date < today {
        return Err(ValidationError::new(
            "appointmentDate",
            "Appointment date cannot be in the past.",
        ));
    }

    let location = required(&form.location, "location", "Please select a donation location.")?;
    let donation_site_id: i64 = location
        .parse()
        .map_err(|_| ValidationError::new("location", "Please select a donation location."))?;

    let phone: String = form.phone.chars().filter(|c| !c.is_whitespace()).collect();
    let phone = required(&phone, "phone", "Please enter your phone number.")?.to_string();
    if !is_valid_phone(&phone) {
        return Err(ValidationError::new(
            "phone",
            "Invalid phone number format. Please check again.",
        ));
    }

    let dob = required(&form.dob, "dob", "Please enter your date of birth.")?;
    let dob = parse_date(dob, "dob")?;
    if age_on(dob, date) < MIN_DONOR_AGE {
        return Err(ValidationError::new(
            "dob",
            format!("You must be at least {MIN_DONOR_AGE} years old to donate blood."),
        ));
    }

    let name = required(&form.name, "name", "Please enter your full name.")?.to_string();

    let blood_type = if form.blood_type.trim().is_empty() {
        "A+".to_string()
    } else {
        let (group, rh) = split_blood_type(&form.blood_type);
        check_blood_group(&group)?;
        let rh = rh.unwrap_or_else(|| "+".to_string());
        format!("{group}{rh}")
    };

    // The backend expects the slot at the start of the donation day.
    let appointment_date = date
        .and_time(NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default())
        .and_utc();

    Ok(NewAppointment {
        name,
        email: form.email.trim().to_string(),
        phone,
        dob,
        blood_type,
        appointment_date,
        location: location.to_string(),
        donation_site_id,
        notes: form.notes.trim().to_string(),
    })
}

pub fn validate_sign_in(username: &str, password: &str) -> Checked<()> {
    if username.trim().is_empty() || password.is_empty() {
        return Err(ValidationError::new(
            "username",
            "Please enter username and password.",
        ));
    }
    Ok(())
}

pub fn validate_sign_up(form: &SignUpForm) -> Checked<()> {
    if !form.agree_terms {
        return Err(ValidationError::new(
            "agreeTerms",
            "You must agree to the Terms and Privacy Policy.",
        ));
    }
    required(&form.name, "name", "Please enter your name.")?;
    required(&form.username, "username", "Please enter a username.")?;
    check_password(&form.password)
}

fn check_password(password: &str) -> Checked<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::new(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters."),
        ));
    }
    Ok(())
}

/// Admin user form. Creating needs a username and a password; editing sends
/// the password only when one was typed.
pub fn validate_user_form(form: &UserForm, creating: bool) -> Checked<UserPayload> {
    let username = if creating {
        Some(required(&form.username, "username", "Please enter a username.")?.to_string())
    } else {
        None
    };
    let password = match form.password.as_str() {
        "" if !creating => None,
        password => {
            check_password(password)?;
            Some(password.to_string())
        }
    };
    Ok(UserPayload {
        name: form.name.trim().to_string(),
        username,
        role: form.role.unwrap_or(Role::Donor),
        password,
    })
}

pub fn validate_forgot_password(email: &str) -> Checked<()> {
    let email = required(email, "email", "Please enter your email address.")?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ValidationError::new("email", "Please enter a valid email address.")),
    }
}

pub fn validate_reset_password(form: &ResetPasswordForm) -> Checked<()> {
    if form.password != form.confirm_password {
        return Err(ValidationError::new("confirmPassword", "Confirm password not match!"));
    }
    if form.token.trim().is_empty() {
        return Err(ValidationError::new("token", "Invalid token or link problem."));
    }
    check_password(&form.password)
}

/// `HH:MM`, 24-hour. Returns the normalised form.
pub fn parse_time_slot(raw: &str) -> Checked<String> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| ValidationError::new("timeSlot", "Time slot must be HH:MM (24-hour)."))
}

pub fn validate_health_check(form: &HealthCheckForm) -> Checked<HealthCheckPayload> {
    let Some(is_normal) = form.is_normal else {
        return Err(ValidationError::new(
            "isNormal",
            "Please choose APPROVED or NOT APPROVED.",
        ));
    };

    let weight = form.weight.filter(|w| w.is_finite() && *w > 0.0 && *w <= 300.0).ok_or_else(|| {
        ValidationError::new("weight", "Weight must be a positive number of kilograms.")
    })?;

    let temperature = form
        .temperature
        .filter(|t| (34.0..=42.0).contains(t))
        .ok_or_else(|| ValidationError::new("temperature", "Temperature must be between 34 and 42 °C."))?;

    let heart_rate = form
        .heart_rate
        .filter(|hr| (30..=220).contains(hr))
        .ok_or_else(|| ValidationError::new("heartRate", "Heart rate must be between 30 and 220 bpm."))?;

    let bp_raw = form.blood_pressure.as_deref().unwrap_or_default().trim();
    let bp_error = || ValidationError::new("bloodPressure", "Blood pressure must look like 120/80.");
    let caps = BLOOD_PRESSURE_RE.captures(bp_raw).ok_or_else(bp_error)?;
    let systolic: u32 = caps[1].parse().map_err(|_| bp_error())?;
    let diastolic: u32 = caps[2].parse().map_err(|_| bp_error())?;
    if systolic <= diastolic {
        return Err(bp_error());
    }

    Ok(HealthCheckPayload {
        weight,
        blood_pressure: format!("{systolic}/{diastolic}"),
        heart_rate,
        temperature,
        is_normal,
        notes: form.notes.trim().to_string(),
    })
}

/// Blood unit from a completed donation (`appointment_id` set) or entered
/// by hand into the inventory.
pub fn validate_blood_unit(
    form: &BloodUnitForm,
    appointment_id: Option<i64>,
    today: NaiveDate,
) -> Checked<BloodUnitPayload> {
    let volume = form.volume.unwrap_or(DEFAULT_UNIT_VOLUME_ML);
    if volume == 0 || volume > MAX_UNIT_VOLUME_ML {
        return Err(ValidationError::new(
            "volume",
            format!("Volume must be between 1 and {MAX_UNIT_VOLUME_ML} mL."),
        ));
    }

    let raw_type = form.blood_type.as_deref().unwrap_or_default();
    let raw_type = required(raw_type, "bloodType", "Please choose a blood type.")?;
    let (blood_type, rh_from_type) = split_blood_type(raw_type);
    check_blood_group(&blood_type)?;

    let rh_type = form
        .rh_type
        .as_deref()
        .map(str::trim)
        .filter(|rh| !rh.is_empty())
        .map(str::to_string)
        .or(rh_from_type)
        .unwrap_or_else(|| "+".to_string());
    check_rh(&rh_type)?;

    if appointment_id.is_some() {
        return Ok(BloodUnitPayload {
            appointment_id,
            volume,
            blood_type,
            rh_type,
            collection_date: None,
            expiry_date: None,
            storage_location: form
                .storage_location
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        });
    }

    let storage_location = required(
        form.storage_location.as_deref().unwrap_or_default(),
        "storageLocation",
        "Please enter a storage location.",
    )?
    .to_string();

    let collection_date = match form.collection_date.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => parse_date(raw, "collectionDate")?,
        _ => today,
    };
    let expiry_raw = required(
        form.expiry_date.as_deref().unwrap_or_default(),
        "expiryDate",
        "Please enter an expiry date.",
    )?;
    let expiry_date = parse_date(expiry_raw, "expiryDate")?;
    if expiry_date <= collection_date {
        return Err(ValidationError::new(
            "expiryDate",
            "Expiry date must be after the collection date.",
        ));
    }

    Ok(BloodUnitPayload {
        appointment_id: None,
        volume,
        blood_type,
        rh_type,
        collection_date: Some(collection_date),
        expiry_date: Some(expiry_date),
        storage_location: Some(storage_location),
    })
}

pub fn validate_type_name(new_type: &str) -> Checked<String> {
    let name = required(new_type, "newType", "Please enter the new blood type name.")?;
    Ok(name.to_string())
}

pub fn validate_schedule_range(start: &str, end: &str) -> Checked<(NaiveDate, NaiveDate)> {
    let start = parse_date(start, "start")?;
    let end = parse_date(end, "end")?;
    if start > end {
        return Err(ValidationError::new("end", "The range must end on or after its start."));
    }
    Ok((start, end))
}

/// First and last day of a `YYYY-MM` month.
pub fn month_range(month: &str) -> Checked<(NaiveDate, NaiveDate)> {
    let month_error = || ValidationError::new("month", "month must be YYYY-MM");
    let first = NaiveDate::parse_from_str(&format!("{}-01", month.trim()), "%Y-%m-%d")
        .map_err(|_| month_error())?;
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(month_error)?;
    Ok((first, last))
}
