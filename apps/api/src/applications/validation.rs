use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::application::{
    ApplicationFields, ApplicationForm, ApplicationRecord, ApplicationStatus, DEFAULT_PROCESS,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub(crate) fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Trims a text value and collapses blank input to `None`.
fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (date part kept).
fn parse_applied_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// Validates a form submission.
///
/// `company` and `position` must be present. `process`, `appliedDate` and
/// `status` fall back to `Resume`, `today` and `Applied` when omitted, but a
/// value that is present and unparseable is an error. Every failure is
/// collected so the caller can show them all at once.
pub fn validate_application(
    form: ApplicationForm,
    today: NaiveDate,
) -> Result<ApplicationFields, Vec<FieldError>> {
    let mut errors = Vec::new();

    let company = clean(form.company);
    if company.is_none() {
        errors.push(FieldError::new("company", "Company is required"));
    }

    let position = clean(form.position);
    if position.is_none() {
        errors.push(FieldError::new("position", "Position is required"));
    }

    let applied_date = match clean(form.applied_date) {
        None => Some(today),
        Some(raw) => {
            let parsed = parse_applied_date(&raw);
            if parsed.is_none() {
                errors.push(FieldError::new(
                    "appliedDate",
                    "Applied date must be a valid date (YYYY-MM-DD)",
                ));
            }
            parsed
        }
    };

    let status = match clean(form.status) {
        None => Some(ApplicationStatus::default()),
        Some(raw) => match raw.parse::<ApplicationStatus>() {
            Ok(status) => Some(status),
            Err(_) => {
                let allowed: Vec<&str> = ApplicationStatus::ALL.iter().map(|s| s.as_str()).collect();
                errors.push(FieldError::new(
                    "status",
                    format!("Status must be one of: {}", allowed.join(", ")),
                ));
                None
            }
        },
    };

    match (company, position, applied_date, status) {
        (Some(company), Some(position), Some(applied_date), Some(status)) if errors.is_empty() => {
            Ok(ApplicationFields {
                company,
                position,
                location: clean(form.location),
                industry: clean(form.industry),
                poc: clean(form.poc),
                agent: clean(form.agent),
                process: clean(form.process).unwrap_or_else(|| DEFAULT_PROCESS.to_string()),
                applied_date,
                status,
                notes: clean(form.notes),
            })
        }
        _ => Err(errors),
    }
}

/// Fills every field the form leaves out with the stored value, so an update
/// never picks up the create defaults. A field sent as blank text still
/// clears optional values and fails for required ones.
pub fn merge_with_existing(form: ApplicationForm, existing: &ApplicationRecord) -> ApplicationForm {
    let keep = |sent: Option<String>, stored: &Option<String>| sent.or_else(|| stored.clone());

    ApplicationForm {
        company: form.company.or_else(|| Some(existing.company.clone())),
        position: form.position.or_else(|| Some(existing.position.clone())),
        location: keep(form.location, &existing.location),
        industry: keep(form.industry, &existing.industry),
        poc: keep(form.poc, &existing.poc),
        agent: keep(form.agent, &existing.agent),
        process: form.process.or_else(|| Some(existing.process.clone())),
        applied_date: form
            .applied_date
            .or_else(|| Some(existing.applied_date.format("%Y-%m-%d").to_string())),
        status: form
            .status
            .or_else(|| Some(existing.status.as_str().to_string())),
        notes: keep(form.notes, &existing.notes),
    }
}
