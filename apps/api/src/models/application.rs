use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

/// Pipeline stage assigned when the form leaves `process` blank.
pub const DEFAULT_PROCESS: &str = "Resume";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum ApplicationStatus {
    #[default]
    Applied,
    #[serde(rename = "In Progress", alias = "in_progress")]
    InProgress,
    Rejected,
    Offer,
    Accepted,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 5] = [
        ApplicationStatus::Applied,
        ApplicationStatus::InProgress,
        ApplicationStatus::Rejected,
        ApplicationStatus::Offer,
        ApplicationStatus::Accepted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "Applied",
            ApplicationStatus::InProgress => "In Progress",
            ApplicationStatus::Rejected => "Rejected",
            ApplicationStatus::Offer => "Offer",
            ApplicationStatus::Accepted => "Accepted",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown application status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for ApplicationStatus {
    type Err = UnknownStatus;

    /// Case-insensitive; accepts "In Progress", "in_progress" and "in-progress".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "applied" => Ok(ApplicationStatus::Applied),
            "inprogress" => Ok(ApplicationStatus::InProgress),
            "rejected" => Ok(ApplicationStatus::Rejected),
            "offer" => Ok(ApplicationStatus::Offer),
            "accepted" => Ok(ApplicationStatus::Accepted),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// One tracked job application, as stored in `jobs` (SQLite) or
/// `tracks_applicationrecord` (Supabase).
///
/// The storage column for `position` is `role`; both names are accepted when
/// reading rows back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
    pub id: Uuid,
    pub company: String,
    #[serde(alias = "role")]
    pub position: String,
    pub location: Option<String>,
    pub industry: Option<String>,
    pub poc: Option<String>,
    pub agent: Option<String>,
    pub process: String,
    pub applied_date: NaiveDate,
    pub status: ApplicationStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Raw form submission. Every field is optional here so that validation can
/// report all missing fields at once instead of failing on the first.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationForm {
    pub company: Option<String>,
    #[serde(alias = "role")]
    pub position: Option<String>,
    pub location: Option<String>,
    pub industry: Option<String>,
    pub poc: Option<String>,
    pub agent: Option<String>,
    pub process: Option<String>,
    #[serde(alias = "applied_date")]
    pub applied_date: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// Validated, trimmed field values. Everything a record holds except the
/// server-assigned `id` and `createdAt`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationFields {
    pub company: String,
    pub position: String,
    pub location: Option<String>,
    pub industry: Option<String>,
    pub poc: Option<String>,
    pub agent: Option<String>,
    pub process: String,
    pub applied_date: NaiveDate,
    pub status: ApplicationStatus,
    pub notes: Option<String>,
}

impl ApplicationFields {
    /// Column/value map using the storage column names.
    pub fn to_row(&self) -> Value {
        json!({
            "role": self.position,
            "company": self.company,
            "location": self.location,
            "industry": self.industry,
            "poc": self.poc,
            "agent": self.agent,
            "process": self.process,
            "appliedDate": self.applied_date.format("%Y-%m-%d").to_string(),
            "status": self.status.as_str(),
            "notes": self.notes,
        })
    }

    pub fn into_record(self, id: Uuid, created_at: DateTime<Utc>) -> ApplicationRecord {
        ApplicationRecord {
            id,
            company: self.company,
            position: self.position,
            location: self.location,
            industry: self.industry,
            poc: self.poc,
            agent: self.agent,
            process: self.process,
            applied_date: self.applied_date,
            status: self.status,
            notes: self.notes,
            created_at,
        }
    }
}
