//! Dashboard view over stored applications: search, status filter, sort,
//! pagination and per-status counts.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::models::application::{ApplicationRecord, ApplicationStatus};

pub const DEFAULT_PER_PAGE: usize = 10;
pub const MAX_PER_PAGE: usize = 100;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    AppliedDate,
    #[default]
    CreatedAt,
    Company,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub sort: SortKey,
    #[serde(default)]
    pub order: SortOrder,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct StatusStats {
    pub total: usize,
    pub applied: usize,
    pub in_progress: usize,
    pub rejected: usize,
    pub offer: usize,
    pub accepted: usize,
}

impl StatusStats {
    pub fn from_records(records: &[ApplicationRecord]) -> Self {
        let mut stats = StatusStats {
            total: records.len(),
            ..Default::default()
        };
        for record in records {
            let slot = match record.status {
                ApplicationStatus::Applied => &mut stats.applied,
                ApplicationStatus::InProgress => &mut stats.in_progress,
                ApplicationStatus::Rejected => &mut stats.rejected,
                ApplicationStatus::Offer => &mut stats.offer,
                ApplicationStatus::Accepted => &mut stats.accepted,
            };
            *slot += 1;
        }
        stats
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardPage {
    pub applications: Vec<ApplicationRecord>,
    /// Number of records after filtering, before pagination.
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
    /// Counts over every stored record, independent of the filter.
    pub stats: StatusStats,
}

/// Case-insensitive substring match against company, position, location and
/// industry. A blank needle matches everything.
pub fn matches_search(record: &ApplicationRecord, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }

    [
        Some(record.company.as_str()),
        Some(record.position.as_str()),
        record.location.as_deref(),
        record.industry.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(&needle))
}

fn matches_status(record: &ApplicationRecord, status: &str) -> bool {
    let status = status.trim();
    status.is_empty() || record.status.as_str().eq_ignore_ascii_case(status)
}

fn compare(a: &ApplicationRecord, b: &ApplicationRecord, key: SortKey) -> Ordering {
    let primary = match key {
        SortKey::AppliedDate => a.applied_date.cmp(&b.applied_date),
        SortKey::CreatedAt => Ordering::Equal,
        SortKey::Company => a.company.to_lowercase().cmp(&b.company.to_lowercase()),
    };
    primary
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Filters, sorts and paginates `records`.
///
/// Ties on the sort key fall back to `createdAt` then `id`, so the ordering
/// is total and `desc` is exactly the reverse of `asc`.
pub fn build_dashboard(records: Vec<ApplicationRecord>, query: &DashboardQuery) -> DashboardPage {
    let stats = StatusStats::from_records(&records);

    let search = query.search.as_deref().unwrap_or_default();
    let status = query.status.as_deref().unwrap_or_default();

    let mut filtered: Vec<ApplicationRecord> = records
        .into_iter()
        .filter(|r| matches_search(r, search) && matches_status(r, status))
        .collect();

    filtered.sort_by(|a, b| {
        let ord = compare(a, b, query.sort);
        match query.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });

    let per_page = query
        .per_page
        .unwrap_or(DEFAULT_PER_PAGE)
        .clamp(1, MAX_PER_PAGE);
    let page = query.page.unwrap_or(1).max(1);
    let total = filtered.len();
    let total_pages = total.div_ceil(per_page);

    let applications = filtered
        .into_iter()
        .skip((page - 1).saturating_mul(per_page))
        .take(per_page)
        .collect();

    DashboardPage {
        applications,
        total,
        page,
        per_page,
        total_pages,
        stats,
    }
}
