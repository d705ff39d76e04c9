use chrono::{DateTime, Utc};

use crate::extraction::Extraction;
use crate::webhook_models::Lead;

/// Column headers, in the order cells are written.
pub const COLUMNS: [&str; 12] = [
    "Timestamp",
    "Brokerage",
    "Name",
    "Phone",
    "Email",
    "Role",
    "Inquiry",
    "Market",
    "Deal Size",
    "Urgency",
    "Summary",
    "Raw",
];

pub type Row = [String; 12];

/// ISO-8601 instant with `T` replaced by a space and `Z` by ` UTC`,
/// e.g. `2025-03-14 09:26:53.589 UTC`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string()
}

pub fn build_row(lead: &Lead, at: DateTime<Utc>, brokerage: &str, raw: &str) -> Row {
    [
        format_timestamp(at),
        brokerage.to_string(),
        lead.name.clone(),
        lead.phone.clone(),
        lead.email.clone(),
        lead.role.clone(),
        lead.inquiry.clone(),
        lead.market.clone(),
        lead.deal_size.clone(),
        lead.urgency.clone(),
        lead.summary.clone(),
        raw.to_string(),
    ]
}

pub fn row_for(extraction: &Extraction, at: DateTime<Utc>) -> Row {
    build_row(&extraction.lead, at, &extraction.brokerage, &extraction.raw)
}
