pub mod filter;
pub mod preview;
pub mod send;
pub mod summary;
pub mod template;

use outreach_core::record::Record;

/// Shared table row for record listings.
pub fn record_row(record: &Record) -> Vec<String> {
    vec![
        record.name.clone(),
        record.email.clone(),
        record.hours_behind.to_string(),
        record.days_absent.to_string(),
        record.effective_tier().to_string(),
    ]
}

pub const RECORD_HEADERS: [&str; 5] = ["NAME", "EMAIL", "HOURS BEHIND", "DAYS ABSENT", "TIER"];
