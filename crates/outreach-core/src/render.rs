use crate::record::Record;
use chrono::{Days, Local, NaiveDate};

/// Substitute `{placeholder}` tokens in `text` from `record`, using the
/// current date for the derived date fields.
pub fn render(text: &str, record: &Record) -> String {
    render_at(text, record, Local::now().date_naive())
}

/// Like [`render`] but with an explicit "today", so derived dates are
/// deterministic under test.
///
/// Single left-to-right pass: each token is replaced at most once and the
/// output is never re-scanned, so substituted values cannot introduce new
/// placeholders. Tokens that resolve to nothing are left verbatim — template
/// authors see unresolved tokens immediately.
pub fn render_at(text: &str, record: &Record, today: NaiveDate) -> String {
    if text.is_empty() {
        return String::new();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find(['{', '}']) {
            Some(end) if after.as_bytes()[end] == b'}' => {
                let token = &after[..end];
                match resolve(token, record, today) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('{');
                        out.push_str(token);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            // Bare or nested '{': emit it and keep scanning.
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

// ---------------------------------------------------------------------------
// Resolution layers
// ---------------------------------------------------------------------------

/// Computed and fallback names take precedence over direct field lookup,
/// mirroring how the replacement set is layered: a record column named
/// `power_hour_date` cannot shadow the derived date.
fn resolve(token: &str, record: &Record, today: NaiveDate) -> Option<String> {
    match token {
        "power_hour_date" => Some(derived_date(today, 5)),
        "deadline_date" => Some(derived_date(today, 7)),
        "first_name" => Some(first_name(record)),
        "name" => Some(display_name(record)),
        "email" => Some(email(record)),
        "manager_name" => Some(fallback(
            record,
            &["manager_name", "Manager", "manager"],
            "your manager",
        )),
        "manager_email" => Some(fallback(
            record,
            &["manager_email", "manager_email_address"],
            "",
        )),
        "hours_behind" | "off_the_job" => Some(hours_value(record).to_string()),
        "days_absent" | "last_attended" => Some(days_value(record).to_string()),
        "hours_plural" => Some(plural(hours_value(record), "hour", "hours")),
        "days_plural" => Some(plural(days_value(record), "day", "days")),
        _ => record.field(token),
    }
}

fn derived_date(today: NaiveDate, days_ahead: u64) -> String {
    let date = today
        .checked_add_days(Days::new(days_ahead))
        .unwrap_or(today);
    date.format("%A, %B %d, %Y").to_string()
}

fn fallback(record: &Record, keys: &[&str], default: &str) -> String {
    for key in keys {
        if let Some(value) = record.field(key) {
            if !value.is_empty() {
                return value;
            }
        }
    }
    default.to_string()
}

fn email(record: &Record) -> String {
    fallback(record, &["email", "Email", "email_address"], "")
}

fn full_name(record: &Record) -> Option<String> {
    let name = fallback(record, &["name", "Name", "apprentice_name"], "");
    (!name.is_empty()).then_some(name)
}

fn first_name(record: &Record) -> String {
    if let Some(explicit) = record.field("first_name") {
        if !explicit.trim().is_empty() {
            return explicit;
        }
    }
    full_name(record)
        .as_deref()
        .and_then(|n| n.split_whitespace().next())
        .unwrap_or("there")
        .to_string()
}

fn display_name(record: &Record) -> String {
    full_name(record).unwrap_or_else(|| first_name(record))
}

fn hours_value(record: &Record) -> u32 {
    metric_value(record.hours_behind, record, &["off_the_job", "hours_behind"])
}

fn days_value(record: &Record) -> u32 {
    metric_value(record.days_absent, record, &["last_attended", "days_absent"])
}

/// Fallback chain for a governing metric: the typed field wins, then any
/// legacy-named extra coerced through the normalizer rules.
fn metric_value(typed: u32, record: &Record, legacy_keys: &[&str]) -> u32 {
    if typed != 0 {
        return typed;
    }
    for key in legacy_keys {
        if let Some(raw) = record.extra.get(*key) {
            return crate::normalize::digits_only(raw);
        }
    }
    0
}

fn plural(count: u32, singular: &str, plural: &str) -> String {
    if count == 1 { singular } else { plural }.to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
