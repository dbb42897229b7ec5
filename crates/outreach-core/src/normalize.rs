use serde_json::Value;

// ---------------------------------------------------------------------------
// Metric coercion
// ---------------------------------------------------------------------------

/// Coerce free-form text to a non-negative count: strip every non-digit
/// character, then parse base-10. Empty result or overflow degrades to 0.
/// `"12 hrs"` → 12, `"N/A"` → 0, `"-5"` → 5 (sign discarded).
pub fn digits_only(text: &str) -> u32 {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Coerce a raw record value to a non-negative count. Missing, null, and
/// non-numeric values all degrade to 0; this never fails.
pub fn coerce_count(value: Option<&Value>) -> u32 {
    match value {
        None | Some(Value::Null) => 0,
        Some(v) => digits_only(&value_text(v)),
    }
}

/// Render a raw record value as plain text. Strings pass through unquoted;
/// null renders empty.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Column canonicalization
// ---------------------------------------------------------------------------

/// Map known case/spacing variants of source column names to their canonical
/// field names. Unrecognized columns return `None` and keep their original
/// spelling so they stay addressable as placeholders.
pub fn canonical_field(name: &str) -> Option<&'static str> {
    let key: String = name
        .trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect();
    match key.as_str() {
        "hours_behind" | "off_the_job" | "off_the_job_hours" | "otj_hours_behind" => {
            Some("hours_behind")
        }
        "days_absent" | "last_attended" | "days_since_last_attendance" | "last_attendance" => {
            Some("days_absent")
        }
        "email" | "email_address" | "e_mail" => Some("email"),
        "name" | "apprentice_name" | "full_name" => Some("name"),
        "off_track_category" | "tier" => Some("tier"),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn digits_only_table() {
        assert_eq!(digits_only("12hrs"), 12);
        assert_eq!(digits_only("12 hrs"), 12);
        assert_eq!(digits_only(""), 0);
        assert_eq!(digits_only("abc"), 0);
        assert_eq!(digits_only("N/A"), 0);
        assert_eq!(digits_only("-5"), 5);
        assert_eq!(digits_only("42"), 42);
    }

    #[test]
    fn digits_only_overflow_degrades_to_zero() {
        assert_eq!(digits_only("99999999999999999999"), 0);
    }

    #[test]
    fn coerce_count_handles_missing_and_null() {
        assert_eq!(coerce_count(None), 0);
        assert_eq!(coerce_count(Some(&Value::Null)), 0);
    }

    #[test]
    fn coerce_count_handles_numbers_and_strings() {
        assert_eq!(coerce_count(Some(&json!(17))), 17);
        assert_eq!(coerce_count(Some(&json!("17"))), 17);
        assert_eq!(coerce_count(Some(&json!("17 hours"))), 17);
        assert_eq!(coerce_count(Some(&json!(true))), 0);
    }

    #[test]
    fn canonical_field_variants() {
        assert_eq!(canonical_field("Off the job"), Some("hours_behind"));
        assert_eq!(canonical_field("off_the_job"), Some("hours_behind"));
        assert_eq!(canonical_field("Hours Behind"), Some("hours_behind"));
        assert_eq!(canonical_field("Last Attended"), Some("days_absent"));
        assert_eq!(canonical_field("days absent"), Some("days_absent"));
        assert_eq!(canonical_field("Email Address"), Some("email"));
        assert_eq!(canonical_field("Apprentice Name"), Some("name"));
        assert_eq!(canonical_field("off_track_category"), Some("tier"));
        assert_eq!(canonical_field("manager_name"), None);
    }
}
