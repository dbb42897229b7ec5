use crate::normalize::{canonical_field, coerce_count, digits_only, value_text};
use crate::tier::{classify, Tier};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A raw imported row: flat key/value mapping straight out of the tabular
/// importer, before any normalization.
pub type RawRecord = serde_json::Map<String, Value>;

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// A preprocessed attendance record: the fixed fields every consumer relies
/// on, plus an open `extra` map so any other source column stays addressable
/// as a template placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub hours_behind: u32,
    #[serde(default)]
    pub days_absent: u32,
    /// Classification, filled by `preprocess`. Absent on records built by
    /// other means; consumers fall back to `effective_tier`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl Record {
    /// Build a record from one raw row: canonicalize known column-name
    /// variants, default missing required fields, coerce both governing
    /// metrics, and classify. Never fails; bad input degrades field by field.
    pub fn from_raw(row: &RawRecord) -> Self {
        let mut email = String::new();
        let mut name = String::new();
        let mut hours_raw: Option<&Value> = None;
        let mut days_raw: Option<&Value> = None;
        let mut extra = BTreeMap::new();

        for (key, value) in row {
            match canonical_field(key) {
                Some("hours_behind") => hours_raw = Some(value),
                Some("days_absent") => days_raw = Some(value),
                Some("email") => email = value_text(value),
                Some("name") => name = value_text(value),
                // Incoming categories are recomputed below so a stale
                // classification can never disagree with the metrics.
                Some("tier") => {}
                _ => {
                    extra.insert(key.clone(), value_text(value));
                }
            }
        }

        let hours_behind = coerce_count(hours_raw);
        let days_absent = coerce_count(days_raw);
        Self {
            email,
            name,
            hours_behind,
            days_absent,
            tier: Some(classify(hours_behind, days_absent)),
            extra,
        }
    }

    /// Flatten back to a raw row, exposing the legacy alias columns
    /// (`off_the_job`, `last_attended`, `off_track_category`) alongside the
    /// canonical names. `from_raw(to_raw(r)) == r`, which makes reprocessing
    /// idempotent.
    pub fn to_raw(&self) -> RawRecord {
        let mut row = RawRecord::new();
        row.insert("email".into(), Value::String(self.email.clone()));
        row.insert("name".into(), Value::String(self.name.clone()));
        row.insert("hours_behind".into(), Value::from(self.hours_behind));
        row.insert("off_the_job".into(), Value::from(self.hours_behind));
        row.insert("days_absent".into(), Value::from(self.days_absent));
        row.insert("last_attended".into(), Value::from(self.days_absent));
        if let Some(tier) = self.tier {
            row.insert(
                "off_track_category".into(),
                Value::String(tier.as_str().to_string()),
            );
        }
        for (key, value) in &self.extra {
            row.insert(key.clone(), Value::String(value.clone()));
        }
        row
    }

    /// Look up a field by name, covering the fixed fields, their legacy
    /// aliases, and the open extras.
    pub fn field(&self, name: &str) -> Option<String> {
        match name {
            "email" => Some(self.email.clone()),
            "name" => Some(self.name.clone()),
            "hours_behind" | "off_the_job" => Some(self.hours_behind.to_string()),
            "days_absent" | "last_attended" => Some(self.days_absent.to_string()),
            "tier" | "off_track_category" => self.tier.map(|t| t.as_str().to_string()),
            _ => self.extra.get(name).cloned(),
        }
    }

    /// The tier this record dispatches under: a valid precomputed
    /// classification wins, otherwise classify from whichever metrics are
    /// present.
    pub fn effective_tier(&self) -> Tier {
        if let Some(tier) = self.tier {
            return tier;
        }
        for key in ["off_track_category", "tier"] {
            if let Some(token) = self.extra.get(key) {
                if let Ok(tier) = token.parse() {
                    return tier;
                }
            }
        }
        classify(self.hours_behind, self.days_absent)
    }
}

// ---------------------------------------------------------------------------
// Batch operations
// ---------------------------------------------------------------------------

/// Normalize and classify a batch of raw rows. Rows are independent; order
/// is preserved. Idempotent: feeding the output (via `to_raw`) back in
/// yields the same records.
pub fn preprocess(rows: &[RawRecord]) -> Vec<Record> {
    rows.iter().map(Record::from_raw).collect()
}

/// Merge per-email patches into matching records. Patch fields win on
/// conflict; a patched governing metric triggers reclassification unless the
/// patch also carries an explicit valid tier. Malformed patch fields are
/// skipped, unmatched emails are a no-op, and the batch never fails.
pub fn enrich(records: &mut [Record], patches: &BTreeMap<String, RawRecord>) {
    for record in records.iter_mut() {
        let Some(patch) = patches.get(&record.email) else {
            continue;
        };
        let mut metrics_changed = false;
        let mut explicit_tier = None;
        for (key, value) in patch {
            match canonical_field(key) {
                Some("hours_behind") => {
                    record.hours_behind = coerce_count(Some(value));
                    metrics_changed = true;
                }
                Some("days_absent") => {
                    record.days_absent = coerce_count(Some(value));
                    metrics_changed = true;
                }
                Some("email") => record.email = value_text(value),
                Some("name") => record.name = value_text(value),
                Some("tier") => match value_text(value).parse::<Tier>() {
                    Ok(tier) => explicit_tier = Some(tier),
                    Err(_) => {
                        tracing::warn!(key = %key, "skipping malformed tier in enrichment patch");
                    }
                },
                _ => {
                    record.extra.insert(key.clone(), value_text(value));
                }
            }
        }
        if let Some(tier) = explicit_tier {
            record.tier = Some(tier);
        } else if metrics_changed {
            record.tier = Some(classify(record.hours_behind, record.days_absent));
        }
    }
}

/// Records dispatching under `tier`, in their original relative order.
pub fn select_by_tier(records: &[Record], tier: Tier) -> Vec<&Record> {
    records
        .iter()
        .filter(|r| r.effective_tier() == tier)
        .collect()
}

/// Filter records by field criteria (logical AND). The two governing
/// metrics match by inclusive threshold (`value >= criterion`); every other
/// field matches by case-insensitive substring containment.
pub fn search<'a>(records: &'a [Record], criteria: &[(String, String)]) -> Vec<&'a Record> {
    records
        .iter()
        .filter(|r| {
            criteria
                .iter()
                .all(|(field, wanted)| matches_criterion(r, field, wanted))
        })
        .collect()
}

fn matches_criterion(record: &Record, field: &str, wanted: &str) -> bool {
    match canonical_field(field) {
        Some("hours_behind") => record.hours_behind >= digits_only(wanted),
        Some("days_absent") => record.days_absent >= digits_only(wanted),
        _ => match record.field(field) {
            Some(value) => value.to_lowercase().contains(&wanted.to_lowercase()),
            None => false,
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
