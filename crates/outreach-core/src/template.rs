use crate::error::{OutreachError, Result};
use crate::tier::Tier;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

/// One outbound message template: subject and body, both containing
/// `{placeholder}` tokens. Valid only when both parts are non-blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub subject: String,
    pub body: String,
}

impl Template {
    pub fn is_valid(&self) -> bool {
        !self.subject.trim().is_empty() && !self.body.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// TemplateStore
// ---------------------------------------------------------------------------

/// One template per tier. Persisted as a JSON mapping
/// `{tier: {subject, body}}`; loading is lenient, importing is
/// all-or-nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateStore {
    templates: BTreeMap<Tier, Template>,
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::defaults()
    }
}

impl TemplateStore {
    /// The built-in template set. Every tier has a valid template out of the
    /// box so a fresh install can dispatch immediately.
    pub fn defaults() -> Self {
        let mut templates = BTreeMap::new();
        templates.insert(
            Tier::Significantly,
            Template {
                subject: "Attendance and OTJ Logging - Action Required".to_string(),
                body: "\
Hi {first_name},

I hope you are doing well.

I am reaching out regarding your engagement with the programme. Our records \
show that it has been {days_absent} {days_plural} since your last attendance, \
and you are currently {hours_behind} {hours_plural} behind on your Off-the-Job \
(OTJ) training hours. This places you significantly off track, as both \
attendance and OTJ logging are key metrics we use to monitor learner engagement.

As there has been no response to previous messages and no improvement in your \
engagement, I have copied in {manager_name}, your apprentice manager, for \
visibility. We now need to arrange a meeting to discuss how you plan to get \
back on track. As discussed during the launch meeting, logging OTJ hours on a \
weekly basis is a mandatory requirement to ensure compliance with government \
regulations.

Your prompt attention to this matter is appreciated.

Your Coach,"
                    .to_string(),
            },
        );
        templates.insert(
            Tier::Moderately,
            Template {
                subject: "OTJ Logging - Power Hour Session".to_string(),
                body: "\
Hello {first_name},

I hope you are doing well.

Our records show you are currently {hours_behind} {hours_plural} behind on \
your Off-the-Job (OTJ) training hours. As discussed during the launch meeting, \
logging OTJ hours on a weekly basis is mandatory to maintain compliance with \
government regulations.

To help you get back on track, we've scheduled an OTJ Power Hour session on \
{power_hour_date}, during which you will log your outstanding hours.

- Opt-out: If you log all your OTJ hours before the session, you won't need to attend.
- Required attendance: If your hours remain outstanding, attendance will be mandatory.

Please reach out if you have any questions or if you anticipate any difficulty \
logging your hours before the session.

Your coach,"
                    .to_string(),
            },
        );
        templates.insert(
            Tier::Slightly,
            Template {
                subject: "OTJ Logging Required".to_string(),
                body: "\
Hello {first_name},

I hope you are doing well.

I am reaching out regarding your Off-the-Job (OTJ) training hours. Our records \
show that you are currently {hours_behind} {hours_plural} behind on your OTJ \
logging.

As discussed during the launch meetings, weekly tracking of OTJ hours is a key \
requirement to ensure we remain compliant with government regulations.

To avoid further escalation, I ask that you log the remaining hours by \
{deadline_date}. This will help us stay on track and avoid the need for \
involvement from the compliance team.

Please let me know if you need any support with this.

Your coach,"
                    .to_string(),
            },
        );
        templates.insert(
            Tier::OnTrack,
            Template {
                subject: "OTJ Logging - Keep It Up".to_string(),
                body: "\
Hello {first_name},

Our records show your attendance and Off-the-Job (OTJ) logging are on track. \
Thank you for keeping your hours up to date.

Please continue logging your OTJ hours weekly so we stay compliant with \
government regulations.

Your coach,"
                    .to_string(),
            },
        );
        Self { templates }
    }

    /// A store with no templates at all. Useful when every template is going
    /// to be supplied explicitly; dispatching against missing tiers yields
    /// per-record failures.
    pub fn empty() -> Self {
        Self {
            templates: BTreeMap::new(),
        }
    }

    /// Load from disk, overlaying the defaults. Lenient: entries with an
    /// unknown tier name or a blank subject/body are skipped with a warning,
    /// leaving the default in effect for that tier. A missing file yields
    /// the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let mut store = Self::defaults();
        if !path.exists() {
            return Ok(store);
        }
        let data = std::fs::read_to_string(path)?;
        let entries: BTreeMap<String, Value> = serde_json::from_str(&data)?;
        for (name, value) in entries {
            let Ok(tier) = name.parse::<Tier>() else {
                tracing::warn!(tier = %name, "skipping template entry with unknown tier");
                continue;
            };
            match serde_json::from_value::<Template>(value) {
                Ok(template) if template.is_valid() => {
                    store.templates.insert(tier, template);
                }
                _ => {
                    tracing::warn!(tier = %name, "skipping structurally invalid template entry");
                }
            }
        }
        Ok(store)
    }

    /// Atomically persist the full set as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let named: BTreeMap<&str, &Template> = self
            .templates
            .iter()
            .map(|(tier, template)| (tier.as_str(), template))
            .collect();
        let data = serde_json::to_string_pretty(&named)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    pub fn get(&self, tier: Tier) -> Option<&Template> {
        self.templates.get(&tier)
    }

    pub fn get_all(&self) -> &BTreeMap<Tier, Template> {
        &self.templates
    }

    /// Replace the template for one tier. Rejects blank subject or body with
    /// a typed error, leaving the store unchanged.
    pub fn update(&mut self, tier: Tier, subject: &str, body: &str) -> Result<()> {
        if subject.trim().is_empty() {
            return Err(OutreachError::EmptyTemplateField {
                tier: tier.to_string(),
                field: "subject",
            });
        }
        if body.trim().is_empty() {
            return Err(OutreachError::EmptyTemplateField {
                tier: tier.to_string(),
                field: "body",
            });
        }
        self.templates.insert(
            tier,
            Template {
                subject: subject.to_string(),
                body: body.to_string(),
            },
        );
        Ok(())
    }

    /// Check presence and non-blankness of both parts for one tier.
    pub fn validate(&self, tier: Tier) -> std::result::Result<(), String> {
        match self.templates.get(&tier) {
            None => Err(format!("no template for tier '{tier}'")),
            Some(t) if t.subject.trim().is_empty() => {
                Err(format!("template for tier '{tier}' has an empty subject"))
            }
            Some(t) if t.body.trim().is_empty() => {
                Err(format!("template for tier '{tier}' has an empty body"))
            }
            Some(_) => Ok(()),
        }
    }

    /// Write the full set to `dest` (same representation as `save`).
    pub fn export_all(&self, dest: &Path) -> Result<()> {
        self.save(dest)
    }

    /// Import a template set, all-or-nothing: if any entry names an unknown
    /// tier or fails validation, the whole import is rejected and the store
    /// is left untouched. Tiers absent from the source keep their current
    /// templates.
    pub fn import_all(&mut self, src: &Path) -> Result<()> {
        let data = std::fs::read_to_string(src)?;
        let entries: BTreeMap<String, Value> = serde_json::from_str(&data)?;
        let mut incoming = Vec::with_capacity(entries.len());
        for (name, value) in entries {
            let tier = name.parse::<Tier>().map_err(|_| {
                OutreachError::InvalidTemplateSet(format!("unknown tier '{name}'"))
            })?;
            let template: Template = serde_json::from_value(value).map_err(|e| {
                OutreachError::InvalidTemplateSet(format!("malformed entry for '{name}': {e}"))
            })?;
            if !template.is_valid() {
                return Err(OutreachError::InvalidTemplateSet(format!(
                    "entry for '{name}' has an empty subject or body"
                )));
            }
            incoming.push((tier, template));
        }
        for (tier, template) in incoming {
            self.templates.insert(tier, template);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_cover_every_tier_and_validate() {
        let store = TemplateStore::defaults();
        for tier in Tier::all() {
            assert!(store.get(*tier).is_some(), "{tier}");
            assert!(store.validate(*tier).is_ok(), "{tier}");
        }
    }

    #[test]
    fn update_rejects_blank_parts() {
        let mut store = TemplateStore::defaults();
        let before = store.get(Tier::Slightly).cloned();
        assert!(store.update(Tier::Slightly, "  ", "body").is_err());
        assert!(store.update(Tier::Slightly, "subject", "\n").is_err());
        assert_eq!(store.get(Tier::Slightly).cloned(), before);

        store.update(Tier::Slightly, "New subject", "New body").unwrap();
        assert_eq!(store.get(Tier::Slightly).unwrap().subject, "New subject");
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("email_templates.json");
        let mut store = TemplateStore::defaults();
        store
            .update(Tier::Moderately, "Custom subject", "Custom {name}")
            .unwrap();
        store.save(&path).unwrap();

        let loaded = TemplateStore::load(&path).unwrap();
        assert_eq!(loaded, store);
    }

    #[test]
    fn load_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let store = TemplateStore::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(store, TemplateStore::defaults());
    }

    #[test]
    fn load_skips_invalid_entries_keeping_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("email_templates.json");
        std::fs::write(
            &path,
            r#"{
                "slightly": {"subject": "Kept", "body": "Kept body"},
                "moderately": {"subject": "", "body": "blank subject"},
                "severely": {"subject": "x", "body": "unknown tier"}
            }"#,
        )
        .unwrap();
        let store = TemplateStore::load(&path).unwrap();
        assert_eq!(store.get(Tier::Slightly).unwrap().subject, "Kept");
        assert_eq!(
            store.get(Tier::Moderately),
            TemplateStore::defaults().get(Tier::Moderately)
        );
    }

    #[test]
    fn import_is_all_or_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("incoming.json");
        std::fs::write(
            &path,
            r#"{
                "slightly": {"subject": "Good", "body": "Good body"},
                "moderately": {"subject": "Bad", "body": ""}
            }"#,
        )
        .unwrap();
        let mut store = TemplateStore::defaults();
        let before = store.clone();
        let err = store.import_all(&path).unwrap_err();
        assert!(matches!(err, OutreachError::InvalidTemplateSet(_)));
        assert_eq!(store, before, "store untouched after rejected import");
    }

    #[test]
    fn import_applies_valid_set() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("incoming.json");
        std::fs::write(
            &path,
            r#"{"on_track": {"subject": "Well done", "body": "Keep going {first_name}"}}"#,
        )
        .unwrap();
        let mut store = TemplateStore::defaults();
        store.import_all(&path).unwrap();
        assert_eq!(store.get(Tier::OnTrack).unwrap().subject, "Well done");
        // Tiers absent from the source keep their current templates.
        assert_eq!(
            store.get(Tier::Slightly),
            TemplateStore::defaults().get(Tier::Slightly)
        );
    }

    #[test]
    fn export_then_import_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("set.json");
        let mut store = TemplateStore::defaults();
        store.update(Tier::OnTrack, "Exported", "Exported body").unwrap();
        store.export_all(&path).unwrap();

        let mut other = TemplateStore::defaults();
        other.import_all(&path).unwrap();
        assert_eq!(other, store);
    }
}
