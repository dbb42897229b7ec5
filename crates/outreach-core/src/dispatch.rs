use crate::error::{OutreachError, Result};
use crate::record::Record;
use crate::render;
use crate::template::TemplateStore;
use crate::tier::Tier;
use crate::transport::{Transport, TransportError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Ledger types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SendStatus {
    Sent,
    Failed,
}

impl fmt::Display for SendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SendStatus::Sent => "sent",
            SendStatus::Failed => "failed",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub email: String,
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub email: String,
    pub name: String,
    pub status: SendStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Accounting for one dispatch run. Created fresh per run, owned by the
/// call; `sent + failed == total` holds on completion.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Ledger {
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    pub failures: Vec<Failure>,
    pub log: Vec<AuditEntry>,
}

impl Ledger {
    fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    fn record_sent(&mut self, record: &Record, tier: Tier) {
        self.sent += 1;
        self.log.push(AuditEntry {
            timestamp: Utc::now(),
            email: record.email.clone(),
            name: record.name.clone(),
            status: SendStatus::Sent,
            tier: Some(tier),
            error: None,
        });
    }

    fn record_failed(&mut self, record: &Record, tier: Option<Tier>, error: String) {
        self.failed += 1;
        self.failures.push(Failure {
            email: record.email.clone(),
            name: record.name.clone(),
            error: error.clone(),
        });
        self.log.push(AuditEntry {
            timestamp: Utc::now(),
            email: record.email.clone(),
            name: record.name.clone(),
            status: SendStatus::Failed,
            tier,
            error: Some(error),
        });
    }

    /// Percentage of the batch delivered; 0 when the batch was empty.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.sent as f64 / self.total as f64 * 100.0
    }

    /// How many messages went out under each tier, from the sent audit
    /// entries.
    pub fn tier_usage(&self) -> BTreeMap<Tier, usize> {
        let mut usage = BTreeMap::new();
        for entry in &self.log {
            if entry.status == SendStatus::Sent {
                if let Some(tier) = entry.tier {
                    *usage.entry(tier).or_insert(0) += 1;
                }
            }
        }
        usage
    }

    /// Human-readable run summary: totals, rate, and failure causes with
    /// remediation hints when anything failed.
    pub fn report(&self) -> String {
        let mut report = format!(
            "Dispatch report - {}\n{}\n\n",
            Utc::now().format("%Y-%m-%d %H:%M:%S"),
            "=".repeat(50)
        );
        report.push_str(&format!("Total messages to send: {}\n", self.total));
        report.push_str(&format!("Successfully sent: {}\n", self.sent));
        report.push_str(&format!("Failed to send: {}\n", self.failed));
        if self.total > 0 {
            report.push_str(&format!("Success rate: {:.1}%\n", self.success_rate()));
        }
        if !self.failures.is_empty() {
            report.push_str(&format!("\nFailed recipients:\n{}\n", "-".repeat(20)));
            for failure in &self.failures {
                report.push_str(&format!(
                    "- {} ({}): {}\n",
                    failure.name, failure.email, failure.error
                ));
            }
            report.push_str(
                "\nCommon failure reasons:\n\
                 - Invalid email addresses\n\
                 - SMTP server issues\n\
                 - Network connectivity problems\n\
                 - Authentication issues\n",
            );
        }
        report
    }

    /// Export the audit log as CSV (header row required by consumers).
    /// Atomic: either the whole log lands at `path` or an error is returned.
    pub fn export_log(&self, path: &Path) -> Result<()> {
        if self.log.is_empty() {
            return Err(OutreachError::NothingToExport);
        }
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["timestamp", "email", "name", "status", "tier", "error"])?;
        for entry in &self.log {
            writer.write_record([
                entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                entry.email.clone(),
                entry.name.clone(),
                entry.status.to_string(),
                entry.tier.map(|t| t.as_str().to_string()).unwrap_or_default(),
                entry.error.clone().unwrap_or_default(),
            ])?;
        }
        let data = writer
            .into_inner()
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        crate::io::atomic_write(path, &data)
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// One per-record progress event from a background run.
#[derive(Debug, Clone)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
    pub recipient: String,
}

fn progress_label(record: &Record) -> String {
    if record.name.is_empty() {
        record.email.clone()
    } else {
        format!("{} ({})", record.name, record.email)
    }
}

// ---------------------------------------------------------------------------
// DispatchEngine
// ---------------------------------------------------------------------------

/// Sequential bulk dispatcher: one reused transport session, one message at
/// a time in input order, fixed pacing between sends. `&mut self` keeps runs
/// one-at-a-time per engine.
#[derive(Debug)]
pub struct DispatchEngine {
    pacing: Duration,
}

impl Default for DispatchEngine {
    fn default() -> Self {
        Self {
            pacing: Duration::from_millis(100),
        }
    }
}

impl DispatchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pacing(pacing: Duration) -> Self {
        Self { pacing }
    }

    /// Run one batch. `open` establishes the single transport session; if it
    /// fails, every record is marked failed and the ledger is still
    /// returned — this never panics and never aborts partway without
    /// accounting. `on_progress(done, total, recipient)` fires after every
    /// record, success or failure.
    pub fn run<T, O, F>(
        &mut self,
        records: &[Record],
        templates: &TemplateStore,
        open: O,
        mut on_progress: F,
    ) -> Ledger
    where
        T: Transport,
        O: FnOnce() -> std::result::Result<T, TransportError>,
        F: FnMut(usize, usize, &str),
    {
        let total = records.len();
        let mut ledger = Ledger::new(total);

        let mut transport = match open() {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(error = %e, "transport connection failed, marking batch failed");
                for (i, record) in records.iter().enumerate() {
                    ledger.record_failed(record, None, format!("transport unavailable: {e}"));
                    on_progress(i + 1, total, &progress_label(record));
                }
                return ledger;
            }
        };

        for (i, record) in records.iter().enumerate() {
            match self.send_one(record, templates, &mut transport) {
                Ok(tier) => {
                    tracing::debug!(email = %record.email, tier = %tier, "message sent");
                    ledger.record_sent(record, tier);
                }
                Err((tier, error)) => {
                    tracing::warn!(email = %record.email, error = %error, "message failed");
                    ledger.record_failed(record, tier, error);
                }
            }
            on_progress(i + 1, total, &progress_label(record));
            if i + 1 < total && !self.pacing.is_zero() {
                thread::sleep(self.pacing);
            }
        }
        ledger
    }

    fn send_one<T: Transport>(
        &self,
        record: &Record,
        templates: &TemplateStore,
        transport: &mut T,
    ) -> std::result::Result<Tier, (Option<Tier>, String)> {
        let tier = record.effective_tier();
        let template = templates
            .get(tier)
            .ok_or_else(|| (Some(tier), format!("no template for tier '{tier}'")))?;
        let subject = render::render(&template.subject, record);
        let body = render::render(&template.body, record);
        transport
            .send(&record.email, &subject, &body)
            .map_err(|e| (Some(tier), e.to_string()))?;
        Ok(tier)
    }

    /// Run on a worker thread, streaming per-record progress over a channel.
    /// The final ledger comes back through the join handle. The dispatch
    /// loop itself stays strictly sequential.
    pub fn run_background<T, O>(
        mut self,
        records: Vec<Record>,
        templates: TemplateStore,
        open: O,
    ) -> (mpsc::Receiver<Progress>, thread::JoinHandle<Ledger>)
    where
        T: Transport + 'static,
        O: FnOnce() -> std::result::Result<T, TransportError> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            self.run(&records, &templates, open, move |done, total, recipient| {
                // A dropped receiver just means nobody is watching.
                let _ = tx.send(Progress {
                    done,
                    total,
                    recipient: recipient.to_string(),
                });
            })
        });
        (rx, handle)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{preprocess, RawRecord};
    use crate::transport::DryRunMailer;
    use serde_json::{json, Value};

    /// Fails sends to scripted addresses, succeeds otherwise.
    struct ScriptedMailer {
        reject: Vec<&'static str>,
    }

    impl Transport for ScriptedMailer {
        fn send(&mut self, to: &str, _subject: &str, _body: &str) -> std::result::Result<(), TransportError> {
            if self.reject.contains(&to) {
                return Err(TransportError::Send("mailbox unavailable".to_string()));
            }
            Ok(())
        }
    }

    fn records(rows: &[&[(&str, Value)]]) -> Vec<Record> {
        let raw: Vec<RawRecord> = rows
            .iter()
            .map(|fields| {
                fields
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect()
            })
            .collect();
        preprocess(&raw)
    }

    fn three_records() -> Vec<Record> {
        records(&[
            &[
                ("name", json!("Ada")),
                ("email", json!("ada@example.com")),
                ("hours_behind", json!(35)),
                ("days_absent", json!(35)),
            ],
            &[
                ("name", json!("Grace")),
                ("email", json!("grace@example.com")),
                ("hours_behind", json!(20)),
            ],
            &[
                ("name", json!("Alan")),
                ("email", json!("alan@example.com")),
                ("hours_behind", json!(5)),
            ],
        ])
    }

    fn engine() -> DispatchEngine {
        DispatchEngine::with_pacing(Duration::ZERO)
    }

    #[test]
    fn end_to_end_batch_all_sent() {
        let batch = three_records();
        let templates = TemplateStore::defaults();
        let mut progress = Vec::new();
        let ledger = engine().run(
            &batch,
            &templates,
            || Ok(DryRunMailer::default()),
            |done, total, recipient| progress.push((done, total, recipient.to_string())),
        );

        assert_eq!(ledger.total, 3);
        assert_eq!(ledger.sent, 3);
        assert_eq!(ledger.failed, 0);
        assert_eq!(ledger.sent + ledger.failed, ledger.total);

        let tiers: Vec<_> = ledger.log.iter().map(|e| e.tier.unwrap()).collect();
        assert_eq!(
            tiers,
            [Tier::Significantly, Tier::Moderately, Tier::OnTrack]
        );

        assert_eq!(progress.len(), 3);
        assert_eq!(progress[0], (1, 3, "Ada (ada@example.com)".to_string()));
        assert_eq!(progress[2].0, 3);
    }

    #[test]
    fn fatal_connect_marks_whole_batch_failed() {
        let batch = three_records();
        let templates = TemplateStore::defaults();
        let mut calls = 0;
        let ledger = engine().run(
            &batch,
            &templates,
            || -> std::result::Result<DryRunMailer, TransportError> {
                Err(TransportError::Connect("refused".to_string()))
            },
            |_, _, _| calls += 1,
        );

        assert_eq!(ledger.total, 3);
        assert_eq!(ledger.sent, 0);
        assert_eq!(ledger.failed, 3);
        assert_eq!(calls, 3, "progress still reported per record");
        assert!(ledger.failures[0].error.contains("transport unavailable"));
        assert!(ledger.log.iter().all(|e| e.status == SendStatus::Failed));
    }

    #[test]
    fn per_record_failure_does_not_abort_batch() {
        let batch = three_records();
        let templates = TemplateStore::defaults();
        let ledger = engine().run(
            &batch,
            &templates,
            || {
                Ok(ScriptedMailer {
                    reject: vec!["grace@example.com"],
                })
            },
            |_, _, _| {},
        );

        assert_eq!(ledger.sent, 2);
        assert_eq!(ledger.failed, 1);
        assert_eq!(ledger.sent + ledger.failed, ledger.total);
        assert_eq!(ledger.failures[0].email, "grace@example.com");
        assert!(ledger.failures[0].error.contains("mailbox unavailable"));
    }

    #[test]
    fn missing_template_is_a_per_record_failure() {
        let batch = three_records();
        let templates = TemplateStore::empty();
        let ledger = engine().run(
            &batch,
            &templates,
            || Ok(DryRunMailer::default()),
            |_, _, _| {},
        );

        assert_eq!(ledger.sent, 0);
        assert_eq!(ledger.failed, 3);
        assert!(ledger.failures[0].error.contains("no template for tier"));
    }

    #[test]
    fn precomputed_tier_wins_over_metrics() {
        let mut batch = records(&[&[
            ("email", json!("ada@example.com")),
            ("hours_behind", json!(0)),
        ]]);
        batch[0].tier = Some(Tier::Moderately);
        let templates = TemplateStore::defaults();
        let ledger = engine().run(
            &batch,
            &templates,
            || Ok(DryRunMailer::default()),
            |_, _, _| {},
        );
        assert_eq!(ledger.log[0].tier, Some(Tier::Moderately));
    }

    #[test]
    fn empty_batch_yields_empty_ledger() {
        let templates = TemplateStore::defaults();
        let ledger = engine().run(
            &[],
            &templates,
            || Ok(DryRunMailer::default()),
            |_, _, _| panic!("no progress expected"),
        );
        assert_eq!(ledger.total, 0);
        assert_eq!(ledger.success_rate(), 0.0);
    }

    #[test]
    fn tier_usage_counts_sent_only() {
        let batch = three_records();
        let templates = TemplateStore::defaults();
        let ledger = engine().run(
            &batch,
            &templates,
            || {
                Ok(ScriptedMailer {
                    reject: vec!["alan@example.com"],
                })
            },
            |_, _, _| {},
        );
        let usage = ledger.tier_usage();
        assert_eq!(usage.get(&Tier::Significantly), Some(&1));
        assert_eq!(usage.get(&Tier::Moderately), Some(&1));
        assert_eq!(usage.get(&Tier::OnTrack), None);
    }

    #[test]
    fn report_lists_failures_and_hints() {
        let batch = three_records();
        let templates = TemplateStore::defaults();
        let ledger = engine().run(
            &batch,
            &templates,
            || {
                Ok(ScriptedMailer {
                    reject: vec!["grace@example.com"],
                })
            },
            |_, _, _| {},
        );
        let report = ledger.report();
        assert!(report.contains("Successfully sent: 2"));
        assert!(report.contains("Failed to send: 1"));
        assert!(report.contains("Grace (grace@example.com)"));
        assert!(report.contains("Common failure reasons"));
    }

    #[test]
    fn export_log_writes_header_and_rows() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sending_log.csv");
        let batch = three_records();
        let templates = TemplateStore::defaults();
        let ledger = engine().run(
            &batch,
            &templates,
            || Ok(DryRunMailer::default()),
            |_, _, _| {},
        );
        ledger.export_log(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "timestamp,email,name,status,tier,error"
        );
        assert_eq!(lines.count(), 3);
        assert!(content.contains("ada@example.com,Ada,sent,significantly"));
    }

    #[test]
    fn export_log_rejects_empty_log() {
        let dir = tempfile::TempDir::new().unwrap();
        let ledger = Ledger::default();
        assert!(matches!(
            ledger.export_log(&dir.path().join("log.csv")),
            Err(OutreachError::NothingToExport)
        ));
    }

    #[test]
    fn background_run_streams_progress_and_returns_ledger() {
        let batch = three_records();
        let templates = TemplateStore::defaults();
        let (progress, handle) =
            engine().run_background(batch, templates, || Ok(DryRunMailer::default()));

        let events: Vec<Progress> = progress.iter().collect();
        let ledger = handle.join().unwrap();

        assert_eq!(events.len(), 3);
        assert_eq!(events.last().unwrap().done, 3);
        assert_eq!(ledger.sent, 3);
    }
}
