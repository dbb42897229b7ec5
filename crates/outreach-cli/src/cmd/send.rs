use crate::output::print_json;
use anyhow::Context;
use clap::Args;
use outreach_core::config::Config;
use outreach_core::dispatch::DispatchEngine;
use outreach_core::record::{select_by_tier, Record};
use outreach_core::source::Dataset;
use outreach_core::template::TemplateStore;
use outreach_core::transport::{DryRunMailer, SmtpMailer, TransportConfig};
use outreach_core::Tier;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Args)]
pub struct SendArgs {
    /// Records file (.csv or .json)
    pub file: PathBuf,

    /// Restrict the batch to one tier
    #[arg(long)]
    pub tier: Option<String>,

    /// SMTP server (overrides outreach.yaml)
    #[arg(long)]
    pub server: Option<String>,

    /// SMTP port (overrides outreach.yaml)
    #[arg(long)]
    pub port: Option<u16>,

    /// Sender address (overrides outreach.yaml)
    #[arg(long)]
    pub from: Option<String>,

    /// SMTP credential
    #[arg(
        long,
        env = "OUTREACH_SMTP_PASSWORD",
        hide_env_values = true,
        default_value = ""
    )]
    pub password: String,

    /// Render and account without opening an SMTP session
    #[arg(long)]
    pub dry_run: bool,

    /// Write the audit log as CSV after the run
    #[arg(long, value_name = "FILE")]
    pub log_out: Option<PathBuf>,
}

pub fn run(root: &Path, args: SendArgs, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load configuration")?;
    let templates = TemplateStore::load(&root.join(&config.templates_path))
        .context("failed to load templates")?;
    let dataset = Dataset::load(&args.file).context("failed to load records")?;

    let records: Vec<Record> = match &args.tier {
        Some(name) => {
            let tier: Tier = name.parse()?;
            select_by_tier(&dataset.records, tier)
                .into_iter()
                .cloned()
                .collect()
        }
        None => dataset.records.clone(),
    };

    let mut engine = DispatchEngine::with_pacing(Duration::from_millis(config.pacing_ms));

    let ledger = if args.dry_run {
        engine.run(
            &records,
            &templates,
            || Ok(DryRunMailer::default()),
            |done, total, recipient| {
                if !json {
                    println!("[{done}/{total}] {recipient}");
                }
            },
        )
    } else {
        let transport = TransportConfig {
            server: args.server.unwrap_or(config.smtp.server),
            port: args.port.unwrap_or(config.smtp.port),
            sender: args.from.unwrap_or(config.smtp.sender),
            credential: args.password,
        };
        anyhow::ensure!(
            !transport.sender.is_empty(),
            "no sender address: pass --from or set smtp.sender in outreach.yaml"
        );
        anyhow::ensure!(
            !transport.credential.is_empty(),
            "no credential: set OUTREACH_SMTP_PASSWORD"
        );
        engine.run(
            &records,
            &templates,
            move || SmtpMailer::connect(&transport),
            |done, total, recipient| {
                if !json {
                    println!("[{done}/{total}] {recipient}");
                }
            },
        )
    };

    if let Some(path) = &args.log_out {
        ledger
            .export_log(path)
            .context("failed to export audit log")?;
        if !json {
            println!("Audit log written to {}", path.display());
        }
    }

    if json {
        print_json(&ledger)?;
    } else {
        println!("\n{}", ledger.report());
    }

    if ledger.sent == 0 && ledger.failed > 0 {
        anyhow::bail!("no messages sent ({} failed)", ledger.failed);
    }
    Ok(())
}
