mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::{send::SendArgs, template::TemplateSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "outreach",
    about = "Classify apprentice attendance records and dispatch tiered outreach emails",
    version,
    propagate_version = true
)]
struct Cli {
    /// Working directory holding outreach.yaml and the template set
    #[arg(long, global = true, env = "OUTREACH_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Per-tier breakdown of a records file
    Summary { file: PathBuf },

    /// Preview classified records
    Preview {
        file: PathBuf,

        /// Maximum rows to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Filter records by field criteria
    Filter {
        file: PathBuf,

        /// FIELD=VALUE pair; numeric fields match by >=, text by substring (repeatable)
        #[arg(long = "where", value_name = "FIELD=VALUE", required = true)]
        criteria: Vec<String>,
    },

    /// Manage per-tier message templates
    Template {
        #[command(subcommand)]
        subcommand: TemplateSubcommand,
    },

    /// Render and dispatch tiered emails for a records file
    Send(SendArgs),
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let root = cli.root.unwrap_or_else(|| PathBuf::from("."));

    let result = match cli.command {
        Commands::Summary { file } => cmd::summary::run(&file, cli.json),
        Commands::Preview { file, limit } => cmd::preview::run(&file, limit, cli.json),
        Commands::Filter { file, criteria } => cmd::filter::run(&file, &criteria, cli.json),
        Commands::Template { subcommand } => cmd::template::run(&root, subcommand, cli.json),
        Commands::Send(args) => cmd::send::run(&root, args, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
