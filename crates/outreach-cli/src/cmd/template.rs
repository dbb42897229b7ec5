use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use outreach_core::config::Config;
use outreach_core::template::TemplateStore;
use outreach_core::Tier;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum TemplateSubcommand {
    /// Show one template, or all of them
    Show { tier: Option<String> },

    /// Set subject and body for a tier
    Set {
        tier: String,

        #[arg(long)]
        subject: String,

        /// Body text (or use --body-file)
        #[arg(long, conflicts_with = "body_file")]
        body: Option<String>,

        /// Read the body from a file
        #[arg(long)]
        body_file: Option<PathBuf>,
    },

    /// Validate all templates
    Validate,

    /// Export the full template set
    Export { dest: PathBuf },

    /// Import a full template set (all-or-nothing)
    Import { src: PathBuf },
}

pub fn run(root: &Path, subcommand: TemplateSubcommand, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load configuration")?;
    let path = root.join(&config.templates_path);
    let mut store = TemplateStore::load(&path).context("failed to load templates")?;

    match subcommand {
        TemplateSubcommand::Show { tier } => match tier {
            Some(name) => {
                let tier: Tier = name.parse()?;
                let template = store
                    .get(tier)
                    .ok_or_else(|| outreach_core::OutreachError::TemplateNotFound(tier.to_string()))?;
                if json {
                    return print_json(template);
                }
                println!("Tier: {tier}");
                println!("Subject: {}", template.subject);
                println!("\n{}", template.body);
            }
            None => {
                if json {
                    let named: std::collections::BTreeMap<&str, _> = store
                        .get_all()
                        .iter()
                        .map(|(tier, template)| (tier.as_str(), template))
                        .collect();
                    return print_json(&named);
                }
                for (tier, template) in store.get_all() {
                    println!("[{tier}] {}", template.subject);
                }
            }
        },
        TemplateSubcommand::Set {
            tier,
            subject,
            body,
            body_file,
        } => {
            let tier: Tier = tier.parse()?;
            let body = match (body, body_file) {
                (Some(text), _) => text,
                (None, Some(file)) => {
                    std::fs::read_to_string(&file).context("failed to read body file")?
                }
                (None, None) => anyhow::bail!("provide --body or --body-file"),
            };
            store.update(tier, &subject, &body)?;
            store.save(&path).context("failed to save templates")?;
            println!("Updated template for tier '{tier}'");
        }
        TemplateSubcommand::Validate => {
            let mut all_ok = true;
            for &tier in Tier::all() {
                match store.validate(tier) {
                    Ok(()) => println!("{tier}: ok"),
                    Err(reason) => {
                        all_ok = false;
                        println!("{tier}: {reason}");
                    }
                }
            }
            if !all_ok {
                anyhow::bail!("template set is not valid");
            }
        }
        TemplateSubcommand::Export { dest } => {
            store.export_all(&dest).context("failed to export templates")?;
            println!("Templates exported to {}", dest.display());
        }
        TemplateSubcommand::Import { src } => {
            store.import_all(&src).context("import rejected")?;
            store.save(&path).context("failed to save templates")?;
            println!("Templates imported from {}", src.display());
        }
    }
    Ok(())
}
