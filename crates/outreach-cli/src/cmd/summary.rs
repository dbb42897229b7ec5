use crate::output::{print_json, print_table};
use anyhow::Context;
use outreach_core::source::Dataset;
use outreach_core::Tier;
use std::path::Path;

pub fn run(file: &Path, json: bool) -> anyhow::Result<()> {
    let dataset = Dataset::load(file).context("failed to load records")?;

    let counts: Vec<(Tier, usize)> = Tier::all()
        .iter()
        .map(|&tier| {
            let count = outreach_core::record::select_by_tier(&dataset.records, tier).len();
            (tier, count)
        })
        .collect();

    if json {
        #[derive(serde::Serialize)]
        struct Summary {
            file: String,
            total: usize,
            tiers: std::collections::BTreeMap<Tier, usize>,
        }
        let output = Summary {
            file: dataset.path.display().to_string(),
            total: dataset.record_count(),
            tiers: counts.into_iter().collect(),
        };
        return print_json(&output);
    }

    println!("{}", dataset.file_info());
    println!();
    let rows: Vec<Vec<String>> = counts
        .into_iter()
        .map(|(tier, count)| vec![tier.to_string(), count.to_string()])
        .collect();
    print_table(&["TIER", "RECIPIENTS"], rows);
    Ok(())
}
