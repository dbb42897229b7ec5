use crate::cmd::{record_row, RECORD_HEADERS};
use crate::output::{print_json, print_table};
use anyhow::Context;
use outreach_core::record::search;
use outreach_core::source::Dataset;
use std::path::Path;

pub fn run(file: &Path, criteria: &[String], json: bool) -> anyhow::Result<()> {
    let parsed: Vec<(String, String)> = criteria
        .iter()
        .map(|c| {
            c.split_once('=')
                .map(|(field, value)| (field.trim().to_string(), value.trim().to_string()))
                .ok_or_else(|| anyhow::anyhow!("criterion '{c}' is not FIELD=VALUE"))
        })
        .collect::<anyhow::Result<_>>()?;

    let dataset = Dataset::load(file).context("failed to load records")?;
    let hits = search(&dataset.records, &parsed);

    if json {
        return print_json(&hits);
    }

    let rows: Vec<Vec<String>> = hits.iter().map(|r| record_row(r)).collect();
    print_table(&RECORD_HEADERS, rows);
    println!(
        "\n{} of {} records matched",
        hits.len(),
        dataset.record_count()
    );
    Ok(())
}
