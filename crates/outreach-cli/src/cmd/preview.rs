use crate::cmd::{record_row, RECORD_HEADERS};
use crate::output::{print_json, print_table};
use anyhow::Context;
use outreach_core::source::Dataset;
use std::path::Path;

pub fn run(file: &Path, limit: usize, json: bool) -> anyhow::Result<()> {
    let dataset = Dataset::load(file).context("failed to load records")?;
    let shown = dataset.preview(limit);

    if json {
        return print_json(&shown);
    }

    println!("{}", dataset.file_info());
    println!();
    let rows: Vec<Vec<String>> = shown.iter().map(record_row).collect();
    print_table(&RECORD_HEADERS, rows);
    if dataset.record_count() > shown.len() {
        println!(
            "\n({} of {} records shown)",
            shown.len(),
            dataset.record_count()
        );
    }
    Ok(())
}
