use std::path::Path;

use anyhow::{Context, Result};

use quarry_core::triple::parse_delimited;
use quarry_core::Config;

pub fn run(config: &Config, file: &Path) -> Result<()> {
    let input = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    let batch = parse_delimited(&input, config.triples.delimiter);

    for record in &batch.rejected {
        eprintln!("line {}: {} ({:?})", record.line, record.error, record.raw);
    }
    println!("{}", serde_json::to_string_pretty(&batch.accepted)?);
    eprintln!(
        "{} accepted, {} rejected",
        batch.accepted.len(),
        batch.rejected.len()
    );

    Ok(())
}
