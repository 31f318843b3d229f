use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use quarry_core::{
    Config, ExportFormat, MetadataUpdate, PipelineOrchestrator, Provenance, RawFile, Stage,
    StageReport, NEAR_DUPLICATE_THRESHOLD,
};

use super::RunArgs;

pub async fn run(config: &Config, args: &RunArgs) -> Result<()> {
    let files = collect_inputs(&args.paths)?;
    if files.is_empty() {
        bail!("no input files found");
    }
    tracing::info!(files = files.len(), "running pipeline");

    let mut pipeline = PipelineOrchestrator::from_config(config)?;
    pipeline.load_files(files);
    let mut reports = Vec::new();

    pipeline.jump_to(Stage::Parse);
    reports.push(pipeline.run_parse().await?);

    pipeline.jump_to(Stage::Tag);
    let update = metadata_update(args);
    if !update.is_empty() {
        reports.push(pipeline.update_metadata(update));
    }
    reports.push(pipeline.suggest_metadata());

    pipeline.jump_to(Stage::Chunk);
    reports.push(match &args.chunks {
        Some(path) => pipeline.accept_chunks_text(&read_override(path)?),
        None => pipeline.compute_chunks(),
    });

    pipeline.jump_to(Stage::ExtractEntities);
    reports.push(match &args.entities {
        Some(path) => pipeline.accept_entities_text(&read_override(path)?),
        None => pipeline.run_entities().await?,
    });

    pipeline.jump_to(Stage::ExtractTriples);
    reports.push(match &args.triples {
        Some(path) => pipeline.accept_triples_text(&read_override(path)?),
        None => pipeline.run_triples().await?,
    });

    pipeline.jump_to(Stage::Export);
    for report in &reports {
        print_report(report);
    }
    for pair in pipeline
        .document()
        .entities()
        .near_duplicates(NEAR_DUPLICATE_THRESHOLD)
    {
        eprintln!(
            "  note: {:?} and {:?} may be the same entity ({:.0}% similar)",
            pair.first,
            pair.second,
            pair.similarity * 100.0
        );
    }

    let format = if args.compact {
        ExportFormat::Compact
    } else {
        ExportFormat::Pretty
    };
    let record = pipeline.export();

    match &args.output {
        Some(path) => {
            record.write_to(path, format).await?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{}", record.render(format)?),
    }

    Ok(())
}

fn metadata_update(args: &RunArgs) -> MetadataUpdate {
    MetadataUpdate {
        institution: args.institution.clone(),
        doc_type: args.doc_type.clone(),
        year: args.year.clone(),
    }
}

/// Files are taken as given; directories contribute their visible files in
/// name order.
fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<RawFile>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(path)
                .with_context(|| format!("failed to list {}", path.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && !is_hidden(p))
                .collect();
            entries.sort();
            files.extend(entries.into_iter().map(RawFile::from_path));
        } else if path.is_file() {
            files.push(RawFile::from_path(path));
        } else {
            bail!("file not found: {}", path.display());
        }
    }

    Ok(files)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

fn read_override(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn print_report(report: &StageReport) {
    let source = match report.provenance {
        Provenance::Automatic => "auto",
        Provenance::Override => "override",
    };
    eprintln!("{}: {} accepted ({source})", report.stage, report.accepted);
    for warning in &report.warnings {
        eprintln!("  warning: {}: {}", warning.item, warning.message);
    }
}
