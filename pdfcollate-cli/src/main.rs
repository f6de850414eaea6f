//! pdfcollate - Collect pages from PDF files, rearrange them and merge the
//! selection into a single document.
//!
//! Each run is one session: every input is loaded page by page, the edits
//! from the command line are applied as collection commands, and the
//! current order is merged.

mod cli;

use clap::Parser;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::process;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use pdfcollate::artifact::{WriteOptions, can_write};
use pdfcollate::config::{Config, EditScript, OverwriteMode, PageRef};
use pdfcollate::error::PdfCollateError;
use pdfcollate::ingest::{IngestOutcome, IngestReport, Ingestor, Upload};
use pdfcollate::merge::{MergeOptions, MergeStatistics, Merger};
use pdfcollate::output::{
    IngestSummary, OutputFormatter, ProgressBar, display_ingest_summary, display_merge_summary,
};
use pdfcollate::render;
use pdfcollate::session::{
    Command, CommandOutcome, EventReceiver, PageEntry, PageId, Session, SessionEvent,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err}");
        process::exit(err.exit_code());
    }
}

/// Log to stderr. `RUST_LOG` wins over the verbosity flags.
fn init_tracing(cli: &Cli) {
    let default_level = if cli.verbose {
        "pdfcollate=debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// What `--json` prints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunSummary<'a> {
    ingest: IngestSummary,
    files: Vec<&'a IngestReport>,
    pages: &'a [PageEntry],
    dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    merge: Option<&'a MergeStatistics>,
}

/// Main application logic.
async fn run(cli: Cli) -> Result<(), PdfCollateError> {
    cli.validate()?;

    let all_inputs = cli.get_all_inputs().await?;
    let config = cli.to_config(all_inputs)?;

    let formatter = OutputFormatter::from_config(&config);

    if formatter.should_print() {
        formatter.section(&format!("{} v{}", pdfcollate::NAME, pdfcollate::VERSION));
        formatter.blank_line();
    }

    // Check the output before doing any work
    if !config.dry_run {
        can_write(&config.output).await?;
        handle_output_overwrite(&config, &formatter).await?;
    }

    let (session, mut events) = Session::new();

    formatter.info(&format!("Loading {} file(s)...", config.inputs.len()));
    let outcomes = ingest_inputs(&session, &mut events, &config, &formatter).await?;

    if formatter.should_print() {
        display_ingest_summary(&formatter, &outcomes);
        formatter.blank_line();
    }

    if !config.edits.is_empty() {
        let index = page_index(&session, &outcomes).await;
        apply_edits(&session, &config.edits, &index).await?;
    }

    let released = session.release_unused_files().await;
    if !released.is_empty() {
        formatter.detail("Released files", &released.len().to_string());
    }

    if let Some(ref dir) = config.thumbnails {
        let written = write_thumbnails(&session, dir).await?;
        formatter.info(&format!(
            "Wrote {written} thumbnail(s) to {}",
            dir.display()
        ));
    }

    let pages = session.snapshot().await;

    if config.dry_run {
        if config.json {
            print_json(&RunSummary {
                ingest: IngestSummary::from_outcomes(&outcomes),
                files: outcomes.iter().filter_map(IngestOutcome::report).collect(),
                pages: &pages,
                dry_run: true,
                output: None,
                merge: None,
            })?;
            return Ok(());
        }

        display_plan(&formatter, &pages);
        formatter.blank_line();
        formatter.success("Dry run completed successfully");
        formatter.info(&format!("  Output would be: {}", config.output.display()));
        formatter.info("  Run without --dry-run to create the merged PDF");
        return Ok(());
    }

    formatter.info(&format!("Merging {} page(s)...", pages.len()));

    let merger = Merger::with_options(MergeOptions::from_config(&config));
    let result = merger.merge(&session).await?;

    // Drain merge events; the result already carries everything they report
    while let Ok(event) = events.try_recv() {
        debug!(?event, "session event");
    }

    let write_options = WriteOptions {
        overwrite: config.overwrite_mode != OverwriteMode::NoClobber,
        ..Default::default()
    };
    let write_stats = result
        .artifact
        .write_to(&config.output, &write_options)
        .await?;
    session.artifacts().revoke(result.artifact.url()).await;

    if config.json {
        print_json(&RunSummary {
            ingest: IngestSummary::from_outcomes(&outcomes),
            files: outcomes.iter().filter_map(IngestOutcome::report).collect(),
            pages: &pages,
            dry_run: false,
            output: Some(&config.output),
            merge: Some(&result.statistics),
        })?;
        return Ok(());
    }

    if formatter.should_print() {
        display_merge_summary(&formatter, &result.statistics);
        formatter.success(&format!(
            "Successfully created {} ({})",
            config.output.display(),
            write_stats.format_file_size()
        ));

        if formatter.is_verbose() {
            let store = session.store().statistics().await;

            formatter.blank_line();
            formatter.section("Statistics");
            formatter.detail("Input files", &store.files.to_string());
            formatter.detail("Pages merged", &result.statistics.pages_merged.to_string());
            formatter.detail("Retained input", &pdfcollate::utils::format_file_size(store.retained_bytes));
            formatter.detail("Output size", &write_stats.format_file_size());
            formatter.detail("Render parses", &store.render_parses.to_string());
            formatter.detail("Merge parses", &store.merge_parses.to_string());
            formatter.detail(
                "Merge time",
                &format!("{:.2}s", result.statistics.merge_time.as_secs_f64()),
            );
            formatter.detail(
                "Write time",
                &format!("{:.2}s", write_stats.write_time.as_secs_f64()),
            );
            formatter.detail("Compression", &config.compression.to_string());

            if !config.metadata.is_empty() {
                formatter.detail("Metadata", "Set");
            }
        }
    }

    Ok(())
}

/// Read every input and feed it through ingestion, ticking a progress bar
/// as pages arrive.
async fn ingest_inputs(
    session: &Session,
    events: &mut EventReceiver,
    config: &Config,
    formatter: &OutputFormatter,
) -> Result<Vec<IngestOutcome>, PdfCollateError> {
    let ingestor = Ingestor::new(session.clone(), render::default_backend())
        .with_thumbnail_scale(config.thumbnail_scale);

    // Unreadable inputs keep their position so `file:page` numbering holds.
    let mut unreadable = Vec::with_capacity(config.inputs.len());
    let mut uploads = Vec::with_capacity(config.inputs.len());
    for path in config.inputs() {
        match Upload::from_path(path).await {
            Ok(upload) => {
                unreadable.push(None);
                uploads.push(upload);
            }
            Err(error) => {
                unreadable.push(Some(ingestor.unreadable(path.display().to_string(), error)));
            }
        }
    }

    let mut progress = if formatter.should_print() {
        ProgressBar::auto(0)
    } else {
        ProgressBar::disabled()
    };
    progress.set_message("Rendering pages");

    let batch = ingestor.ingest_batch(uploads);
    tokio::pin!(batch);

    let outcomes = loop {
        tokio::select! {
            outcomes = &mut batch => break outcomes,
            Some(event) = events.recv() => track_event(&event, &mut progress),
        }
    };
    while let Ok(event) = events.try_recv() {
        track_event(&event, &mut progress);
    }

    if progress.position() > 0 {
        progress.finish();
    } else {
        progress.clear();
    }

    let mut ingested = outcomes.into_iter();
    Ok(unreadable
        .into_iter()
        .filter_map(|failed| failed.or_else(|| ingested.next()))
        .collect())
}

fn track_event(event: &SessionEvent, progress: &mut ProgressBar) {
    match event {
        SessionEvent::PageAppended { .. } => progress.increment(),
        event if event.is_failure() => debug!(?event, "ingestion failure"),
        _ => {}
    }
}

/// Map `file:page` references to the ids ingestion gave those pages.
///
/// Files are numbered by input position, including inputs that were
/// skipped or failed to load.
async fn page_index(session: &Session, outcomes: &[IngestOutcome]) -> HashMap<PageRef, PageId> {
    session
        .with_pages(|pages| {
            let mut index = HashMap::new();
            for (position, outcome) in outcomes.iter().enumerate() {
                let Some(report) = outcome.report() else {
                    continue;
                };
                for entry in pages.pages_for_file(report.file_id) {
                    index.insert(
                        PageRef::new(position as u32 + 1, entry.page_number),
                        entry.id,
                    );
                }
            }
            index
        })
        .await
}

fn resolve(index: &HashMap<PageRef, PageId>, reference: PageRef) -> Result<PageId, PdfCollateError> {
    index
        .get(&reference)
        .copied()
        .ok_or_else(|| PdfCollateError::InvalidPageReference {
            reference: reference.to_string(),
            details: "no such page was loaded".to_string(),
        })
}

/// Apply the edit script as session commands: remove, select, rotate.
async fn apply_edits(
    session: &Session,
    edits: &EditScript,
    index: &HashMap<PageRef, PageId>,
) -> Result<(), PdfCollateError> {
    for &reference in &edits.remove {
        let page_id = resolve(index, reference)?;
        session.apply(Command::Remove(page_id)).await?;
    }

    if let Some(ref select) = edits.select {
        let ids = select
            .iter()
            .map(|&reference| resolve(index, reference))
            .collect::<Result<Vec<_>, _>>()?;
        if let CommandOutcome::Reordered { dropped } = session.apply(Command::Reorder(ids)).await?
            && dropped > 0
        {
            warn!(dropped, "selection named removed or repeated pages");
        }
    }

    for edit in &edits.rotate {
        let page_id = resolve(index, edit.target)?;
        let outcome = session
            .apply(Command::Rotate {
                page_id,
                delta: edit.degrees,
            })
            .await?;
        if matches!(outcome, CommandOutcome::Rotated(None)) {
            warn!(page = %edit.target, "rotation for a page that is no longer selected");
        }
    }

    Ok(())
}

/// Write the thumbnail of every page, in collection order.
async fn write_thumbnails(session: &Session, dir: &Path) -> Result<usize, PdfCollateError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| PdfCollateError::FailedToWrite {
            path: dir.to_path_buf(),
            source,
        })?;

    let pages = session.snapshot().await;
    for (position, entry) in pages.iter().enumerate() {
        let name = format!(
            "{:03}-file{}-page{}.png",
            position + 1,
            entry.file_id,
            entry.page_number
        );
        entry.thumbnail.write_png(&dir.join(name)).await?;
    }

    Ok(pages.len())
}

fn display_plan(formatter: &OutputFormatter, pages: &[PageEntry]) {
    formatter.section("Merge plan");
    for (position, entry) in pages.iter().enumerate() {
        if entry.rotation.is_none() {
            formatter.info(&format!("{:>4}. {}", position + 1, entry.label));
        } else {
            formatter.info(&format!(
                "{:>4}. {} (rotated {})",
                position + 1,
                entry.label,
                entry.rotation
            ));
        }
    }
    if pages.len() < pdfcollate::merge::MIN_MERGE_PAGES {
        formatter.warning("Please add at least two pages to merge");
    }
}

fn print_json(summary: &RunSummary<'_>) -> Result<(), PdfCollateError> {
    let json = serde_json::to_string_pretty(summary)
        .map_err(|e| PdfCollateError::other(format!("Failed to serialize summary: {e}")))?;
    println!("{json}");
    Ok(())
}

/// Handle output file overwrite scenarios.
async fn handle_output_overwrite(
    config: &Config,
    formatter: &OutputFormatter,
) -> Result<(), PdfCollateError> {
    if !tokio::fs::try_exists(&config.output).await.unwrap_or(false) {
        return Ok(());
    }

    match config.overwrite_mode {
        OverwriteMode::Force => Ok(()),
        OverwriteMode::NoClobber => Err(PdfCollateError::output_exists(config.output.clone())),
        OverwriteMode::Prompt => {
            // Nobody to ask in quiet or JSON mode
            if formatter.is_quiet() {
                return Err(PdfCollateError::output_exists(config.output.clone()));
            }

            formatter.warning(&format!(
                "Output file already exists: {}",
                config.output.display()
            ));

            use std::io::{self, Write};
            print!("Overwrite? [y/N]: ");
            io::stdout().flush().ok();

            let mut response = String::new();
            io::stdin()
                .read_line(&mut response)
                .map_err(|err| PdfCollateError::other(format!("Failed to read input: {err}")))?;

            let response = response.trim().to_lowercase();
            if response == "y" || response == "yes" {
                Ok(())
            } else {
                Err(PdfCollateError::Cancelled)
            }
        }
    }
}
