mod bootstrap;

use std::path::Path;

use anyhow::Result;
use history_core::formatting::{format_listening_time, format_number};
use history_core::settings::Settings;
use history_data::analysis::{run_pipeline, PipelineOptions, PipelineOutcome};

fn main() -> Result<()> {
    let settings = Settings::load();
    settings.validate()?;

    bootstrap::setup_logging(&settings.log_level)?;
    tracing::info!("listening-history v{} starting", env!("CARGO_PKG_VERSION"));

    let outputs = settings.output_paths();
    bootstrap::ensure_directories(&outputs)?;

    let options = PipelineOptions {
        jobs: settings.jobs.map(|n| n as usize),
        active_minutes: settings.active_minutes,
    };

    match run_pipeline(&settings.input, &outputs, &options)? {
        PipelineOutcome::Written(report) => {
            let summary = &report.summary;
            tracing::info!(
                "{} plays, {} artists, {} active days",
                summary.total_plays,
                summary.unique_artists,
                summary.active_days
            );
            println!(
                "Wrote: {} and analytics to {}",
                report.canonical.path.display(),
                outputs.analytics_dir.display()
            );
            println!(
                "Listened {} ({} minutes) across {} plays, {} artists, {} active days",
                format_listening_time(summary.total_minutes),
                format_number(summary.total_minutes, 1),
                summary.total_plays,
                summary.unique_artists,
                summary.active_days
            );
            if report.files_skipped > 0 {
                println!("Skipped {} unreadable files", report.files_skipped);
            }
        }
        PipelineOutcome::NoData {
            files_found,
            files_skipped,
        } => {
            println!("{}", no_data_message(&settings.input, files_found, files_skipped));
        }
    }

    Ok(())
}

/// Explain an empty run: nothing discovered reads differently from files
/// that were found but yielded no usable records.
fn no_data_message(input: &Path, files_found: usize, files_skipped: usize) -> String {
    if files_found == 0 {
        format!(
            "No streaming history JSON files found. Put your unzipped export under {}",
            input.display()
        )
    } else if files_skipped == files_found {
        format!(
            "Found {} streaming history files under {} but none could be read",
            files_found,
            input.display()
        )
    } else {
        format!(
            "Found {} streaming history files under {} ({} unreadable) but no plays with a valid timestamp",
            files_found,
            input.display(),
            files_skipped
        )
    }
}
