//! CLI smoke entry point.
//!
//! # Responsibility
//! - Open a store, seed sample data on the background path and merge it.
//! - Print the notebook list with note counts for quick local checks.
//!
//! Usage: `notebooks [store_dir]` (defaults to a directory under the system
//! temp dir).

use notebooks_core::format::short_date;
use notebooks_core::service::notebook_service::notebook_summaries;
use notebooks_core::service::sample_data::seed_notebook_with_notes_in_background;
use notebooks_core::{core_version, init_logging, DataController, LogLevel, StoreConfig};
use std::path::PathBuf;
use std::process::ExitCode;

const SCHEMA_NAME: &str = "Notebooks";
// 1x1 PNG used as the sample notebook cover.
const SAMPLE_COVER_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0xF8,
    0xCF, 0xC0, 0xF0, 0x1F, 0x00, 0x05, 0x00, 0x01, 0xFF, 0x89, 0x99, 0x3D, 0x1D, 0x00, 0x00,
    0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

fn main() -> ExitCode {
    println!("notebooks_core version={}", core_version());

    let store_dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("notebooks-cli"));
    let store_dir = match std::path::absolute(&store_dir) {
        Ok(path) => path,
        Err(err) => {
            eprintln!("invalid store directory `{}`: {err}", store_dir.display());
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = init_logging(
        LogLevel::default_for_build().as_str(),
        store_dir.join("logs"),
    ) {
        eprintln!("logging disabled: {err}");
    }

    let config = match StoreConfig::new(SCHEMA_NAME, &store_dir) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid store config: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut controller = match DataController::load(config) {
        Ok(controller) => controller,
        Err(err) => {
            eprintln!("failed to load store: {err}");
            return ExitCode::FAILURE;
        }
    };
    println!("store={}", controller.store_path().display());

    let seeded = seed_notebook_with_notes_in_background(&controller, Some(SAMPLE_COVER_PNG.to_vec()))
        .and_then(|task| task.wait())
        .and_then(|result| result);
    if let Err(err) = seeded {
        eprintln!("failed to seed sample data: {err}");
        return ExitCode::FAILURE;
    }

    let merged = controller.merge_changes();
    println!("merged_change_sets={}", merged.len());

    match notebook_summaries(controller.view_context()) {
        Ok(summaries) => {
            for summary in summaries {
                println!(
                    "{}\t{}\tnotes={}\tcover={}",
                    short_date(summary.notebook.created_at).unwrap_or_default(),
                    summary.notebook.title,
                    summary.note_count,
                    summary.cover.map_or(0, |cover| cover.byte_len)
                );
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("failed to list notebooks: {err}");
            ExitCode::FAILURE
        }
    }
}
