//! OCR command.

use console::style;

use super::convert::{build_client, common_options};
use crate::cli::helpers;
use crate::cli::ProcessArgs;
use crate::models::OcrOptions;
use crate::settings::Settings;

/// OCR a local file or directory.
pub async fn cmd_ocr(settings: &Settings, path: &str, process: ProcessArgs) -> anyhow::Result<()> {
    let output_dir = helpers::setup_output_directory(process.output_dir.as_deref())?;
    let extensions = helpers::parse_extensions(process.extensions.as_deref());
    let collection = helpers::collection_for_path("", path, extensions.as_deref())?;

    if collection.is_empty() {
        eprintln!("{} No supported files found in {}", style("✗").red(), path);
        std::process::exit(1);
    }
    println!(
        "{} Found {} file(s) to process",
        style("→").cyan(),
        collection.len()
    );

    let client = build_client(settings, &process)?;
    let options = OcrOptions {
        common: common_options(&process),
    };

    let bar = helpers::batch_spinner("Running OCR on", collection.len());
    let summary = collection
        .ocr_all(&client, options, Some(&output_dir), process.max_concurrent)
        .await?;
    bar.finish_and_clear();

    let code = helpers::print_summary(&summary, "OCR", &output_dir);
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
