//! Convert command.

use std::time::Duration;

use console::style;

use crate::cli::helpers;
use crate::cli::{ConvertArgs, ProcessArgs};
use crate::client::AsyncDatalabClient;
use crate::models::{ConvertOptions, ProcessingOptions};
use crate::settings::Settings;

/// Convert a file, directory, or URL.
pub async fn cmd_convert(
    settings: &Settings,
    path: &str,
    process: ProcessArgs,
    args: ConvertArgs,
) -> anyhow::Result<()> {
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
    let options = build_options(&args, &process)?;

    let bar = helpers::batch_spinner("Converting", collection.len());
    let summary = collection
        .convert_all(&client, options, Some(&output_dir), process.max_concurrent)
        .await?;
    bar.finish_and_clear();

    let code = helpers::print_summary(&summary, "Conversion", &output_dir);
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

/// Client with the command's poll budget applied.
pub(super) fn build_client(
    settings: &Settings,
    process: &ProcessArgs,
) -> crate::error::Result<AsyncDatalabClient> {
    let mut settings = settings.clone();
    settings.max_polls = process.max_polls;
    settings.poll_interval = Duration::from_secs(process.poll_interval);
    AsyncDatalabClient::from_settings(&settings)
}

pub(super) fn common_options(process: &ProcessArgs) -> ProcessingOptions {
    ProcessingOptions {
        max_pages: process.max_pages,
        page_range: process.page_range.clone(),
        skip_cache: process.skip_cache,
        ..Default::default()
    }
}

fn build_options(args: &ConvertArgs, process: &ProcessArgs) -> crate::error::Result<ConvertOptions> {
    let page_schema = args
        .page_schema
        .as_deref()
        .map(helpers::read_json_arg)
        .transpose()?;

    Ok(ConvertOptions {
        common: common_options(process),
        output_format: args.format,
        mode: args.mode,
        force_ocr: args.force_ocr,
        format_lines: args.format_lines,
        paginate: args.paginate,
        use_llm: args.use_llm,
        strip_existing_ocr: args.strip_existing_ocr,
        disable_image_extraction: args.disable_image_extraction,
        block_correction_prompt: args.block_correction_prompt.clone(),
        page_schema,
        additional_config: None,
    })
}
