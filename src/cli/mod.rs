//! CLI parser and command dispatch.

mod commands;
mod helpers;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::models::{OutputFormat, ProcessingMode};
use crate::settings::load_settings;

#[derive(Parser)]
#[command(name = "datalab")]
#[command(about = "Datalab document processing API client")]
#[command(version)]
pub struct Cli {
    /// Config file path (default: ~/.config/datalab/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API key (overrides config file and environment)
    #[arg(long, global = true, hide_env_values = true, env = "DATALAB_API_KEY")]
    api_key: Option<String>,

    /// API base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

/// Options shared by the convert and ocr commands.
#[derive(Args)]
pub struct ProcessArgs {
    /// Output directory (default: current directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Maximum number of pages to process per document
    #[arg(long)]
    max_pages: Option<u32>,

    /// Page range to process (e.g. "0-2" or "0,1,2")
    #[arg(long)]
    page_range: Option<String>,

    /// Skip the server-side cache when running inference
    #[arg(long)]
    skip_cache: bool,

    /// Comma-separated extension filter for directory inputs
    #[arg(long)]
    extensions: Option<String>,

    /// Maximum concurrent requests
    #[arg(long, default_value = "5")]
    max_concurrent: usize,

    /// Maximum polling attempts per job
    #[arg(long, default_value = "300")]
    max_polls: usize,

    /// Polling interval in seconds
    #[arg(long, default_value = "1")]
    poll_interval: u64,
}

/// Options specific to the convert command.
#[derive(Args)]
pub struct ConvertArgs {
    /// Output format
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Markdown)]
    format: OutputFormat,

    /// Speed/accuracy mode
    #[arg(long, value_enum, default_value_t = ProcessingMode::Fast)]
    mode: ProcessingMode,

    /// Force OCR on every page
    #[arg(long)]
    force_ocr: bool,

    /// Partially OCR lines for better formatting
    #[arg(long)]
    format_lines: bool,

    /// Add page delimiters to output
    #[arg(long)]
    paginate: bool,

    /// Use an LLM to enhance accuracy
    #[arg(long)]
    use_llm: bool,

    /// Remove existing OCR text and redo OCR
    #[arg(long)]
    strip_existing_ocr: bool,

    /// Disable extraction of images
    #[arg(long)]
    disable_image_extraction: bool,

    /// Custom prompt for block correction
    #[arg(long)]
    block_correction_prompt: Option<String>,

    /// JSON schema for structured extraction (inline JSON or a file path)
    #[arg(long)]
    page_schema: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert documents to markdown, HTML, JSON, or chunks
    Convert {
        /// File, directory, or URL to process
        path: String,
        #[command(flatten)]
        process: ProcessArgs,
        #[command(flatten)]
        convert: ConvertArgs,
    },

    /// Perform OCR on local documents
    Ocr {
        /// File or directory to process
        path: String,
        #[command(flatten)]
        process: ProcessArgs,
    },

    /// Manage workflows and executions
    Workflow {
        #[command(subcommand)]
        command: WorkflowCommands,
    },
}

#[derive(Subcommand)]
enum WorkflowCommands {
    /// Create a new workflow
    Create {
        /// Name of the workflow
        #[arg(long)]
        name: String,
        /// Workflow steps as inline JSON or a path to a JSON file
        #[arg(long)]
        steps: String,
    },

    /// List the team's workflows
    List,

    /// Show a workflow's configuration
    Show {
        /// Workflow ID
        workflow_id: i64,
    },

    /// Trigger a workflow execution
    Execute {
        /// Workflow ID
        workflow_id: i64,
        /// Input configuration as inline JSON or a path to a JSON file
        #[arg(long)]
        input_config: String,
    },

    /// Check the status of an execution
    Status {
        /// Execution ID
        execution_id: i64,
        /// Poll until the execution reaches a terminal state
        #[arg(long)]
        wait: bool,
        /// Maximum polling attempts when waiting
        #[arg(long, default_value = "300")]
        max_polls: usize,
        /// Polling interval in seconds when waiting
        #[arg(long, default_value = "1")]
        poll_interval: u64,
        /// Save the final execution state to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_ref())?;
    if let Some(key) = cli.api_key {
        settings.api_key = Some(key);
    }
    if let Some(url) = cli.base_url {
        settings.base_url = url.trim_end_matches('/').to_string();
    }

    match cli.command {
        Commands::Convert {
            path,
            process,
            convert,
        } => commands::convert::cmd_convert(&settings, &path, process, convert).await,
        Commands::Ocr { path, process } => {
            commands::ocr::cmd_ocr(&settings, &path, process).await
        }
        Commands::Workflow { command } => match command {
            WorkflowCommands::Create { name, steps } => {
                commands::workflow::cmd_create(&settings, &name, &steps).await
            }
            WorkflowCommands::List => commands::workflow::cmd_list(&settings).await,
            WorkflowCommands::Show { workflow_id } => {
                commands::workflow::cmd_show(&settings, workflow_id).await
            }
            WorkflowCommands::Execute {
                workflow_id,
                input_config,
            } => commands::workflow::cmd_execute(&settings, workflow_id, &input_config).await,
            WorkflowCommands::Status {
                execution_id,
                wait,
                max_polls,
                poll_interval,
                output,
            } => {
                commands::workflow::cmd_status(
                    &settings,
                    execution_id,
                    wait,
                    max_polls,
                    poll_interval,
                    output.as_deref(),
                )
                .await
            }
        },
    }
}
