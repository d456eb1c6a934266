//! Rust SDK for the Datalab document processing API.
//!
//! Submit documents for conversion or OCR, poll for results, run batches
//! with bounded concurrency, and manage server-side workflows. The async
//! client is the primary interface; [`DatalabClient`] wraps it for
//! synchronous callers.

pub mod cli;
pub mod client;
pub mod collections;
pub mod error;
pub mod mime;
pub mod models;
pub mod settings;
pub mod sources;

pub use client::{AsyncDatalabClient, DatalabClient, PollConfig};
pub use collections::{Collection, CollectionResult, ItemResult};
pub use error::{DatalabError, Result};
pub use models::{
    ConversionResult, ConvertOptions, InputConfig, OcrOptions, OcrResult, OutputFormat,
    ProcessingMode, ProcessingOptions, Workflow, WorkflowExecution, WorkflowStep,
};
pub use settings::{load_settings, Settings};
pub use sources::SourceKind;
