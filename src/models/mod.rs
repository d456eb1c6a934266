//! Data models for the Datalab SDK.

mod options;
mod results;
mod workflow;

pub use options::{
    ConvertOptions, FormOptions, OcrOptions, OutputFormat, ProcessingMode, ProcessingOptions,
};
pub use results::{ConversionResult, OcrPage, OcrResult, TextLine};
pub use workflow::{InputConfig, Workflow, WorkflowExecution, WorkflowStep};
