//! Command implementations.

pub mod convert;
pub mod ocr;
pub mod workflow;
