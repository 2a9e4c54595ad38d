//! Export pipeline: reconcile each symbol, convert to the export timezone, write one CSV.

pub mod pipeline;
pub mod progress;
pub mod writer;

pub use pipeline::{ExportPipeline, ExportReport, SymbolOutcome, SymbolReport};
pub use progress::{ExportProgress, SilentProgress, StdoutProgress};
pub use writer::{export_file_name, ExportError, PROCESSED_DATA_DIR};
