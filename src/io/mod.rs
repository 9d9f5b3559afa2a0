//! IO modules - external data in and out
//!
//! - `ingest` - transaction table reader (delimited export or workbook)
//! - `egress` - overlay document writer (GeoJSON / JSON)

pub mod egress;
pub mod ingest;

// Re-export commonly used types
pub use egress::{write_overlay, EgressError, OutputFormat};
pub use ingest::{
    read_transactions, read_workbook, IngestError, IngestReport, InputFormat, InputSettings, SkipTally,
};
