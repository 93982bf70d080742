//! Core engine: the fetch, parse, transform and write step.

pub mod ingest;
pub mod transform;
pub mod weather_codes;

pub use ingest::{IngestReport, IngestStep};
