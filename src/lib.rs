//! meteo-ingest: hourly Open-Meteo forecast ingestion.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod forecast;
pub mod engine;
pub mod storage;
pub mod schedule;
