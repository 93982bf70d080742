//! Persistence layer.
//!
//! Rows go to an append-only table through the `WeatherSink` trait. The
//! PostgreSQL implementation lives in [`postgres`].

pub mod postgres;

use async_trait::async_trait;

use crate::types::{IngestError, WeatherRow};

/// Append-only destination for a batch of rows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WeatherSink: Send + Sync {
    /// Append `rows` in one atomic call and return how many were written.
    /// Existing rows are never touched; appending the same batch twice
    /// stores it twice.
    async fn append(&self, rows: &[WeatherRow]) -> Result<u64, IngestError>;
}
