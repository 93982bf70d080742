//! Forecast sources.
//!
//! Defines the `ForecastSource` trait and the Open-Meteo implementation.

pub mod open_meteo;

use async_trait::async_trait;

use crate::types::{ForecastRequest, HourlySeries, IngestError};

/// Abstraction over the hourly forecast endpoint.
///
/// One call is one network request. Implementations classify failures:
/// transport and status problems as [`IngestError::Network`], bodies of the
/// wrong shape as [`IngestError::DataFormat`]. They never retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ForecastSource: Send + Sync {
    /// Fetch the hourly series for `request`.
    async fn fetch_hourly(&self, request: &ForecastRequest) -> Result<HourlySeries, IngestError>;
}
