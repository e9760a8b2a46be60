//! Event ingestion pipeline: input lines -> Event -> Dispatcher.

mod ingest;
mod stats;

pub use ingest::{IngestConfig, IngestPipeline};
pub use stats::IngestStats;
