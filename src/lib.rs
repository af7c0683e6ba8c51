//! Spotify listening-history ETL and weekly recap.
//!
//! This library exposes the pipeline stages for the binary and for testing.

pub mod config;
pub mod load;
pub mod pipeline;
pub mod report;
pub mod spotify;
pub mod sqlite_persistence;
pub mod transform;

// Re-export commonly used types for convenience
pub use load::{LoadError, LoadReport, MusicStore};
pub use pipeline::{local_today, run_ingest, run_report, IngestSettings, PipelineError};
pub use spotify::{SpotifyApi, SpotifyClient};
pub use transform::{transform, Batch, TransformSettings};
