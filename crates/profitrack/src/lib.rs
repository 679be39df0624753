pub mod config;
pub mod error;
pub mod reporting;
pub mod scoring;
pub mod telemetry;
