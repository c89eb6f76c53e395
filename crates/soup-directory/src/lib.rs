pub mod config;
pub mod directory;
pub mod error;
pub mod telemetry;
