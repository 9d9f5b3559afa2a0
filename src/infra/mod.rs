//! Infrastructure - configuration and metrics
//!
//! - `config` - Application configuration (TOML loading, defaults, overrides)
//! - `metrics` - Pipeline run counters

pub mod config;
pub mod metrics;

// Re-export commonly used types
pub use config::Config;
pub use metrics::{PipelineMetrics, PipelineSummary};
