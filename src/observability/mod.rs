//! # Observability
//!
//! Prometheus metrics collection. Tracing is initialized in `main`.

pub mod metrics;

// Re-export for convenience
pub use metrics::*;
