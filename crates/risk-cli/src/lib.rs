//! I/O side of the risk classifier: configuration, the elevation service
//! client, reference-layer loading, grid generation and result files.

pub mod backoff;
pub mod config;
pub mod elevation;
pub mod grid;
pub mod layers;
pub mod output;

pub use backoff::{Backoff, RetryPolicy};
pub use config::Config;
pub use elevation::HttpElevationSource;
