//! HTTP handlers for the affiliation service.

pub mod affiliation;
pub mod health;
pub mod metrics;

pub use affiliation::*;
pub use health::*;
pub use metrics::*;
