//! Result aggregation engine.
//!
//! Correlation of records to profiles, per-control aggregation with
//! severity tracking, and the two statistic rollups.

pub mod aggregator;
pub mod classifier;
pub mod index;
pub mod summary;

pub use aggregator::{Control, ControlAggregator};
pub use index::{ProfileIndex, ProfileRef};
pub use summary::{profile_summary, tests_summary};
