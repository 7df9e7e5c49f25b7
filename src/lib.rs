//! Stress journal: aggregation and statistics over timestamped stress logs.

pub mod analysis;
pub mod buckets;
pub mod db;
pub mod models;
pub mod report;
pub mod stats;
pub mod store;
pub mod window;
