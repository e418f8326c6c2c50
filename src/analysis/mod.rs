//! Aggregation of classified worklogs into member and squad reports.

pub mod aggregator;
pub mod pipeline;

pub use aggregator::*;
pub use pipeline::{Pipeline, PipelineOptions};
