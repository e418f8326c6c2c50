//! Report metrics and rendering.

pub mod generator;
pub mod metrics;

pub use generator::{generate_json_report, generate_markdown_report, generate_text_report};
pub use metrics::{Percent, ReportMetrics};
