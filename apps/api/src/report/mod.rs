// Report generation: ordered sections per questionnaire, pagination onto US-letter
// pages, and Markdown snapshots exported to S3.
// Pagination is CPU-bound and runs inside tokio::task::spawn_blocking.

pub mod export;
pub mod font_metrics;
pub mod handlers;
pub mod paginate;
pub mod sections;

pub use font_metrics::{default_page_config, FontFamily, PageConfig};
