//! Output generation for finished runs.
//!
//! # Submodules
//!
//! - [`markdown`]: the [`DocumentRenderer`] trait and the Markdown renderer
//! - [`json`]: optional JSON dump of the [`PipelineRun`](crate::pipeline::PipelineRun)
//! - [`indexes`]: the append-only `reports_index.md`
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── News_Analysis_chips_20250506_091500.md     # rendered report
//! ├── News_Analysis_chips_20250506_091500.json   # run dump (write_run_json)
//! └── reports_index.md                           # every report (update_index)
//! ```
//!
//! Only the rendered report is required; the side outputs are best-effort.

pub mod indexes;
pub mod json;
pub mod markdown;

pub use markdown::{DocumentRenderer, MarkdownRenderer};

use crate::utils::sanitize_topic;
use chrono::{DateTime, Local};

/// File name for a report on `topic` generated at `at`.
pub fn report_filename(topic: &str, at: DateTime<Local>, extension: &str) -> String {
    format!(
        "News_Analysis_{}_{}.{extension}",
        sanitize_topic(topic),
        at.format("%Y%m%d_%H%M%S")
    )
}
