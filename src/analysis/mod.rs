//! Language-model backed analysis of scraped news.
//!
//! - [`summarize`]: per-article synopsis
//! - [`insights`]: free-form answer to a question about the search hits
//! - [`report`]: multi-section narrative report and its section parser
//!
//! Each component matches on [`TextBackend`](crate::api::TextBackend) and
//! takes a deterministic path when no model is configured. None of them
//! return errors: backend failures become explanatory text on the result.

pub mod insights;
pub mod report;
pub mod summarize;

pub use insights::{Analysis, analyze};
pub use report::{ComposedReport, compose_report, parse_report_sections};
pub use summarize::summarize;
