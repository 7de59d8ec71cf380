//! # News Analyst
//!
//! Researches a news topic end to end and writes a formatted report.
//!
//! ## Architecture
//!
//! A run is a fixed sequence of stages, each recorded in a
//! [`PipelineRun`](pipeline::PipelineRun):
//! 1. **check_internet**: probe a known URL; abort the run when offline
//! 2. **search_news**: DuckDuckGo results for the topic
//! 3. **scrape_articles**: extract each page and summarize it with the LLM
//! 4. **generate_report**: one consolidated report over the successful articles
//! 5. **analyze_news**: key insights from the search snippets
//! 6. **generate_document**: assemble the [`DocumentTree`](document::DocumentTree) and render it
//!
//! Stage failures are data, not errors: later stages see what earlier ones
//! produced and degrade to placeholder text. Only a render failure surfaces
//! as `Err` from [`Pipeline::run`](pipeline::Pipeline::run).
//!
//! ## Usage
//!
//! ```no_run
//! use news_analyst::config::Settings;
//! use news_analyst::pipeline::{RunLimits, build_pipeline};
//!
//! # async fn demo() -> news_analyst::error::Result<()> {
//! let settings = Settings::default();
//! let pipeline = build_pipeline(&settings, std::env::var("OPENAI_API_KEY").ok())?;
//! let report = pipeline.run("semiconductor export rules", RunLimits::quick()).await?;
//! println!("{}", report.outcome);
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod api;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod models;
pub mod outputs;
pub mod pipeline;
pub mod sources;
pub mod stats;
pub mod utils;
