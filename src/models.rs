//! Data models for articles as they move through the pipeline.
//!
//! - [`ArticleStub`]: a search hit before any content is fetched
//! - [`ScrapedArticle`]: a stub after extraction and summarization
//! - [`ReportSection`]: one titled block of a composed report
//!
//! `ScrapedArticle::word_count == 0` is the only extraction-failure signal;
//! every aggregate in the crate goes through [`ScrapedArticle::is_successful`].

use crate::utils::truncate_chars;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Characters of extracted text kept on a [`ScrapedArticle`].
pub const STORED_CONTENT_CHARS: usize = 2000;

/// Summary recorded when no text could be extracted from a URL.
pub const UNSCRAPED_SUMMARY: &str = "Could not scrape content from this URL";

/// A lightweight search result, produced by the search stage.
///
/// Identity is the URL; duplicates returned by the search backend are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleStub {
    pub title: String,
    /// Snippet supplied by the search backend.
    pub summary: String,
    pub url: String,
    pub discovered_at: DateTime<Local>,
}

/// An article after the extraction + summarization stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedArticle {
    pub original_title: String,
    pub url: String,
    pub original_summary: String,
    /// Extracted text (first [`STORED_CONTENT_CHARS`] characters), empty on failure.
    pub full_content: String,
    pub ai_summary: String,
    pub scraped_at: DateTime<Local>,
    /// Words in the extracted text; zero means extraction failed.
    pub word_count: usize,
}

impl ScrapedArticle {
    /// Build the record for a stub whose text was extracted.
    pub fn extracted(
        stub: &ArticleStub,
        content: &str,
        ai_summary: String,
        scraped_at: DateTime<Local>,
    ) -> Self {
        Self {
            original_title: stub.title.clone(),
            url: stub.url.clone(),
            original_summary: stub.summary.clone(),
            full_content: truncate_chars(content, STORED_CONTENT_CHARS).to_string(),
            ai_summary,
            scraped_at,
            word_count: content.split_whitespace().count(),
        }
    }

    /// Build the placeholder record for a stub whose extraction failed.
    pub fn failed(
        stub: &ArticleStub,
        reason: impl Into<String>,
        scraped_at: DateTime<Local>,
    ) -> Self {
        Self {
            original_title: stub.title.clone(),
            url: stub.url.clone(),
            original_summary: stub.summary.clone(),
            full_content: String::new(),
            ai_summary: reason.into(),
            scraped_at,
            word_count: 0,
        }
    }

    pub fn is_successful(&self) -> bool {
        self.word_count > 0
    }

    /// Host (and port, when present) of the article URL.
    pub fn host(&self) -> Option<String> {
        let parsed = url::Url::parse(&self.url).ok()?;
        let host = parsed.host_str()?;
        Some(match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        })
    }
}

/// Keep only the articles whose extraction succeeded, preserving order.
pub fn successful(articles: &[ScrapedArticle]) -> Vec<&ScrapedArticle> {
    articles.iter().filter(|a| a.is_successful()).collect()
}

/// One titled block of a composed report.
///
/// A leading block that precedes any heading has an empty title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSection {
    pub title: String,
    pub body: String,
}

impl ReportSection {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}
