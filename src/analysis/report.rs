//! Multi-article narrative reports.
//!
//! [`compose_report`] turns the successfully scraped articles into a
//! five-section executive report (Executive Summary, Major Themes, Key
//! Developments, Analysis & Insights, Sources Summary). Without a model it
//! synthesizes a minimal report from counts and an excerpt of the context.
//!
//! [`parse_report_sections`] splits report text back into titled sections
//! for document assembly.

use crate::api::{AskAsync, Prompt, TextBackend};
use crate::models::{ReportSection, ScrapedArticle, successful};
use crate::utils::{truncate_chars, with_thousands};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

pub const NO_SUCCESSFUL_ARTICLES: &str = "No successfully scraped articles to generate report from";

/// Characters of the combined article context quoted by the fallback report.
const FALLBACK_EXCERPT_CHARS: usize = 1000;

/// Output of the report stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedReport {
    pub success: bool,
    pub report: String,
    /// Successfully scraped articles that fed the report.
    pub articles_analyzed: usize,
    /// All scraped articles handed to the composer.
    pub total_articles: usize,
    pub topic: String,
    pub generated_at: DateTime<Local>,
    pub error: Option<String>,
}

impl ComposedReport {
    fn failed(
        topic: &str,
        total_articles: usize,
        error: impl Into<String>,
        report: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            report: report.into(),
            articles_analyzed: 0,
            total_articles,
            topic: topic.to_string(),
            generated_at: Local::now(),
            error: Some(error.into()),
        }
    }

    /// The failed result recorded when no article was scraped successfully.
    pub fn no_successful_articles(topic: &str, total_articles: usize) -> Self {
        Self::failed(
            topic,
            total_articles,
            NO_SUCCESSFUL_ARTICLES,
            "Unable to generate report - no articles were successfully scraped.",
        )
    }

    /// Report text split into titled sections.
    pub fn sections(&self) -> Vec<ReportSection> {
        parse_report_sections(&self.report)
    }
}

/// Compose a report on `topic` from the scraped articles.
#[instrument(level = "info", skip_all, fields(%topic, articles = articles.len()))]
pub async fn compose_report<A: AskAsync>(
    backend: &TextBackend<A>,
    articles: &[ScrapedArticle],
    topic: &str,
    generated_at: DateTime<Local>,
) -> ComposedReport {
    if articles.is_empty() {
        let reason = "No scraped articles provided for report generation";
        return ComposedReport::failed(topic, 0, reason, "");
    }
    let usable = successful(articles);
    if usable.is_empty() {
        return ComposedReport::no_successful_articles(topic, articles.len());
    }

    let context = article_context(&usable);
    info!(successful = usable.len(), "Composing report");

    let report = match backend {
        TextBackend::Live { client, .. } => {
            match client.ask(&report_prompt(topic, usable.len(), &context)).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Report generation failed");
                    let reason = format!("Report generation failed: {e}");
                    return ComposedReport::failed(topic, articles.len(), reason, "");
                }
            }
        }
        TextBackend::Fallback => fallback_report(topic, &usable, &context),
    };

    ComposedReport {
        success: true,
        report,
        articles_analyzed: usable.len(),
        total_articles: articles.len(),
        topic: topic.to_string(),
        generated_at,
        error: None,
    }
}

/// Title, source, word count and summary of every article, one block each.
fn article_context(articles: &[&ScrapedArticle]) -> String {
    articles
        .iter()
        .enumerate()
        .map(|(i, a)| {
            format!(
                "\nArticle {}: {}\nSource: {}\nWord Count: {}\nSummary: {}\n",
                i + 1,
                a.original_title,
                a.url,
                a.word_count,
                a.ai_summary
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn report_prompt(topic: &str, count: usize, context: &str) -> Prompt {
    Prompt {
        system: "You are an expert news analyst creating executive-level reports. \
                 Be comprehensive, insightful, and professional."
            .to_string(),
        user: format!(
            "Create a comprehensive news analysis report based on these article summaries:\n\n\
             Topic: {topic}\n\
             Number of articles analyzed: {count}\n\n\
             {context}\n\n\
             Generate a professional report with:\n\
             1. **Executive Summary** - Key findings and trends\n\
             2. **Major Themes** - Common topics and patterns\n\
             3. **Key Developments** - Most important news items\n\
             4. **Analysis & Insights** - What these developments mean\n\
             5. **Sources Summary** - Brief overview of sources used\n\n\
             Format as a clear, well-structured report suitable for executive briefing."
        ),
        max_tokens: 1200,
        temperature: 0.3,
    }
}

fn fallback_report(topic: &str, articles: &[&ScrapedArticle], context: &str) -> String {
    let total_words: usize = articles.iter().map(|a| a.word_count).sum();
    format!(
        "**Executive Summary**\n\
         Analysis of {count} articles about {topic}.\n\n\
         **Major Themes**\n\
         Based on {count} scraped articles with a total of {words} words analyzed.\n\n\
         **Key Developments**\n\
         {excerpt}\n\n\
         **Note**: Full AI analysis unavailable (no API key configured)\n",
        count = articles.len(),
        words = with_thousands(total_words),
        excerpt = truncate_chars(context, FALLBACK_EXCERPT_CHARS),
    )
}

/// Split report text into ordered `(title, body)` sections.
///
/// A line wrapped in `**` or starting with `#` opens a new section and
/// flushes the previous one. Text before the first heading becomes a section
/// with an empty title; whitespace-only preambles are dropped. Bodies are
/// trimmed.
pub fn parse_report_sections(text: &str) -> Vec<ReportSection> {
    let mut sections = Vec::new();
    let mut title = String::new();
    let mut body = String::new();

    for line in text.lines() {
        let marker = line.trim();
        let heading = if is_bold_line(marker) {
            Some(unbold(marker))
        } else if marker.starts_with('#') {
            Some(unbold(marker.trim_matches('#').trim()))
        } else {
            None
        };

        match heading {
            Some(next) => {
                flush(&mut sections, &title, &body);
                title = next.to_string();
                body.clear();
            }
            None => {
                body.push_str(line);
                body.push('\n');
            }
        }
    }
    flush(&mut sections, &title, &body);
    sections
}

fn is_bold_line(line: &str) -> bool {
    line.len() >= 2 && line.starts_with("**") && line.ends_with("**")
}

/// Drop a surrounding `**...**` pair, if any.
fn unbold(text: &str) -> &str {
    if is_bold_line(text) {
        text.trim_matches('*').trim()
    } else {
        text
    }
}

fn flush(sections: &mut Vec<ReportSection>, title: &str, body: &str) {
    let body = body.trim();
    if !title.is_empty() || !body.is_empty() {
        sections.push(ReportSection::new(title, body));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::models::{ArticleStub, UNSCRAPED_SUMMARY};

    #[derive(Debug)]
    struct Fixed(&'static str);

    impl AskAsync for Fixed {
        async fn ask(&self, _prompt: &Prompt) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn article(url: &str, content: &str) -> ScrapedArticle {
        let stub = ArticleStub {
            title: format!("Title for {url}"),
            summary: String::new(),
            url: url.to_string(),
            discovered_at: Local::now(),
        };
        if content.is_empty() {
            ScrapedArticle::failed(&stub, UNSCRAPED_SUMMARY, Local::now())
        } else {
            ScrapedArticle::extracted(&stub, content, "AI summary".to_string(), Local::now())
        }
    }

    /// Re-serialize sections with bold markers.
    fn flatten(sections: &[ReportSection]) -> String {
        sections
            .iter()
            .map(|s| {
                if s.title.is_empty() {
                    format!("{}\n", s.body)
                } else {
                    format!("**{}**\n{}\n", s.title, s.body)
                }
            })
            .collect()
    }

    #[test]
    fn test_parse_bold_and_hash_markers() {
        let text = concat!(
            "Intro line\n**Executive Summary**\nThings happened.\nMore.\n",
            "## Major Themes\nTheme one\n",
        );
        let sections = parse_report_sections(text);
        assert_eq!(
            sections,
            vec![
                ReportSection::new("", "Intro line"),
                ReportSection::new("Executive Summary", "Things happened.\nMore."),
                ReportSection::new("Major Themes", "Theme one"),
            ]
        );
    }

    #[test]
    fn test_parse_without_markers_is_single_section() {
        let text = "Just a paragraph.\n\nAnd another one.";
        let sections = parse_report_sections(text);
        assert_eq!(sections, vec![ReportSection::new("", text)]);
    }

    #[test]
    fn test_parse_consecutive_markers_keep_empty_bodies() {
        let sections = parse_report_sections("# One\n# Two\n**Three**\nbody");
        let titles: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["One", "Two", "Three"]);
        assert_eq!(sections[0].body, "");
        assert_eq!(sections[1].body, "");
        assert_eq!(sections[2].body, "body");
    }

    #[test]
    fn test_parse_flushes_trailing_content() {
        let sections = parse_report_sections("**Only**\nlast line without newline");
        assert_eq!(sections, vec![ReportSection::new("Only", "last line without newline")]);
    }

    #[test]
    fn test_inline_bold_is_body_text() {
        let sections = parse_report_sections("**Note**: not a heading\n");
        assert_eq!(sections, vec![ReportSection::new("", "**Note**: not a heading")]);
    }

    #[test]
    fn test_parse_is_idempotent_on_flattened_output() {
        let text = concat!(
            "Preamble\n\n**Executive Summary**\nA.\n\nB.\n",
            "### Key Developments\n\n**Sources Summary**\nC\n",
        );
        let first = parse_report_sections(text);
        let second = parse_report_sections(&flatten(&first));
        assert_eq!(first, second);

        let mixed = "## **Executive Summary**\nA.\n# **Major Themes**\nB.\n";
        let first = parse_report_sections(mixed);
        assert_eq!(first[0].title, "Executive Summary");
        assert_eq!(first[1].title, "Major Themes");
        assert_eq!(parse_report_sections(&flatten(&first)), first);
    }

    #[test]
    fn test_parse_empty_text() {
        assert!(parse_report_sections("").is_empty());
        assert!(parse_report_sections("\n  \n").is_empty());
    }

    #[tokio::test]
    async fn test_compose_requires_successful_articles() {
        let backend: TextBackend<Fixed> = TextBackend::Fallback;
        let articles = vec![article("https://a.com/1", "")];
        let report = compose_report(&backend, &articles, "chips", Local::now()).await;
        assert!(!report.success);
        assert_eq!(report.error.as_deref(), Some(NO_SUCCESSFUL_ARTICLES));
        assert_eq!(report.total_articles, 1);
    }

    #[tokio::test]
    async fn test_compose_empty_input() {
        let backend: TextBackend<Fixed> = TextBackend::Fallback;
        let report = compose_report(&backend, &[], "chips", Local::now()).await;
        assert!(!report.success);
        assert!(report.report.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_report_is_deterministic() {
        let backend: TextBackend<Fixed> = TextBackend::Fallback;
        let articles = vec![
            article("https://a.com/1", &"word ".repeat(700)),
            article("https://b.com/2", ""),
            article("https://c.com/3", &"word ".repeat(600)),
        ];
        let report = compose_report(&backend, &articles, "chips", Local::now()).await;
        assert!(report.success);
        assert_eq!(report.articles_analyzed, 2);
        assert_eq!(report.total_articles, 3);
        assert!(report.report.contains("Analysis of 2 articles about chips."));
        assert!(report.report.contains("a total of 1,300 words analyzed"));
        assert!(report.report.contains("Article 1: Title for https://a.com/1"));
        assert!(!report.report.contains("https://b.com/2"));

        let titles: Vec<String> = report.sections().into_iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["Executive Summary", "Major Themes", "Key Developments"]);
    }

    #[derive(Debug)]
    struct Unavailable;

    impl AskAsync for Unavailable {
        async fn ask(&self, _prompt: &Prompt) -> Result<String> {
            Err(crate::error::Error::LlmStatus {
                status: 503,
                body: "overloaded".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_live_failure_is_reported() {
        let backend = TextBackend::Live {
            client: Unavailable,
            model: "m".to_string(),
        };
        let articles = vec![article("https://a.com/1", "some words here")];
        let report = compose_report(&backend, &articles, "chips", Local::now()).await;
        assert!(!report.success);
        assert!(report.report.is_empty());
        assert_eq!(report.total_articles, 1);
        let error = report.error.unwrap();
        assert!(error.starts_with("Report generation failed: "));
        assert!(error.contains("503"));
    }

    #[tokio::test]
    async fn test_live_report_text_is_returned() {
        let backend = TextBackend::Live {
            client: Fixed("**Executive Summary**\nAll good."),
            model: "m".to_string(),
        };
        let articles = vec![article("https://a.com/1", "some words here")];
        let report = compose_report(&backend, &articles, "chips", Local::now()).await;
        assert!(report.success);
        assert_eq!(report.sections(), vec![ReportSection::new("Executive Summary", "All good.")]);
    }
}
