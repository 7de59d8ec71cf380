//! Turn a finished [`PipelineRun`] into a [`DocumentTree`].
//!
//! Sections always appear in the same order, whatever the run contains:
//!
//! 1. Cover (title, topic, headline metrics, generation details)
//! 2. Table of contents
//! 3. Executive dashboard
//! 4. Key findings
//! 5. Detailed analysis
//! 6. Article deep dive
//! 7. Statistical analysis
//! 8. Source credibility
//! 9. Technical appendix
//!
//! A section whose input stage is missing or failed renders an explanatory
//! line instead of its content. Assembly itself never fails.

use super::{DocumentTree, HeadingLevel, Paragraph, Table, TextRun};
use crate::models::{ScrapedArticle, UNSCRAPED_SUMMARY, successful};
use crate::pipeline::{PipelineRun, Stage};
use crate::stats::{CoverageStats, WordCountDistribution, source_breakdown};
use crate::utils::{truncate_chars, with_thousands};
use chrono::{DateTime, Local};
use tracing::{debug, instrument};

pub const NO_SCRAPED_ARTICLES: &str = "No articles were successfully scraped for deep analysis.";
pub const NO_REPORT: &str = "No comprehensive report was generated for this analysis.";

const DEPTH_LABEL: &str = "COMPREHENSIVE";
const CONTENT_PREVIEW_CHARS: usize = 300;
const HEADER_TOPIC_CHARS: usize = 50;

const CONTENTS: [(&str, &str); 7] = [
    ("Executive Dashboard", "Key metrics and performance indicators"),
    ("Key Findings", "Principal discoveries and insights"),
    ("Detailed Analysis", "Comprehensive analytical breakdown"),
    ("Article Deep Dive", "Individual article examination"),
    ("Statistical Analysis", "Quantitative data assessment"),
    ("Source Credibility", "Source reliability evaluation"),
    ("Technical Appendix", "Implementation details"),
];

/// Inputs to assembly that do not come from the run itself.
#[derive(Debug, Clone)]
pub struct AssemblyConfig {
    /// Cap on per-article blocks in the deep dive.
    pub max_articles_in_report: usize,
    /// Scrape limit the run was started with.
    pub max_articles_requested: usize,
    /// Model name, or `None` when running without a language model.
    pub model: Option<String>,
    /// Human-readable name of the output format.
    pub document_format: String,
    pub generated_at: DateTime<Local>,
}

pub struct DocumentAssembler<'a> {
    run: &'a PipelineRun,
    topic: &'a str,
    config: &'a AssemblyConfig,
}

impl<'a> DocumentAssembler<'a> {
    pub fn new(run: &'a PipelineRun, topic: &'a str, config: &'a AssemblyConfig) -> Self {
        Self { run, topic, config }
    }

    #[instrument(level = "info", skip_all, fields(topic = %self.topic, stages = self.run.len()))]
    pub fn assemble(&self) -> DocumentTree {
        let mut doc = DocumentTree {
            header: format!(
                "News Analysis Report - {}",
                truncate_chars(self.topic, HEADER_TOPIC_CHARS)
            ),
            footer: format!(
                "Generated on {} | Confidential Analysis Report",
                self.config.generated_at.format("%B %d, %Y")
            ),
            blocks: Vec::new(),
        };

        self.cover(&mut doc);
        self.table_of_contents(&mut doc);
        self.dashboard(&mut doc);
        self.key_findings(&mut doc);
        self.detailed_analysis(&mut doc);
        self.deep_dive(&mut doc);
        self.statistics(&mut doc);
        self.source_credibility(&mut doc);
        self.appendix(&mut doc);

        debug!(blocks = doc.blocks.len(), "Document assembled");
        doc
    }

    fn engine(&self) -> String {
        match &self.config.model {
            Some(model) => format!("{model} Advanced Analysis Engine"),
            None => "Basic Analysis Engine (no language model configured)".to_string(),
        }
    }

    fn missing_report(&self) -> String {
        match self.run.get(Stage::GenerateReport).and_then(|r| r.error.as_deref()) {
            Some(reason) => format!("{NO_REPORT} Reason: {reason}"),
            None => NO_REPORT.to_string(),
        }
    }

    fn cover(&self, doc: &mut DocumentTree) {
        doc.heading(HeadingLevel::Title, "COMPREHENSIVE NEWS ANALYSIS");
        doc.paragraph(
            Paragraph::new(vec![TextRun::italic(format!("Topic: {}", self.topic))]).centered(),
        );
        doc.separator();

        let found = self.run.search().map_or(0, |s| s.count());
        let coverage = self
            .run
            .scrape()
            .map(|b| CoverageStats::from_articles(&b.articles))
            .unwrap_or_default();
        doc.table(Table::with_header(
            ["Articles Found", "Articles Scraped", "Success Rate", "Analysis Depth"],
            [cells(&[
                &found.to_string(),
                &coverage.total.to_string(),
                &format!("{:.1}%", coverage.success_rate()),
                DEPTH_LABEL,
            ])],
        ));

        doc.paragraph(
            Paragraph::new(vec![
                TextRun::plain("Generated: "),
                TextRun::bold(self.config.generated_at.format("%B %d, %Y at %I:%M %p").to_string()),
            ])
            .centered(),
        );
        doc.paragraph(
            Paragraph::new(vec![TextRun::plain("Powered by: "), TextRun::bold(self.engine())])
                .centered(),
        );
        doc.page_break();
    }

    fn table_of_contents(&self, doc: &mut DocumentTree) {
        doc.section("TABLE OF CONTENTS");
        for (i, (title, description)) in CONTENTS.into_iter().enumerate() {
            doc.paragraph(
                Paragraph::new(vec![TextRun::bold(format!("{}. {title}", i + 1))]).indented(),
            );
            doc.paragraph(Paragraph::new(vec![TextRun::italic(description).muted()]).indented());
        }
        doc.page_break();
    }

    fn dashboard(&self, doc: &mut DocumentTree) {
        doc.section("EXECUTIVE DASHBOARD");
        doc.subsection("Performance Overview");

        let search = self.run.search();
        let scrape = self.run.scrape();
        let reported = self.run.report().is_some();
        let summaries = scrape.map_or(0, |b| {
            b.articles.iter().filter(|a| has_ai_summary(a)).count()
        });

        doc.table(Table::with_header(
            ["Metric", "Value", "Status"],
            [
                cells(&[
                    "Total Articles Discovered",
                    &search.map_or(0, |s| s.count()).to_string(),
                    status(search.is_some()),
                ]),
                cells(&[
                    "Articles Successfully Scraped",
                    &scrape.map_or(0, |b| b.successful_scrapes()).to_string(),
                    status(scrape.is_some()),
                ]),
                cells(&[
                    "AI Summaries Generated",
                    &summaries.to_string(),
                    status(scrape.is_some()),
                ]),
                cells(&[
                    "Comprehensive Report",
                    if reported { "Generated" } else { "Not Generated" },
                    status(reported),
                ]),
            ],
        ));

        doc.subsection("Analysis Configuration");
        doc.bullets([
            format!("Search Query: {}", search.map_or("N/A", |s| s.query.as_str())),
            format!("Maximum Articles Requested: {}", self.config.max_articles_requested),
            "Scraping Depth: Full Content Extraction".to_string(),
            match &self.config.model {
                Some(model) => format!("AI Model: {model}"),
                None => "AI Model: Not configured".to_string(),
            },
            "Analysis Type: Comprehensive Multi-Source".to_string(),
            "Report Format: Professional Executive Brief".to_string(),
        ]);
    }

    fn key_findings(&self, doc: &mut DocumentTree) {
        doc.section("KEY FINDINGS");
        let Some(report) = self.run.report() else {
            doc.text(self.missing_report());
            return;
        };

        for section in report.sections() {
            if section.title.is_empty() {
                doc.text(section.body);
                continue;
            }
            doc.subsection(section.title.as_str());
            if section.body.is_empty() {
                continue;
            }
            if section.title.to_lowercase().contains("executive") {
                doc.callout(section.body);
            } else {
                doc.text(section.body);
            }
        }
    }

    fn detailed_analysis(&self, doc: &mut DocumentTree) {
        doc.section("DETAILED ANALYSIS");
        let Some(report) = self.run.report() else {
            doc.text(self.missing_report());
            return;
        };

        for para in report.report.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
            if !(para.starts_with("**") || para.starts_with('#')) {
                doc.text(para);
                continue;
            }
            let (heading, rest) = para.split_once('\n').unwrap_or((para, ""));
            doc.subsection(heading.replace("**", "").replace('#', "").trim());
            let rest = rest.trim();
            if !rest.is_empty() {
                doc.text(rest);
            }
        }
    }

    fn deep_dive(&self, doc: &mut DocumentTree) {
        doc.section("ARTICLE DEEP DIVE");
        match self.run.scrape() {
            Some(batch) => self.article_blocks(doc, &batch.articles),
            None => doc.text(NO_SCRAPED_ARTICLES),
        }
        doc.page_break();
    }

    fn article_blocks(&self, doc: &mut DocumentTree, articles: &[ScrapedArticle]) {
        let coverage = CoverageStats::from_articles(articles);
        doc.subsection("Coverage Statistics");
        doc.table(Table::key_value([
            ("Total Articles Processed", coverage.total.to_string()),
            ("Successfully Analyzed", coverage.successful.to_string()),
            ("Total Words Processed", with_thousands(coverage.total_words)),
            (
                "Average Article Length",
                format!("{} words", with_thousands(coverage.average_words)),
            ),
        ]));

        let usable = successful(articles);
        if usable.is_empty() {
            doc.text(NO_SCRAPED_ARTICLES);
            return;
        }

        doc.subsection("Individual Article Analysis");
        let shown = &usable[..usable.len().min(self.config.max_articles_in_report)];
        if shown.len() < usable.len() {
            doc.paragraph(
                Paragraph::new(vec![TextRun::italic(format!(
                    "Showing {} of {} successfully scraped articles.",
                    shown.len(),
                    usable.len()
                ))
                .muted()]),
            );
        }

        for (i, article) in shown.iter().enumerate() {
            doc.paragraph(Paragraph::new(vec![
                TextRun::bold(format!("Article {}: ", i + 1)),
                TextRun::italic(&article.original_title),
            ]));
            doc.table(Table::key_value([
                ("Source URL", article.url.clone()),
                ("Word Count", format!("{} words", with_thousands(article.word_count))),
                (
                    "Extraction Time",
                    article.scraped_at.format("%Y-%m-%d at %H:%M:%S").to_string(),
                ),
                (
                    "Extraction Status",
                    if article.is_successful() {
                        "✓ Successful"
                    } else {
                        "✗ Failed"
                    }
                    .to_string(),
                ),
            ]));

            doc.paragraph(Paragraph::new(vec![TextRun::bold("AI-Generated Summary:")]));
            let summary = if article.ai_summary.is_empty() {
                "No summary available"
            } else {
                article.ai_summary.as_str()
            };
            doc.paragraph(Paragraph::text(summary).indented());

            if !article.original_summary.is_empty() {
                doc.paragraph(Paragraph::new(vec![TextRun::bold("Original Summary:")]));
                doc.paragraph(Paragraph::text(&article.original_summary).indented());
            }

            if !article.full_content.is_empty() {
                doc.paragraph(Paragraph::new(vec![TextRun::bold(format!(
                    "Content Preview (First {CONTENT_PREVIEW_CHARS} characters):"
                ))]));
                doc.paragraph(
                    Paragraph::new(vec![TextRun::plain(preview(&article.full_content)).muted()])
                        .indented(),
                );
            }

            if i + 1 < shown.len() {
                doc.separator();
            }
        }
    }

    fn statistics(&self, doc: &mut DocumentTree) {
        doc.section("STATISTICAL ANALYSIS");
        doc.subsection("Data Quality Metrics");
        let Some(batch) = self.run.scrape() else {
            doc.text("No extraction data available: article scraping did not complete.");
            return;
        };

        let coverage = CoverageStats::from_articles(&batch.articles);
        doc.table(Table::with_header(
            ["Metric", "Value", "Percentage"],
            [
                cells(&["Total Articles Attempted", &coverage.total.to_string(), "100%"]),
                cells(&[
                    "Successful Extractions",
                    &coverage.successful.to_string(),
                    &format!("{:.1}%", coverage.success_rate()),
                ]),
                cells(&[
                    "Failed Extractions",
                    &coverage.failed.to_string(),
                    &format!("{:.1}%", coverage.failure_rate()),
                ]),
                cells(&[
                    "Average Words per Article",
                    &with_thousands(coverage.average_words),
                    "N/A",
                ]),
                cells(&[
                    "Total Content Analyzed",
                    &format!("{} words", with_thousands(coverage.total_words)),
                    "N/A",
                ]),
            ],
        ));

        doc.subsection("Content Distribution");
        match WordCountDistribution::from_articles(&batch.articles) {
            Some(dist) => doc.bullets([
                format!("Shortest Article: {} words", with_thousands(dist.shortest)),
                format!("Longest Article: {} words", with_thousands(dist.longest)),
                format!("Median Length: {} words", with_thousands(dist.median)),
                format!("Standard Deviation: {:.1} words", dist.std_dev),
            ]),
            None => doc.text("No successfully scraped articles to measure."),
        }
    }

    fn source_credibility(&self, doc: &mut DocumentTree) {
        doc.section("SOURCE CREDIBILITY");
        doc.subsection("Source Diversity Analysis");
        let Some(batch) = self.run.scrape() else {
            doc.text("No source data available: article scraping did not complete.");
            return;
        };

        let shares = source_breakdown(&batch.articles);
        if shares.is_empty() {
            doc.text("No source domains could be identified.");
            return;
        }
        doc.table(Table::with_header(
            ["Source Domain", "Articles", "Percentage"],
            shares
                .into_iter()
                .map(|s| vec![s.host, s.count.to_string(), format!("{:.1}%", s.percentage)]),
        ));
    }

    fn appendix(&self, doc: &mut DocumentTree) {
        doc.page_break();
        doc.section("TECHNICAL APPENDIX");
        doc.subsection("Execution Log");
        doc.table(Table::with_header(
            ["Tool", "Status", "Details"],
            self.run.iter().map(|(stage, result)| {
                vec![
                    stage.name().to_string(),
                    if result.success { "✓ Success" } else { "✗ Failed" }.to_string(),
                    result.detail(),
                ]
            }),
        ));

        doc.subsection("System Information");
        doc.bullets([
            format!(
                "Report Generated: {}",
                self.config.generated_at.format("%Y-%m-%d %H:%M:%S")
            ),
            match &self.config.model {
                Some(model) => format!("Analysis Engine: {model} Advanced"),
                None => "Analysis Engine: Basic (no language model)".to_string(),
            },
            "Scraping Engine: scraper (html5ever)".to_string(),
            "Search Provider: DuckDuckGo".to_string(),
            format!("Document Format: {}", self.config.document_format),
            "Processing Pipeline: Automated Multi-Stage".to_string(),
        ]);
    }
}

fn cells(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn status(ok: bool) -> &'static str {
    if ok { "✓ Complete" } else { "✗ Failed" }
}

fn has_ai_summary(article: &ScrapedArticle) -> bool {
    !article.ai_summary.is_empty() && article.ai_summary != UNSCRAPED_SUMMARY
}

fn preview(content: &str) -> String {
    let head = truncate_chars(content, CONTENT_PREVIEW_CHARS);
    if head.len() < content.len() {
        format!("{head}...")
    } else {
        head.to_string()
    }
}
