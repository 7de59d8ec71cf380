//! The research pipeline: connectivity, search, scrape, report, analysis,
//! document.
//!
//! [`Pipeline::run`] drives the stages strictly in order and records one
//! [`StageResult`] per stage in a [`PipelineRun`]. Stage failures become
//! data; the run stops early only when the network is down or the search
//! finds nothing. A render failure is the one error returned to the caller.
//!
//! Collaborators are generic so the whole pipeline runs against fakes in
//! tests:
//!
//! | Parameter | Trait | Production type |
//! |-----------|-------|-----------------|
//! | `S` | [`NewsSource`] | [`WebSources`] |
//! | `F` | [`ContentFetch`] | [`HttpExtractor`] |
//! | `A` | [`AskAsync`] | [`RetryAsk<ChatClient>`] |
//! | `R` | [`DocumentRenderer`] | [`MarkdownRenderer`] |

pub mod stage;

pub use stage::{
    ConnectionStatus, PipelineRun, ScrapeBatch, SearchResults, Stage, StagePayload, StageResult,
};

use crate::analysis::insights::MAX_CONTEXT_ARTICLES;
use crate::analysis::{ComposedReport, analyze, compose_report, summarize};
use crate::api::{AskAsync, ChatClient, RetryAsk, TextBackend};
use crate::config::Settings;
use crate::document::{AssemblyConfig, DocumentAssembler};
use crate::error::Result;
use crate::models::{ArticleStub, ScrapedArticle, UNSCRAPED_SUMMARY};
use crate::outputs::indexes::{IndexEntry, update_reports_index};
use crate::outputs::{DocumentRenderer, MarkdownRenderer, json, report_filename};
use crate::sources::{ContentFetch, HttpExtractor, NewsSource, WebSources};
use crate::utils::{truncate_chars, with_thousands};
use chrono::{DateTime, Local};
use futures::stream::{self, StreamExt};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

pub const OFFLINE_MESSAGE: &str = "No internet connection available. Please check your connection.";

pub const MAX_SEARCH_LIMIT: usize = 50;
pub const MAX_SCRAPE_LIMIT: usize = 30;

/// Article counts for one run, clamped to what the sources can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunLimits {
    /// Stubs requested from search, in `1..=50`.
    pub search: usize,
    /// Stubs handed to extraction, in `1..=30`.
    pub scrape: usize,
    /// Articles shown in the deep dive.
    pub report_detail: usize,
}

impl RunLimits {
    pub fn new(search: i64, scrape: i64, report_detail: Option<i64>) -> Self {
        let scrape = scrape.clamp(1, MAX_SCRAPE_LIMIT as i64) as usize;
        Self {
            search: search.clamp(1, MAX_SEARCH_LIMIT as i64) as usize,
            scrape,
            report_detail: report_detail.map_or(scrape, |d| d.max(1) as usize),
        }
    }

    pub fn quick() -> Self {
        Self::new(15, 10, Some(5))
    }

    pub fn comprehensive() -> Self {
        Self::new(30, 20, Some(20))
    }
}

impl Default for RunLimits {
    fn default() -> Self {
        Self::new(20, 15, None)
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The connectivity probe failed; nothing else ran.
    Offline,
    /// Search returned nothing for the topic.
    NoResults { topic: String },
    /// A document was rendered.
    Completed(CompletedRun),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletedRun {
    pub topic: String,
    pub document_path: PathBuf,
    pub articles_searched: usize,
    pub articles_scraped: usize,
    pub successful_scrapes: usize,
    pub total_words: usize,
    pub ai_summaries: usize,
    pub report_generated: bool,
    pub report_detail: usize,
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    pub fn document_path(&self) -> Option<&Path> {
        match self {
            Outcome::Completed(done) => Some(&done.document_path),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Offline => f.write_str(OFFLINE_MESSAGE),
            Outcome::NoResults { topic } => write!(f, "Could not find articles about: {topic}"),
            Outcome::Completed(done) => {
                writeln!(f, "COMPREHENSIVE ANALYSIS COMPLETE")?;
                writeln!(f)?;
                writeln!(f, "Document generated: {}", done.document_path.display())?;
                writeln!(f)?;
                writeln!(f, "Analysis summary:")?;
                writeln!(f, "  Articles searched: {}", done.articles_searched)?;
                writeln!(f, "  Articles scraped: {}", done.articles_scraped)?;
                writeln!(f, "  Successful extractions: {}", done.successful_scrapes)?;
                writeln!(f, "  Total words analyzed: {}", with_thousands(done.total_words))?;
                writeln!(f, "  AI summaries generated: {}", done.ai_summaries)?;
                writeln!(
                    f,
                    "  Comprehensive report: {}",
                    if done.report_generated { "generated" } else { "not generated" }
                )?;
                writeln!(f)?;
                writeln!(f, "Topic analyzed: \"{}\"", done.topic)?;
                write!(f, "Article deep dive: up to {} articles", done.report_detail)
            }
        }
    }
}

/// The outcome of a run together with every recorded stage result.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub outcome: Outcome,
    pub run: PipelineRun,
}

/// Input for one stage, tagged by the stage it drives.
#[derive(Debug, Clone, Copy)]
pub enum StageRequest<'a> {
    CheckInternet,
    SearchNews {
        query: &'a str,
        max_results: usize,
    },
    ScrapeArticles {
        articles: &'a [ArticleStub],
        max_articles: usize,
    },
    GenerateReport {
        articles: &'a [ScrapedArticle],
        topic: &'a str,
    },
    AnalyzeNews {
        articles: &'a [ArticleStub],
        question: &'a str,
    },
    GenerateDocument {
        run: &'a PipelineRun,
        topic: &'a str,
        limits: RunLimits,
    },
}

impl StageRequest<'_> {
    pub fn stage(&self) -> Stage {
        match self {
            StageRequest::CheckInternet => Stage::CheckInternet,
            StageRequest::SearchNews { .. } => Stage::SearchNews,
            StageRequest::ScrapeArticles { .. } => Stage::ScrapeArticles,
            StageRequest::GenerateReport { .. } => Stage::GenerateReport,
            StageRequest::AnalyzeNews { .. } => Stage::AnalyzeNews,
            StageRequest::GenerateDocument { .. } => Stage::GenerateDocument,
        }
    }
}

/// Where and how a pipeline writes its outputs.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub output_dir: PathBuf,
    /// Pause between consecutive article fetches.
    pub throttle: Duration,
    pub write_run_json: bool,
    pub update_index: bool,
}

impl PipelineOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            output_dir: PathBuf::from(&settings.output_dir),
            throttle: settings.throttle(),
            write_run_json: settings.write_run_json,
            update_index: settings.update_index,
        }
    }
}

pub struct Pipeline<S, F, A, R> {
    source: S,
    fetcher: F,
    backend: TextBackend<A>,
    renderer: R,
    options: PipelineOptions,
}

/// The pipeline wired to the web, the chat API and the Markdown renderer.
pub type DefaultPipeline =
    Pipeline<WebSources, HttpExtractor, RetryAsk<ChatClient>, MarkdownRenderer>;

/// Build the production pipeline. A missing `api_key` selects the fallback backend.
pub fn build_pipeline(settings: &Settings, api_key: Option<String>) -> Result<DefaultPipeline> {
    Ok(Pipeline::new(
        WebSources::new(settings)?,
        HttpExtractor::new(settings)?,
        TextBackend::from_settings(api_key, settings)?,
        MarkdownRenderer,
        PipelineOptions::from_settings(settings),
    ))
}

impl<S, F, A, R> Pipeline<S, F, A, R>
where
    S: NewsSource,
    F: ContentFetch,
    A: AskAsync,
    R: DocumentRenderer,
{
    pub fn new(
        source: S,
        fetcher: F,
        backend: TextBackend<A>,
        renderer: R,
        options: PipelineOptions,
    ) -> Self {
        Self {
            source,
            fetcher,
            backend,
            renderer,
            options,
        }
    }

    pub fn backend(&self) -> &TextBackend<A> {
        &self.backend
    }

    /// Run every stage for `topic`.
    ///
    /// Returns `Err` only when the document cannot be rendered.
    #[instrument(
        level = "info",
        skip(self),
        fields(search = limits.search, scrape = limits.scrape)
    )]
    pub async fn run(&self, topic: &str, limits: RunLimits) -> Result<PipelineReport> {
        let mut run = PipelineRun::new();

        let connectivity = self.execute(StageRequest::CheckInternet).await?;
        let online = connectivity.success;
        run.record(connectivity);
        if !online {
            warn!("Aborting run: no connectivity");
            return Ok(PipelineReport {
                outcome: Outcome::Offline,
                run,
            });
        }

        let search = self
            .execute(StageRequest::SearchNews {
                query: topic,
                max_results: limits.search,
            })
            .await?;
        run.record(search);
        let stubs = run.search().map(|s| s.articles.clone()).unwrap_or_default();
        if stubs.is_empty() {
            warn!("Aborting run: no search results");
            return Ok(PipelineReport {
                outcome: Outcome::NoResults {
                    topic: topic.to_string(),
                },
                run,
            });
        }

        let scrape = self
            .execute(StageRequest::ScrapeArticles {
                articles: &stubs,
                max_articles: limits.scrape,
            })
            .await?;
        run.record(scrape);
        let scraped = run.scrape().map(|b| b.articles.clone()).unwrap_or_default();

        let report = self
            .execute(StageRequest::GenerateReport {
                articles: &scraped,
                topic,
            })
            .await?;
        run.record(report);

        let question = format!("Provide key insights about: {topic}");
        let analysis = self
            .execute(StageRequest::AnalyzeNews {
                articles: &stubs[..stubs.len().min(MAX_CONTEXT_ARTICLES)],
                question: &question,
            })
            .await?;
        run.record(analysis);

        let document = match self
            .execute(StageRequest::GenerateDocument {
                run: &run,
                topic,
                limits,
            })
            .await
        {
            Ok(document) => document,
            Err(e) => {
                error!(error = %e, "Failed to render document");
                return Err(e);
            }
        };
        let document_path = match &document.payload {
            StagePayload::GenerateDocument {
                document_path: Some(path),
            } => path.clone(),
            _ => PathBuf::new(),
        };
        run.record(document);
        self.write_side_outputs(&run, topic, &document_path).await;

        let outcome = Outcome::Completed(CompletedRun {
            topic: topic.to_string(),
            document_path,
            articles_searched: stubs.len(),
            articles_scraped: scraped.len(),
            successful_scrapes: scraped.iter().filter(|a| a.is_successful()).count(),
            total_words: scraped.iter().map(|a| a.word_count).sum(),
            ai_summaries: scraped
                .iter()
                .filter(|a| !a.ai_summary.is_empty() && a.ai_summary != UNSCRAPED_SUMMARY)
                .count(),
            report_generated: run.report().is_some(),
            report_detail: limits.report_detail,
        });
        info!(stages = run.len(), "Run complete");
        Ok(PipelineReport { outcome, run })
    }

    /// Run a single stage.
    ///
    /// Every stage but `generate_document` reports failure inside the
    /// returned [`StageResult`].
    pub async fn execute(&self, request: StageRequest<'_>) -> Result<StageResult> {
        debug!(
            stage = %request.stage(),
            description = request.stage().description(),
            "Executing stage"
        );
        let result = match request {
            StageRequest::CheckInternet => self.check_internet().await,
            StageRequest::SearchNews { query, max_results } => {
                self.search_news(query, max_results).await
            }
            StageRequest::ScrapeArticles { articles, max_articles } => {
                self.scrape_articles(articles, max_articles).await
            }
            StageRequest::GenerateReport { articles, topic } => {
                report_result(compose_report(&self.backend, articles, topic, Local::now()).await)
            }
            StageRequest::AnalyzeNews { articles, question } => {
                let analysis = analyze(&self.backend, articles, question).await;
                if analysis.success {
                    StageResult::succeeded(StagePayload::AnalyzeNews(analysis))
                } else {
                    let error = analysis.error.clone().unwrap_or_else(|| analysis.analysis.clone());
                    StageResult::failed(StagePayload::AnalyzeNews(analysis), error)
                }
            }
            StageRequest::GenerateDocument { run, topic, limits } => {
                self.generate_document(run, topic, limits).await?
            }
        };
        Ok(result)
    }

    #[instrument(level = "info", skip_all)]
    async fn check_internet(&self) -> StageResult {
        match self.source.check_connectivity().await {
            Ok(code) => StageResult::succeeded(StagePayload::CheckInternet {
                status: ConnectionStatus::Connected,
                response_code: Some(code),
            }),
            Err(e) => StageResult::failed(
                StagePayload::CheckInternet {
                    status: ConnectionStatus::Disconnected,
                    response_code: None,
                },
                e.to_string(),
            ),
        }
    }

    #[instrument(level = "info", skip(self))]
    async fn search_news(&self, query: &str, max_results: usize) -> StageResult {
        let payload = |articles| {
            StagePayload::SearchNews(SearchResults {
                query: query.to_string(),
                articles,
            })
        };
        match self.source.search(query, max_results).await {
            Ok(articles) if articles.is_empty() => {
                StageResult::failed(payload(articles), format!("No articles found for: {query}"))
            }
            Ok(articles) => {
                info!(count = articles.len(), "Found articles");
                StageResult::succeeded(payload(articles))
            }
            Err(e) => {
                warn!(error = %e, "Search failed");
                StageResult::failed(payload(Vec::new()), e.to_string())
            }
        }
    }

    /// Extract and summarize the first `max_articles` stubs, one at a time.
    #[instrument(
        level = "info",
        skip_all,
        fields(available = articles.len(), max_articles = max_articles)
    )]
    async fn scrape_articles(&self, articles: &[ArticleStub], max_articles: usize) -> StageResult {
        let throttle = self.options.throttle;
        let queue = articles.iter().take(max_articles).enumerate();
        let scraped: Vec<ScrapedArticle> = stream::iter(queue)
            .then(|(i, stub)| async move {
                if i > 0 && !throttle.is_zero() {
                    tokio::time::sleep(throttle).await;
                }
                debug!(index = i, title = %truncate_chars(&stub.title, 50), "Scraping article");
                self.scrape_one(stub).await
            })
            .collect()
            .await;

        let batch = ScrapeBatch { articles: scraped };
        info!(
            successful = batch.successful_scrapes(),
            total = batch.total_scraped(),
            "Scraped articles"
        );
        StageResult::succeeded(StagePayload::ScrapeArticles(batch))
    }

    async fn scrape_one(&self, stub: &ArticleStub) -> ScrapedArticle {
        let content = self.fetcher.extract(&stub.url).await;
        if content.trim().is_empty() {
            warn!(url = %stub.url, "No content extracted");
            return ScrapedArticle::failed(stub, UNSCRAPED_SUMMARY, Local::now());
        }
        let summary = summarize(&self.backend, &stub.title, &content).await;
        ScrapedArticle::extracted(stub, &content, summary, Local::now())
    }

    #[instrument(level = "info", skip_all, fields(%topic))]
    async fn generate_document(
        &self,
        run: &PipelineRun,
        topic: &str,
        limits: RunLimits,
    ) -> Result<StageResult> {
        let generated_at = Local::now();
        let config = AssemblyConfig {
            max_articles_in_report: limits.report_detail,
            max_articles_requested: limits.scrape,
            model: self.backend.model().map(str::to_string),
            document_format: self.renderer.format_name().to_string(),
            generated_at,
        };
        let doc = DocumentAssembler::new(run, topic, &config).assemble();
        let path = self
            .options
            .output_dir
            .join(report_filename(topic, generated_at, self.renderer.extension()));

        self.renderer.render(&doc, &path).await?;
        info!(path = %path.display(), "Document generated");
        Ok(StageResult::succeeded(StagePayload::GenerateDocument {
            document_path: Some(path),
        }))
    }

    /// Run JSON and index updates. Failures are logged only.
    async fn write_side_outputs(&self, run: &PipelineRun, topic: &str, document_path: &Path) {
        let generated_at: DateTime<Local> = Local::now();
        if self.options.write_run_json {
            let path = json::run_json_path(document_path);
            if let Err(e) = json::write_run(run, topic, generated_at, &path).await {
                error!(path = %path.display(), error = %e, "Failed to write run JSON");
            }
        }

        if self.options.update_index {
            let document_filename = document_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            let (successful_scrapes, total_scraped) = run
                .scrape()
                .map_or((0, 0), |b| (b.successful_scrapes(), b.total_scraped()));
            let entry = IndexEntry {
                topic,
                document_filename,
                generated_at,
                successful_scrapes,
                total_scraped,
            };
            if let Err(e) = update_reports_index(&self.options.output_dir, &entry).await {
                error!(error = %e, "Failed to update reports index");
            }
        }
    }

    /// Run with explicit counts and return the outcome text.
    pub async fn analyze_news(
        &self,
        topic: &str,
        search: i64,
        scrape: i64,
        report_detail: Option<i64>,
    ) -> String {
        self.summarize_run(topic, RunLimits::new(search, scrape, report_detail)).await
    }

    /// Run with the quick preset (15 searched, 10 scraped, 5 in detail).
    pub async fn quick_news_report(&self, topic: &str) -> String {
        self.summarize_run(topic, RunLimits::quick()).await
    }

    /// Run with the comprehensive preset (30 searched, 20 scraped, 20 in detail).
    pub async fn comprehensive_news_analysis(&self, topic: &str) -> String {
        self.summarize_run(topic, RunLimits::comprehensive()).await
    }

    async fn summarize_run(&self, topic: &str, limits: RunLimits) -> String {
        match self.run(topic, limits).await {
            Ok(report) => report.outcome.to_string(),
            Err(e) => format!("Failed to generate document: {e}"),
        }
    }
}

fn report_result(report: ComposedReport) -> StageResult {
    if report.success {
        return StageResult::succeeded(StagePayload::GenerateReport(report));
    }
    let error = report
        .error
        .clone()
        .unwrap_or_else(|| "Report generation failed".to_string());
    StageResult::failed(StagePayload::GenerateReport(report), error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::report::NO_SUCCESSFUL_ARTICLES;
    use crate::api::Prompt;
    use crate::document::assemble::NO_SCRAPED_ARTICLES;
    use crate::document::{Block, DocumentTree};
    use crate::error::Error;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct NoModel;

    impl AskAsync for NoModel {
        async fn ask(&self, _prompt: &Prompt) -> Result<String> {
            Err(Error::EmptyCompletion)
        }
    }

    struct FakeSource {
        online: bool,
        stubs: Vec<ArticleStub>,
        search_down: bool,
    }

    impl NewsSource for FakeSource {
        async fn check_connectivity(&self) -> Result<u16> {
            if self.online {
                Ok(200)
            } else {
                Err(Error::Io(std::io::Error::other("network unreachable")))
            }
        }

        async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<ArticleStub>> {
            if self.search_down {
                return Err(Error::Search("backend returned 503".to_string()));
            }
            Ok(self.stubs.iter().take(max_results).cloned().collect())
        }
    }

    #[derive(Default)]
    struct FakeFetch {
        pages: HashMap<String, String>,
        requested: Mutex<Vec<String>>,
    }

    impl ContentFetch for FakeFetch {
        async fn extract(&self, url: &str) -> String {
            self.requested.lock().unwrap().push(url.to_string());
            self.pages.get(url).cloned().unwrap_or_default()
        }
    }

    #[derive(Default)]
    struct FakeRenderer {
        fail: bool,
        rendered: Mutex<Vec<DocumentTree>>,
    }

    impl DocumentRenderer for FakeRenderer {
        fn format_name(&self) -> &'static str {
            "Test"
        }

        fn extension(&self) -> &'static str {
            "txt"
        }

        async fn render(&self, doc: &DocumentTree, _path: &Path) -> Result<()> {
            if self.fail {
                return Err(Error::Render("disk full".to_string()));
            }
            self.rendered.lock().unwrap().push(doc.clone());
            Ok(())
        }
    }

    fn stub(i: usize) -> ArticleStub {
        ArticleStub {
            title: format!("Story {i}"),
            summary: format!("Snippet {i}"),
            url: format!("https://news{i}.example.com/story"),
            discovered_at: Local::now(),
        }
    }

    fn pipeline(
        online: bool,
        stubs: Vec<ArticleStub>,
        pages: &[(usize, &str)],
        renderer: FakeRenderer,
        output_dir: &Path,
    ) -> Pipeline<FakeSource, FakeFetch, NoModel, FakeRenderer> {
        let fetcher = FakeFetch {
            pages: pages
                .iter()
                .map(|(i, text)| (stub(*i).url, text.to_string()))
                .collect(),
            ..Default::default()
        };
        Pipeline::new(
            FakeSource {
                online,
                stubs,
                search_down: false,
            },
            fetcher,
            TextBackend::Fallback,
            renderer,
            PipelineOptions {
                output_dir: output_dir.to_path_buf(),
                throttle: Duration::ZERO,
                write_run_json: true,
                update_index: true,
            },
        )
    }

    fn paragraph_texts(blocks: &[Block]) -> Vec<String> {
        blocks
            .iter()
            .filter_map(|b| match b {
                Block::Paragraph(p) => Some(p.plain_text()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_limits_are_clamped() {
        assert_eq!(
            RunLimits::new(0, 0, None),
            RunLimits {
                search: 1,
                scrape: 1,
                report_detail: 1
            }
        );
        assert_eq!(
            RunLimits::new(999, 999, None),
            RunLimits {
                search: 50,
                scrape: 30,
                report_detail: 30
            }
        );
        assert_eq!(RunLimits::new(-5, 12, Some(3)).search, 1);
        assert_eq!(RunLimits::new(20, 12, Some(3)).report_detail, 3);
    }

    #[test]
    fn test_presets() {
        assert_eq!(
            RunLimits::quick(),
            RunLimits {
                search: 15,
                scrape: 10,
                report_detail: 5
            }
        );
        assert_eq!(
            RunLimits::comprehensive(),
            RunLimits {
                search: 30,
                scrape: 20,
                report_detail: 20
            }
        );
        assert_eq!(
            RunLimits::default(),
            RunLimits {
                search: 20,
                scrape: 15,
                report_detail: 15
            }
        );
    }

    #[tokio::test]
    async fn test_offline_run_stops_after_probe() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(false, vec![stub(1)], &[], FakeRenderer::default(), dir.path());
        let report = p.run("chips", RunLimits::default()).await.unwrap();

        assert_eq!(report.outcome, Outcome::Offline);
        assert_eq!(report.outcome.to_string(), OFFLINE_MESSAGE);
        assert_eq!(report.run.len(), 1);
        assert!(!report.run.get(Stage::CheckInternet).unwrap().success);
        assert!(p.renderer.rendered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_search_stops_with_no_results() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(true, vec![], &[], FakeRenderer::default(), dir.path());
        let report = p.run("chips", RunLimits::default()).await.unwrap();

        assert_eq!(report.outcome.to_string(), "Could not find articles about: chips");
        assert_eq!(report.run.len(), 2);
        assert!(!report.run.get(Stage::SearchNews).unwrap().success);
        assert!(p.renderer.rendered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_error_stops_with_no_results() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = pipeline(true, vec![stub(1)], &[], FakeRenderer::default(), dir.path());
        p.source.search_down = true;
        let report = p.run("chips", RunLimits::default()).await.unwrap();

        assert_eq!(
            report.outcome,
            Outcome::NoResults {
                topic: "chips".to_string()
            }
        );
        assert_eq!(report.run.len(), 2);
        assert!(!report.run.contains(Stage::ScrapeArticles));
        let search = report.run.get(Stage::SearchNews).unwrap();
        assert!(!search.success);
        assert_eq!(search.error.as_deref(), Some("search failed: backend returned 503"));
        assert!(p.fetcher.requested.lock().unwrap().is_empty());
        assert!(p.renderer.rendered.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scrape_waits_between_requests() {
        let dir = tempfile::tempdir().unwrap();
        let pages = [(1, "First body."), (2, "Second body."), (3, "Third body.")];
        let mut p = pipeline(true, vec![], &pages, FakeRenderer::default(), dir.path());
        let throttle = Duration::from_millis(500);
        p.options.throttle = throttle;
        let stubs: Vec<ArticleStub> = (1..=3).map(stub).collect();

        let started = tokio::time::Instant::now();
        let result = p
            .execute(StageRequest::ScrapeArticles {
                articles: &stubs,
                max_articles: 3,
            })
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(started.elapsed(), throttle * 2);
        let requested = p.fetcher.requested.lock().unwrap().clone();
        let expected: Vec<String> = stubs.iter().map(|s| s.url.clone()).collect();
        assert_eq!(requested, expected);

        let single = tokio::time::Instant::now();
        p.execute(StageRequest::ScrapeArticles {
            articles: &stubs[..1],
            max_articles: 1,
        })
        .await
        .unwrap();
        assert_eq!(single.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_failed_extraction_still_produces_document() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(true, vec![stub(1)], &[], FakeRenderer::default(), dir.path());
        let report = p.run("chips", RunLimits::default()).await.unwrap();

        assert!(report.outcome.is_completed());
        let stages: Vec<Stage> = report.run.iter().map(|(s, _)| s).collect();
        assert_eq!(stages, Stage::ALL.to_vec());

        let scrape = report.run.get(Stage::ScrapeArticles).unwrap();
        assert!(scrape.success);
        assert_eq!(report.run.scrape().unwrap().successful_scrapes(), 0);

        let report_stage = report.run.get(Stage::GenerateReport).unwrap();
        assert!(!report_stage.success);
        assert_eq!(report_stage.error.as_deref(), Some(NO_SUCCESSFUL_ARTICLES));

        let rendered = p.renderer.rendered.lock().unwrap();
        assert_eq!(rendered.len(), 1);
        let deep_dive = paragraph_texts(rendered[0].section_blocks("ARTICLE DEEP DIVE"));
        assert!(deep_dive.contains(&NO_SCRAPED_ARTICLES.to_string()));
    }

    #[tokio::test]
    async fn test_render_failure_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = FakeRenderer {
            fail: true,
            ..Default::default()
        };
        let p = pipeline(true, vec![stub(1)], &[], renderer, dir.path());
        let err = p.run("chips", RunLimits::default()).await.unwrap_err();
        assert!(matches!(err, Error::Render(_)));

        let text = p.analyze_news("chips", 5, 5, None).await;
        assert!(text.starts_with("Failed to generate document: "));
    }

    #[tokio::test]
    async fn test_scrape_limit_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let body = "word ".repeat(60);
        let stubs: Vec<ArticleStub> = (1..=5).map(stub).collect();
        let p = pipeline(
            true,
            stubs,
            &[(1, body.as_str()), (3, body.as_str())],
            FakeRenderer::default(),
            dir.path(),
        );
        let report = p.run("chips", RunLimits::new(20, 3, None)).await.unwrap();

        let requested = p.fetcher.requested.lock().unwrap().clone();
        assert_eq!(requested, vec![stub(1).url, stub(2).url, stub(3).url]);

        let batch = report.run.scrape().unwrap();
        assert_eq!(batch.total_scraped(), 3);
        assert_eq!(batch.successful_scrapes(), 2);
        assert_eq!(batch.articles[1].ai_summary, UNSCRAPED_SUMMARY);
        assert!(batch.articles[0].ai_summary.starts_with("AI summary unavailable (no API key)"));
        assert!(report.run.get(Stage::GenerateReport).unwrap().success);
    }

    #[tokio::test]
    async fn test_completed_run_writes_side_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let body = "word ".repeat(60);
        let p = pipeline(
            true,
            vec![stub(1), stub(2)],
            &[(1, body.as_str()), (2, body.as_str())],
            FakeRenderer::default(),
            dir.path(),
        );
        let report = p.run("chips", RunLimits::quick()).await.unwrap();

        let Outcome::Completed(done) = &report.outcome else {
            panic!("run did not complete");
        };
        assert_eq!(done.successful_scrapes, 2);
        assert_eq!(done.total_words, 120);
        assert!(done.report_generated);
        assert!(done.document_path.starts_with(dir.path()));
        assert_eq!(done.document_path.extension().unwrap(), "txt");

        let analysis = report.run.get(Stage::AnalyzeNews).unwrap();
        assert!(!analysis.success);
        assert_eq!(analysis.error.as_deref(), Some("No OpenAI API key"));

        assert!(json::run_json_path(&done.document_path).exists());
        let index = std::fs::read_to_string(dir.path().join("reports_index.md")).unwrap();
        assert!(index.contains("[chips]"));
        assert!(index.contains("2/2 articles scraped"));

        let text = report.outcome.to_string();
        assert!(text.starts_with("COMPREHENSIVE ANALYSIS COMPLETE"));
        assert!(text.contains("Successful extractions: 2"));
    }

    #[tokio::test]
    async fn test_execute_tags_results_with_requested_stage() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(true, vec![stub(1)], &[], FakeRenderer::default(), dir.path());
        let stubs = vec![stub(1)];
        let requests = [
            StageRequest::CheckInternet,
            StageRequest::SearchNews {
                query: "chips",
                max_results: 3,
            },
            StageRequest::ScrapeArticles {
                articles: &stubs,
                max_articles: 1,
            },
            StageRequest::GenerateReport {
                articles: &[],
                topic: "chips",
            },
            StageRequest::AnalyzeNews {
                articles: &stubs,
                question: "q",
            },
        ];
        for request in requests {
            let result = p.execute(request).await.unwrap();
            assert_eq!(result.stage(), request.stage());
        }
    }
}
