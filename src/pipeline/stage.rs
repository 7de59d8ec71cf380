//! Stage registry and per-stage results.
//!
//! Every stage of a run is named by a [`Stage`] tag and records exactly one
//! [`StageResult`] in the [`PipelineRun`]. The payload variant always matches
//! the stage it was recorded under.

use crate::analysis::{Analysis, ComposedReport};
use crate::models::{ArticleStub, ScrapedArticle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use tracing::warn;

/// Pipeline stages, declared in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    CheckInternet,
    SearchNews,
    ScrapeArticles,
    GenerateReport,
    AnalyzeNews,
    GenerateDocument,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::CheckInternet,
        Stage::SearchNews,
        Stage::ScrapeArticles,
        Stage::GenerateReport,
        Stage::AnalyzeNews,
        Stage::GenerateDocument,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::CheckInternet => "check_internet",
            Stage::SearchNews => "search_news",
            Stage::ScrapeArticles => "scrape_articles",
            Stage::GenerateReport => "generate_report",
            Stage::AnalyzeNews => "analyze_news",
            Stage::GenerateDocument => "generate_document",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Stage::CheckInternet => "Check if internet connection is available",
            Stage::SearchNews => "Search for current news articles on any topic",
            Stage::ScrapeArticles => "Scrape full content from article URLs and generate summaries",
            Stage::GenerateReport => "Generate comprehensive report from multiple article summaries",
            Stage::AnalyzeNews => "Analyze news articles and answer questions about them",
            Stage::GenerateDocument => "Assemble and render the formatted report document",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
        })
    }
}

/// Articles returned by the search stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub articles: Vec<ArticleStub>,
}

impl SearchResults {
    pub fn count(&self) -> usize {
        self.articles.len()
    }
}

/// Articles processed by the extraction + summarization stage, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeBatch {
    pub articles: Vec<ScrapedArticle>,
}

impl ScrapeBatch {
    pub fn total_scraped(&self) -> usize {
        self.articles.len()
    }

    pub fn successful_scrapes(&self) -> usize {
        self.articles.iter().filter(|a| a.is_successful()).count()
    }
}

/// Stage-specific data carried by a [`StageResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StagePayload {
    CheckInternet {
        status: ConnectionStatus,
        response_code: Option<u16>,
    },
    SearchNews(SearchResults),
    ScrapeArticles(ScrapeBatch),
    GenerateReport(ComposedReport),
    AnalyzeNews(Analysis),
    GenerateDocument {
        document_path: Option<PathBuf>,
    },
}

impl StagePayload {
    pub fn stage(&self) -> Stage {
        match self {
            StagePayload::CheckInternet { .. } => Stage::CheckInternet,
            StagePayload::SearchNews(_) => Stage::SearchNews,
            StagePayload::ScrapeArticles(_) => Stage::ScrapeArticles,
            StagePayload::GenerateReport(_) => Stage::GenerateReport,
            StagePayload::AnalyzeNews(_) => Stage::AnalyzeNews,
            StagePayload::GenerateDocument { .. } => Stage::GenerateDocument,
        }
    }
}

/// Outcome of one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub success: bool,
    pub error: Option<String>,
    pub payload: StagePayload,
}

impl StageResult {
    pub fn succeeded(payload: StagePayload) -> Self {
        Self {
            success: true,
            error: None,
            payload,
        }
    }

    pub fn failed(payload: StagePayload, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            payload,
        }
    }

    pub fn stage(&self) -> Stage {
        self.payload.stage()
    }

    /// One-line summary for the execution log.
    pub fn detail(&self) -> String {
        match &self.payload {
            StagePayload::CheckInternet { status, .. } => format!("Status: {status}"),
            StagePayload::SearchNews(search) => format!("Found {} articles", search.count()),
            StagePayload::ScrapeArticles(batch) => format!(
                "Scraped {}/{} articles",
                batch.successful_scrapes(),
                batch.total_scraped()
            ),
            StagePayload::GenerateReport(report) if report.success => {
                format!("Report with {} sources", report.articles_analyzed)
            }
            StagePayload::GenerateReport(report) => report
                .error
                .clone()
                .unwrap_or_else(|| "Report not generated".to_string()),
            StagePayload::AnalyzeNews(analysis) => {
                format!("Analyzed {} articles", analysis.articles_analyzed)
            }
            StagePayload::GenerateDocument { document_path } => match document_path {
                Some(path) => format!("Document: {}", path.display()),
                None => "Document: N/A".to_string(),
            },
        }
    }
}

/// Results accumulated over one run, keyed and ordered by stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    stages: BTreeMap<Stage, StageResult>,
}

impl PipelineRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stage result. Returns `false` and keeps the existing entry
    /// when the stage was already recorded.
    pub fn record(&mut self, result: StageResult) -> bool {
        let stage = result.stage();
        if self.stages.contains_key(&stage) {
            warn!(%stage, "Stage already recorded; ignoring new result");
            return false;
        }
        self.stages.insert(stage, result);
        true
    }

    pub fn get(&self, stage: Stage) -> Option<&StageResult> {
        self.stages.get(&stage)
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.stages.contains_key(&stage)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Recorded stages in execution order.
    pub fn iter(&self) -> impl Iterator<Item = (Stage, &StageResult)> {
        self.stages.iter().map(|(stage, result)| (*stage, result))
    }

    fn successful(&self, stage: Stage) -> Option<&StagePayload> {
        self.get(stage).filter(|r| r.success).map(|r| &r.payload)
    }

    /// Search results, when the search stage succeeded.
    pub fn search(&self) -> Option<&SearchResults> {
        match self.successful(Stage::SearchNews)? {
            StagePayload::SearchNews(search) => Some(search),
            _ => None,
        }
    }

    /// Scraped batch, when the scrape stage succeeded.
    pub fn scrape(&self) -> Option<&ScrapeBatch> {
        match self.successful(Stage::ScrapeArticles)? {
            StagePayload::ScrapeArticles(batch) => Some(batch),
            _ => None,
        }
    }

    /// Composed report, when the report stage succeeded.
    pub fn report(&self) -> Option<&ComposedReport> {
        match self.successful(Stage::GenerateReport)? {
            StagePayload::GenerateReport(report) => Some(report),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connectivity(ok: bool) -> StageResult {
        if ok {
            StageResult::succeeded(StagePayload::CheckInternet {
                status: ConnectionStatus::Connected,
                response_code: Some(200),
            })
        } else {
            StageResult::failed(
                StagePayload::CheckInternet {
                    status: ConnectionStatus::Disconnected,
                    response_code: None,
                },
                "timed out",
            )
        }
    }

    #[test]
    fn test_stage_names_are_unique_and_ordered() {
        let names: Vec<&str> = Stage::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "check_internet",
                "search_news",
                "scrape_articles",
                "generate_report",
                "analyze_news",
                "generate_document"
            ]
        );
        assert!(Stage::ALL.windows(2).all(|w| w[0] < w[1]));
        assert!(Stage::ALL.iter().all(|s| !s.description().is_empty()));
    }

    #[test]
    fn test_record_is_write_once() {
        let mut run = PipelineRun::new();
        assert!(run.record(connectivity(true)));
        assert!(!run.record(connectivity(false)));
        assert_eq!(run.len(), 1);
        assert!(run.get(Stage::CheckInternet).unwrap().success);
    }

    #[test]
    fn test_iter_follows_execution_order() {
        let mut run = PipelineRun::new();
        run.record(StageResult::succeeded(StagePayload::ScrapeArticles(ScrapeBatch {
            articles: vec![],
        })));
        run.record(connectivity(true));
        run.record(StageResult::succeeded(StagePayload::SearchNews(SearchResults {
            query: "q".to_string(),
            articles: vec![],
        })));
        let order: Vec<Stage> = run.iter().map(|(s, _)| s).collect();
        assert_eq!(order, vec![Stage::CheckInternet, Stage::SearchNews, Stage::ScrapeArticles]);
    }

    #[test]
    fn test_failed_stage_is_not_exposed_as_payload() {
        let mut run = PipelineRun::new();
        run.record(StageResult::failed(
            StagePayload::SearchNews(SearchResults {
                query: "q".to_string(),
                articles: vec![],
            }),
            "search failed",
        ));
        assert!(run.contains(Stage::SearchNews));
        assert!(run.search().is_none());
        assert!(run.scrape().is_none());
    }

    #[test]
    fn test_details() {
        assert_eq!(connectivity(true).detail(), "Status: connected");
        assert_eq!(connectivity(false).detail(), "Status: disconnected");
        let doc = StageResult::succeeded(StagePayload::GenerateDocument {
            document_path: Some(PathBuf::from("report.md")),
        });
        assert_eq!(doc.detail(), "Document: report.md");
    }

    #[test]
    fn test_run_serializes_with_stage_keys() {
        let mut run = PipelineRun::new();
        run.record(connectivity(true));
        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["stages"]["check_internet"]["success"], true);
        assert_eq!(json["stages"]["check_internet"]["payload"]["stage"], "check_internet");
        assert_eq!(json["stages"]["check_internet"]["payload"]["status"], "connected");
    }
}
