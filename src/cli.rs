//! Command-line interface for News Analyst.
//!
//! Arguments are parsed with `clap`; credentials and the API endpoint can
//! also come from the environment. Without `--topic` the binary starts an
//! interactive [`Session`].

use crate::api::AskAsync;
use crate::config::Settings;
use crate::error::Result;
use crate::outputs::DocumentRenderer;
use crate::pipeline::{Pipeline, RunLimits};
use crate::sources::{ContentFetch, NewsSource};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{error, info};

const RULE: &str = "==================================================";

/// Command-line arguments for the News Analyst application.
///
/// # Examples
///
/// ```sh
/// # Interactive session, reports in ./reports
/// news_analyst -o ./reports
///
/// # One report with the quick preset
/// news_analyst --topic "semiconductor export rules" --preset quick
///
/// # Custom limits and a JSON dump of the run
/// news_analyst -t "chips" --search-limit 30 --scrape-limit 10 --write-json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML settings file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for generated reports
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// API key for the OpenAI-compatible chat endpoint; without it the basic fallback is used
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Base URL of the chat endpoint
    #[arg(long, env = "OPENAI_BASE_URL")]
    pub api_base: Option<String>,

    /// Model name sent with every completion request
    #[arg(long)]
    pub model: Option<String>,

    /// Analyze this topic once and exit instead of starting a session
    #[arg(short, long)]
    pub topic: Option<String>,

    /// Preset article limits for one-shot mode
    #[arg(long, value_enum)]
    pub preset: Option<Preset>,

    /// Articles to request from search (1-50)
    #[arg(long)]
    pub search_limit: Option<i64>,

    /// Articles to extract and summarize (1-30)
    #[arg(long)]
    pub scrape_limit: Option<i64>,

    /// Articles shown in the deep dive (defaults to the scrape limit)
    #[arg(long)]
    pub report_detail: Option<i64>,

    /// Also write the full run as JSON next to the report
    #[arg(long)]
    pub write_json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Preset {
    /// 15 searched, 10 scraped, 5 in detail
    Quick,
    /// 30 searched, 20 scraped, 20 in detail
    Comprehensive,
}

impl Cli {
    /// Overlay command-line values on the loaded settings.
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(dir) = &self.output_dir {
            settings.output_dir = dir.clone();
        }
        if let Some(base) = &self.api_base {
            settings.api_base = base.clone();
        }
        if let Some(model) = &self.model {
            settings.model = model.clone();
        }
        if self.write_json {
            settings.write_run_json = true;
        }
    }

    /// Limits for one-shot mode: the preset (or defaults) with explicit flags on top.
    pub fn limits(&self) -> RunLimits {
        let base = match self.preset {
            Some(Preset::Quick) => RunLimits::quick(),
            Some(Preset::Comprehensive) => RunLimits::comprehensive(),
            None => RunLimits::default(),
        };
        let detail = self
            .report_detail
            .or_else(|| self.preset.map(|_| base.report_detail as i64));
        RunLimits::new(
            self.search_limit.unwrap_or(base.search as i64),
            self.scrape_limit.unwrap_or(base.scrape as i64),
            detail,
        )
    }
}

/// `true` for the words that end an interactive session.
pub fn is_quit(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "quit" | "exit" | "bye")
}

/// Parse a limit answer. Empty input selects `default`.
pub fn parse_limit(input: &str, default: i64) -> std::result::Result<i64, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(default);
    }
    input
        .parse::<i64>()
        .map_err(|_| format!("Please enter a whole number (got '{input}')."))
}

/// Interactive prompt loop over any line reader and writer.
pub struct Session<I, O> {
    input: I,
    output: O,
}

impl<I, O> Session<I, O>
where
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
{
    pub fn new(input: I, output: O) -> Self {
        Self { input, output }
    }

    async fn say(&mut self, text: &str) -> Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        self.output.flush().await?;
        Ok(())
    }

    /// Show `text` and read one line. `None` at end of input.
    async fn prompt(&mut self, text: &str) -> Result<Option<String>> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.flush().await?;
        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Ask for a limit until the answer parses. `None` at end of input.
    async fn ask_limit(&mut self, label: &str, default: i64) -> Result<Option<i64>> {
        loop {
            let Some(answer) = self.prompt(&format!("{label} (default {default}): ")).await? else {
                return Ok(None);
            };
            match parse_limit(&answer, default) {
                Ok(value) => return Ok(Some(value)),
                Err(message) => self.say(&message).await?,
            }
        }
    }

    /// Run topics through `pipeline` until the user quits or input ends.
    pub async fn run<S, F, A, R>(&mut self, pipeline: &Pipeline<S, F, A, R>) -> Result<()>
    where
        S: NewsSource,
        F: ContentFetch,
        A: AskAsync,
        R: DocumentRenderer,
    {
        self.say("NEWS ANALYSIS SYSTEM").await?;
        self.say(RULE).await?;
        self.say("Builds a structured report for any news topic:").await?;
        self.say("  - configurable number of articles to search").await?;
        self.say("  - configurable scraping depth").await?;
        self.say("  - adjustable report detail level").await?;
        match pipeline.backend().model() {
            Some(model) => self.say(&format!("Language model: {model}")).await?,
            None => self.say("Language model: not configured (basic fallback)").await?,
        }

        loop {
            let topic_prompt = "\nEnter a news topic (or 'quit' to exit): ";
            let Some(topic) = self.prompt(topic_prompt).await? else {
                break;
            };
            if topic.is_empty() {
                continue;
            }
            if is_quit(&topic) {
                self.say("Goodbye!").await?;
                break;
            }

            let Some(search) = self.ask_limit("Number of articles to search", 20).await? else {
                break;
            };
            let Some(scrape) = self.ask_limit("Number of articles to scrape", 15).await? else {
                break;
            };
            let detail_label = "Articles to include in detailed report";
            let Some(detail) = self.ask_limit(detail_label, scrape).await? else {
                break;
            };

            let limits = RunLimits::new(search, scrape, Some(detail));
            info!(%topic, ?limits, "Starting analysis");
            self.say(RULE).await?;
            match pipeline.run(&topic, limits).await {
                Ok(report) => self.say(&report.outcome.to_string()).await?,
                Err(e) => {
                    error!(%topic, error = %e, "Run failed");
                    self.say(&format!("Error: {e}")).await?;
                }
            }
            self.say(RULE).await?;
        }
        Ok(())
    }
}
