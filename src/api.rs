//! Language model access with exponential backoff retry logic.
//!
//! # Architecture
//!
//! - [`AskAsync`]: core trait, one prompt in, completion text out
//! - [`ChatClient`]: OpenAI-compatible `/chat/completions` client
//! - [`RetryAsk`]: decorator that adds retry logic to any `AskAsync`
//! - [`TextBackend`]: the capability chosen once at startup, either a live
//!   client or the deterministic fallback used when no credential is set
//!
//! # Retry Strategy
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..=max_jitter)
//! ```

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::utils::truncate_for_log;
use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// A single chat-style request to the language model.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    /// Role instructions sent as the system message.
    pub system: String,
    /// The task itself, sent as the user message.
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Trait for async LLM interaction.
///
/// Implementors send a [`Prompt`] and return the completion text. This
/// abstraction allows for different backends or decorators (like retry logic).
pub trait AskAsync {
    async fn ask(&self, prompt: &Prompt) -> Result<String>;
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`] implementation.
pub struct RetryAsk<T> {
    /// The underlying LLM client to wrap.
    inner: T,
    /// Retries after the first failed attempt.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    max_delay: StdDuration,
    max_jitter: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    /// Create a new retry wrapper around an existing [`AskAsync`] implementation.
    ///
    /// ```ignore
    /// let api = RetryAsk::new(ChatClient::new(key, &settings)?, 2, Duration::from_secs(1));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
            max_jitter: StdDuration::from_millis(250),
        }
    }

    /// Override the random jitter bound added to each backoff delay.
    pub fn with_max_jitter(mut self, max_jitter: StdDuration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    fn backoff(&self, attempt: usize) -> StdDuration {
        let factor = 1u32.checked_shl((attempt - 1) as u32).unwrap_or(u32::MAX);
        let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=self.max_jitter.as_millis() as u64);
        delay + StdDuration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync + fmt::Debug,
{
    #[instrument(level = "info", skip_all)]
    async fn ask(&self, prompt: &Prompt) -> Result<String> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(prompt).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis(),
                            elapsed_ms_total = total_dt.as_millis(),
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis(),
                        elapsed_ms_total = total_dt.as_millis(),
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

/// Extract the first non-empty completion from a `/chat/completions` body.
fn parse_completion(body: &str) -> Result<String> {
    let response: ChatResponse = serde_json::from_str(body)?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or(Error::EmptyCompletion)
}

/// Client for an OpenAI-compatible chat completion endpoint.
#[derive(Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl ChatClient {
    pub fn new(api_key: impl Into<String>, settings: &Settings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.llm_timeout())
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
        })
    }
}

impl AskAsync for ChatClient {
    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn ask(&self, prompt: &Prompt) -> Result<String> {
        let t0 = Instant::now();
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            max_tokens: prompt.max_tokens,
            temperature: prompt.temperature,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        let dt = t0.elapsed();

        if !status.is_success() {
            warn!(elapsed_ms = dt.as_millis(), status = status.as_u16(), "API call failed");
            return Err(Error::LlmStatus {
                status: status.as_u16(),
                body: truncate_for_log(&body, 300),
            });
        }
        parse_completion(&body)
    }
}

/// The text generation capability, selected once at startup.
///
/// Components match on the variant instead of checking for a client:
/// `Live` sends prompts to the model, `Fallback` takes each component's
/// deterministic path.
#[derive(Debug)]
pub enum TextBackend<A = RetryAsk<ChatClient>> {
    Live { client: A, model: String },
    Fallback,
}

impl TextBackend {
    /// Build the live backend when a credential is present, otherwise the fallback.
    #[instrument(level = "info", skip_all)]
    pub fn from_settings(api_key: Option<String>, settings: &Settings) -> Result<Self> {
        match api_key.filter(|k| !k.trim().is_empty()) {
            Some(key) => {
                let client = ChatClient::new(key, settings)?;
                info!(
                    model = %settings.model,
                    api_base = %settings.api_base,
                    "Language model backend configured"
                );
                let retries = settings.llm_max_retries;
                Ok(TextBackend::Live {
                    client: RetryAsk::new(client, retries, StdDuration::from_secs(1)),
                    model: settings.model.clone(),
                })
            }
            None => {
                warn!(
                    "OPENAI_API_KEY not set; summaries, analysis and reports use the basic fallback"
                );
                Ok(TextBackend::Fallback)
            }
        }
    }
}

impl<A> TextBackend<A> {
    pub fn is_live(&self) -> bool {
        matches!(self, TextBackend::Live { .. })
    }

    /// Model name of the live backend.
    pub fn model(&self) -> Option<&str> {
        match self {
            TextBackend::Live { model, .. } => Some(model),
            TextBackend::Fallback => None,
        }
    }
}
