//! Per-article summaries.

use crate::api::{AskAsync, Prompt, TextBackend};
use crate::utils::truncate_chars;
use tracing::{debug, instrument, warn};

/// Content shorter than this is not worth a model call.
pub const MIN_SUMMARY_INPUT_CHARS: usize = 100;

/// Characters of article text included in the prompt.
pub const PROMPT_CONTENT_CHARS: usize = 2000;

pub const INSUFFICIENT_CONTENT: &str = "Insufficient content to summarize";

/// Summarize an article in three to four sentences.
///
/// Never fails: short input, a missing model and backend errors all produce
/// an explanatory string instead.
#[instrument(level = "info", skip_all, fields(title = %truncate_chars(title, 60)))]
pub async fn summarize<A: AskAsync>(
    backend: &TextBackend<A>,
    title: &str,
    content: &str,
) -> String {
    if content.chars().count() < MIN_SUMMARY_INPUT_CHARS {
        debug!(chars = content.chars().count(), "Content too short to summarize");
        return INSUFFICIENT_CONTENT.to_string();
    }

    match backend {
        TextBackend::Live { client, .. } => {
            match client.ask(&summary_prompt(title, content)).await {
                Ok(summary) => summary,
                Err(e) => {
                    warn!(error = %e, "Summary generation failed");
                    format!("Summary generation failed: {e}")
                }
            }
        }
        TextBackend::Fallback => format!(
            "AI summary unavailable (no API key). Content preview: {}...",
            truncate_chars(content, 200)
        ),
    }
}

fn summary_prompt(title: &str, content: &str) -> Prompt {
    Prompt {
        system: "You are an expert news summarizer. Provide concise, factual summaries."
            .to_string(),
        user: format!(
            "Summarize this news article concisely:\n\n\
             Title: {title}\n\n\
             Content: {}\n\n\
             Provide a clear, factual summary in 3-4 sentences focusing on:\n\
             1. Main news/event\n\
             2. Key details and facts\n\
             3. Any important implications or context",
            truncate_chars(content, PROMPT_CONTENT_CHARS)
        ),
        max_tokens: 200,
        temperature: 0.2,
    }
}
