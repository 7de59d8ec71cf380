//! Question answering over search results.

use crate::api::{AskAsync, Prompt, TextBackend};
use crate::models::ArticleStub;
use crate::utils::truncate_chars;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// At most this many articles are given to the model as context.
pub const MAX_CONTEXT_ARTICLES: usize = 5;

/// Outcome of an analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub success: bool,
    /// The model's answer, or an explanation when `success` is false.
    pub analysis: String,
    pub articles_analyzed: usize,
    pub question: String,
    pub error: Option<String>,
}

impl Analysis {
    fn failed(question: &str, analysis: impl Into<String>, error: Option<String>) -> Self {
        Self {
            success: false,
            analysis: analysis.into(),
            articles_analyzed: 0,
            question: question.to_string(),
            error,
        }
    }
}

/// Answer `question` using the first few search results as evidence.
#[instrument(level = "info", skip_all, fields(articles = articles.len(), %question))]
pub async fn analyze<A: AskAsync>(
    backend: &TextBackend<A>,
    articles: &[ArticleStub],
    question: &str,
) -> Analysis {
    if articles.is_empty() {
        return Analysis::failed(question, "No articles available for analysis", None);
    }
    let client = match backend {
        TextBackend::Live { client, .. } => client,
        TextBackend::Fallback => {
            return Analysis::failed(
                question,
                "AI analysis unavailable (no API key configured)",
                Some("No OpenAI API key".to_string()),
            );
        }
    };

    let context = &articles[..articles.len().min(MAX_CONTEXT_ARTICLES)];
    info!(count = context.len(), "Analyzing articles");
    match client.ask(&analysis_prompt(context, question)).await {
        Ok(answer) => Analysis {
            success: true,
            analysis: answer,
            articles_analyzed: context.len(),
            question: question.to_string(),
            error: None,
        },
        Err(e) => {
            warn!(error = %e, "Analysis failed");
            Analysis::failed(question, format!("Analysis failed: {e}"), Some(e.to_string()))
        }
    }
}

fn analysis_prompt(articles: &[ArticleStub], question: &str) -> Prompt {
    let context = articles
        .iter()
        .enumerate()
        .map(|(i, a)| {
            format!(
                "{}. Title: {}\n   Summary: {}...\n   URL: {}",
                i + 1,
                a.title,
                truncate_chars(&a.summary, 200),
                a.url
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    Prompt {
        system: concat!(
            "You are an expert news analyst. ",
            "Provide thorough, factual analysis based on the provided articles."
        )
        .to_string(),
        user: format!(
            "Based on these current news articles:\n\n{context}\n\n\
             Question: {question}\n\n\
             Please provide a comprehensive analysis based on the news provided. Include:\n\
             1. Direct answer to the question\n\
             2. Supporting evidence from the articles\n\
             3. Any relevant context or implications\n\
             4. Confidence level in your analysis (1-10)"
        ),
        max_tokens: 800,
        temperature: 0.3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use chrono::Local;

    #[derive(Debug)]
    struct Echo;

    impl AskAsync for Echo {
        async fn ask(&self, prompt: &Prompt) -> Result<String> {
            Ok(prompt.user.clone())
        }
    }

    #[derive(Debug)]
    struct Broken;

    impl AskAsync for Broken {
        async fn ask(&self, _prompt: &Prompt) -> Result<String> {
            Err(Error::LlmStatus {
                status: 500,
                body: "boom".to_string(),
            })
        }
    }

    fn stubs(n: usize) -> Vec<ArticleStub> {
        (1..=n)
            .map(|i| ArticleStub {
                title: format!("Story {i}"),
                summary: format!("Snippet {i}"),
                url: format!("https://example.com/{i}"),
                discovered_at: Local::now(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_uses_first_five_articles() {
        let backend = TextBackend::Live {
            client: Echo,
            model: "m".to_string(),
        };
        let result = analyze(&backend, &stubs(8), "Provide key insights about: chips").await;
        assert!(result.success);
        assert_eq!(result.articles_analyzed, 5);
        assert!(result.analysis.contains("5. Title: Story 5"));
        assert!(!result.analysis.contains("Story 6"));
        assert!(result.analysis.contains("Question: Provide key insights about: chips"));
    }

    #[tokio::test]
    async fn test_empty_input_fails() {
        let backend = TextBackend::Live {
            client: Echo,
            model: "m".to_string(),
        };
        let result = analyze(&backend, &[], "q").await;
        assert!(!result.success);
        assert_eq!(result.analysis, "No articles available for analysis");
    }

    #[tokio::test]
    async fn test_fallback_reports_unavailable() {
        let backend: TextBackend<Echo> = TextBackend::Fallback;
        let result = analyze(&backend, &stubs(2), "q").await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("No OpenAI API key"));
    }

    #[tokio::test]
    async fn test_backend_error_is_captured() {
        let backend = TextBackend::Live {
            client: Broken,
            model: "m".to_string(),
        };
        let result = analyze(&backend, &stubs(1), "q").await;
        assert!(!result.success);
        assert!(result.analysis.starts_with("Analysis failed: "));
        assert!(result.error.unwrap().contains("500"));
    }
}
