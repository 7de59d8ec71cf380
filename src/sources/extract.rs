//! Article text extraction.
//!
//! Page chrome (`script`, `style`, `nav`, `footer`, `header`, `aside`) is
//! ignored. The first content selector that yields any text wins; when none
//! does, all paragraph text on the page is concatenated. Whitespace runs are
//! collapsed and the result is capped at [`MAX_EXTRACTED_CHARS`].

use super::{ContentFetch, build_client};
use crate::config::Settings;
use crate::error::Result;
use crate::utils::{collapse_whitespace, truncate_chars};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{info, instrument, warn};

/// Upper bound on the characters returned for one article.
pub const MAX_EXTRACTED_CHARS: usize = 3000;

const STRIPPED_TAGS: &[&str] = &["script", "style", "nav", "footer", "header", "aside"];

/// Content regions, most specific first.
const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "[role=\"main\"]",
    ".content",
    ".post-content",
    ".entry-content",
    ".article-body",
    ".story-body",
    "main",
];

static CONTENT: Lazy<Vec<Selector>> = Lazy::new(|| {
    CONTENT_SELECTORS
        .iter()
        .map(|s| Selector::parse(s).expect("valid selector"))
        .collect()
});
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("valid selector"));

/// Extract readable article text from an HTML document.
pub fn extract_main_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let mut text = String::new();
    for selector in CONTENT.iter() {
        text = joined_text(document.select(selector));
        if !text.trim().is_empty() {
            break;
        }
    }
    if text.trim().is_empty() {
        text = joined_text(document.select(&PARAGRAPH));
    }

    truncate_chars(&collapse_whitespace(&text), MAX_EXTRACTED_CHARS).to_string()
}

fn joined_text<'a>(elements: impl Iterator<Item = ElementRef<'a>>) -> String {
    elements
        .filter(|el| !is_stripped(el))
        .map(|el| {
            let mut out = String::new();
            visible_text(el, &mut out);
            out
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// True when the element is, or sits inside, page chrome.
fn is_stripped(el: &ElementRef) -> bool {
    STRIPPED_TAGS.contains(&el.value().name())
        || el
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|a| STRIPPED_TAGS.contains(&a.value().name()))
}

fn visible_text(el: ElementRef, out: &mut String) {
    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            if !STRIPPED_TAGS.contains(&child_el.value().name()) {
                visible_text(child_el, out);
            }
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
        }
    }
}

/// Live [`ContentFetch`] that downloads pages over HTTP.
#[derive(Debug, Clone)]
pub struct HttpExtractor {
    client: reqwest::Client,
}

impl HttpExtractor {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            client: build_client(settings, settings.fetch_timeout())?,
        })
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        Ok(self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?)
    }
}

impl ContentFetch for HttpExtractor {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn extract(&self, url: &str) -> String {
        match self.fetch(url).await {
            Ok(html) => {
                let text = extract_main_text(&html);
                info!(chars = text.chars().count(), "Extracted article text");
                text
            }
            Err(e) => {
                warn!(error = %e, "Article fetch failed");
                String::new()
            }
        }
    }
}
