//! DuckDuckGo HTML search.
//!
//! Queries `https://html.duckduckgo.com/html/` and turns each organic result
//! into an [`ArticleStub`]. Sponsored results are skipped and redirect links
//! of the form `//duckduckgo.com/l/?uddg=<encoded>&rut=...` are unwrapped.

use crate::error::{Error, Result};
use crate::models::ArticleStub;
use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument};

const SEARCH_URL: &str = "https://html.duckduckgo.com/html/";

static RESULT: Lazy<Selector> = Lazy::new(|| Selector::parse(".result").expect("valid selector"));
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a.result__a").expect("valid selector"));
static SNIPPET: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".result__snippet").expect("valid selector"));

/// Build the search URL for `query`.
pub fn search_url(query: &str, region: &str, time_limit: &str) -> String {
    format!(
        "{}?q={}&kl={}&df={}",
        SEARCH_URL,
        urlencoding::encode(query),
        urlencoding::encode(region),
        urlencoding::encode(time_limit)
    )
}

/// Run a search and return at most `max_results` stubs.
#[instrument(level = "info", skip(client))]
pub async fn search(
    client: &reqwest::Client,
    query: &str,
    region: &str,
    time_limit: &str,
    max_results: usize,
) -> Result<Vec<ArticleStub>> {
    let response = client
        .get(search_url(query, region, time_limit))
        .header("Accept", "text/html")
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::Search(format!("DuckDuckGo returned status {status}")));
    }
    let body = response.text().await?;

    let stubs = parse_results(&body, max_results, Local::now());
    info!(count = stubs.len(), query, "Search returned articles");
    Ok(stubs)
}

/// Parse a DuckDuckGo HTML result page.
pub fn parse_results(
    html: &str,
    max_results: usize,
    discovered_at: DateTime<Local>,
) -> Vec<ArticleStub> {
    let document = Html::parse_document(html);
    let mut stubs = Vec::new();

    for result in document.select(&RESULT) {
        if stubs.len() >= max_results {
            break;
        }
        let classes = result.value().attr("class").unwrap_or_default();
        if classes.contains("result--ad") {
            continue;
        }
        let Some(link) = result.select(&LINK).next() else {
            continue;
        };
        let url = link.value().attr("href").map(resolve_link).unwrap_or_default();
        if url.is_empty() {
            debug!("Skipping search result without a link");
            continue;
        }

        let title = squash(&link.text().collect::<String>());
        let summary = result
            .select(&SNIPPET)
            .next()
            .map(|el| squash(&el.text().collect::<String>()))
            .unwrap_or_default();

        stubs.push(ArticleStub {
            title: if title.is_empty() { "[No Title]".to_string() } else { title },
            summary: if summary.is_empty() { "[No Summary]".to_string() } else { summary },
            url,
            discovered_at,
        });
    }
    stubs
}

/// Unwrap DuckDuckGo redirect links and make scheme-relative links absolute.
pub fn resolve_link(href: &str) -> String {
    if let Some(pos) = href.find("uddg=") {
        let start = pos + "uddg=".len();
        let end = href[start..].find('&').map(|i| start + i).unwrap_or(href.len());
        if let Ok(decoded) = urlencoding::decode(&href[start..end]) {
            if !decoded.is_empty() {
                return decoded.into_owned();
            }
        }
    }
    if let Some(rest) = href.strip_prefix("//") {
        return format!("https://{rest}");
    }
    href.trim().to_string()
}

fn squash(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"
    <html><body>
      <div class="result results_links result--ad">
        <a class="result__a" href="https://ads.example.com/buy">Buy now</a>
        <a class="result__snippet">Sponsored</a>
      </div>
      <div class="result results_links">
        <h2><a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fnews.example.com%2Fstory%3Fid%3D7&amp;rut=abc">
          Chip   exports <b>tighten</b></a></h2>
        <a class="result__snippet" href="#">New rules take effect on Monday.</a>
      </div>
      <div class="result results_links">
        <a class="result__a" href="https://other.example.org/a"></a>
      </div>
      <div class="result results_links">
        <a class="result__a">No link here</a>
      </div>
      <div class="result results_links">
        <a class="result__a" href="https://third.example.net/b">Third</a>
        <a class="result__snippet">Third snippet</a>
      </div>
    </body></html>"##;

    #[test]
    fn test_parse_results_skips_ads_and_linkless() {
        let stubs = parse_results(PAGE, 10, Local::now());
        assert_eq!(stubs.len(), 3);
        assert_eq!(stubs[0].url, "https://news.example.com/story?id=7");
        assert_eq!(stubs[0].title, "Chip exports tighten");
        assert_eq!(stubs[0].summary, "New rules take effect on Monday.");
        assert_eq!(stubs[1].title, "[No Title]");
        assert_eq!(stubs[1].summary, "[No Summary]");
        assert_eq!(stubs[2].url, "https://third.example.net/b");
    }

    #[test]
    fn test_parse_results_respects_limit() {
        let stubs = parse_results(PAGE, 1, Local::now());
        assert_eq!(stubs.len(), 1);
        assert_eq!(stubs[0].url, "https://news.example.com/story?id=7");
    }

    #[test]
    fn test_parse_results_empty_page() {
        assert!(parse_results("<html><body>No results.</body></html>", 5, Local::now()).is_empty());
    }

    #[test]
    fn test_resolve_link() {
        assert_eq!(
            resolve_link("//duckduckgo.com/l/?uddg=https%3A%2F%2Fa.com%2Fx&rut=1"),
            "https://a.com/x"
        );
        assert_eq!(resolve_link("//a.com/y"), "https://a.com/y");
        assert_eq!(resolve_link("https://b.com/z"), "https://b.com/z");
    }

    #[test]
    fn test_search_url_encodes_query() {
        let url = search_url("chip exports & tariffs", "us-en", "d");
        assert_eq!(
            url,
            "https://html.duckduckgo.com/html/?q=chip%20exports%20%26%20tariffs&kl=us-en&df=d"
        );
    }
}
