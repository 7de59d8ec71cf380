//! Aggregate statistics over scraped articles.
//!
//! Success is always judged by [`ScrapedArticle::is_successful`]
//! (`word_count > 0`); no function here keeps a separate notion of it.

use crate::models::ScrapedArticle;
use itertools::Itertools;
use std::collections::HashMap;

/// Element at index `n / 2` of the ascending-sorted values.
///
/// For even `n` this is the upper middle element, not the mean of the two
/// middle elements.
pub fn median(values: &[usize]) -> Option<usize> {
    values.iter().copied().sorted().nth(values.len() / 2)
}

/// Population standard deviation (variance divided by `n`). Zero for no values.
pub fn population_std_dev(values: &[usize]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let variance = values.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// `part / whole * 100`, with an empty whole treated as one.
pub fn percentage(part: usize, whole: usize) -> f64 {
    part as f64 / whole.max(1) as f64 * 100.0
}

/// Extraction outcome counts for a scraped batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoverageStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Sum of word counts over successful articles.
    pub total_words: usize,
    /// `total_words / max(successful, 1)`, floored.
    pub average_words: usize,
}

impl CoverageStats {
    pub fn from_articles(articles: &[ScrapedArticle]) -> Self {
        let successful = articles.iter().filter(|a| a.is_successful()).count();
        let total_words = articles
            .iter()
            .filter(|a| a.is_successful())
            .map(|a| a.word_count)
            .sum();
        Self {
            total: articles.len(),
            successful,
            failed: articles.len() - successful,
            total_words,
            average_words: total_words / successful.max(1),
        }
    }

    pub fn success_rate(&self) -> f64 {
        percentage(self.successful, self.total)
    }

    pub fn failure_rate(&self) -> f64 {
        percentage(self.failed, self.total)
    }
}

/// Spread of word counts across successful articles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WordCountDistribution {
    pub shortest: usize,
    pub longest: usize,
    pub median: usize,
    pub std_dev: f64,
}

impl WordCountDistribution {
    /// `None` when no article was scraped successfully.
    pub fn from_articles(articles: &[ScrapedArticle]) -> Option<Self> {
        let counts: Vec<usize> = articles
            .iter()
            .filter(|a| a.is_successful())
            .map(|a| a.word_count)
            .collect();
        let (shortest, longest) = counts.iter().copied().minmax().into_option()?;
        Some(Self {
            shortest,
            longest,
            median: median(&counts)?,
            std_dev: population_std_dev(&counts),
        })
    }
}

/// Share of the scraped articles coming from one host.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceShare {
    pub host: String,
    pub count: usize,
    pub percentage: f64,
}

/// Group articles by URL host, most frequent first.
///
/// Hosts with equal counts keep first-seen order. Articles whose URL has no
/// host are left out of both the groups and the total.
pub fn source_breakdown(articles: &[ScrapedArticle]) -> Vec<SourceShare> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for host in articles.iter().filter_map(ScrapedArticle::host) {
        let count = counts.entry(host.clone()).or_insert(0);
        if *count == 0 {
            order.push(host);
        }
        *count += 1;
    }

    let total: usize = counts.values().sum();
    order
        .into_iter()
        .map(|host| {
            let count = counts[&host];
            SourceShare {
                host,
                count,
                percentage: percentage(count, total),
            }
        })
        .sorted_by(|a, b| b.count.cmp(&a.count))
        .collect()
}
