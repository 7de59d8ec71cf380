//! Runtime settings loaded from an optional YAML file.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration. Command-line flags override file values in `main`.
//!
//! ```yaml
//! model: gpt-4
//! api_base: https://api.openai.com/v1
//! throttle_ms: 500
//! output_dir: ./reports
//! ```

use crate::error::Result;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

/// Tunables for the external collaborators and output locations.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Chat model name sent to the completion endpoint.
    pub model: String,
    /// Base URL of an OpenAI-compatible API (without `/chat/completions`).
    pub api_base: String,
    /// URL probed before a run to confirm the network is reachable.
    pub connectivity_url: String,
    pub connectivity_timeout_secs: u64,
    /// Timeout for search and article fetches.
    pub fetch_timeout_secs: u64,
    pub llm_timeout_secs: u64,
    /// Retries after the first failed completion call.
    pub llm_max_retries: usize,
    /// Pause between consecutive article fetches.
    pub throttle_ms: u64,
    /// Directory the rendered report is written to.
    pub output_dir: String,
    pub search_region: String,
    /// DuckDuckGo time filter (`d`, `w`, `m`, `y`).
    pub search_time_limit: String,
    /// Also dump the full pipeline run as JSON next to the report.
    pub write_run_json: bool,
    /// Append each generated report to `reports_index.md`.
    pub update_index: bool,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            connectivity_url: "https://httpbin.org/get".to_string(),
            connectivity_timeout_secs: 5,
            fetch_timeout_secs: 10,
            llm_timeout_secs: 60,
            llm_max_retries: 2,
            throttle_ms: 500,
            output_dir: ".".to_string(),
            search_region: "us-en".to_string(),
            search_time_limit: "d".to_string(),
            write_run_json: false,
            update_index: true,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

impl Settings {
    /// Parse settings from YAML text. Missing keys take their defaults.
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Load settings from `path`, or return the defaults when no path is given.
    #[instrument(level = "info", skip_all)]
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let text = tokio::fs::read_to_string(path).await?;
                let settings = Self::from_yaml(&text)?;
                info!(path = %path.display(), model = %settings.model, "Loaded settings");
                Ok(settings)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn connectivity_timeout(&self) -> Duration {
        Duration::from_secs(self.connectivity_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.model, "gpt-4");
        assert_eq!(s.connectivity_timeout(), Duration::from_secs(5));
        assert_eq!(s.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(s.throttle(), Duration::from_millis(500));
        assert!(s.update_index);
        assert!(!s.write_run_json);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let s = Settings::from_yaml("model: gpt-4o-mini\nthrottle_ms: 0\n").unwrap();
        assert_eq!(s.model, "gpt-4o-mini");
        assert_eq!(s.throttle_ms, 0);
        assert_eq!(s.api_base, "https://api.openai.com/v1");
        assert_eq!(s.search_region, "us-en");
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Settings::from_yaml("  \n").unwrap(), Settings::default());
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let err = Settings::from_yaml("throttle_ms: [not, a, number]").unwrap_err();
        assert!(matches!(err, crate::error::Error::Config(_)));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        tokio::fs::write(&path, "output_dir: /tmp/reports\nwrite_run_json: true\n")
            .await
            .unwrap();
        let s = Settings::load(Some(path.as_path())).await.unwrap();
        assert_eq!(s.output_dir, "/tmp/reports");
        assert!(s.write_run_json);
    }

    #[tokio::test]
    async fn test_load_without_path() {
        let s = Settings::load(None).await.unwrap();
        assert_eq!(s, Settings::default());
    }
}
