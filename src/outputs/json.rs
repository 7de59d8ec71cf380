//! JSON dump of a pipeline run.
//!
//! Written next to the rendered document with the same stem, so
//! `News_Analysis_chips_20250506_091500.md` gets a
//! `News_Analysis_chips_20250506_091500.json` holding every stage result.

use crate::error::Result;
use crate::pipeline::PipelineRun;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

#[derive(Debug, Serialize)]
struct RunRecord<'a> {
    topic: &'a str,
    generated_at: DateTime<Local>,
    #[serde(flatten)]
    run: &'a PipelineRun,
}

/// Path of the JSON dump that accompanies `document_path`.
pub fn run_json_path(document_path: &Path) -> PathBuf {
    document_path.with_extension("json")
}

/// Serialize `run` to `path`, creating the parent directory if needed.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_run(
    run: &PipelineRun,
    topic: &str,
    generated_at: DateTime<Local>,
    path: &Path,
) -> Result<()> {
    let json = serde_json::to_string_pretty(&RunRecord {
        topic,
        generated_at,
        run,
    })?;

    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }
    }

    fs::write(path, json).await?;
    info!(stages = run.len(), "Wrote run JSON");
    Ok(())
}
