//! `reports_index.md` management.
//!
//! Every generated report gets one entry, grouped under its generation date:
//!
//! ```text
//! # News Analysis Reports
//!
//! - **2025-05-06**
//!     - [chips](./News_Analysis_chips_20250506_091500.md) (09:15, 4/6 articles scraped)
//! ```
//!
//! Re-running for the same document never duplicates its entry.

use crate::error::Result;
use chrono::{DateTime, Local};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, instrument};

pub const INDEX_FILENAME: &str = "reports_index.md";
const INDEX_TITLE: &str = "# News Analysis Reports";

/// What the index records about one report.
#[derive(Debug, Clone)]
pub struct IndexEntry<'a> {
    pub topic: &'a str,
    pub document_filename: &'a str,
    pub generated_at: DateTime<Local>,
    pub successful_scrapes: usize,
    pub total_scraped: usize,
}

/// Add `entry` to `{output_dir}/reports_index.md`, creating the file if needed.
#[instrument(
    level = "info",
    skip_all,
    fields(output_dir = %output_dir.display(), file = %entry.document_filename)
)]
pub async fn update_reports_index(output_dir: &Path, entry: &IndexEntry<'_>) -> Result<()> {
    let index_path = output_dir.join(INDEX_FILENAME);
    let content = if fs::try_exists(&index_path).await? {
        fs::read_to_string(&index_path).await?
    } else {
        format!("{INDEX_TITLE}\n\n")
    };

    let updated = insert_entry(&content, entry);
    if updated == content {
        debug!("Report already indexed");
        return Ok(());
    }
    fs::write(&index_path, updated).await?;
    info!(path = %index_path.display(), "Updated reports index");
    Ok(())
}

fn insert_entry(content: &str, entry: &IndexEntry<'_>) -> String {
    let date_heading = format!("- **{}**", entry.generated_at.format("%Y-%m-%d"));
    let report_line = format!(
        "    - [{}](./{}) ({}, {}/{} articles scraped)",
        entry.topic,
        entry.document_filename,
        entry.generated_at.format("%H:%M"),
        entry.successful_scrapes,
        entry.total_scraped
    );
    let link = format!("](./{})", entry.document_filename);

    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
    if lines.iter().any(|l| l.contains(&link)) {
        return content.to_string();
    }

    match lines.iter().position(|l| l.trim() == date_heading) {
        Some(i) => {
            let mut j = i + 1;
            while j < lines.len() && lines[j].starts_with("    - ") {
                j += 1;
            }
            lines.insert(j, report_line);
        }
        None => {
            if !lines.iter().any(|l| l.starts_with(INDEX_TITLE)) {
                lines.insert(0, INDEX_TITLE.to_string());
                lines.insert(1, String::new());
            }
            lines.push(date_heading);
            lines.push(report_line);
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(file: &'static str, hour: u32) -> IndexEntry<'static> {
        IndexEntry {
            topic: "chips",
            document_filename: file,
            generated_at: Local.with_ymd_and_hms(2025, 5, 6, hour, 15, 0).unwrap(),
            successful_scrapes: 4,
            total_scraped: 6,
        }
    }

    #[test]
    fn test_first_entry_creates_date_group() {
        let out = insert_entry(&format!("{INDEX_TITLE}\n\n"), &entry("a.md", 9));
        let expected = concat!(
            "# News Analysis Reports\n\n",
            "- **2025-05-06**\n",
            "    - [chips](./a.md) (09:15, 4/6 articles scraped)\n",
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn test_same_day_entries_share_heading() {
        let first = insert_entry(&format!("{INDEX_TITLE}\n\n"), &entry("a.md", 9));
        let second = insert_entry(&first, &entry("b.md", 10));
        assert_eq!(second.matches("- **2025-05-06**").count(), 1);
        let a = second.find("./a.md").unwrap();
        let b = second.find("./b.md").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_existing_entry_is_not_duplicated() {
        let first = insert_entry(&format!("{INDEX_TITLE}\n\n"), &entry("a.md", 9));
        assert_eq!(insert_entry(&first, &entry("a.md", 9)), first);
    }

    #[tokio::test]
    async fn test_update_creates_index_file() {
        let dir = tempfile::tempdir().unwrap();
        update_reports_index(dir.path(), &entry("a.md", 9)).await.unwrap();
        update_reports_index(dir.path(), &entry("a.md", 9)).await.unwrap();
        let text = std::fs::read_to_string(dir.path().join(INDEX_FILENAME)).unwrap();
        assert!(text.starts_with(INDEX_TITLE));
        assert_eq!(text.matches("./a.md").count(), 1);
    }
}
