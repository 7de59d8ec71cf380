//! Markdown rendering of [`DocumentTree`]s.
//!
//! | Block | Markdown |
//! |-------|----------|
//! | Title / Section / Subsection | `#` / `##` / `###` |
//! | Paragraph | runs with `**bold**` / `*italic*`, centered ones in `<div align="center">` |
//! | Table | GitHub pipe table, `|` escaped, an empty header row when none is given |
//! | Callout | `> [!NOTE]` blockquote |
//! | Separator | `---` |
//! | Page break | `<div style="page-break-after: always;"></div>` |

use crate::document::{Align, Block, DocumentTree, HeadingLevel, Paragraph, Table, TextRun};
use crate::error::{Error, Result};
use std::fmt::{self, Write};
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

/// Serializes a [`DocumentTree`] to a file.
pub trait DocumentRenderer {
    /// Human-readable format name, shown in the report itself.
    fn format_name(&self) -> &'static str;

    /// File extension, without the dot.
    fn extension(&self) -> &'static str;

    /// Write `doc` to `path`. Any failure is an [`Error::Render`].
    async fn render(&self, doc: &DocumentTree, path: &Path) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl DocumentRenderer for MarkdownRenderer {
    fn format_name(&self) -> &'static str {
        "Markdown"
    }

    fn extension(&self) -> &'static str {
        "md"
    }

    #[instrument(
        level = "info",
        skip_all,
        fields(path = %path.display(), blocks = doc.blocks.len())
    )]
    async fn render(&self, doc: &DocumentTree, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                error!(dir = %parent.display(), error = %e, "Failed to create output dir");
                Error::Render(format!("{}: {e}", parent.display()))
            })?;
        }
        fs::write(path, to_markdown(doc))
            .await
            .map_err(|e| Error::Render(format!("{}: {e}", path.display())))?;
        info!("Wrote Markdown report");
        Ok(())
    }
}

/// Render a document to a Markdown string.
pub fn to_markdown(doc: &DocumentTree) -> String {
    Markdown(doc).to_string()
}

struct Markdown<'a>(&'a DocumentTree);

impl fmt::Display for Markdown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let doc = self.0;
        if !doc.header.is_empty() {
            writeln!(f, "*{}*\n", doc.header)?;
        }
        for block in &doc.blocks {
            write_block(f, block)?;
            writeln!(f)?;
        }
        if !doc.footer.is_empty() {
            writeln!(f, "---\n\n*{}*", doc.footer)?;
        }
        Ok(())
    }
}

fn write_block(f: &mut impl Write, block: &Block) -> fmt::Result {
    match block {
        Block::Heading { level, text } => {
            let hashes = match level {
                HeadingLevel::Title => "#",
                HeadingLevel::Section => "##",
                HeadingLevel::Subsection => "###",
            };
            writeln!(f, "{hashes} {text}")
        }
        Block::Paragraph(p) => write_paragraph(f, p),
        Block::BulletList { items } => items.iter().try_for_each(|item| writeln!(f, "- {item}")),
        Block::Table(table) => write_table(f, table),
        Block::Callout { text } => {
            writeln!(f, "> [!NOTE]")?;
            text.lines().try_for_each(|line| writeln!(f, "> {line}"))
        }
        Block::Separator => writeln!(f, "---"),
        Block::PageBreak => writeln!(f, "<div style=\"page-break-after: always;\"></div>"),
    }
}

fn write_paragraph(f: &mut impl Write, p: &Paragraph) -> fmt::Result {
    let text: String = p.runs.iter().map(run_markdown).collect();
    match (p.align, p.indented) {
        (Align::Center, _) => writeln!(f, "<div align=\"center\">\n\n{text}\n\n</div>"),
        (Align::Left, true) => text.lines().try_for_each(|line| writeln!(f, "> {line}")),
        (Align::Left, false) => writeln!(f, "{text}"),
    }
}

/// Wrap the non-whitespace core of a run in emphasis markers.
///
/// Markers hugging whitespace (`**Article 1: **`) are not parsed as
/// emphasis, so surrounding whitespace stays outside.
fn run_markdown(run: &TextRun) -> String {
    let marker = match (run.bold, run.italic) {
        (true, true) => "***",
        (true, false) => "**",
        (false, true) => "*",
        (false, false) => return run.text.clone(),
    };
    let core = run.text.trim();
    if core.is_empty() {
        return run.text.clone();
    }
    let lead = &run.text[..run.text.len() - run.text.trim_start().len()];
    let trail = &run.text[run.text.trim_end().len()..];
    format!("{lead}{marker}{core}{marker}{trail}")
}

fn write_table(f: &mut impl Write, table: &Table) -> fmt::Result {
    let width = table
        .header
        .as_ref()
        .map(Vec::len)
        .into_iter()
        .chain(table.rows.iter().map(Vec::len))
        .max()
        .unwrap_or(0);
    if width == 0 {
        return Ok(());
    }

    let empty = vec![String::new(); width];
    write_row(f, table.header.as_ref().unwrap_or(&empty), width)?;
    writeln!(f, "|{}", " --- |".repeat(width))?;
    table.rows.iter().try_for_each(|row| write_row(f, row, width))
}

fn write_row(f: &mut impl Write, cells: &[String], width: usize) -> fmt::Result {
    write!(f, "|")?;
    for i in 0..width {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        write!(f, " {} |", escape_cell(cell))?;
    }
    writeln!(f)
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace('\n', "<br>")
}
