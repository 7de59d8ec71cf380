//! Structured report documents.
//!
//! A [`DocumentTree`] is an ordered list of [`Block`]s plus running header
//! and footer text. It is produced once by [`DocumentAssembler`] and handed
//! to a renderer; nothing mutates it afterwards.

pub mod assemble;

pub use assemble::{AssemblyConfig, DocumentAssembler};

use serde::Serialize;

/// Heading depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadingLevel {
    Title,
    Section,
    Subsection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Align {
    #[default]
    Left,
    Center,
}

/// A styled span of text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TextRun {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    /// De-emphasized text (captions, previews, separators).
    pub muted: bool,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            bold: true,
            ..Self::plain(text)
        }
    }

    pub fn italic(text: impl Into<String>) -> Self {
        Self {
            italic: true,
            ..Self::plain(text)
        }
    }

    pub fn muted(self) -> Self {
        Self { muted: true, ..self }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Paragraph {
    pub runs: Vec<TextRun>,
    pub align: Align,
    pub indented: bool,
}

impl Paragraph {
    pub fn new(runs: Vec<TextRun>) -> Self {
        Self {
            runs,
            ..Default::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(vec![TextRun::plain(text)])
    }

    pub fn centered(self) -> Self {
        Self {
            align: Align::Center,
            ..self
        }
    }

    pub fn indented(self) -> Self {
        Self { indented: true, ..self }
    }

    /// Concatenated run text without styling.
    pub fn plain_text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// A grid of text cells. Rows are expected to match the header width.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Table {
    pub header: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn with_header<H, R>(header: H, rows: R) -> Self
    where
        H: IntoIterator,
        H::Item: Into<String>,
        R: IntoIterator<Item = Vec<String>>,
    {
        Self {
            header: Some(header.into_iter().map(Into::into).collect()),
            rows: rows.into_iter().collect(),
        }
    }

    /// A two-column label/value table without a header row.
    pub fn key_value<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            header: None,
            rows: pairs.into_iter().map(|(k, v)| vec![k.into(), v.into()]).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Heading { level: HeadingLevel, text: String },
    Paragraph(Paragraph),
    BulletList { items: Vec<String> },
    Table(Table),
    /// Highlighted box around a block of text.
    Callout { text: String },
    Separator,
    PageBreak,
}

/// A complete document ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DocumentTree {
    pub header: String,
    pub footer: String,
    pub blocks: Vec<Block>,
}

impl DocumentTree {
    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn heading(&mut self, level: HeadingLevel, text: impl Into<String>) {
        self.push(Block::Heading {
            level,
            text: text.into(),
        });
    }

    pub fn section(&mut self, text: impl Into<String>) {
        self.heading(HeadingLevel::Section, text);
    }

    pub fn subsection(&mut self, text: impl Into<String>) {
        self.heading(HeadingLevel::Subsection, text);
    }

    pub fn paragraph(&mut self, paragraph: Paragraph) {
        self.push(Block::Paragraph(paragraph));
    }

    pub fn text(&mut self, text: impl Into<String>) {
        self.paragraph(Paragraph::text(text));
    }

    pub fn bullets<S: Into<String>>(&mut self, items: impl IntoIterator<Item = S>) {
        self.push(Block::BulletList {
            items: items.into_iter().map(Into::into).collect(),
        });
    }

    pub fn table(&mut self, table: Table) {
        self.push(Block::Table(table));
    }

    pub fn callout(&mut self, text: impl Into<String>) {
        self.push(Block::Callout { text: text.into() });
    }

    pub fn separator(&mut self) {
        self.push(Block::Separator);
    }

    pub fn page_break(&mut self) {
        self.push(Block::PageBreak);
    }

    /// Text of every heading at `level`, in document order.
    pub fn headings(&self, level: HeadingLevel) -> Vec<&str> {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                Block::Heading { level: l, text } if *l == level => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Blocks between the section heading `title` and the next section heading.
    pub fn section_blocks(&self, title: &str) -> &[Block] {
        let is_section = |b: &Block| {
            matches!(
                b,
                Block::Heading {
                    level: HeadingLevel::Section,
                    ..
                }
            )
        };
        let Some(start) = self.blocks.iter().position(|b| {
            matches!(b, Block::Heading { level: HeadingLevel::Section, text } if text == title)
        }) else {
            return &[];
        };
        let body = &self.blocks[start + 1..];
        let end = body.iter().position(is_section).unwrap_or(body.len());
        &body[..end]
    }
}
