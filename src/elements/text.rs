//! Text element types flowing through the pipeline.
//!
//! A page's items start as positioned [`TextRun`]s, are folded into
//! [`Line`]s of analyzed [`Word`]s, and finally gathered into blocks.

use crate::elements::block::BlockType;

/// A single positioned glyph run, as produced by the ingestion adapter.
///
/// Coordinates follow PDF conventions: `y` is the baseline and larger `y`
/// means higher on the page. Runs are immutable once ingested; stages that
/// need a variant copy the run.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    /// Baseline X position (rounded to an integer at ingestion)
    pub x: f32,
    /// Baseline Y position (rounded to an integer at ingestion)
    pub y: f32,
    /// Advance width in page units
    pub width: f32,
    /// Line height, corrected for font-scaled transforms
    pub height: f32,
    /// NFKC-normalized text
    pub text: String,
    /// Font resource id the run was set in
    pub font_id: String,
}

impl TextRun {
    /// Whether the trimmed text is a bare integer.
    pub fn is_numeric(&self) -> bool {
        let trimmed = self.text.trim();
        !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit())
    }
}

/// Inline formatting derived from a font's style confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextFormat {
    /// No inline marker
    #[default]
    Regular,
    /// `**bold**`
    Bold,
    /// `*italic*`
    Italic,
    /// `***bold italic***`
    BoldItalic,
}

impl TextFormat {
    /// The Markdown marker for this format (empty for regular text).
    pub fn marker(&self) -> &'static str {
        match self {
            TextFormat::Regular => "",
            TextFormat::Bold => "**",
            TextFormat::Italic => "*",
            TextFormat::BoldItalic => "***",
        }
    }
}

/// Semantic role of a word within a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordKind {
    /// Ordinary text
    Plain,
    /// Hyperlink; emitted as `[text](url)`
    Link {
        /// Link target (the word itself, `www.` words get `http://` prefixed)
        url: String,
    },
    /// Raised numeral referencing a footnote; emitted as `[^N]`
    FootnoteAnchor,
    /// Numeral opening a footnote definition; emitted as `[^N]: `
    FootnoteDef,
}

/// A word produced by inline analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    /// The word's glyphs (may contain interior spaces from merged runs)
    pub text: String,
    /// Semantic role
    pub kind: WordKind,
    /// Inline format inherited from the source font
    pub format: TextFormat,
}

impl Word {
    /// Create a plain, unformatted word.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: WordKind::Plain,
            format: TextFormat::Regular,
        }
    }
}

/// Counts of the elements found while parsing a line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineSummary {
    /// Number of words
    pub words: usize,
    /// Number of link words
    pub links: usize,
    /// Number of footnote anchors
    pub footnote_anchors: usize,
    /// Number of footnote definitions
    pub footnote_defs: usize,
}

/// A logical line: same-baseline runs merged and analyzed into words.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// X of the first (leftmost) run
    pub x: f32,
    /// Baseline Y of the first run
    pub y: f32,
    /// Sum of the source run widths
    pub width: f32,
    /// Maximum source run height
    pub height: f32,
    /// Words in ascending X order
    pub words: Vec<Word>,
    /// Structural type, once a detector has claimed the line
    pub kind: Option<BlockType>,
    /// Dominant font id (the leftmost run's font)
    pub font_id: String,
    /// Lines that lost all content (or were replaced by a synthetic
    /// duplicate) are retained but marked removed
    pub removed: bool,
}

impl Line {
    /// Tally the parsed elements of this line.
    pub fn summary(&self) -> LineSummary {
        let mut summary = LineSummary {
            words: self.words.len(),
            ..Default::default()
        };
        for word in &self.words {
            match word.kind {
                WordKind::Link { .. } => summary.links += 1,
                WordKind::FootnoteAnchor => summary.footnote_anchors += 1,
                WordKind::FootnoteDef => summary.footnote_defs += 1,
                WordKind::Plain => {},
            }
        }
        summary
    }

    /// The line's text with words joined by single spaces.
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Coarse character class used by the vertical-text recombiner.
///
/// A column of vertically-set glyphs only recombines while its characters
/// stay in one class; mixing classes breaks the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharKind {
    /// CJK ideographs, kana and fullwidth forms
    Cjk,
    /// Latin letters
    Latin,
    /// ASCII digits
    Digit,
    /// Everything else
    Other,
}

impl CharKind {
    /// Classify a character.
    pub fn of(c: char) -> Self {
        let code = c as u32;
        if (0x4E00..=0x9FFF).contains(&code)
            || (0x3400..=0x4DBF).contains(&code)
            || (0x3040..=0x30FF).contains(&code)
            || (0xF900..=0xFAFF).contains(&code)
            || (0xFF00..=0xFFEF).contains(&code)
        {
            CharKind::Cjk
        } else if c.is_ascii_digit() {
            CharKind::Digit
        } else if c.is_alphabetic() {
            CharKind::Latin
        } else {
            CharKind::Other
        }
    }
}
