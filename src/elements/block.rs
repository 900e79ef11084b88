//! Typed blocks: groups of consecutive lines sharing a structural role.

use crate::elements::text::Line;

/// The closed set of structural block types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    /// Level-1 heading
    H1,
    /// Level-2 heading
    H2,
    /// Level-3 heading
    H3,
    /// Level-4 heading
    H4,
    /// Level-5 heading
    H5,
    /// Level-6 heading
    H6,
    /// List entry (bulleted or numbered, bullets normalized to `-`)
    List,
    /// Indented code
    Code,
    /// Tabular content
    Table,
    /// Table-of-contents entry
    Toc,
    /// Footnote definitions
    Footnotes,
    /// Plain paragraph text
    Paragraph,
}

impl BlockType {
    /// Heading level (1..=6) when this is a headline type.
    pub fn headline_level(&self) -> Option<u8> {
        match self {
            BlockType::H1 => Some(1),
            BlockType::H2 => Some(2),
            BlockType::H3 => Some(3),
            BlockType::H4 => Some(4),
            BlockType::H5 => Some(5),
            BlockType::H6 => Some(6),
            _ => None,
        }
    }

    /// Construct a headline type from a level (1..=6).
    pub fn headline(level: u8) -> Option<BlockType> {
        match level {
            1 => Some(BlockType::H1),
            2 => Some(BlockType::H2),
            3 => Some(BlockType::H3),
            4 => Some(BlockType::H4),
            5 => Some(BlockType::H5),
            6 => Some(BlockType::H6),
            _ => None,
        }
    }

    /// Whether consecutive lines of this type merge into one block.
    ///
    /// Headlines stay single-line; everything else aggregates.
    pub fn merge_to_block(&self) -> bool {
        self.headline_level().is_none()
    }

    /// Whether a block of this type absorbs subsequent untyped lines
    /// regardless of spacing.
    pub fn merge_following_untyped(&self) -> bool {
        matches!(self, BlockType::Toc)
    }

    /// Whether a block of this type absorbs subsequent untyped lines only
    /// when the gap is small.
    pub fn merge_following_untyped_small_distance(&self) -> bool {
        matches!(self, BlockType::Footnotes)
    }
}

/// A group of consecutive lines sharing a [`BlockType`].
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Lines in page order (top to bottom)
    pub lines: Vec<Line>,
    /// Structural type
    pub kind: BlockType,
    /// Free-form note attached by a detector (e.g. the matched table rule)
    pub annotation: Option<String>,
}

impl Block {
    /// Create a block from its lines and type.
    pub fn new(kind: BlockType, lines: Vec<Line>) -> Self {
        Self {
            lines,
            kind,
            annotation: None,
        }
    }

    /// Baseline of the first line (top of the block).
    pub fn top_y(&self) -> f32 {
        self.lines.first().map(|l| l.y).unwrap_or(0.0)
    }

    /// Baseline minus height of the last line (bottom of the block).
    pub fn bottom_y(&self) -> f32 {
        self.lines.last().map(|l| l.y - l.height).unwrap_or(0.0)
    }

    /// Smallest line X in the block.
    pub fn min_x(&self) -> f32 {
        self.lines
            .iter()
            .map(|l| l.x)
            .fold(f32::INFINITY, f32::min)
    }

    /// All line texts joined with single spaces.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
