//! Page element model.
//!
//! A page's `items` list holds different element kinds at different
//! pipeline stages: raw [`TextRun`]s after ingestion, [`Line`]s after line
//! grouping, [`Block`]s after gathering. [`ImageRecord`]s ride along from
//! ingestion to emission. The tagged [`PageItem`] variant makes each
//! stage's expectations checkable with an exhaustive match.

pub mod block;
pub mod image;
pub mod text;

pub use block::{Block, BlockType};
pub use image::{ImageFormat, ImageRecord};
pub use text::{CharKind, Line, LineSummary, TextFormat, TextRun, Word, WordKind};

/// A single item on a page, at whatever stage the page is in.
#[derive(Debug, Clone, PartialEq)]
pub enum PageItem {
    /// A positioned glyph run (stages 1–2)
    Run(TextRun),
    /// A merged, analyzed line (stages 3–6)
    Line(Line),
    /// A typed block (stages 7+)
    Block(Block),
    /// A decoded image record (all stages)
    Image(ImageRecord),
}

impl PageItem {
    /// The run inside, if this is a run item.
    pub fn as_run(&self) -> Option<&TextRun> {
        match self {
            PageItem::Run(run) => Some(run),
            _ => None,
        }
    }

    /// The line inside, if this is a line item.
    pub fn as_line(&self) -> Option<&Line> {
        match self {
            PageItem::Line(line) => Some(line),
            _ => None,
        }
    }

    /// Mutable access to the line inside, if this is a line item.
    pub fn as_line_mut(&mut self) -> Option<&mut Line> {
        match self {
            PageItem::Line(line) => Some(line),
            _ => None,
        }
    }

    /// The block inside, if this is a block item.
    pub fn as_block(&self) -> Option<&Block> {
        match self {
            PageItem::Block(block) => Some(block),
            _ => None,
        }
    }

    /// The image inside, if this is an image item.
    pub fn as_image(&self) -> Option<&ImageRecord> {
        match self {
            PageItem::Image(image) => Some(image),
            _ => None,
        }
    }

    /// Whether this item is an image record.
    pub fn is_image(&self) -> bool {
        matches!(self, PageItem::Image(_))
    }
}

/// One page of the document being converted.
#[derive(Debug, Clone)]
pub struct PageContext {
    /// Zero-based page index
    pub index: usize,
    /// Page width in page units
    pub width: f32,
    /// Page height in page units
    pub height: f32,
    /// Ordered items, element kind depending on the pipeline stage
    pub items: Vec<PageItem>,
}

impl PageContext {
    /// Create an empty page.
    pub fn new(index: usize, width: f32, height: f32) -> Self {
        Self {
            index,
            width,
            height,
            items: Vec::new(),
        }
    }

    /// Iterate the lines on this page (skips images and other item kinds).
    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.items.iter().filter_map(PageItem::as_line)
    }

    /// Iterate the blocks on this page.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.items.iter().filter_map(PageItem::as_block)
    }
}
