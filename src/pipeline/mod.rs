//! The structural reconstruction pipeline.
//!
//! A linear sequence of transformations over a shared [`ParseResult`]:
//!
//! ```text
//! DocumentSource
//!     ↓
//! [ingest]      TextRun / ImageRecord items, page-number artifacts stripped
//!     ↓
//! [stats]       Globals: body font/height/spacing, style confidence
//!     ↓
//! [lines]       TextRun → Line (words, links, footnotes, inline format)
//!     ↓
//! [vertical]    single-character columns → horizontal lines
//!     ↓
//! [lists]       bullet / numbered list tagging
//!     ↓
//! [toc]         dot-leader table-of-contents tagging
//!     ↓
//! [headers]     weighted multi-feature H1–H4 classification
//!     ↓
//! [blocks]      Line → Block, images re-interleaved by Y-range
//!     ↓
//! [code]        indented untyped blocks → CODE
//!     ↓
//! [tables]      keyword + geometry table detection
//!     ↓
//! [markdown emitter + image sink]
//! ```
//!
//! Each stage reads a page's `items` and writes a replacement list; the
//! pipeline itself is data (an ordered list of boxed [`Stage`]s), so stages
//! can be tested in isolation and reordered trivially.

pub mod blocks;
pub mod code;
pub mod headers;
pub mod ingest;
pub mod lines;
pub mod lists;
pub mod stats;
pub mod tables;
pub mod toc;
pub mod vertical;

use crate::config::{ConvertObserver, ConvertOptions, NoopObserver};
use crate::converters::markdown::MarkdownEmitter;
use crate::elements::{PageContext, TextFormat};
use crate::error::Result;
use crate::images::ImageSink;
use crate::source::{DocumentMetadata, DocumentSource, FontDescriptor};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Per-font style confidence plus the discrete format derived from it.
///
/// The raw confidences are kept for explainability and threshold tuning;
/// downstream consults only [`FontStyle::format`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontStyle {
    /// Bold confidence in `[0, 1]`
    pub bold: f32,
    /// Italic confidence in `[0, 1]`
    pub italic: f32,
    /// Discrete format at the 0.3 thresholds
    pub format: TextFormat,
}

impl FontStyle {
    /// A regular (body) style with zero confidence.
    pub fn regular() -> Self {
        Self {
            bold: 0.0,
            italic: 0.0,
            format: TextFormat::Regular,
        }
    }
}

/// Document-wide statistics, computed once and read-only thereafter.
///
/// Stages that produce derived maps (the header detector's font-size level
/// assignment) extend this without mutating existing fields.
#[derive(Debug, Clone)]
pub struct Globals {
    /// Most frequent run height across the document
    pub body_height: f32,
    /// Most frequent font id across the document
    pub body_font: String,
    /// Modal positive Y-delta between consecutive body-height runs
    pub body_distance: f32,
    /// Largest run height seen
    pub max_height: f32,
    /// Font id of the largest run
    pub max_height_font: String,
    /// Per-font style confidence
    pub styles: HashMap<String, FontStyle>,
    /// Per-font average character width
    pub char_widths: HashMap<String, f32>,
    /// Font-size cluster representatives mapped to header levels (1..=4),
    /// filled in by the header detector
    pub header_levels: Vec<(f32, u8)>,
}

impl Default for Globals {
    fn default() -> Self {
        Self {
            body_height: 0.0,
            body_font: String::new(),
            body_distance: 0.0,
            max_height: 0.0,
            max_height_font: String::new(),
            styles: HashMap::new(),
            char_widths: HashMap::new(),
            header_levels: Vec::new(),
        }
    }
}

impl Globals {
    /// The discrete inline format of a font, regular when unknown.
    pub fn format_of(&self, font_id: &str) -> TextFormat {
        self.styles
            .get(font_id)
            .map(|s| s.format)
            .unwrap_or(TextFormat::Regular)
    }

    /// Look up the header level assigned to a font size, within `tolerance`.
    pub fn header_level_for(&self, height: f32, tolerance: f32) -> Option<u8> {
        self.header_levels
            .iter()
            .find(|(size, _)| (size - height).abs() <= tolerance)
            .map(|(_, level)| *level)
    }
}

/// The shared record every stage reads and rewrites.
#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    /// Pages in document order
    pub pages: Vec<PageContext>,
    /// Document-wide statistics (populated by the stats stage)
    pub globals: Globals,
    /// Resolved font descriptors by font id
    pub fonts: HashMap<String, FontDescriptor>,
    /// Document metadata (title feeds the image name prefix)
    pub metadata: DocumentMetadata,
}

/// One transformation of the pipeline.
pub trait Stage {
    /// Stage name for logging.
    fn name(&self) -> &'static str;

    /// Consume the parse result and produce the transformed one.
    fn run(&self, parse: ParseResult, options: &ConvertOptions) -> Result<ParseResult>;
}

/// The default stage order.
///
/// Detectors that claim lines run before the header detector so its
/// candidate set is already narrowed; block-level detectors run after
/// gathering.
pub fn default_stages() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(stats::GlobalStats),
        Box::new(lines::LineGrouping),
        Box::new(vertical::VerticalText),
        Box::new(lists::ListItems),
        Box::new(toc::TocLines),
        Box::new(headers::HeaderDetector),
        Box::new(blocks::BlockGatherer),
        Box::new(code::CodeBlocks),
        Box::new(tables::TableDetector),
    ]
}

/// The outcome of a conversion.
#[derive(Debug, Clone, Default)]
pub struct Conversion {
    /// One Markdown string per page, in page order
    pub pages: Vec<String>,
    /// Image name → encoded bytes; `Some` only for
    /// [`crate::ImageMode::Relative`]
    pub images: Option<IndexMap<String, Vec<u8>>>,
}

/// Convert a document to per-page Markdown.
///
/// # Arguments
///
/// * `source` - A PDF library bound to the [`DocumentSource`] contract
/// * `options` - Conversion options; validated before any page is read
///
/// # Errors
///
/// Fails on invalid configuration or when the source cannot enumerate the
/// document. Content defects (broken images, unresolved fonts, empty
/// pages) never abort the conversion.
pub fn convert<S: DocumentSource>(source: &mut S, options: &ConvertOptions) -> Result<Conversion> {
    let mut observer = NoopObserver;
    convert_with_observer(source, options, &mut observer)
}

/// Convert a document to per-page Markdown, firing observer callbacks.
///
/// Callbacks are observability-only; the output is identical to
/// [`convert`].
pub fn convert_with_observer<S: DocumentSource>(
    source: &mut S,
    options: &ConvertOptions,
    observer: &mut dyn ConvertObserver,
) -> Result<Conversion> {
    options.validate()?;

    let mut parse = ingest::ingest(source, options, observer)?;
    observer.on_document_parsed(parse.pages.len());

    for stage in default_stages() {
        log::debug!("running stage: {}", stage.name());
        parse = stage.run(parse, options)?;
    }

    let mut sink = ImageSink::new(options, &parse.metadata)?;
    let emitter = MarkdownEmitter::new(options);
    let mut pages = Vec::with_capacity(parse.pages.len());
    for page in &parse.pages {
        pages.push(emitter.emit_page(page, &mut sink)?);
    }

    Ok(Conversion {
        pages,
        images: sink.into_map(),
    })
}
