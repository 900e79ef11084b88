//! The document-source contract consumed by the ingestion adapter.
//!
//! The PDF decoder itself (content streams, glyph placement, font programs,
//! XObject decompression) is an external collaborator. This module defines
//! the trait a PDF library binding must implement so the pipeline can pull
//! positioned text records, page operator lists and image objects out of it.
//!
//! Implementations are expected to be cheap to call repeatedly; the pipeline
//! reads each page exactly once, in index order.

use crate::error::Result;
use std::time::Duration;

/// A positioned glyph run as reported by the PDF library's text-content
/// iterator.
///
/// Coordinates follow PDF conventions: the transform places the run's
/// baseline origin in page space, with larger Y meaning higher on the page.
#[derive(Debug, Clone)]
pub struct RawTextItem {
    /// Text-space to page-space transform `[a, b, c, d, e, f]`
    pub transform: [f32; 6],
    /// Advance width of the run in page units
    pub width: f32,
    /// Line height of the run as reported by the library
    pub height: f32,
    /// The run's text, as decoded by the library (not yet normalized)
    pub text: String,
    /// Identifier of the font resource the run was set in
    pub font_id: String,
}

/// One entry of a page's operator list.
///
/// Only the operators that matter for image placement are surfaced; the
/// library is free to omit everything else.
#[derive(Debug, Clone)]
pub enum PageOp {
    /// `q` — push the graphics state
    SaveState,
    /// `Q` — pop the graphics state
    RestoreState,
    /// `cm` — concatenate onto the CTM
    Transform([f32; 6]),
    /// Paint a named image XObject
    PaintImage {
        /// XObject resource name
        name: String,
    },
    /// Paint a named JPEG (DCT) image XObject
    PaintJpeg {
        /// XObject resource name
        name: String,
    },
    /// Paint an inline image whose data is embedded in the content stream
    PaintInlineImage {
        /// Pixel width of the inline image
        width: u32,
        /// Pixel height of the inline image
        height: u32,
        /// Inline image data as stored in the stream
        data: Vec<u8>,
    },
}

/// An image XObject resolved through the library's object store.
///
/// The adapter probes the byte sources in declaration order: raw stream
/// bytes, library-decoded bytes, then raw pixels (re-encoded to PNG).
#[derive(Debug, Clone, Default)]
pub struct ResolvedImage {
    /// Pixel width of the image
    pub width: u32,
    /// Pixel height of the image
    pub height: u32,
    /// The compressed stream bytes exactly as stored in the PDF
    pub stream_bytes: Option<Vec<u8>>,
    /// Bytes produced by the library's own accessor (already unfiltered)
    pub decoded_bytes: Option<Vec<u8>>,
    /// Raw pixel buffer, RGB (3 bytes/px) or RGBA (4 bytes/px)
    pub pixels: Option<Vec<u8>>,
}

/// Font descriptor fields relevant to style-confidence scoring.
#[derive(Debug, Clone)]
pub struct FontDescriptor {
    /// Font resource identifier (matches [`RawTextItem::font_id`])
    pub id: String,
    /// PostScript or family name
    pub name: String,
    /// Numeric weight from the descriptor, when present (400 regular, 700 bold)
    pub weight: Option<u16>,
    /// Italic angle in degrees, when present (non-zero means oblique)
    pub italic_angle: Option<f32>,
}

impl FontDescriptor {
    /// Build a descriptor carrying only a name, for fonts the library could
    /// not resolve. Style confidence degrades to name-substring heuristics.
    pub fn name_only(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            weight: None,
            italic_angle: None,
        }
    }
}

/// Document-level metadata.
#[derive(Debug, Clone, Default)]
pub struct DocumentMetadata {
    /// The `/Title` entry of the information dictionary, when present
    pub title: Option<String>,
}

/// The decoded content of a single page.
#[derive(Debug, Clone)]
pub struct PageContent {
    /// Page (viewport) width in page units
    pub width: f32,
    /// Page (viewport) height in page units
    pub height: f32,
    /// Positioned text runs in content-stream order
    pub text_items: Vec<RawTextItem>,
    /// Operator list entries relevant to image placement
    pub ops: Vec<PageOp>,
}

/// Contract the pipeline consumes from a PDF library binding.
///
/// Fatal errors belong in `metadata` and `page` (a document that cannot be
/// enumerated cannot be converted). `font` and `image_xobject` failures are
/// absorbed by the adapter: fonts degrade to name-only heuristics, images
/// are dropped.
pub trait DocumentSource {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Document metadata (title, used for the image name prefix).
    fn metadata(&mut self) -> Result<DocumentMetadata>;

    /// Resolve a font descriptor by resource id.
    ///
    /// Returning `Ok(None)` or `Err` degrades style detection for that font
    /// but never fails the conversion.
    fn font(&mut self, id: &str) -> Result<Option<FontDescriptor>>;

    /// Decode one page's text content and operator list.
    fn page(&mut self, index: usize) -> Result<PageContent>;

    /// Resolve an image XObject by resource name.
    ///
    /// Implementations must give up and return by `timeout`; the adapter
    /// treats `Err`, `Ok(None)` and deadline overruns identically by
    /// skipping the image.
    fn image_xobject(&mut self, name: &str, timeout: Duration) -> Result<Option<ResolvedImage>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_only_descriptor() {
        let font = FontDescriptor::name_only("F3-BoldItalic");
        assert_eq!(font.id, "F3-BoldItalic");
        assert_eq!(font.name, "F3-BoldItalic");
        assert!(font.weight.is_none());
        assert!(font.italic_angle.is_none());
    }

    #[test]
    fn test_resolved_image_default_has_no_bytes() {
        let img = ResolvedImage::default();
        assert!(img.stream_bytes.is_none());
        assert!(img.decoded_bytes.is_none());
        assert!(img.pixels.is_none());
    }
}
