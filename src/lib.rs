// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::manual_range_contains)]
#![allow(clippy::match_like_matches_macro)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # PDF Markdown
//!
//! Structural reconstruction of document semantics from low-level PDF
//! layout: positioned glyph runs, font metadata and image-paint records go
//! in, per-page Markdown comes out.
//!
//! ## What it does
//!
//! - **Statistics-driven classification**: body font/height/spacing modes,
//!   per-font style confidence, multi-feature header scoring with font-size
//!   clustering
//! - **Structure recovery**: headings (H1–H4), lists, code blocks, tables,
//!   footnotes, table-of-contents lines, inline bold/italic, links
//! - **Layout repair**: vertical-text recombination, page-number artifact
//!   stripping, in-flow image placement by Y-range overlap
//! - **Image handling**: discard, base64 data URIs, in-memory map, or
//!   save-to-disk, with PNG/JPEG magic validation
//!
//! The PDF decoder itself is an external collaborator: bind your PDF
//! library to the [`source::DocumentSource`] trait and the pipeline
//! consumes its positioned text runs and operator lists.
//!
//! ## Quick Start
//!
//! ```ignore
//! use pdf_markdown::{convert, ConvertOptions, ImageMode};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut source = MyPdfBinding::open("paper.pdf")?;
//! let options = ConvertOptions {
//!     image_mode: ImageMode::Relative,
//!     ..Default::default()
//! };
//! let result = convert(&mut source, &options)?;
//! for page in &result.pages {
//!     println!("{}", page);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]

// Error handling
pub mod error;

// Configuration
pub mod config;

// Geometry (CTM tracking, vertical extents)
pub mod geometry;

// The consumed PDF-library contract
pub mod source;

// Page element model
pub mod elements;

// The structural reconstruction pipeline
pub mod pipeline;

// Markdown emission
pub mod converters;

// Image sink (discard / base64 / map / save)
pub mod images;

// Re-exports
pub use config::{ConvertObserver, ConvertOptions, HeaderWeights, ImageMode, NoopObserver, Tunables};
pub use error::{Error, Result};
pub use pipeline::{convert, convert_with_observer, Conversion, Globals, ParseResult, Stage};
pub use source::{DocumentMetadata, DocumentSource, FontDescriptor, PageContent, PageOp, RawTextItem, ResolvedImage};

// Internal utilities
pub(crate) mod utils {
    //! Internal utility functions for the library.

    use std::cmp::Ordering;

    /// Safely compare two floating point numbers, handling NaN cases.
    ///
    /// NaN values are treated as equal to each other and greater than all
    /// other values, so sorting never panics on NaN comparisons.
    #[inline]
    pub fn safe_float_cmp(a: f32, b: f32) -> Ordering {
        match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => a.partial_cmp(&b).unwrap(),
        }
    }

}

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
