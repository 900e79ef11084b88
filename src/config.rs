//! Conversion options and heuristic tunables.
//!
//! All settings live in [`ConvertOptions`]; the detector thresholds,
//! weights and keyword lists sit behind [`Tunables`] so callers can retune
//! the classifiers (or swap the CJK keyword defaults for another corpus)
//! without touching the geometric rules.

use crate::error::{Error, Result};
use crate::source::{DocumentMetadata, FontDescriptor};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// How decoded images are handled and referenced in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageMode {
    /// Drop images; the Markdown contains no image references
    #[default]
    None,
    /// Embed each image as a base64 data URI
    Base64,
    /// Reference images as `./name` and return the bytes in the result map
    Relative,
    /// Write images under [`ConvertOptions::image_save_path`]
    Save,
}

/// Feature weights for the header detector.
///
/// The score of a candidate line is the weighted mean of its present
/// features; weights are normalized over the features that could be
/// computed, so absent features do not drag the score down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeaderWeights {
    /// Line height relative to body height, gated at the ratio threshold
    pub font_size_ratio: f32,
    /// Whitespace before/after the line relative to body line spacing
    pub vertical_spacing: f32,
    /// No other candidate within half a line-height vertically
    pub standalone: f32,
    /// Vertical position of the line within the page
    pub position_on_page: f32,
    /// How common the line's font size is on the page
    pub repetition: f32,
    /// Trimmed text equals its uppercase form and contains a letter
    pub uppercase: f32,
    /// Line font differs from the body font
    pub font_family: f32,
}

impl Default for HeaderWeights {
    fn default() -> Self {
        Self {
            font_size_ratio: 0.35,
            vertical_spacing: 0.20,
            standalone: 0.15,
            position_on_page: 0.10,
            repetition: 0.10,
            uppercase: 0.05,
            font_family: 0.05,
        }
    }
}

/// Thresholds, weights and keyword lists for the structural classifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tunables {
    /// Minimum weighted score for a line to be retained as a header candidate
    pub header_score_threshold: f32,
    /// Header feature weights
    pub header_weights: HeaderWeights,
    /// Minimum height/body-height ratio for the font-size feature to fire
    pub font_size_ratio_gate: f32,
    /// Font-size clustering tolerance for header level assignment
    pub cluster_tolerance: f32,
    /// Exact-height table-of-contents overrides: `(line height, level 1..=4)`.
    /// Matches take precedence over cluster-derived levels.
    pub toc_levels: Vec<(f32, u8)>,
    /// Extra slack added to the indented-line gap threshold in the block
    /// gatherer
    pub big_distance_slack: f32,
    /// Horizontal gap above which a space is inserted between merged runs
    pub word_space_gap: f32,
    /// Minimum column length for the vertical-text recombiner to emit a
    /// merged horizontal line
    pub vertical_stash_min: usize,
    /// Minimum downward step between single-character lines in a vertical
    /// column
    pub vertical_gap: f32,
    /// Characters recognized as list bullets (normalized to `-`)
    pub bullet_chars: String,
    /// Keywords that mark a token as a table header cell
    pub table_header_keywords: Vec<String>,
    /// Phrases that mark running prose (rejects table detection)
    pub table_paragraph_cues: Vec<String>,
    /// Glyphs treated as strong table-cell indicators
    pub status_glyphs: Vec<String>,
    /// Strip repeating bare-integer page-number artifacts
    pub strip_page_numbers: bool,
    /// Deadline for resolving one image XObject, in seconds
    pub image_fetch_timeout_secs: u64,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            header_score_threshold: 0.4,
            header_weights: HeaderWeights::default(),
            font_size_ratio_gate: 1.15,
            cluster_tolerance: 0.5,
            toc_levels: Vec::new(),
            big_distance_slack: 1.0,
            word_space_gap: 5.0,
            vertical_stash_min: 5,
            vertical_gap: 5.0,
            bullet_chars: "•·●◦○▪■□▸‣*+".to_string(),
            table_header_keywords: vec![
                "名称".to_string(),
                "类型".to_string(),
                "支持".to_string(),
                "备注".to_string(),
                "标题".to_string(),
                "参数".to_string(),
                "默认".to_string(),
                "说明".to_string(),
            ],
            table_paragraph_cues: vec![
                "这是".to_string(),
                "用于".to_string(),
                "说明".to_string(),
                "但是".to_string(),
                "所以".to_string(),
                "因为".to_string(),
                "如果".to_string(),
            ],
            status_glyphs: vec!["✅".to_string(), "⚠️".to_string(), "❌".to_string()],
            strip_page_numbers: true,
            image_fetch_timeout_secs: 10,
        }
    }
}

impl Tunables {
    /// The image-fetch deadline as a [`Duration`].
    pub fn image_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.image_fetch_timeout_secs)
    }
}

/// Caller-supplied conversion options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConvertOptions {
    /// Image handling mode
    pub image_mode: ImageMode,
    /// Target directory for [`ImageMode::Save`]; created if absent
    pub image_save_path: Option<PathBuf>,
    /// Overrides the metadata-derived image name prefix
    pub title_prefix: Option<String>,
    /// Heuristic thresholds, weights and keyword lists
    pub tunables: Tunables,
}

impl ConvertOptions {
    /// Validate the options before any page is touched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when `image_mode` is `Save` without
    /// an `image_save_path`.
    pub fn validate(&self) -> Result<()> {
        if self.image_mode == ImageMode::Save && self.image_save_path.is_none() {
            return Err(Error::InvalidConfig(
                "image_mode = save requires image_save_path".to_string(),
            ));
        }
        Ok(())
    }
}

/// Observability callbacks fired during conversion.
///
/// All methods default to no-ops; callbacks have no effect on the output.
pub trait ConvertObserver {
    /// Document metadata became available.
    fn on_metadata(&mut self, _metadata: &DocumentMetadata) {}

    /// A page finished ingesting (`index` is zero-based).
    fn on_page(&mut self, _index: usize, _total: usize) {}

    /// A font descriptor was resolved.
    fn on_font(&mut self, _font: &FontDescriptor) {}

    /// All pages were ingested; structural analysis begins.
    fn on_document_parsed(&mut self, _pages: usize) {}
}

/// The default observer: ignores every event.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl ConvertObserver for NoopObserver {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = HeaderWeights::default();
        let sum = w.font_size_ratio
            + w.vertical_spacing
            + w.standalone
            + w.position_on_page
            + w.repetition
            + w.uppercase
            + w.font_family;
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_save_mode_requires_path() {
        let options = ConvertOptions {
            image_mode: ImageMode::Save,
            ..Default::default()
        };
        assert!(options.validate().is_err());

        let options = ConvertOptions {
            image_mode: ImageMode::Save,
            image_save_path: Some(PathBuf::from("/tmp/images")),
            ..Default::default()
        };
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_other_modes_need_no_path() {
        for mode in [ImageMode::None, ImageMode::Base64, ImageMode::Relative] {
            let options = ConvertOptions {
                image_mode: mode,
                ..Default::default()
            };
            assert!(options.validate().is_ok());
        }
    }

    #[test]
    fn test_fetch_timeout_default() {
        let tunables = Tunables::default();
        assert_eq!(tunables.image_fetch_timeout(), Duration::from_secs(10));
    }
}
