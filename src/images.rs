//! Image sink: turns image records into Markdown references and routes the
//! bytes per the configured [`ImageMode`].
//!
//! Ownership of the encoded buffers follows the mode: `save` writes and
//! drops, `base64` encodes once and drops, `relative` keeps them in the
//! returned map until the caller releases it, `none` drops immediately.

use crate::config::{ConvertOptions, ImageMode};
use crate::elements::ImageRecord;
use crate::error::Result;
use crate::source::DocumentMetadata;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use indexmap::IndexMap;
use std::fs;
use std::path::PathBuf;

/// Maximum length of the sanitized metadata-derived prefix.
const PREFIX_MAX: usize = 50;

/// Routes image bytes per the configured mode and hands the emitter its
/// Markdown references.
#[derive(Debug)]
pub struct ImageSink {
    mode: ImageMode,
    save_path: Option<PathBuf>,
    prefix: String,
    map: Option<IndexMap<String, Vec<u8>>>,
}

impl ImageSink {
    /// Create a sink for one conversion.
    ///
    /// In `save` mode the target directory is created here; failure to
    /// create it is fatal before any page is emitted.
    pub fn new(options: &ConvertOptions, metadata: &DocumentMetadata) -> Result<Self> {
        let save_path = match (options.image_mode, &options.image_save_path) {
            (ImageMode::Save, Some(path)) => {
                fs::create_dir_all(path)?;
                Some(path.clone())
            },
            _ => None,
        };

        Ok(Self {
            mode: options.image_mode,
            save_path,
            prefix: title_prefix(options, metadata),
            map: (options.image_mode == ImageMode::Relative).then(IndexMap::new),
        })
    }

    /// The file name an image record gets on the given page:
    /// `{prefix}_image{N}_p{page+1}.{ext}`.
    pub fn file_name(&self, image: &ImageRecord, page_index: usize) -> String {
        format!(
            "{}_{}_p{}.{}",
            self.prefix,
            image.synthetic_name(),
            page_index + 1,
            image.format.extension()
        )
    }

    /// Produce the Markdown reference for an image, routing its bytes.
    ///
    /// Returns `Ok(None)` when the image produces no reference: mode
    /// `none`, or a best-effort save that failed.
    pub fn render(&mut self, image: &ImageRecord, page_index: usize) -> Result<Option<String>> {
        let name = self.file_name(image, page_index);
        match self.mode {
            ImageMode::None => Ok(None),
            ImageMode::Base64 => {
                let encoded = BASE64.encode(&image.bytes);
                Ok(Some(format!(
                    "![{}](data:{};base64,{})",
                    name,
                    image.format.mime(),
                    encoded
                )))
            },
            ImageMode::Relative => {
                if let Some(map) = &mut self.map {
                    map.insert(name.clone(), image.bytes.clone());
                }
                Ok(Some(format!("![{}](./{})", name, name)))
            },
            ImageMode::Save => {
                let dir = match &self.save_path {
                    Some(dir) => dir,
                    None => return Ok(None),
                };
                let target = dir.join(&name);
                match fs::write(&target, &image.bytes) {
                    Ok(()) => Ok(Some(format!("![{}]({})", name, name))),
                    Err(e) => {
                        log::debug!("failed to write {}: {}, image dropped", target.display(), e);
                        Ok(None)
                    },
                }
            },
        }
    }

    /// The accumulated image map (`relative` mode only).
    pub fn into_map(self) -> Option<IndexMap<String, Vec<u8>>> {
        self.map
    }
}

/// The image name prefix: the caller-supplied string, else the metadata
/// title sanitized and truncated, else `pdf`.
pub fn title_prefix(options: &ConvertOptions, metadata: &DocumentMetadata) -> String {
    if let Some(prefix) = &options.title_prefix {
        if !prefix.is_empty() {
            return prefix.clone();
        }
    }
    let sanitized = metadata
        .title
        .as_deref()
        .map(sanitize_title)
        .unwrap_or_default();
    if sanitized.is_empty() {
        "pdf".to_string()
    } else {
        sanitized
    }
}

/// Keep ASCII alphanumerics and CJK ideographs, cap the length.
fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|&c| {
            let code = c as u32;
            c.is_ascii_alphanumeric()
                || (0x4E00..=0x9FFF).contains(&code)
                || (0x3400..=0x4DBF).contains(&code)
                || (0x3040..=0x30FF).contains(&code)
        })
        .take(PREFIX_MAX)
        .collect()
}
