//! Decoded raster image records.

/// Image format of a decoded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG (lossless)
    Png,
    /// JPEG (lossy, preserves DCT-encoded images byte for byte)
    Jpeg,
}

impl ImageFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }

    /// MIME subtype used in data URIs.
    pub fn mime(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }

    /// Detect the format from leading magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<ImageFormat> {
        if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            Some(ImageFormat::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8]) {
            Some(ImageFormat::Jpeg)
        } else {
            None
        }
    }

    /// Whether `bytes` start with this format's magic numbers.
    pub fn matches(&self, bytes: &[u8]) -> bool {
        ImageFormat::sniff(bytes) == Some(*self)
    }
}

/// A decoded raster image positioned on a page.
///
/// Records are produced by the ingestion adapter and flow through the
/// pipeline unchanged; the block gatherer only reorders them. The byte
/// buffer is guaranteed to start with the magic numbers of `format`
/// (records failing that check are dropped at ingestion).
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    /// Horizontal center of the painted image
    pub x: f32,
    /// Vertical center of the painted image
    pub y: f32,
    /// Painted width in page units
    pub width: f32,
    /// Painted height in page units
    pub height: f32,
    /// Encoded bytes (PNG or JPEG)
    pub bytes: Vec<u8>,
    /// Byte format
    pub format: ImageFormat,
    /// Document-wide monotonic image number, starting at 1
    pub index: usize,
}

impl ImageRecord {
    /// The synthetic name assigned at ingestion (`image{N}`).
    pub fn synthetic_name(&self) -> String {
        format!("image{}", self.index)
    }
}
