//! Ingestion adapter: document source → positioned page items.
//!
//! Converts the PDF library's text-content records and operator lists into
//! [`TextRun`]s and [`ImageRecord`]s, NFKC-normalizing text, tracking the
//! CTM across save/restore/concat operators for image placement, and
//! stripping repeated page-number artifacts. Per-page output is sorted by
//! Y descending, ties broken by X ascending.

use crate::config::{ConvertObserver, ConvertOptions};
use crate::elements::{ImageFormat, ImageRecord, PageContext, PageItem, TextRun};
use crate::error::{Error, Result};
use crate::geometry::MatrixStack;
use crate::pipeline::ParseResult;
use crate::source::{DocumentSource, FontDescriptor, PageOp, RawTextItem, ResolvedImage};
use crate::utils::safe_float_cmp;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};
use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

/// Fraction of the page height considered "near the edge" when hunting for
/// page-number artifacts.
const EDGE_BAND: f32 = 0.1;

/// Number of leading pages examined for the page-number pattern.
const PAGE_NUMBER_PROBE: usize = 10;

/// Minimum consecutive-page chain length that arms the stripper.
const PAGE_NUMBER_MIN_CHAIN: usize = 3;

/// Ingest every page of the document.
pub fn ingest<S: DocumentSource>(
    source: &mut S,
    options: &ConvertOptions,
    observer: &mut dyn ConvertObserver,
) -> Result<ParseResult> {
    let metadata = source.metadata()?;
    observer.on_metadata(&metadata);

    let total = source.page_count();
    let mut pages = Vec::with_capacity(total);
    let mut fonts: HashMap<String, FontDescriptor> = HashMap::new();
    let mut image_counter = 0usize;

    for index in 0..total {
        let content = source.page(index).map_err(|e| Error::Page {
            index,
            reason: e.to_string(),
        })?;

        let mut page = PageContext::new(index, content.width, content.height);

        for item in &content.text_items {
            resolve_font(source, &mut fonts, &item.font_id, observer);
            page.items.push(PageItem::Run(text_run_from(item)));
        }

        extract_images(source, &content.ops, options, &mut image_counter, &mut page);

        sort_page(&mut page);
        observer.on_page(index, total);
        pages.push(page);
    }

    if options.tunables.strip_page_numbers {
        strip_page_numbers(&mut pages);
    }

    Ok(ParseResult {
        pages,
        fonts,
        metadata,
        ..Default::default()
    })
}

/// Convert one library text record into a [`TextRun`].
///
/// Positions are rounded to integers; the height is divided by the
/// magnitude of the transform's (a, b) components when that quotient
/// exceeds 1, undoing font-scaled heights.
fn text_run_from(item: &RawTextItem) -> TextRun {
    let [a, b, _, _, e, f] = item.transform;
    let mut height = item.height;
    let mag = (a * a + b * b).sqrt();
    if mag > 0.0 {
        let quotient = item.height / mag;
        if quotient > 1.0 {
            height = quotient;
        }
    }

    TextRun {
        x: e.round(),
        y: f.round(),
        width: item.width,
        height,
        text: item.text.nfkc().collect(),
        font_id: item.font_id.clone(),
    }
}

fn resolve_font<S: DocumentSource>(
    source: &mut S,
    fonts: &mut HashMap<String, FontDescriptor>,
    font_id: &str,
    observer: &mut dyn ConvertObserver,
) {
    if fonts.contains_key(font_id) {
        return;
    }
    let descriptor = match source.font(font_id) {
        Ok(Some(descriptor)) => {
            observer.on_font(&descriptor);
            descriptor
        },
        Ok(None) => FontDescriptor::name_only(font_id),
        Err(e) => {
            log::debug!("font {} failed to resolve: {}", font_id, e);
            FontDescriptor::name_only(font_id)
        },
    };
    fonts.insert(font_id.to_string(), descriptor);
}

/// Replay the operator list, collecting image records.
fn extract_images<S: DocumentSource>(
    source: &mut S,
    ops: &[PageOp],
    options: &ConvertOptions,
    counter: &mut usize,
    page: &mut PageContext,
) {
    let timeout = options.tunables.image_fetch_timeout();
    let mut ctm = MatrixStack::new();

    for op in ops {
        match op {
            PageOp::SaveState => ctm.save(),
            PageOp::RestoreState => ctm.restore(),
            PageOp::Transform(m) => ctm.concat(*m),
            PageOp::PaintImage { name } | PageOp::PaintJpeg { name } => {
                let resolved = match source.image_xobject(name, timeout) {
                    Ok(Some(resolved)) => resolved,
                    Ok(None) => {
                        log::debug!("image {} not resolvable, skipped", name);
                        continue;
                    },
                    Err(e) => {
                        log::debug!("image {} fetch failed: {}", name, e);
                        continue;
                    },
                };
                match image_bytes(&resolved) {
                    Some((bytes, format)) => {
                        push_record(page, &ctm, resolved.width, resolved.height, bytes, format, counter);
                    },
                    None => log::debug!("image {} has no usable bytes, dropped", name),
                }
            },
            PageOp::PaintInlineImage {
                width,
                height,
                data,
            } => {
                let probe = ResolvedImage {
                    width: *width,
                    height: *height,
                    stream_bytes: Some(data.clone()),
                    decoded_bytes: None,
                    pixels: Some(data.clone()),
                };
                match image_bytes(&probe) {
                    Some((bytes, format)) => {
                        push_record(page, &ctm, *width, *height, bytes, format, counter);
                    },
                    None => log::debug!("inline image dropped (no magic match, no pixel fit)"),
                }
            },
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn push_record(
    page: &mut PageContext,
    ctm: &MatrixStack,
    pixel_width: u32,
    pixel_height: u32,
    bytes: Vec<u8>,
    format: ImageFormat,
    counter: &mut usize,
) {
    let m = ctm.current();
    let width = m.x_magnitude() * pixel_width as f32;
    let height = m.y_magnitude() * pixel_height as f32;
    // Stored as the PDF-up vertical center so it sorts against text baselines.
    let y = m.f + height / 2.0;

    *counter += 1;
    page.items.push(PageItem::Image(ImageRecord {
        x: m.e,
        y,
        width,
        height,
        bytes,
        format,
        index: *counter,
    }));
}

/// Probe a resolved image's byte sources in order: raw stream bytes,
/// library-decoded bytes, raw pixels re-encoded to PNG. Returns `None`
/// when nothing passes the magic-number check.
fn image_bytes(resolved: &ResolvedImage) -> Option<(Vec<u8>, ImageFormat)> {
    for candidate in [&resolved.stream_bytes, &resolved.decoded_bytes] {
        if let Some(bytes) = candidate {
            if let Some(format) = ImageFormat::sniff(bytes) {
                return Some((bytes.clone(), format));
            }
        }
    }

    if let Some(pixels) = &resolved.pixels {
        match encode_pixels(pixels, resolved.width, resolved.height) {
            Ok(Some(png)) => return Some((png, ImageFormat::Png)),
            Ok(None) => {},
            Err(e) => log::debug!("raw pixel encode failed: {}", e),
        }
    }

    None
}

/// Re-encode a raw RGB or RGBA buffer as PNG. Returns `Ok(None)` when the
/// buffer length fits neither interpretation.
fn encode_pixels(pixels: &[u8], width: u32, height: u32) -> Result<Option<Vec<u8>>> {
    let px = (width as usize) * (height as usize);
    if px == 0 {
        return Ok(None);
    }
    let color = if pixels.len() == px * 3 {
        ColorType::Rgb8
    } else if pixels.len() == px * 4 {
        ColorType::Rgba8
    } else {
        return Ok(None);
    };

    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(pixels, width, height, color)
        .map_err(|e| Error::Image(e.to_string()))?;
    Ok(Some(out))
}

/// Sort a page's items by Y descending, ties by X ascending.
fn sort_page(page: &mut PageContext) {
    page.items.sort_by(|a, b| {
        let (ax, ay) = item_pos(a);
        let (bx, by) = item_pos(b);
        safe_float_cmp(by, ay).then(safe_float_cmp(ax, bx))
    });
}

fn item_pos(item: &PageItem) -> (f32, f32) {
    match item {
        PageItem::Run(run) => (run.x, run.y),
        PageItem::Image(image) => (image.x, image.y),
        PageItem::Line(line) => (line.x, line.y),
        PageItem::Block(block) => (block.min_x(), block.top_y()),
    }
}

/// A detected page-number artifact chain.
#[derive(Debug)]
struct PageNumberPattern {
    /// First page index the pattern holds on
    start_page: usize,
    /// Artifact value on `start_page`
    start_value: i64,
}

/// Detect and remove repeating bare-integer page numbers.
///
/// Only the first [`PAGE_NUMBER_PROBE`] pages vote; documents whose
/// pagination begins later keep their integer-only lines.
fn strip_page_numbers(pages: &mut [PageContext]) {
    let pattern = match detect_page_numbers(pages) {
        Some(pattern) => pattern,
        None => return,
    };
    log::debug!(
        "stripping page numbers from page {} (value {})",
        pattern.start_page,
        pattern.start_value
    );

    for (index, page) in pages.iter_mut().enumerate().skip(pattern.start_page) {
        let expected = pattern.start_value + (index - pattern.start_page) as i64;
        let height = page.height;
        if let Some(pos) = page.items.iter().position(|item| {
            item.as_run()
                .map(|run| run_page_number(run, height) == Some(expected))
                .unwrap_or(false)
        }) {
            page.items.remove(pos);
        }
    }
}

fn detect_page_numbers(pages: &[PageContext]) -> Option<PageNumberPattern> {
    let probe = pages.len().min(PAGE_NUMBER_PROBE);
    if probe < PAGE_NUMBER_MIN_CHAIN {
        return None;
    }

    let candidates: Vec<Vec<i64>> = pages[..probe]
        .iter()
        .map(|page| {
            page.items
                .iter()
                .filter_map(|item| item.as_run())
                .filter_map(|run| run_page_number(run, page.height))
                .collect()
        })
        .collect();

    for start in 0..=(probe - PAGE_NUMBER_MIN_CHAIN) {
        for &value in &candidates[start] {
            let chain_holds = (start..probe).all(|index| {
                let expected = value + (index - start) as i64;
                candidates[index].contains(&expected)
            });
            if chain_holds {
                return Some(PageNumberPattern {
                    start_page: start,
                    start_value: value,
                });
            }
        }
    }

    None
}

/// The run's integer value, when it is a bare integer sitting in the top
/// or bottom edge band of the page.
fn run_page_number(run: &TextRun, page_height: f32) -> Option<i64> {
    if !run.is_numeric() {
        return None;
    }
    let near_edge = run.y <= page_height * EDGE_BAND || run.y >= page_height * (1.0 - EDGE_BAND);
    if !near_edge {
        return None;
    }
    run.text.trim().parse().ok()
}
