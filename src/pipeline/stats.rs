//! Global statistics: one pass over all runs before any structure is built.
//!
//! Produces the document-wide baselines every later classifier leans on:
//! the body font and height (modes over all runs), the natural inter-line
//! spacing (`body_distance`), per-font average character widths, and
//! per-font bold/italic style confidence.

use crate::config::ConvertOptions;
use crate::elements::TextFormat;
use crate::error::Result;
use crate::pipeline::{FontStyle, Globals, ParseResult, Stage};
use crate::source::FontDescriptor;
use std::collections::HashMap;

/// Heights and Y-deltas are matched at 0.1 resolution; PDF font sizes are
/// quantized far coarser than that in practice.
fn bucket(value: f32) -> i64 {
    (value * 10.0).round() as i64
}

/// Stage computing [`Globals`].
pub struct GlobalStats;

impl Stage for GlobalStats {
    fn name(&self) -> &'static str {
        "stats"
    }

    fn run(&self, mut parse: ParseResult, _options: &ConvertOptions) -> Result<ParseResult> {
        parse.globals = compute(&parse);
        log::debug!(
            "body font {} height {} distance {}",
            parse.globals.body_font,
            parse.globals.body_height,
            parse.globals.body_distance
        );
        Ok(parse)
    }
}

fn compute(parse: &ParseResult) -> Globals {
    let mut height_counts: HashMap<i64, (usize, f32)> = HashMap::new();
    let mut font_counts: HashMap<&str, usize> = HashMap::new();
    let mut max_height = 0.0f32;
    let mut max_height_font = String::new();

    for page in &parse.pages {
        for run in page.items.iter().filter_map(|i| i.as_run()) {
            let entry = height_counts.entry(bucket(run.height)).or_insert((0, run.height));
            entry.0 += 1;
            *font_counts.entry(run.font_id.as_str()).or_insert(0) += 1;
            if run.height > max_height {
                max_height = run.height;
                max_height_font = run.font_id.clone();
            }
        }
    }

    let body_height = mode_value(&height_counts);
    let body_font = font_counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
        .map(|(font, _)| font.to_string())
        .unwrap_or_default();

    let body_distance = body_distance(parse, body_height);
    let char_widths = char_widths(parse, body_height);
    let styles = styles(
        &parse.fonts,
        &char_widths,
        &body_font,
        &max_height_font,
    );

    Globals {
        body_height,
        body_font,
        body_distance,
        max_height,
        max_height_font,
        styles,
        char_widths,
        header_levels: Vec::new(),
    }
}

/// The representative value of the most frequent bucket. Ties resolve to
/// the smaller height for determinism.
fn mode_value(counts: &HashMap<i64, (usize, f32)>) -> f32 {
    counts
        .iter()
        .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then(b.0.cmp(a.0)))
        .map(|(_, (_, value))| *value)
        .unwrap_or(0.0)
}

/// Modal positive Y-delta between consecutive body-height runs with
/// non-empty text. A non-body run resets the running anchor.
fn body_distance(parse: &ParseResult, body_height: f32) -> f32 {
    let body_bucket = bucket(body_height);
    let mut deltas: HashMap<i64, (usize, f32)> = HashMap::new();

    for page in &parse.pages {
        let mut anchor: Option<f32> = None;
        for run in page.items.iter().filter_map(|i| i.as_run()) {
            if bucket(run.height) != body_bucket || run.text.trim().is_empty() {
                anchor = None;
                continue;
            }
            if let Some(prev_y) = anchor {
                let delta = prev_y - run.y;
                if delta > 0.0 {
                    let entry = deltas.entry(bucket(delta)).or_insert((0, delta));
                    entry.0 += 1;
                }
            }
            anchor = Some(run.y);
        }
    }

    let modal = mode_value(&deltas);
    if modal > 0.0 {
        modal
    } else {
        body_height * 1.2
    }
}

/// Mean of `width / trimmed-length` per font, over runs whose height is
/// within 0.5 of the body height.
fn char_widths(parse: &ParseResult, body_height: f32) -> HashMap<String, f32> {
    let mut sums: HashMap<&str, (f32, usize)> = HashMap::new();

    for page in &parse.pages {
        for run in page.items.iter().filter_map(|i| i.as_run()) {
            if (run.height - body_height).abs() > 0.5 {
                continue;
            }
            let len = run.text.trim().chars().count();
            if len == 0 {
                continue;
            }
            let entry = sums.entry(run.font_id.as_str()).or_insert((0.0, 0));
            entry.0 += run.width / len as f32;
            entry.1 += 1;
        }
    }

    sums.into_iter()
        .map(|(font, (sum, count))| (font.to_string(), sum / count as f32))
        .collect()
}

fn styles(
    fonts: &HashMap<String, FontDescriptor>,
    char_widths: &HashMap<String, f32>,
    body_font: &str,
    max_height_font: &str,
) -> HashMap<String, FontStyle> {
    let body_avg_width = char_widths.get(body_font).copied();

    fonts
        .iter()
        .map(|(id, descriptor)| {
            let style = if id == body_font {
                FontStyle::regular()
            } else {
                confidence(descriptor, char_widths.get(id).copied(), body_avg_width, id == max_height_font)
            };
            (id.clone(), style)
        })
        .collect()
}

/// Weighted style evidence for one font.
///
/// Descriptor fields carry 0.40, the threshold-gated width ratio 0.35, the
/// soft width ratio 0.20 and name substrings 0.05; a max-height font gets a
/// weak 0.1 bold fallback. Confidences clamp to [0, 1] and discretize at
/// the 0.3 thresholds.
fn confidence(
    descriptor: &FontDescriptor,
    avg_width: Option<f32>,
    body_avg_width: Option<f32>,
    is_max_height_font: bool,
) -> FontStyle {
    let mut bold = 0.0f32;
    let mut italic = 0.0f32;

    if descriptor.weight.map(|w| w >= 600).unwrap_or(false) {
        bold += 0.40;
    }
    if descriptor.italic_angle.map(|a| a != 0.0).unwrap_or(false) {
        italic += 0.40;
    }

    if let (Some(width), Some(body_width)) = (avg_width, body_avg_width) {
        if body_width > 0.0 {
            let ratio = width / body_width;
            bold += ((ratio - 1.1) / 0.2).clamp(0.0, 1.0) * 0.35;
            bold += (ratio - 1.0).clamp(0.0, 1.0) * 0.20;
        }
    }

    let name = descriptor.name.to_lowercase();
    if name.contains("bold") {
        bold += 0.05;
    }
    if name.contains("italic") || name.contains("oblique") {
        italic += 0.05;
    }

    if is_max_height_font {
        bold += 0.1;
    }

    let bold = bold.clamp(0.0, 1.0);
    let italic = italic.clamp(0.0, 1.0);
    let format = match (bold >= 0.3, italic >= 0.3) {
        (true, true) => TextFormat::BoldItalic,
        (true, false) => TextFormat::Bold,
        (false, true) => TextFormat::Italic,
        (false, false) => TextFormat::Regular,
    };

    FontStyle {
        bold,
        italic,
        format,
    }
}
