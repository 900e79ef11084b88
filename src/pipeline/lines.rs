//! Line grouping and inline analysis.
//!
//! Folds same-baseline [`TextRun`]s into [`Line`]s. Within a line, runs of
//! the same discrete font format and numeric-ness merge into words; raised
//! or lowered numerals become footnote anchors/definitions, `http:` and
//! `www.` words become links, and every word inherits its font's style
//! confidence format.

use crate::config::ConvertOptions;
use crate::elements::{BlockType, Line, PageItem, TextRun, Word, WordKind};
use crate::error::Result;
use crate::pipeline::{Globals, ParseResult, Stage};
use crate::utils::safe_float_cmp;
use std::collections::HashMap;

/// Vertical slack, in page units, before a numeral counts as raised or
/// lowered relative to the line baseline.
const BASELINE_EPSILON: f32 = 1.0;

/// Stage replacing each page's runs with lines.
pub struct LineGrouping;

impl Stage for LineGrouping {
    fn name(&self) -> &'static str {
        "lines"
    }

    fn run(&self, mut parse: ParseResult, options: &ConvertOptions) -> Result<ParseResult> {
        let globals = parse.globals.clone();
        for page in &mut parse.pages {
            let mut images = Vec::new();
            let mut groups: Vec<Vec<TextRun>> = Vec::new();

            for item in page.items.drain(..) {
                match item {
                    PageItem::Image(image) => images.push(PageItem::Image(image)),
                    PageItem::Run(run) => {
                        let tolerance = (globals.body_distance / 2.0).max(1.0);
                        let same_line = groups
                            .last()
                            .map(|group| (group[0].y - run.y).abs() <= tolerance)
                            .unwrap_or(false);
                        if same_line {
                            groups.last_mut().unwrap().push(run);
                        } else {
                            groups.push(vec![run]);
                        }
                    },
                    other => {
                        log::debug!("unexpected item variant before line grouping: {:?}", other);
                    },
                }
            }

            let mut items: Vec<PageItem> = groups
                .into_iter()
                .map(|group| PageItem::Line(build_line(group, &globals, options)))
                .collect();
            items.append(&mut images);
            items.sort_by(|a, b| {
                let (ax, ay) = pos(a);
                let (bx, by) = pos(b);
                safe_float_cmp(by, ay).then(safe_float_cmp(ax, bx))
            });
            page.items = items;
        }
        Ok(parse)
    }
}

fn pos(item: &PageItem) -> (f32, f32) {
    match item {
        PageItem::Line(line) => (line.x, line.y),
        PageItem::Image(image) => (image.x, image.y),
        PageItem::Run(run) => (run.x, run.y),
        PageItem::Block(block) => (block.min_x(), block.top_y()),
    }
}

/// A maximal run of consecutive same-format, same-numeric-ness runs.
#[derive(Debug)]
struct Segment {
    text: String,
    y: f32,
    font_id: String,
    numeric: bool,
    /// Right edge of the last run merged into this segment
    end_x: f32,
}

/// Build one line from its baseline group.
fn build_line(mut group: Vec<TextRun>, globals: &Globals, options: &ConvertOptions) -> Line {
    group.sort_by(|a, b| safe_float_cmp(a.x, b.x));

    let x = group[0].x;
    let y = group[0].y;
    let font_id = group[0].font_id.clone();
    let width: f32 = group.iter().map(|r| r.width).sum();
    let height = group
        .iter()
        .map(|r| r.height)
        .fold(0.0f32, f32::max);

    let segments = merge_segments(&group, globals, options.tunables.word_space_gap);
    let base_y = baseline_of(&group, y);

    let mut kind = None;
    let mut words = Vec::new();
    for segment in &segments {
        let trimmed = segment.text.trim();
        if trimmed.is_empty() {
            continue;
        }

        let raised = segment.numeric && segment.y > base_y + BASELINE_EPSILON;
        let lowered = segment.numeric && segment.y < base_y - BASELINE_EPSILON;
        let format = globals.format_of(&segment.font_id);

        for token in trimmed.split_whitespace() {
            let word_kind = if raised {
                if words.is_empty() {
                    // A line-leading raised numeral opens a footnote
                    // definition.
                    kind = Some(BlockType::Footnotes);
                    WordKind::FootnoteDef
                } else {
                    WordKind::FootnoteAnchor
                }
            } else if lowered {
                kind = Some(BlockType::Footnotes);
                WordKind::FootnoteDef
            } else if token.starts_with("http:") || token.starts_with("https:") {
                WordKind::Link {
                    url: token.to_string(),
                }
            } else if token.starts_with("www.") {
                WordKind::Link {
                    url: format!("http://{}", token),
                }
            } else {
                WordKind::Plain
            };

            words.push(Word {
                text: token.to_string(),
                kind: word_kind,
                format,
            });
        }
    }

    let removed = words.is_empty();
    Line {
        x,
        y,
        width,
        height,
        words,
        kind,
        font_id,
        removed,
    }
}

/// Merge X-ordered runs into segments, inserting spaces per the gap rule:
/// a space goes in when the X-gap exceeds the configured threshold, or when
/// neither adjoining run carries its own boundary space.
fn merge_segments(group: &[TextRun], globals: &Globals, space_gap: f32) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::new();

    for run in group {
        let format = globals.format_of(&run.font_id);
        let numeric = run.is_numeric();

        let mergeable = segments.last().map(|last| {
            globals.format_of(&last.font_id) == format && last.numeric == numeric
        });
        if mergeable == Some(true) {
            let last = segments.last_mut().unwrap();
            let gap = run.x - last.end_x;
            let needs_space =
                gap > space_gap || (!last.text.ends_with(' ') && !run.text.starts_with(' '));
            if needs_space && !last.text.is_empty() {
                last.text.push(' ');
            }
            last.text.push_str(&run.text);
            last.end_x = run.x + run.width;
        } else {
            segments.push(Segment {
                text: run.text.clone(),
                y: run.y,
                font_id: run.font_id.clone(),
                numeric,
                end_x: run.x + run.width,
            });
        }
    }

    segments
}

/// Modal baseline among non-numeric runs, falling back to the line Y.
fn baseline_of(group: &[TextRun], line_y: f32) -> f32 {
    let mut counts: HashMap<i64, (usize, f32)> = HashMap::new();
    for run in group.iter().filter(|r| !r.is_numeric()) {
        let entry = counts.entry((run.y * 10.0).round() as i64).or_insert((0, run.y));
        entry.0 += 1;
    }
    counts
        .values()
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, y)| *y)
        .unwrap_or(line_y)
}
