//! Vertical-text recombination.
//!
//! Vertically-set CJK (and occasionally Latin) text reaches the pipeline as
//! a column of single-character lines. This stage stashes descending
//! single-character lines of one character class and, when the column is
//! long enough to be deliberate, replaces it with one synthetic horizontal
//! line reading top to bottom.

use crate::config::ConvertOptions;
use crate::elements::{CharKind, Line, PageItem, Word};
use crate::error::Result;
use crate::pipeline::{ParseResult, Stage};

/// Stage merging single-character columns into horizontal lines.
pub struct VerticalText;

impl Stage for VerticalText {
    fn name(&self) -> &'static str {
        "vertical"
    }

    fn run(&self, mut parse: ParseResult, options: &ConvertOptions) -> Result<ParseResult> {
        let min_len = options.tunables.vertical_stash_min;
        let gap = options.tunables.vertical_gap;

        for page in &mut parse.pages {
            let mut out: Vec<PageItem> = Vec::with_capacity(page.items.len());
            let mut stash: Vec<Line> = Vec::new();
            let mut stash_kind: Option<CharKind> = None;

            for item in page.items.drain(..) {
                match item {
                    PageItem::Line(line) => {
                        let single = single_char(&line);
                        let extends = match (single, stash.last()) {
                            (Some(kind), Some(prev)) => {
                                Some(kind) == stash_kind && prev.y - line.y > gap
                            },
                            (Some(_), None) => true,
                            (None, _) => false,
                        };

                        if extends {
                            stash_kind = single;
                            stash.push(line);
                        } else {
                            flush(&mut out, &mut stash, min_len);
                            if let Some(kind) = single {
                                stash_kind = Some(kind);
                                stash.push(line);
                            } else {
                                out.push(PageItem::Line(line));
                            }
                        }
                    },
                    other => {
                        flush(&mut out, &mut stash, min_len);
                        out.push(other);
                    },
                }
            }
            flush(&mut out, &mut stash, min_len);
            page.items = out;
        }
        Ok(parse)
    }
}

/// The single character's class, when the line is exactly one
/// one-character word.
fn single_char(line: &Line) -> Option<CharKind> {
    if line.removed || line.words.len() != 1 {
        return None;
    }
    let mut chars = line.words[0].text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(CharKind::of(c)),
        _ => None,
    }
}

/// Emit the stash: merged into one horizontal line when long enough,
/// unchanged otherwise.
fn flush(out: &mut Vec<PageItem>, stash: &mut Vec<Line>, min_len: usize) {
    if stash.len() > min_len {
        let merged = recombine(stash);
        log::debug!("recombined {} vertical characters", stash.len());
        out.push(PageItem::Line(merged));
        stash.clear();
    } else {
        out.extend(stash.drain(..).map(PageItem::Line));
    }
}

fn recombine(stash: &[Line]) -> Line {
    let x = stash.iter().map(|l| l.x).fold(f32::INFINITY, f32::min);
    let y = stash.iter().map(|l| l.y).fold(f32::NEG_INFINITY, f32::max);
    let width: f32 = stash.iter().map(|l| l.width).sum();
    let height = stash.iter().map(|l| l.height).fold(0.0f32, f32::max);
    let text: String = stash.iter().map(|l| l.words[0].text.as_str()).collect();

    Line {
        x,
        y,
        width,
        height,
        words: vec![Word::plain(text)],
        kind: None,
        font_id: stash[0].font_id.clone(),
        removed: false,
    }
}
