//! Table detection.
//!
//! Heuristic detection of tabular blocks: pipe rows, separator rows with
//! consistent column counts, multi-space column alignment, and
//! keyword+glyph patterns for single-line tables. The keyword lists ship
//! with CJK defaults and are configurable; the geometric rules are not.

use crate::config::{ConvertOptions, Tunables};
use crate::elements::{Block, BlockType, PageItem};
use crate::error::Result;
use crate::pipeline::{ParseResult, Stage};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// A row of dashes or equals acting as a table separator.
    static ref RE_SEPARATOR: Regex = Regex::new(r"^\s*(-{3,}|={3,})[\s|+=-]*$").unwrap();

    /// Column boundaries: two or more spaces, or a tab.
    static ref RE_COLUMN_SPLIT: Regex = Regex::new(r"[ ]{2,}|\t").unwrap();
}

/// Sentence-terminating punctuation that marks running prose.
const SENTENCE_PUNCT: [char; 3] = ['。', '！', '？'];

/// Stage tagging tabular blocks.
pub struct TableDetector;

impl Stage for TableDetector {
    fn name(&self) -> &'static str {
        "tables"
    }

    fn run(&self, mut parse: ParseResult, options: &ConvertOptions) -> Result<ParseResult> {
        let tunables = &options.tunables;
        let header_pair = header_pair_regex(tunables);

        for page in &mut parse.pages {
            for item in &mut page.items {
                let block = match item {
                    PageItem::Block(block) if block.kind == BlockType::Paragraph => block,
                    _ => continue,
                };
                if let Some(rule) = classify(block, tunables, header_pair.as_ref()) {
                    log::debug!("table detected by rule {}", rule);
                    block.kind = BlockType::Table;
                    block.annotation = Some(rule.to_string());
                }
            }
        }
        Ok(parse)
    }
}

/// `名称.*类型.*支持.*备注` built from the configured keyword list.
fn header_pair_regex(tunables: &Tunables) -> Option<Regex> {
    if tunables.table_header_keywords.len() < 4 {
        return None;
    }
    let pattern = tunables
        .table_header_keywords
        .iter()
        .take(4)
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&pattern).ok()
}

fn classify(block: &Block, tunables: &Tunables, header_pair: Option<&Regex>) -> Option<&'static str> {
    let line_texts: Vec<String> = block.lines.iter().map(|l| l.text()).collect();
    let aggregated = line_texts.join(" ");
    let length = aggregated.chars().count();

    // Exclusions always win
    let has_sentence_punct = aggregated.contains(&SENTENCE_PUNCT[..]);
    if has_sentence_punct && length > 30 {
        return None;
    }
    let has_glyph = has_status_glyph(&aggregated, tunables);
    let has_cue = tunables
        .table_paragraph_cues
        .iter()
        .any(|cue| aggregated.contains(cue.as_str()));
    if has_cue && length > 20 && !has_glyph {
        return None;
    }

    if line_texts.len() == 1 {
        classify_single_line(&line_texts[0], tunables, header_pair)
    } else {
        classify_multi_line(&line_texts, &aggregated)
    }
}

fn classify_single_line(
    text: &str,
    tunables: &Tunables,
    header_pair: Option<&Regex>,
) -> Option<&'static str> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() < 4 {
        return None;
    }

    let has_glyph = has_status_glyph(text, tunables);
    let has_keyword = tunables
        .table_header_keywords
        .iter()
        .any(|k| text.contains(k.as_str()));
    let short = |limit: usize| tokens.iter().filter(|t| t.chars().count() <= limit).count();

    if has_keyword && has_glyph && short(15) >= 4 {
        return Some("keyword+glyph");
    }
    if tokens.len() >= 6 && short(12) >= 5 && !text.contains(&SENTENCE_PUNCT[..]) {
        return Some("short-tokens");
    }
    if let Some(re) = header_pair {
        if re.is_match(text) && has_glyph && tokens.len() >= 8 {
            return Some("header-pair");
        }
    }
    None
}

fn classify_multi_line(line_texts: &[String], aggregated: &str) -> Option<&'static str> {
    if line_texts.iter().any(|t| t.contains('|')) {
        return Some("pipes");
    }

    let has_separator = line_texts.iter().any(|t| RE_SEPARATOR.is_match(t));
    if has_separator {
        let counts: Vec<usize> = line_texts
            .iter()
            .filter(|t| !RE_SEPARATOR.is_match(t))
            .map(|t| t.split_whitespace().count())
            .collect();
        if counts.len() >= 2 && consistent(&counts, 2) && counts.iter().all(|&c| c >= 2) {
            return Some("separator");
        }
    }

    // Whitespace-aligned columns, guarded against prose
    let cells: Vec<Vec<&str>> = line_texts
        .iter()
        .map(|t| {
            RE_COLUMN_SPLIT
                .split(t.trim())
                .filter(|c| !c.is_empty())
                .collect()
        })
        .collect();
    let counts: Vec<usize> = cells.iter().map(|c| c.len()).collect();
    let punct_count = aggregated
        .chars()
        .filter(|c| SENTENCE_PUNCT.contains(c))
        .count();
    if counts.len() >= 2
        && counts.iter().all(|&c| c >= 2)
        && consistent(&counts, 2)
        && cells
            .iter()
            .flatten()
            .all(|cell| cell.chars().count() <= 30)
        && punct_count <= line_texts.len() / 2
    {
        return Some("columns");
    }

    None
}

fn consistent(counts: &[usize], tolerance: usize) -> bool {
    let min = counts.iter().copied().min().unwrap_or(0);
    let max = counts.iter().copied().max().unwrap_or(0);
    max - min <= tolerance
}

fn has_status_glyph(text: &str, tunables: &Tunables) -> bool {
    tunables
        .status_glyphs
        .iter()
        .any(|g| text.contains(g.as_str()))
}
