//! Table-of-contents line detection.
//!
//! Chapter listings reach the pipeline as ordinary lines ("1.2 Section
//! title ......... 47"). Tagging them here keeps the header detector from
//! scoring them and the table detector from mistaking their column-ish
//! shape for tabular data.

use crate::config::ConvertOptions;
use crate::elements::{BlockType, PageItem};
use crate::error::Result;
use crate::pipeline::{ParseResult, Stage};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// A dot leader (4+ dots or middle dots) followed by a trailing page
    /// number.
    static ref RE_DOT_LEADER: Regex = Regex::new(r"[.·]{4,}\s*\d{1,4}\s*$").unwrap();
}

/// Stage tagging dot-leader lines as TOC entries.
pub struct TocLines;

impl Stage for TocLines {
    fn name(&self) -> &'static str {
        "toc"
    }

    fn run(&self, mut parse: ParseResult, _options: &ConvertOptions) -> Result<ParseResult> {
        for page in &mut parse.pages {
            for item in &mut page.items {
                if let Some(line) = item.as_line_mut() {
                    if line.removed || line.kind.is_some() {
                        continue;
                    }
                    if RE_DOT_LEADER.is_match(&line.text()) {
                        line.kind = Some(BlockType::Toc);
                    }
                }
            }
        }
        Ok(parse)
    }
}
