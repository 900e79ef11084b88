//! List-item detection.
//!
//! Tags lines as list entries and normalizes bullet glyphs to `-`. A line
//! whose leading bullet is not already `-` is expanded into two lines: the
//! original, kept but marked removed, and a synthetic replacement whose
//! first word is `-`.

use crate::config::ConvertOptions;
use crate::elements::{BlockType, PageItem};
use crate::error::Result;
use crate::pipeline::{ParseResult, Stage};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Numbered list openers: `1.`, `2)`, `3、` and CJK numerals `三、`.
    /// The marker must end the word, so decimals like `3.14` stay prose.
    static ref RE_NUMBERED: Regex =
        Regex::new(r"^(\d{1,3}[.)、]|[一二三四五六七八九十百]+[、.)])(\s|$)").unwrap();
}

/// Stage tagging list lines.
pub struct ListItems;

impl Stage for ListItems {
    fn name(&self) -> &'static str {
        "lists"
    }

    fn run(&self, mut parse: ParseResult, options: &ConvertOptions) -> Result<ParseResult> {
        let bullets = &options.tunables.bullet_chars;

        for page in &mut parse.pages {
            let mut out: Vec<PageItem> = Vec::with_capacity(page.items.len());

            for item in page.items.drain(..) {
                let line = match item {
                    PageItem::Line(line) if !line.removed && line.kind.is_none() => line,
                    other => {
                        out.push(other);
                        continue;
                    },
                };

                let first = match line.words.first() {
                    Some(word) => word.text.clone(),
                    None => {
                        out.push(PageItem::Line(line));
                        continue;
                    },
                };

                if first == "-" {
                    let mut line = line;
                    line.kind = Some(BlockType::List);
                    out.push(PageItem::Line(line));
                } else if is_bullet(&first, bullets) {
                    // Keep the original for auditability, emit the
                    // normalized duplicate in its place.
                    let mut replacement = line.clone();
                    replacement.words[0].text = "-".to_string();
                    replacement.kind = Some(BlockType::List);

                    let mut original = line;
                    original.removed = true;
                    out.push(PageItem::Line(original));
                    out.push(PageItem::Line(replacement));
                } else if RE_NUMBERED.is_match(&line.text()) {
                    let mut line = line;
                    line.kind = Some(BlockType::List);
                    out.push(PageItem::Line(line));
                } else {
                    out.push(PageItem::Line(line));
                }
            }
            page.items = out;
        }
        Ok(parse)
    }
}

fn is_bullet(word: &str, bullets: &str) -> bool {
    let mut chars = word.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => bullets.contains(c),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Line, PageContext, Word};

    fn line_with(words: &[&str], y: f32) -> Line {
        Line {
            x: 20.0,
            y,
            width: 100.0,
            height: 12.0,
            words: words.iter().map(|w| Word::plain(*w)).collect(),
            kind: None,
            font_id: "F1".to_string(),
            removed: false,
        }
    }

    fn run_stage(lines: Vec<Line>) -> Vec<PageItem> {
        let mut page = PageContext::new(0, 612.0, 792.0);
        page.items = lines.into_iter().map(PageItem::Line).collect();
        let parse = ParseResult {
            pages: vec![page],
            ..Default::default()
        };
        let parse = ListItems.run(parse, &ConvertOptions::default()).unwrap();
        parse.pages.into_iter().next().unwrap().items
    }

    #[test]
    fn test_dash_tagged_in_place() {
        let items = run_stage(vec![line_with(&["-", "item", "one"], 700.0)]);
        assert_eq!(items.len(), 1);
        let line = items[0].as_line().unwrap();
        assert_eq!(line.kind, Some(BlockType::List));
        assert!(!line.removed);
    }

    #[test]
    fn test_bullet_expands_to_removed_plus_synthetic() {
        let items = run_stage(vec![line_with(&["•", "item"], 700.0)]);
        assert_eq!(items.len(), 2);

        let original = items[0].as_line().unwrap();
        assert!(original.removed);
        assert_eq!(original.words[0].text, "•");
        assert!(original.kind.is_none());

        let synthetic = items[1].as_line().unwrap();
        assert!(!synthetic.removed);
        assert_eq!(synthetic.words[0].text, "-");
        assert_eq!(synthetic.kind, Some(BlockType::List));
    }

    #[test]
    fn test_star_and_plus_bullets() {
        for bullet in ["*", "+", "◦", "▪"] {
            let items = run_stage(vec![line_with(&[bullet, "x"], 700.0)]);
            assert_eq!(items.len(), 2, "bullet {:?}", bullet);
            assert_eq!(
                items[1].as_line().unwrap().kind,
                Some(BlockType::List),
                "bullet {:?}",
                bullet
            );
        }
    }

    #[test]
    fn test_numbered_patterns() {
        for lead in ["1.", "2)", "12.", "三、"] {
            let items = run_stage(vec![line_with(&[lead, "entry"], 700.0)]);
            assert_eq!(items.len(), 1, "lead {:?}", lead);
            assert_eq!(
                items[0].as_line().unwrap().kind,
                Some(BlockType::List),
                "lead {:?}",
                lead
            );
        }
    }

    #[test]
    fn test_plain_text_untouched() {
        let items = run_stage(vec![line_with(&["just", "prose"], 700.0)]);
        assert!(items[0].as_line().unwrap().kind.is_none());
    }

    #[test]
    fn test_decimal_number_not_a_list() {
        let items = run_stage(vec![line_with(&["3.14", "is", "pi"], 700.0)]);
        assert!(items[0].as_line().unwrap().kind.is_none());
    }

    #[test]
    fn test_typed_lines_skipped() {
        let mut line = line_with(&["-", "item"], 700.0);
        line.kind = Some(BlockType::Footnotes);
        let items = run_stage(vec![line]);
        assert_eq!(items[0].as_line().unwrap().kind, Some(BlockType::Footnotes));
    }
}
