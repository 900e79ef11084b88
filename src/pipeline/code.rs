//! Code block detection.
//!
//! Untyped blocks that sit entirely right of the page margin are treated
//! as indented code. Blocks already claimed by another detector are never
//! reclassified.

use crate::config::ConvertOptions;
use crate::elements::{BlockType, PageItem};
use crate::error::Result;
use crate::pipeline::{ParseResult, Stage};

/// Tolerance when comparing a line start against the page margin.
const MARGIN_EPSILON: f32 = 0.5;

/// Stage tagging indented untyped blocks as CODE.
pub struct CodeBlocks;

impl Stage for CodeBlocks {
    fn name(&self) -> &'static str {
        "code"
    }

    fn run(&self, mut parse: ParseResult, _options: &ConvertOptions) -> Result<ParseResult> {
        let body_height = parse.globals.body_height;

        for page in &mut parse.pages {
            let min_x = page
                .blocks()
                .map(|b| b.min_x())
                .fold(f32::INFINITY, f32::min);
            if !min_x.is_finite() {
                continue;
            }

            for item in &mut page.items {
                let block = match item {
                    PageItem::Block(block) if block.kind == BlockType::Paragraph => block,
                    _ => continue,
                };

                let indented_single = block.lines.len() == 1
                    && block.lines[0].x > min_x + MARGIN_EPSILON
                    && block.lines[0].height <= body_height + 1.0;
                let indented_multi = block.lines.len() >= 2
                    && block
                        .lines
                        .iter()
                        .all(|line| line.x > min_x + MARGIN_EPSILON);

                if indented_single || indented_multi {
                    block.kind = BlockType::Code;
                }
            }
        }
        Ok(parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Block, Line, PageContext, Word};
    use crate::pipeline::Globals;

    fn mock_line(text: &str, x: f32, y: f32, height: f32) -> Line {
        Line {
            x,
            y,
            width: text.len() as f32 * 6.0,
            height,
            words: text.split_whitespace().map(Word::plain).collect(),
            kind: None,
            font_id: "F1".to_string(),
            removed: false,
        }
    }

    fn run_stage(blocks: Vec<Block>) -> Vec<Block> {
        let mut page = PageContext::new(0, 612.0, 792.0);
        page.items = blocks.into_iter().map(PageItem::Block).collect();
        let parse = ParseResult {
            pages: vec![page],
            globals: Globals {
                body_height: 12.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let parse = CodeBlocks.run(parse, &ConvertOptions::default()).unwrap();
        parse.pages[0].blocks().cloned().collect()
    }

    #[test]
    fn test_single_indented_line_is_code() {
        let blocks = run_stage(vec![
            Block::new(
                BlockType::Paragraph,
                vec![mock_line("normal prose", 10.0, 700.0, 12.0)],
            ),
            Block::new(
                BlockType::Paragraph,
                vec![mock_line("let x = 1;", 46.0, 670.0, 12.0)],
            ),
        ]);
        assert_eq!(blocks[0].kind, BlockType::Paragraph);
        assert_eq!(blocks[1].kind, BlockType::Code);
    }

    #[test]
    fn test_single_tall_indented_line_is_not_code() {
        // A centered heading-sized line is indented but too tall
        let blocks = run_stage(vec![
            Block::new(
                BlockType::Paragraph,
                vec![mock_line("margin text", 10.0, 700.0, 12.0)],
            ),
            Block::new(
                BlockType::Paragraph,
                vec![mock_line("Centered Title", 200.0, 650.0, 20.0)],
            ),
        ]);
        assert_eq!(blocks[1].kind, BlockType::Paragraph);
    }

    #[test]
    fn test_multi_line_indented_block_is_code() {
        let blocks = run_stage(vec![
            Block::new(
                BlockType::Paragraph,
                vec![mock_line("intro paragraph", 10.0, 700.0, 12.0)],
            ),
            Block::new(
                BlockType::Paragraph,
                vec![
                    mock_line("fn main() {", 46.0, 670.0, 12.0),
                    mock_line("    run();", 64.0, 656.0, 12.0),
                    mock_line("}", 46.0, 642.0, 12.0),
                ],
            ),
        ]);
        assert_eq!(blocks[1].kind, BlockType::Code);
    }

    #[test]
    fn test_block_touching_margin_is_not_code() {
        let blocks = run_stage(vec![Block::new(
            BlockType::Paragraph,
            vec![
                mock_line("starts at margin", 10.0, 700.0, 12.0),
                mock_line("also margin", 10.0, 686.0, 12.0),
            ],
        )]);
        assert_eq!(blocks[0].kind, BlockType::Paragraph);
    }

    #[test]
    fn test_typed_blocks_never_reclassified() {
        let blocks = run_stage(vec![
            Block::new(
                BlockType::Paragraph,
                vec![mock_line("margin", 10.0, 700.0, 12.0)],
            ),
            Block::new(
                BlockType::List,
                vec![mock_line("- indented entry", 46.0, 670.0, 12.0)],
            ),
        ]);
        assert_eq!(blocks[1].kind, BlockType::List);
    }
}
