//! Block gathering and image re-interleaving.
//!
//! Merges consecutive lines into typed [`Block`]s under the
//! type-compatibility and spacing rules, then re-inserts the page's image
//! records in reading order. Image order uses Y-range overlap (not point
//! comparison) so text that wraps around an image keeps its flow.

use crate::config::ConvertOptions;
use crate::elements::{Block, BlockType, ImageRecord, Line, PageItem};
use crate::error::Result;
use crate::geometry::VSpan;
use crate::pipeline::{ParseResult, Stage};
use crate::utils::safe_float_cmp;

/// Fraction of the average height two items must overlap vertically before
/// they are ordered by X instead of Y.
const OVERLAP_FRACTION: f32 = 0.2;

/// Stage folding lines into blocks.
pub struct BlockGatherer;

impl Stage for BlockGatherer {
    fn name(&self) -> &'static str {
        "blocks"
    }

    fn run(&self, mut parse: ParseResult, options: &ConvertOptions) -> Result<ParseResult> {
        let body_distance = parse.globals.body_distance;
        let slack = options.tunables.big_distance_slack;

        for page in &mut parse.pages {
            let mut lines: Vec<Line> = Vec::new();
            let mut images: Vec<ImageRecord> = Vec::new();
            for item in page.items.drain(..) {
                match item {
                    PageItem::Line(line) => {
                        if !line.removed {
                            lines.push(line);
                        }
                    },
                    PageItem::Image(image) => images.push(image),
                    other => log::debug!("unexpected item variant at gathering: {:?}", other),
                }
            }

            let min_x = lines.iter().map(|l| l.x).fold(f32::INFINITY, f32::min);
            let blocks = gather(lines, min_x, body_distance, slack);
            page.items = interleave(blocks, images);
        }
        Ok(parse)
    }
}

fn gather(lines: Vec<Line>, min_x: f32, body_distance: f32, slack: f32) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();
    let mut stash: Vec<Line> = Vec::new();
    let mut stash_kind: Option<BlockType> = None;

    for line in lines {
        if stash.is_empty() {
            stash_kind = line.kind;
            stash.push(line);
            continue;
        }

        let last = stash.last().unwrap();
        let big = big_distance(last, &line, min_x, body_distance, slack);
        let merge = match (stash_kind, line.kind) {
            (None, None) => !big,
            (Some(kind), None) => {
                kind.merge_following_untyped()
                    || (kind.merge_following_untyped_small_distance() && !big)
            },
            (None, Some(_)) => false,
            (Some(stash_type), Some(line_type)) => {
                stash_type == line_type && stash_type.merge_to_block()
            },
        };

        if merge {
            stash.push(line);
        } else {
            blocks.push(close(&mut stash, &mut stash_kind));
            stash_kind = line.kind;
            stash.push(line);
        }
    }
    if !stash.is_empty() {
        blocks.push(close(&mut stash, &mut stash_kind));
    }

    blocks
}

fn close(stash: &mut Vec<Line>, stash_kind: &mut Option<BlockType>) -> Block {
    let kind = stash_kind.take().unwrap_or(BlockType::Paragraph);
    Block::new(kind, std::mem::take(stash))
}

/// Whether the gap between two consecutive lines breaks an untyped block.
///
/// Reverse flow (the next line sits above the last) always breaks; forward
/// gaps break past `body_distance + 1`, or past `body_distance * 1.5 +
/// slack` when both lines are indented.
fn big_distance(last: &Line, next: &Line, min_x: f32, body_distance: f32, slack: f32) -> bool {
    let d = last.y - next.y;
    if d < -body_distance / 2.0 {
        return true;
    }
    let both_indented = last.x > min_x && next.x > min_x;
    let threshold = if both_indented {
        body_distance * 1.5 + slack
    } else {
        body_distance + 1.0
    };
    d > threshold
}

/// Re-insert images among the blocks in reading order.
fn interleave(blocks: Vec<Block>, images: Vec<ImageRecord>) -> Vec<PageItem> {
    let mut items: Vec<(VSpan, f32, PageItem)> = Vec::with_capacity(blocks.len() + images.len());

    for block in blocks {
        let span = VSpan::new(block.top_y(), block.bottom_y());
        items.push((span, block.min_x(), PageItem::Block(block)));
    }
    for image in images {
        let span = VSpan::new(image.y + image.height / 2.0, image.y - image.height / 2.0);
        items.push((span, image.x, PageItem::Image(image)));
    }

    items.sort_by(|(span_a, x_a, _), (span_b, x_b, _)| {
        if span_a.overlaps_by(span_b, OVERLAP_FRACTION) {
            safe_float_cmp(*x_a, *x_b)
        } else {
            safe_float_cmp(span_b.center(), span_a.center())
        }
    });

    items.into_iter().map(|(_, _, item)| item).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{ImageFormat, PageContext, Word};
    use crate::pipeline::Globals;

    fn mock_line(text: &str, x: f32, y: f32, kind: Option<BlockType>) -> Line {
        Line {
            x,
            y,
            width: text.len() as f32 * 6.0,
            height: 12.0,
            words: text.split_whitespace().map(Word::plain).collect(),
            kind,
            font_id: "F1".to_string(),
            removed: false,
        }
    }

    fn mock_image(y: f32, index: usize) -> ImageRecord {
        ImageRecord {
            x: 100.0,
            y,
            width: 80.0,
            height: 60.0,
            bytes: vec![0xFF, 0xD8],
            format: ImageFormat::Jpeg,
            index,
        }
    }

    fn run_stage(lines: Vec<Line>, images: Vec<ImageRecord>) -> Vec<PageItem> {
        let mut page = PageContext::new(0, 612.0, 792.0);
        page.items = lines.into_iter().map(PageItem::Line).collect();
        page.items.extend(images.into_iter().map(PageItem::Image));
        let parse = ParseResult {
            pages: vec![page],
            globals: Globals {
                body_height: 12.0,
                body_distance: 14.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let parse = BlockGatherer
            .run(parse, &ConvertOptions::default())
            .unwrap();
        parse.pages.into_iter().next().unwrap().items
    }

    #[test]
    fn test_untyped_lines_merge_into_paragraph() {
        let items = run_stage(
            vec![
                mock_line("first", 10.0, 700.0, None),
                mock_line("second", 10.0, 686.0, None),
            ],
            vec![],
        );
        assert_eq!(items.len(), 1);
        let block = items[0].as_block().unwrap();
        assert_eq!(block.kind, BlockType::Paragraph);
        assert_eq!(block.lines.len(), 2);
    }

    #[test]
    fn test_big_gap_splits_paragraphs() {
        let items = run_stage(
            vec![
                mock_line("first", 10.0, 700.0, None),
                mock_line("second", 10.0, 650.0, None),
            ],
            vec![],
        );
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_indented_lines_get_wider_threshold() {
        // Gap of 18 exceeds body_distance + 1 = 15 but stays under the
        // indented threshold 14 * 1.5 + 1 = 22
        let items = run_stage(
            vec![
                mock_line("margin", 10.0, 730.0, None),
                mock_line("code line one", 40.0, 700.0, None),
                mock_line("code line two", 40.0, 682.0, None),
            ],
            vec![],
        );
        // margin..code breaks (gap 30); the two code lines merge
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].as_block().unwrap().lines.len(), 2);
    }

    #[test]
    fn test_reverse_flow_breaks() {
        let items = run_stage(
            vec![
                mock_line("lower", 10.0, 650.0, None),
                mock_line("higher", 10.0, 700.0, None),
            ],
            vec![],
        );
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_list_lines_merge_to_one_block() {
        let items = run_stage(
            vec![
                mock_line("- item 1", 10.0, 700.0, Some(BlockType::List)),
                mock_line("- item 2", 10.0, 686.0, Some(BlockType::List)),
                mock_line("- item 3", 10.0, 672.0, Some(BlockType::List)),
            ],
            vec![],
        );
        assert_eq!(items.len(), 1);
        let block = items[0].as_block().unwrap();
        assert_eq!(block.kind, BlockType::List);
        assert_eq!(block.lines.len(), 3);
    }

    #[test]
    fn test_list_does_not_absorb_untyped() {
        let items = run_stage(
            vec![
                mock_line("- item", 10.0, 700.0, Some(BlockType::List)),
                mock_line("continuation prose", 10.0, 686.0, None),
            ],
            vec![],
        );
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_block().unwrap().kind, BlockType::List);
        assert_eq!(items[1].as_block().unwrap().kind, BlockType::Paragraph);
    }

    #[test]
    fn test_headers_stay_single_line() {
        let items = run_stage(
            vec![
                mock_line("Heading A", 10.0, 700.0, Some(BlockType::H2)),
                mock_line("Heading B", 10.0, 686.0, Some(BlockType::H2)),
            ],
            vec![],
        );
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_footnotes_absorb_close_untyped() {
        let items = run_stage(
            vec![
                mock_line("1 the footnote", 10.0, 100.0, Some(BlockType::Footnotes)),
                mock_line("wraps onto this line", 10.0, 86.0, None),
            ],
            vec![],
        );
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_block().unwrap().kind, BlockType::Footnotes);
        assert_eq!(items[0].as_block().unwrap().lines.len(), 2);
    }

    #[test]
    fn test_footnotes_do_not_absorb_across_big_gap() {
        let items = run_stage(
            vec![
                mock_line("1 the footnote", 10.0, 100.0, Some(BlockType::Footnotes)),
                mock_line("unrelated text", 10.0, 50.0, None),
            ],
            vec![],
        );
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_removed_lines_dropped() {
        let mut removed = mock_line("•", 10.0, 700.0, None);
        removed.removed = true;
        let items = run_stage(
            vec![removed, mock_line("- item", 10.0, 700.0, Some(BlockType::List))],
            vec![],
        );
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_block().unwrap().kind, BlockType::List);
    }

    #[test]
    fn test_image_interleaves_between_blocks() {
        let items = run_stage(
            vec![
                mock_line("above the figure", 10.0, 700.0, None),
                mock_line("below the figure", 10.0, 300.0, None),
            ],
            vec![mock_image(500.0, 1)],
        );
        assert_eq!(items.len(), 3);
        assert!(items[0].as_block().is_some());
        assert!(items[1].is_image());
        assert!(items[2].as_block().is_some());
    }

    #[test]
    fn test_overlapping_items_order_by_x() {
        // Text at x=10 and an image at x=200 share the same Y band; the
        // text comes first because it is further left
        let mut image = mock_image(694.0, 1);
        image.x = 200.0;
        let items = run_stage(
            vec![mock_line("wrapped text", 10.0, 700.0, None)],
            vec![image],
        );
        assert!(items[0].as_block().is_some());
        assert!(items[1].is_image());
    }
}
