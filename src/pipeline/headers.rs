//! Multi-feature header detection.
//!
//! Candidate lines (untyped, taller than the body gate) are scored by a
//! weighted mix of typographic features; retained candidates are clustered
//! by font size and the four largest clusters become H1–H4. Pages carrying
//! the document's maximum run height get an additional size-based override.

use crate::config::{ConvertOptions, HeaderWeights};
use crate::elements::{BlockType, Line, PageItem};
use crate::error::Result;
use crate::pipeline::{ParseResult, Stage};
use crate::utils::safe_float_cmp;
use std::collections::HashMap;

/// Maximum number of font-size clusters promoted to header levels.
const LEVEL_CAP: usize = 4;

/// Stage classifying lines as H1–H4.
pub struct HeaderDetector;

impl Stage for HeaderDetector {
    fn name(&self) -> &'static str {
        "headers"
    }

    fn run(&self, mut parse: ParseResult, options: &ConvertOptions) -> Result<ParseResult> {
        if parse.globals.body_height <= 0.0 {
            return Ok(parse);
        }

        let retained = score_candidates(&parse, options);
        let levels = cluster_levels(&retained, options.tunables.cluster_tolerance);
        log::debug!(
            "{} header candidates retained, {} size clusters",
            retained.len(),
            levels.len()
        );

        for candidate in &retained {
            let level = toc_override(&options.tunables.toc_levels, candidate.height)
                .or_else(|| lookup_level(&levels, candidate.height, options.tunables.cluster_tolerance));
            if let Some(level) = level {
                if let Some(line) = parse.pages[candidate.page].items[candidate.item].as_line_mut()
                {
                    line.kind = BlockType::headline(level);
                }
            }
        }

        apply_max_height_rule(&mut parse);
        parse.globals.header_levels = levels;
        Ok(parse)
    }
}

/// A retained header candidate.
#[derive(Debug)]
struct Candidate {
    page: usize,
    item: usize,
    height: f32,
}

/// One candidate's feature snapshot; `None` marks a feature that could not
/// be computed, which drops its weight from the normalization.
#[derive(Debug, Default, Clone, Copy)]
struct Features {
    font_size_ratio: Option<f32>,
    vertical_spacing: Option<f32>,
    standalone: Option<f32>,
    position_on_page: Option<f32>,
    repetition: Option<f32>,
    uppercase: Option<f32>,
    font_family: Option<f32>,
}

impl Features {
    /// Weighted mean over the present features.
    fn score(&self, w: &HeaderWeights) -> f32 {
        let pairs = [
            (self.font_size_ratio, w.font_size_ratio),
            (self.vertical_spacing, w.vertical_spacing),
            (self.standalone, w.standalone),
            (self.position_on_page, w.position_on_page),
            (self.repetition, w.repetition),
            (self.uppercase, w.uppercase),
            (self.font_family, w.font_family),
        ];
        let mut sum = 0.0;
        let mut weight_sum = 0.0;
        for (value, weight) in pairs {
            if let Some(value) = value {
                sum += value.clamp(0.0, 1.0) * weight;
                weight_sum += weight;
            }
        }
        if weight_sum > 0.0 {
            sum / weight_sum
        } else {
            0.0
        }
    }
}

fn score_candidates(parse: &ParseResult, options: &ConvertOptions) -> Vec<Candidate> {
    let tunables = &options.tunables;
    let globals = &parse.globals;
    let body_height = globals.body_height;

    // Document-wide font-size frequency over surviving lines
    let mut size_counts: HashMap<i64, usize> = HashMap::new();
    for page in &parse.pages {
        for line in page.lines().filter(|l| !l.removed) {
            *size_counts.entry(size_bucket(line.height)).or_insert(0) += 1;
        }
    }
    let max_count = size_counts.values().copied().max().unwrap_or(1);

    let mut retained = Vec::new();

    for (page_index, page) in parse.pages.iter().enumerate() {
        let lines: Vec<(usize, &Line)> = page
            .items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| item.as_line().map(|line| (i, line)))
            .filter(|(_, line)| !line.removed)
            .collect();
        if lines.is_empty() {
            continue;
        }

        let page_max_y = lines.iter().map(|(_, l)| l.y).fold(f32::NEG_INFINITY, f32::max);
        let page_min_y = lines.iter().map(|(_, l)| l.y).fold(f32::INFINITY, f32::min);

        // Candidacy: untyped and tall enough for the font-size gate
        let candidates: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, (_, line))| {
                line.kind.is_none() && line.height / body_height >= tunables.font_size_ratio_gate
            })
            .map(|(k, _)| k)
            .collect();

        for &k in &candidates {
            let (item_index, line) = lines[k];
            let ratio = line.height / body_height;

            let standalone = !candidates.iter().any(|&other| {
                other != k && (lines[other].1.y - line.y).abs() <= line.height * 0.5
            });

            let vertical_spacing = {
                let before = (k > 0).then(|| lines[k - 1].1.y - line.y);
                let after = (k + 1 < lines.len()).then(|| line.y - lines[k + 1].1.y);
                match (before, after) {
                    (None, None) => None,
                    (b, a) => {
                        let gap = b.unwrap_or(0.0).max(a.unwrap_or(0.0));
                        Some(gap / (globals.body_distance * 1.5))
                    },
                }
            };

            let position_on_page = if page_max_y > page_min_y {
                Some((page_max_y - line.y) / (page_max_y - page_min_y))
            } else {
                None
            };

            let text = line.text();
            let trimmed = text.trim();
            let uppercase = trimmed.chars().any(|c| c.is_alphabetic())
                && trimmed == trimmed.to_uppercase();

            let repetition = size_counts
                .get(&size_bucket(line.height))
                .map(|&count| count as f32 / max_count as f32);

            let features = Features {
                font_size_ratio: Some((ratio - 1.0).min(1.0)),
                vertical_spacing,
                standalone: Some(if standalone { 1.0 } else { 0.0 }),
                position_on_page,
                repetition,
                uppercase: Some(if uppercase { 1.0 } else { 0.0 }),
                font_family: Some(if line.font_id != globals.body_font {
                    1.0
                } else {
                    0.0
                }),
            };

            let score = features.score(&tunables.header_weights);
            log::trace!("header candidate {:?} scored {:.2}", trimmed, score);
            if score >= tunables.header_score_threshold {
                retained.push(Candidate {
                    page: page_index,
                    item: item_index,
                    height: line.height,
                });
            }
        }
    }

    retained
}

/// Cluster retained candidate heights (representatives deduplicated by the
/// tolerance), largest first, and map the top clusters to levels 1..=4.
fn cluster_levels(retained: &[Candidate], tolerance: f32) -> Vec<(f32, u8)> {
    let mut sizes: Vec<f32> = retained.iter().map(|c| c.height).collect();
    sizes.sort_by(|a, b| safe_float_cmp(*b, *a));
    sizes.dedup_by(|a, b| (*a - *b).abs() <= tolerance);

    sizes
        .into_iter()
        .take(LEVEL_CAP)
        .enumerate()
        .map(|(i, size)| (size, i as u8 + 1))
        .collect()
}

fn lookup_level(levels: &[(f32, u8)], height: f32, tolerance: f32) -> Option<u8> {
    levels
        .iter()
        .find(|(size, _)| (size - height).abs() <= tolerance)
        .map(|(_, level)| *level)
}

/// Exact-height matches from a caller-supplied table-of-contents range map
/// take precedence over cluster assignment.
fn toc_override(toc_levels: &[(f32, u8)], height: f32) -> Option<u8> {
    toc_levels
        .iter()
        .find(|(size, _)| (size - height).abs() < 0.01)
        .map(|(_, level)| *level)
}

/// Pages containing maximum-height runs get H1 for max-height lines and H2
/// for lines clearly above the body band.
fn apply_max_height_rule(parse: &mut ParseResult) {
    let max_height = parse.globals.max_height;
    let body_height = parse.globals.body_height;
    if max_height <= body_height + 0.5 {
        return;
    }
    let h2_floor = body_height + (max_height - body_height) / 3.0;

    for page in &mut parse.pages {
        let has_max = page
            .lines()
            .any(|line| !line.removed && (line.height - max_height).abs() < 0.1);
        if !has_max {
            continue;
        }
        for item in &mut page.items {
            if let Some(line) = item.as_line_mut() {
                if line.removed {
                    continue;
                }
                let is_header = line.kind.map(|k| k.headline_level().is_some()).unwrap_or(true);
                if !is_header {
                    continue;
                }
                if (line.height - max_height).abs() < 0.1 {
                    line.kind = Some(BlockType::H1);
                } else if line.kind.is_none() && line.height > h2_floor {
                    line.kind = Some(BlockType::H2);
                }
            }
        }
    }
}

/// Font sizes cluster at 0.5 resolution for the repetition feature.
fn size_bucket(height: f32) -> i64 {
    (height * 2.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{PageContext, Word};
    use crate::pipeline::Globals;

    fn mock_line(text: &str, y: f32, height: f32, font: &str) -> Line {
        Line {
            x: 20.0,
            y,
            width: text.len() as f32 * 6.0,
            height,
            words: text.split_whitespace().map(Word::plain).collect(),
            kind: None,
            font_id: font.to_string(),
            removed: false,
        }
    }

    fn globals() -> Globals {
        Globals {
            body_height: 12.0,
            body_font: "F1".to_string(),
            body_distance: 14.0,
            max_height: 24.0,
            max_height_font: "F2".to_string(),
            ..Default::default()
        }
    }

    fn run_stage(lines: Vec<Line>, globals: Globals, options: &ConvertOptions) -> ParseResult {
        let mut page = PageContext::new(0, 612.0, 792.0);
        page.items = lines.into_iter().map(PageItem::Line).collect();
        let parse = ParseResult {
            pages: vec![page],
            globals,
            ..Default::default()
        };
        HeaderDetector.run(parse, options).unwrap()
    }

    #[test]
    fn test_title_over_body_becomes_h1() {
        let parse = run_stage(
            vec![
                mock_line("Title", 730.0, 24.0, "F2"),
                mock_line("body text follows here", 700.0, 12.0, "F1"),
                mock_line("and another body line", 686.0, 12.0, "F1"),
            ],
            globals(),
            &ConvertOptions::default(),
        );
        let lines: Vec<&Line> = parse.pages[0].lines().collect();
        assert_eq!(lines[0].kind, Some(BlockType::H1));
        assert!(lines[1].kind.is_none());
        assert!(lines[2].kind.is_none());
    }

    #[test]
    fn test_body_height_lines_are_not_candidates() {
        let parse = run_stage(
            vec![
                mock_line("just prose", 700.0, 12.0, "F1"),
                mock_line("more prose", 686.0, 12.0, "F1"),
            ],
            Globals {
                max_height: 12.0,
                ..globals()
            },
            &ConvertOptions::default(),
        );
        assert!(parse.pages[0].lines().all(|l| l.kind.is_none()));
    }

    #[test]
    fn test_two_sizes_cluster_to_h1_h2() {
        let parse = run_stage(
            vec![
                mock_line("Chapter", 750.0, 24.0, "F2"),
                mock_line("body one", 720.0, 12.0, "F1"),
                mock_line("Section", 690.0, 18.0, "F2"),
                mock_line("body two", 660.0, 12.0, "F1"),
            ],
            globals(),
            &ConvertOptions::default(),
        );
        let lines: Vec<&Line> = parse.pages[0].lines().collect();
        assert_eq!(lines[0].kind, Some(BlockType::H1));
        assert_eq!(lines[2].kind, Some(BlockType::H2));
        assert_eq!(
            parse.globals.header_levels,
            vec![(24.0, 1), (18.0, 2)]
        );
    }

    #[test]
    fn test_level_cap_at_four() {
        let heights = [30.0, 26.0, 22.0, 18.0, 15.0];
        let lines: Vec<Line> = heights
            .iter()
            .enumerate()
            .map(|(i, &h)| mock_line("Heading", 750.0 - i as f32 * 60.0, h, "F2"))
            .collect();
        let parse = run_stage(
            lines,
            Globals {
                max_height: 30.0,
                ..globals()
            },
            &ConvertOptions::default(),
        );
        assert_eq!(parse.globals.header_levels.len(), 4);
        let kinds: Vec<Option<BlockType>> =
            parse.pages[0].lines().map(|l| l.kind).collect();
        assert_eq!(kinds[0], Some(BlockType::H1));
        assert_eq!(kinds[3], Some(BlockType::H4));
        // The fifth size has no cluster level; the max-height override
        // may still promote it when it clears the H2 floor.
        assert_ne!(kinds[4], Some(BlockType::H4));
    }

    #[test]
    fn test_typed_lines_not_candidates() {
        let mut list_line = mock_line("- big list entry", 730.0, 24.0, "F2");
        list_line.kind = Some(BlockType::List);
        let parse = run_stage(
            vec![list_line, mock_line("body", 700.0, 12.0, "F1")],
            globals(),
            &ConvertOptions::default(),
        );
        assert_eq!(
            parse.pages[0].lines().next().unwrap().kind,
            Some(BlockType::List)
        );
    }

    #[test]
    fn test_toc_levels_take_precedence() {
        let mut options = ConvertOptions::default();
        options.tunables.toc_levels = vec![(24.0, 3)];
        let parse = run_stage(
            vec![
                mock_line("Would-be H1", 730.0, 24.0, "F2"),
                mock_line("body line here", 700.0, 12.0, "F1"),
            ],
            Globals {
                // Keep the max-height override out of this test
                max_height: 40.0,
                ..globals()
            },
            &options,
        );
        assert_eq!(
            parse.pages[0].lines().next().unwrap().kind,
            Some(BlockType::H3)
        );
    }

    #[test]
    fn test_max_height_rule_promotes_h1_and_h2() {
        let parse = run_stage(
            vec![
                mock_line("DOC TITLE", 760.0, 24.0, "F2"),
                // 17pt clears body + (24-12)/3 = 16
                mock_line("Subtitle line", 730.0, 17.0, "F2"),
                mock_line("body text", 700.0, 12.0, "F1"),
            ],
            globals(),
            &ConvertOptions::default(),
        );
        let lines: Vec<&Line> = parse.pages[0].lines().collect();
        assert_eq!(lines[0].kind, Some(BlockType::H1));
        assert_eq!(lines[1].kind, Some(BlockType::H2));
    }

    #[test]
    fn test_empty_document_no_panic() {
        let parse = ParseResult::default();
        let parse = HeaderDetector
            .run(parse, &ConvertOptions::default())
            .unwrap();
        assert!(parse.globals.header_levels.is_empty());
    }
}
