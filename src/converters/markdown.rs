//! Markdown emission.
//!
//! Serializes each page's ordered items to Markdown: `#` headings, `-`
//! lists, fenced code, pipe tables, footnote syntax, inline bold/italic
//! markers and image references per the configured mode.

use crate::config::ConvertOptions;
use crate::elements::{Block, BlockType, PageContext, PageItem, TextFormat, Word, WordKind};
use crate::error::Result;
use crate::images::ImageSink;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Column boundaries inside detected table rows.
    static ref RE_COLUMN_SPLIT: Regex = Regex::new(r"[ ]{2,}|\t").unwrap();
}

/// Punctuation that glues to the preceding word without a space.
const GLUE_PUNCT: [char; 3] = ['.', '!', '?'];

/// Serializes pipeline output to Markdown.
#[derive(Debug)]
pub struct MarkdownEmitter<'a> {
    options: &'a ConvertOptions,
}

impl<'a> MarkdownEmitter<'a> {
    /// Create an emitter bound to the conversion options.
    pub fn new(options: &'a ConvertOptions) -> Self {
        Self { options }
    }

    /// Emit one page: items in order, separated by blank lines.
    pub fn emit_page(&self, page: &PageContext, sink: &mut ImageSink) -> Result<String> {
        let mut parts: Vec<String> = Vec::new();

        for item in &page.items {
            match item {
                PageItem::Block(block) => {
                    let text = self.emit_block(block);
                    if !text.is_empty() {
                        parts.push(text);
                    }
                },
                PageItem::Image(image) => {
                    if let Some(reference) = sink.render(image, page.index)? {
                        parts.push(reference);
                    }
                },
                other => log::debug!("unexpected item variant at emission: {:?}", other),
            }
        }

        Ok(parts.join("\n\n"))
    }

    fn emit_block(&self, block: &Block) -> String {
        match block.kind {
            BlockType::H1
            | BlockType::H2
            | BlockType::H3
            | BlockType::H4
            | BlockType::H5
            | BlockType::H6 => {
                let level = block.kind.headline_level().unwrap() as usize;
                let body = block
                    .lines
                    .iter()
                    .map(|l| emit_words(&l.words, true))
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("{} {}", "#".repeat(level), body)
            },
            BlockType::List => block
                .lines
                .iter()
                .map(|l| emit_words(&l.words, true))
                .collect::<Vec<_>>()
                .join("\n"),
            BlockType::Code => {
                let body = block
                    .lines
                    .iter()
                    .map(|l| emit_words(&l.words, false).replace('`', ""))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("```\n{}\n```", body)
            },
            BlockType::Table => self.emit_table(block),
            BlockType::Toc => block
                .lines
                .iter()
                .map(|l| emit_words(&l.words, false))
                .collect::<Vec<_>>()
                .join("\n"),
            BlockType::Footnotes | BlockType::Paragraph => block
                .lines
                .iter()
                .map(|l| emit_words(&l.words, true))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    fn emit_table(&self, block: &Block) -> String {
        let texts: Vec<String> = block.lines.iter().map(|l| l.text()).collect();

        // Pipe rows pass through verbatim
        if texts.iter().any(|t| t.contains('|')) {
            return texts.join("\n");
        }

        let rows: Vec<Vec<String>> = if texts.len() == 1 {
            self.single_line_rows(&texts[0])
        } else {
            texts.iter().map(|t| split_row(t)).collect()
        };
        render_pipe_table(&rows)
    }

    /// Break a one-line table into rows: the leading run of header-keyword
    /// tokens fixes the column count, remaining tokens fill the data rows.
    fn single_line_rows(&self, text: &str) -> Vec<Vec<String>> {
        let keywords = &self.options.tunables.table_header_keywords;
        let tokens: Vec<&str> = text.split_whitespace().collect();

        let header_len = tokens
            .iter()
            .take_while(|t| keywords.iter().any(|k| t.contains(k.as_str())))
            .count();

        if header_len >= 2 {
            let mut rows = vec![tokens[..header_len]
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()];
            for chunk in tokens[header_len..].chunks(header_len) {
                let mut row: Vec<String> = chunk.iter().map(|t| t.to_string()).collect();
                row.resize(header_len, String::new());
                rows.push(row);
            }
            rows
        } else {
            // No keyword header: fall back to multi-space columns, then to
            // one row of whitespace tokens
            let cells = split_row(text);
            if cells.len() >= 2 {
                vec![cells]
            } else {
                vec![tokens.iter().map(|t| t.to_string()).collect()]
            }
        }
    }
}

/// Split a detected table line into cells on multi-space runs, falling
/// back to single-space tokens.
fn split_row(text: &str) -> Vec<String> {
    let cells: Vec<String> = RE_COLUMN_SPLIT
        .split(text.trim())
        .filter(|c| !c.is_empty())
        .map(|c| c.to_string())
        .collect();
    if cells.len() >= 2 {
        cells
    } else {
        text.split_whitespace().map(|t| t.to_string()).collect()
    }
}

fn render_pipe_table(rows: &[Vec<String>]) -> String {
    let mut out = Vec::with_capacity(rows.len() + 1);
    for (i, row) in rows.iter().enumerate() {
        out.push(format!("| {} |", row.join(" | ")));
        if i == 0 {
            let separator: Vec<&str> = row.iter().map(|_| "---").collect();
            out.push(format!("| {} |", separator.join(" | ")));
        }
    }
    out.join("\n")
}

/// Emit a line's words with the inline format state machine.
///
/// A marker opens when a word's format differs from the open one and closes
/// before the next format change; links, footnote anchors and footnote
/// definitions render their Markdown forms. Words join with spaces unless
/// the next word starts with glue punctuation.
fn emit_words(words: &[Word], formatting: bool) -> String {
    let mut out = String::new();
    let mut open = TextFormat::Regular;

    for (i, word) in words.iter().enumerate() {
        let text = word_text(word);
        let format = if formatting {
            word.format
        } else {
            TextFormat::Regular
        };

        if format != open {
            out.push_str(open.marker());
        }
        if i > 0 && !text.starts_with(&GLUE_PUNCT[..]) {
            out.push(' ');
        }
        if format != open {
            out.push_str(format.marker());
            open = format;
        }
        out.push_str(&text);
    }
    out.push_str(open.marker());
    out
}

fn word_text(word: &Word) -> String {
    match &word.kind {
        WordKind::Plain => word.text.clone(),
        WordKind::Link { url } => format!("[{}]({})", word.text, url),
        WordKind::FootnoteAnchor => format!("[^{}]", word.text),
        WordKind::FootnoteDef => format!("[^{}]:", word.text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::Line;

    fn word(text: &str, format: TextFormat) -> Word {
        Word {
            text: text.to_string(),
            kind: WordKind::Plain,
            format,
        }
    }

    fn line_of(words: Vec<Word>, y: f32) -> Line {
        Line {
            x: 10.0,
            y,
            width: 100.0,
            height: 12.0,
            words,
            kind: None,
            font_id: "F1".to_string(),
            removed: false,
        }
    }

    fn plain_line(text: &str, y: f32) -> Line {
        line_of(text.split_whitespace().map(Word::plain).collect(), y)
    }

    fn emit(block: Block) -> String {
        let options = ConvertOptions::default();
        MarkdownEmitter::new(&options).emit_block(&block)
    }

    #[test]
    fn test_heading_prefixes() {
        for (kind, prefix) in [
            (BlockType::H1, "# "),
            (BlockType::H2, "## "),
            (BlockType::H4, "#### "),
            (BlockType::H6, "###### "),
        ] {
            let md = emit(Block::new(kind, vec![plain_line("Heading text", 700.0)]));
            assert!(md.starts_with(prefix), "{:?} -> {:?}", kind, md);
            assert!(md.ends_with("Heading text"));
        }
    }

    #[test]
    fn test_paragraph_joins_lines_with_spaces() {
        let md = emit(Block::new(
            BlockType::Paragraph,
            vec![plain_line("first line", 700.0), plain_line("second", 686.0)],
        ));
        assert_eq!(md, "first line second");
    }

    #[test]
    fn test_list_keeps_line_breaks() {
        let md = emit(Block::new(
            BlockType::List,
            vec![
                plain_line("- item 1", 700.0),
                plain_line("- item 2", 686.0),
                plain_line("- item 3", 672.0),
            ],
        ));
        assert_eq!(md, "- item 1\n- item 2\n- item 3");
    }

    #[test]
    fn test_code_fenced_and_backticks_stripped() {
        let md = emit(Block::new(
            BlockType::Code,
            vec![
                plain_line("let `x` = 1;", 700.0),
                plain_line("run(x);", 686.0),
            ],
        ));
        assert_eq!(md, "```\nlet x = 1;\nrun(x);\n```");
    }

    #[test]
    fn test_code_disables_inline_format() {
        let md = emit(Block::new(
            BlockType::Code,
            vec![line_of(vec![word("bold_code", TextFormat::Bold)], 700.0)],
        ));
        assert_eq!(md, "```\nbold_code\n```");
    }

    #[test]
    fn test_bold_italic_markers() {
        let md = emit(Block::new(
            BlockType::Paragraph,
            vec![line_of(
                vec![
                    word("plain", TextFormat::Regular),
                    word("bold", TextFormat::Bold),
                    word("words", TextFormat::Bold),
                    word("italic", TextFormat::Italic),
                    word("end", TextFormat::Regular),
                ],
                700.0,
            )],
        ));
        assert_eq!(md, "plain **bold words** *italic* end");
    }

    #[test]
    fn test_trailing_format_closed() {
        let md = emit(Block::new(
            BlockType::Paragraph,
            vec![line_of(vec![word("strong", TextFormat::Bold)], 700.0)],
        ));
        assert_eq!(md, "**strong**");
    }

    #[test]
    fn test_punctuation_glues_to_previous_word() {
        let md = emit(Block::new(
            BlockType::Paragraph,
            vec![line_of(
                vec![Word::plain("done"), Word::plain("."), Word::plain("Next")],
                700.0,
            )],
        ));
        assert_eq!(md, "done. Next");
    }

    #[test]
    fn test_link_word() {
        let mut line = plain_line("see", 700.0);
        line.words.push(Word {
            text: "www.example.com".to_string(),
            kind: WordKind::Link {
                url: "http://www.example.com".to_string(),
            },
            format: TextFormat::Regular,
        });
        let md = emit(Block::new(BlockType::Paragraph, vec![line]));
        assert_eq!(md, "see [www.example.com](http://www.example.com)");
    }

    #[test]
    fn test_footnote_anchor_and_def() {
        let mut anchor_line = plain_line("claim", 700.0);
        anchor_line.words.push(Word {
            text: "2".to_string(),
            kind: WordKind::FootnoteAnchor,
            format: TextFormat::Regular,
        });
        let md = emit(Block::new(BlockType::Paragraph, vec![anchor_line]));
        assert_eq!(md, "claim [^2]");

        let mut def_line = line_of(
            vec![Word {
                text: "2".to_string(),
                kind: WordKind::FootnoteDef,
                format: TextFormat::Regular,
            }],
            100.0,
        );
        def_line.words.push(Word::plain("the note"));
        let md = emit(Block::new(BlockType::Footnotes, vec![def_line]));
        assert_eq!(md, "[^2]: the note");
    }

    #[test]
    fn test_toc_preserves_line_breaks_without_markers() {
        let md = emit(Block::new(
            BlockType::Toc,
            vec![
                line_of(vec![word("1. Intro ..... 3", TextFormat::Bold)], 700.0),
                plain_line("2. Body ..... 9", 686.0),
            ],
        ));
        assert_eq!(md, "1. Intro ..... 3\n2. Body ..... 9");
    }

    #[test]
    fn test_pipe_table_verbatim() {
        let md = emit(Block::new(
            BlockType::Table,
            vec![
                plain_line("| a | b |", 700.0),
                plain_line("| 1 | 2 |", 686.0),
            ],
        ));
        assert_eq!(md, "| a | b |\n| 1 | 2 |");
    }

    #[test]
    fn test_columns_table_gets_separator_row() {
        let md = emit(Block::new(
            BlockType::Table,
            vec![
                line_of(vec![Word::plain("name  kind  notes")], 700.0),
                line_of(vec![Word::plain("alpha  x  yes")], 686.0),
            ],
        ));
        let lines: Vec<&str> = md.lines().collect();
        assert_eq!(lines[0], "| name | kind | notes |");
        assert_eq!(lines[1], "| --- | --- | --- |");
        assert_eq!(lines[2], "| alpha | x | yes |");
    }

    #[test]
    fn test_single_line_keyword_table() {
        let md = emit(Block::new(
            BlockType::Table,
            vec![line_of(
                vec![Word::plain("名称 类型 支持 备注 标题结构 ✅ 公式 支持")],
                700.0,
            )],
        ));
        let lines: Vec<&str> = md.lines().collect();
        assert!(lines[0].starts_with("| "));
        assert!(lines[0].ends_with(" |"));
        assert!(lines[1].contains("---"));
    }

    #[test]
    fn test_emitter_idempotent_on_structure_counts() {
        let blocks = vec![
            Block::new(BlockType::H1, vec![plain_line("Title", 760.0)]),
            Block::new(
                BlockType::List,
                vec![plain_line("- a", 700.0), plain_line("- b", 686.0)],
            ),
            Block::new(BlockType::Code, vec![plain_line("code", 650.0)]),
            Block::new(BlockType::Paragraph, vec![plain_line("text", 620.0)]),
        ];
        let first: Vec<String> = blocks.iter().map(|b| emit(b.clone())).collect();
        let second: Vec<String> = blocks.iter().map(|b| emit(b.clone())).collect();

        let count = |pages: &[String], pat: &str| {
            pages
                .iter()
                .map(|p| p.matches(pat).count())
                .sum::<usize>()
        };
        assert_eq!(count(&first, "# "), count(&second, "# "));
        assert_eq!(count(&first, "- "), count(&second, "- "));
        assert_eq!(count(&first, "```"), count(&second, "```"));
        assert_eq!(first, second);
    }
}
