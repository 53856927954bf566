//! Structured text rendering for model output.
//!
//! Turns the constrained markdown dialect the inference prompt asks for
//! (`##`/`###` headings, `**bold**`, `*`/`-` bullets, `1.` numbered items)
//! into typed content blocks. Classification is strictly per line; inline
//! emphasis is applied afterwards to whatever content remains once the
//! block marker is stripped.
//!
//! Parsing never fails. Anything unrecognised degrades to a paragraph.

use std::sync::LazyLock;

use regex::Regex;

static ORDERED_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)\.\s").expect("ordered-item pattern is valid"));

static BOLD_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("bold-span pattern is valid"));

/// Kind of a parsed block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    /// `## ` line.
    Heading,
    /// `### ` line.
    Subheading,
    /// `* ` or `- ` line.
    Bullet,
    /// `N. ` line. Keeps the number exactly as written.
    OrderedItem { number: String },
    Paragraph,
    Blank,
}

/// A run of inline text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineRun {
    Plain(String),
    Emphasis(String),
}

impl InlineRun {
    pub fn text(&self) -> &str {
        match self {
            InlineRun::Plain(s) | InlineRun::Emphasis(s) => s,
        }
    }
}

/// One parsed unit of renderer output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentBlock {
    pub kind: BlockKind,
    /// Leading whitespace characters before a list marker. Zero for every
    /// other kind.
    pub indent: usize,
    pub runs: Vec<InlineRun>,
}

impl ContentBlock {
    fn new(kind: BlockKind, indent: usize, content: &str) -> Self {
        Self {
            kind,
            indent,
            runs: parse_inline(content),
        }
    }

    fn blank() -> Self {
        Self {
            kind: BlockKind::Blank,
            indent: 0,
            runs: Vec::new(),
        }
    }

    /// Concatenated run text without any markers.
    pub fn text(&self) -> String {
        self.runs.iter().map(InlineRun::text).collect()
    }
}

/// Parse raw model output into content blocks, one per physical line.
pub fn parse(text: &str) -> Vec<ContentBlock> {
    text.split('\n').map(parse_line).collect()
}

fn parse_line(raw: &str) -> ContentBlock {
    let line = raw.strip_suffix('\r').unwrap_or(raw);
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ContentBlock::blank();
    }

    if let Some(rest) = trimmed.strip_prefix("### ") {
        return ContentBlock::new(BlockKind::Subheading, 0, rest);
    }
    if let Some(rest) = trimmed.strip_prefix("## ") {
        return ContentBlock::new(BlockKind::Heading, 0, rest);
    }

    let indent = leading_whitespace(line);

    if let Some(rest) = trimmed
        .strip_prefix("* ")
        .or_else(|| trimmed.strip_prefix("- "))
    {
        return ContentBlock::new(BlockKind::Bullet, indent, rest);
    }

    if let Some(caps) = ORDERED_MARKER.captures(trimmed) {
        let marker_len = caps[0].len();
        let number = caps[1].to_string();
        return ContentBlock::new(
            BlockKind::OrderedItem { number },
            indent,
            &trimmed[marker_len..],
        );
    }

    ContentBlock::new(BlockKind::Paragraph, 0, line)
}

fn leading_whitespace(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// Split content on `**…**` spans.
///
/// Empty runs produced at span boundaries are dropped, except that content
/// with nothing else to show still yields a single plain run. An opening
/// `**` without a partner is left in the plain text untouched.
pub fn parse_inline(content: &str) -> Vec<InlineRun> {
    let mut runs = Vec::new();
    let mut cursor = 0;

    for caps in BOLD_SPAN.captures_iter(content) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > cursor {
            runs.push(InlineRun::Plain(content[cursor..whole.start()].to_string()));
        }
        if !inner.as_str().is_empty() {
            runs.push(InlineRun::Emphasis(inner.as_str().to_string()));
        }
        cursor = whole.end();
    }

    if cursor < content.len() {
        runs.push(InlineRun::Plain(content[cursor..].to_string()));
    }
    if runs.is_empty() {
        runs.push(InlineRun::Plain(String::new()));
    }
    runs
}

/// Re-emit blocks in canonical text form.
///
/// Parsing the result yields the same block kinds and indent levels.
pub fn to_canonical(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .map(canonical_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn canonical_line(block: &ContentBlock) -> String {
    let body = canonical_runs(&block.runs);
    let pad = " ".repeat(block.indent);
    match &block.kind {
        BlockKind::Heading => format!("## {body}"),
        BlockKind::Subheading => format!("### {body}"),
        BlockKind::Bullet => format!("{pad}* {body}"),
        BlockKind::OrderedItem { number } => format!("{pad}{number}. {body}"),
        BlockKind::Paragraph => body,
        BlockKind::Blank => String::new(),
    }
}

fn canonical_runs(runs: &[InlineRun]) -> String {
    runs.iter()
        .map(|run| match run {
            InlineRun::Plain(s) => s.clone(),
            InlineRun::Emphasis(s) => format!("**{s}**"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(s: &str) -> InlineRun {
        InlineRun::Plain(s.into())
    }

    fn emph(s: &str) -> InlineRun {
        InlineRun::Emphasis(s.into())
    }

    #[test]
    fn mixed_document() {
        let blocks = parse("### Title\n* item **one**\n1. first\n2. second");
        assert_eq!(blocks.len(), 4);

        assert_eq!(blocks[0].kind, BlockKind::Subheading);
        assert_eq!(blocks[0].runs, vec![plain("Title")]);

        assert_eq!(blocks[1].kind, BlockKind::Bullet);
        assert_eq!(blocks[1].indent, 0);
        assert_eq!(blocks[1].runs, vec![plain("item "), emph("one")]);

        assert_eq!(
            blocks[2].kind,
            BlockKind::OrderedItem {
                number: "1".into()
            }
        );
        assert_eq!(blocks[2].runs, vec![plain("first")]);
        assert_eq!(
            blocks[3].kind,
            BlockKind::OrderedItem {
                number: "2".into()
            }
        );
        assert_eq!(blocks[3].text(), "second");
    }

    #[test]
    fn unterminated_bold_is_literal() {
        let blocks = parse("**unterminated bold");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, BlockKind::Paragraph);
        assert_eq!(blocks[0].runs, vec![plain("**unterminated bold")]);
    }

    #[test]
    fn dangling_delimiter_after_span() {
        let runs = parse_inline("**a** then **b");
        assert_eq!(runs, vec![emph("a"), plain(" then **b")]);
    }

    #[test]
    fn no_delimiters_single_plain_run() {
        assert_eq!(parse_inline("just text"), vec![plain("just text")]);
        assert_eq!(parse_inline(""), vec![plain("")]);
    }

    #[test]
    fn adjacent_spans_have_no_empty_runs() {
        let runs = parse_inline("**a****b**");
        assert_eq!(runs, vec![emph("a"), emph("b")]);
    }

    #[test]
    fn empty_span_does_not_leak_delimiters() {
        let runs = parse_inline("x****y");
        assert_eq!(runs, vec![plain("x"), plain("y")]);
        assert!(runs.iter().all(|r| !r.text().contains('*')));
    }

    #[test]
    fn headings() {
        let blocks = parse("## Overview\n### Details **now**");
        assert_eq!(blocks[0].kind, BlockKind::Heading);
        assert_eq!(blocks[0].text(), "Overview");
        assert_eq!(blocks[1].kind, BlockKind::Subheading);
        assert_eq!(blocks[1].runs, vec![plain("Details "), emph("now")]);
    }

    #[test]
    fn four_hashes_is_a_paragraph() {
        let blocks = parse("#### deep");
        assert_eq!(blocks[0].kind, BlockKind::Paragraph);
        assert_eq!(blocks[0].text(), "#### deep");
    }

    #[test]
    fn indented_heading_marker_still_classifies() {
        let blocks = parse("   ### Indented");
        assert_eq!(blocks[0].kind, BlockKind::Subheading);
        assert_eq!(blocks[0].indent, 0);
    }

    #[test]
    fn nested_bullets_keep_indent() {
        let blocks = parse("- top\n  - nested\n    * deeper");
        assert_eq!(
            blocks.iter().map(|b| b.indent).collect::<Vec<_>>(),
            vec![0, 2, 4]
        );
        assert!(blocks.iter().all(|b| b.kind == BlockKind::Bullet));
        assert_eq!(blocks[2].text(), "deeper");
    }

    #[test]
    fn tab_indent_counts_characters() {
        let blocks = parse("\t\t1. tabbed");
        assert_eq!(blocks[0].indent, 2);
    }

    #[test]
    fn ordered_keeps_literal_number() {
        let blocks = parse("1. one\n7. seven\n42. answer");
        let numbers: Vec<String> = blocks
            .iter()
            .map(|b| match &b.kind {
                BlockKind::OrderedItem { number } => number.clone(),
                other => panic!("expected ordered item, got {other:?}"),
            })
            .collect();
        assert_eq!(numbers, vec!["1", "7", "42"]);
    }

    #[test]
    fn only_ascii_digits_number_an_item() {
        for line in ["\u{0663}. arabic-indic", "\u{0968}. devanagari", "\u{FF11}. fullwidth"] {
            let blocks = parse(line);
            assert_eq!(blocks[0].kind, BlockKind::Paragraph, "line {line:?}");
            assert_eq!(blocks[0].text(), line);
        }
    }

    #[test]
    fn bullet_with_bold_strips_marker_first() {
        let blocks = parse("* **Batch size**: 16");
        assert_eq!(blocks[0].kind, BlockKind::Bullet);
        assert_eq!(blocks[0].runs, vec![emph("Batch size"), plain(": 16")]);
    }

    #[test]
    fn markers_without_space_are_paragraphs() {
        for line in ["*bold?", "-dash", "1.5 ratio", "*"] {
            let blocks = parse(line);
            assert_eq!(blocks[0].kind, BlockKind::Paragraph, "line {line:?}");
        }
    }

    #[test]
    fn blank_lines() {
        let blocks = parse("a\n\n   \nb");
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[1].kind, BlockKind::Blank);
        assert_eq!(blocks[2].kind, BlockKind::Blank);
        assert!(blocks[1].runs.is_empty());
    }

    #[test]
    fn paragraph_keeps_full_line() {
        let blocks = parse("  indented prose  ");
        assert_eq!(blocks[0].kind, BlockKind::Paragraph);
        assert_eq!(blocks[0].text(), "  indented prose  ");
    }

    #[test]
    fn crlf_input() {
        let blocks = parse("### Title\r\n* item\r\n");
        assert_eq!(blocks[0].text(), "Title");
        assert_eq!(blocks[1].text(), "item");
        assert_eq!(blocks[2].kind, BlockKind::Blank);
    }

    #[test]
    fn canonical_form_is_stable() {
        let source = "## Plan\n\n### Steps\n1.  first **bold**\n   - nested item\n\t* tabbed\n9. skipped ahead\nplain **x** text\n**open";
        let first = parse(source);
        let canonical = to_canonical(&first);
        let second = parse(&canonical);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.kind, b.kind);
            assert_eq!(a.indent, b.indent);
        }
        assert_eq!(to_canonical(&second), canonical);
    }

    #[test]
    fn arbitrary_input_never_panics() {
        let inputs = [
            "",
            "\n\n",
            "****",
            "** **",
            "* ",
            "1. ",
            "ünïcödé **bölд** text",
            "   \t  ",
            "### ",
        ];
        for input in inputs {
            let _ = parse(input);
        }
    }
}
