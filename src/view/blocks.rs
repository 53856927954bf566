//! Content blocks and conversation turns as styled lines.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::render::{self, BlockKind, ContentBlock, InlineRun};
use crate::session::{ConversationTurn, Role};

fn emphasis() -> Style {
    Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD)
}

fn marker() -> Style {
    Style::default().fg(Color::Cyan)
}

fn runs(runs: &[InlineRun], base: Style) -> Vec<Span<'static>> {
    runs.iter()
        .map(|run| match run {
            InlineRun::Plain(text) => Span::styled(text.clone(), base),
            InlineRun::Emphasis(text) => Span::styled(text.clone(), emphasis()),
        })
        .collect()
}

/// One line per block, in block order.
pub fn render_blocks(blocks: &[ContentBlock]) -> Vec<Line<'static>> {
    blocks.iter().map(render_block).collect()
}

fn render_block(block: &ContentBlock) -> Line<'static> {
    let pad = " ".repeat(block.indent);
    match &block.kind {
        BlockKind::Heading => Line::from(runs(
            &block.runs,
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )),
        BlockKind::Subheading => Line::from(runs(
            &block.runs,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        BlockKind::Bullet => {
            let mut spans = vec![Span::styled(format!("{pad}• "), marker())];
            spans.extend(runs(&block.runs, Style::default()));
            Line::from(spans)
        }
        BlockKind::OrderedItem { number } => {
            let mut spans = vec![Span::styled(
                format!("{pad}{number}. "),
                marker().add_modifier(Modifier::BOLD),
            )];
            spans.extend(runs(&block.runs, Style::default()));
            Line::from(spans)
        }
        BlockKind::Paragraph => Line::from(runs(&block.runs, Style::default())),
        BlockKind::Blank => Line::default(),
    }
}

/// Parse model output and style it.
pub fn render_reply(text: &str) -> Vec<Line<'static>> {
    render_blocks(&render::parse(text))
}

/// A whole conversation: user turns verbatim, model turns rendered.
pub fn render_turns(turns: &[ConversationTurn]) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for turn in turns {
        match turn.role {
            Role::User => lines.push(Line::from(vec![
                Span::styled("> ", Style::default().fg(Color::DarkGray)),
                Span::raw(turn.text.clone()),
            ])),
            Role::Model => lines.extend(render_reply(&turn.text)),
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::lines_to_text;

    #[test]
    fn reply_lines_follow_blocks() {
        let lines = render_reply("### Title\n* item **one**\n  - nested\n1. first\n\nplain");
        assert_eq!(lines.len(), 6);
        assert_eq!(
            lines_to_text(&lines),
            "Title\n• item one\n  • nested\n1. first\n\nplain"
        );
    }

    #[test]
    fn emphasis_is_bold_white() {
        let lines = render_reply("a **b** c");
        let spans = &lines[0].spans;
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[1].content, "b");
        assert_eq!(spans[1].style.fg, Some(Color::White));
        assert!(spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(spans[0].style.fg, None);
    }

    #[test]
    fn subheading_is_cyan() {
        let lines = render_reply("### Status");
        assert_eq!(lines[0].spans[0].style.fg, Some(Color::Cyan));
    }

    #[test]
    fn unterminated_bold_stays_literal() {
        let lines = render_reply("**unterminated bold");
        assert_eq!(lines_to_text(&lines), "**unterminated bold");
    }

    #[test]
    fn turns_prefix_user_input() {
        let turns = vec![
            ConversationTurn::user("status?"),
            ConversationTurn::model("### Ok\n* all good"),
        ];
        assert_eq!(
            lines_to_text(&render_turns(&turns)),
            "> status?\nOk\n• all good"
        );
    }
}
