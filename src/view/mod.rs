//! Presentation: turns console state into styled ratatui `Line`s.
//!
//! The lines can be placed in a ratatui `Paragraph` or written straight to
//! a plain terminal with `write_lines`, which is what the REPL does.

pub mod blocks;
pub mod catalog;
pub mod log;

use std::io::{self, Write};

use crossterm::queue;
use crossterm::style::{Attribute, Print, ResetColor, SetAttribute, SetForegroundColor};
use ratatui::backend::IntoCrossterm;
use ratatui::style::Modifier;
use ratatui::text::Line;

pub use blocks::{render_blocks, render_reply, render_turns};
pub use catalog::{model_row, model_rows, workspace_header};
pub use log::{category_color, log_line, log_lines};

/// Plain text of the lines, one per row, styling dropped.
pub fn lines_to_text(lines: &[Line]) -> String {
    lines
        .iter()
        .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write styled lines to a terminal using ANSI escapes.
pub fn write_lines<W: Write>(out: &mut W, lines: &[Line]) -> io::Result<()> {
    for line in lines {
        for span in &line.spans {
            if let Some(fg) = span.style.fg {
                queue!(out, SetForegroundColor(fg.into_crossterm()))?;
            }
            if span.style.add_modifier.contains(Modifier::BOLD) {
                queue!(out, SetAttribute(Attribute::Bold))?;
            }
            if span.style.add_modifier.contains(Modifier::UNDERLINED) {
                queue!(out, SetAttribute(Attribute::Underlined))?;
            }
            queue!(
                out,
                Print(span.content.as_ref()),
                SetAttribute(Attribute::Reset),
                ResetColor
            )?;
        }
        queue!(out, Print("\n"))?;
    }
    out.flush()
}
