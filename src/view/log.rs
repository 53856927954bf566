//! Event log lines, colored by category.

use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::eventlog::{EventCategory, EventLogEntry};

/// Cluster events are blue, model events green, the rest muted.
pub fn category_color(category: EventCategory) -> Color {
    match category {
        EventCategory::Cluster => Color::Blue,
        EventCategory::Model => Color::Green,
        _ => Color::DarkGray,
    }
}

pub fn log_line(entry: &EventLogEntry) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("[{}] ", entry.clock()),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            format!("[{}] {}", entry.category, entry.message),
            Style::default().fg(category_color(entry.category)),
        ),
    ])
}

pub fn log_lines(entries: &[EventLogEntry]) -> Vec<Line<'static>> {
    entries.iter().map(log_line).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::lines_to_text;

    fn entry(category: EventCategory, message: &str) -> EventLogEntry {
        EventLogEntry {
            at_millis: 3_723_000,
            category,
            message: message.into(),
        }
    }

    #[test]
    fn line_matches_display() {
        let e = entry(EventCategory::Cluster, "Re-scaling nodes to 6...");
        assert_eq!(
            lines_to_text(&[log_line(&e)]),
            "[01:02:03] [CLUSTER] Re-scaling nodes to 6..."
        );
        assert_eq!(lines_to_text(&[log_line(&e)]), e.to_string());
    }

    #[test]
    fn colors_by_category() {
        let cluster = log_line(&entry(EventCategory::Cluster, "x"));
        let model = log_line(&entry(EventCategory::Model, "x"));
        let error = log_line(&entry(EventCategory::Error, "x"));
        assert_eq!(cluster.spans[1].style.fg, Some(Color::Blue));
        assert_eq!(model.spans[1].style.fg, Some(Color::Green));
        assert_eq!(error.spans[1].style.fg, Some(Color::DarkGray));
    }
}
