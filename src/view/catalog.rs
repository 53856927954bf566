//! Catalog rows and the workspace header.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::catalog::{DeploymentStatus, ModelRecord};
use crate::lifecycle::instance::InstanceSnapshot;

fn status_color(status: DeploymentStatus) -> Color {
    match status {
        DeploymentStatus::Idle => Color::DarkGray,
        DeploymentStatus::Deploying => Color::Yellow,
        DeploymentStatus::Active => Color::Green,
        DeploymentStatus::Failed => Color::Red,
    }
}

/// `m1  Core LLM v4  NLP  12ms  High Performance  Active`
pub fn model_row(record: &ModelRecord) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("{:<4}", record.id()),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            format!("{:<22}", record.name()),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("{:<9}", record.category().label())),
        Span::raw(format!("{:<7}", record.spec.latency)),
        Span::raw(format!("{:<20}", record.spec.tier)),
        Span::styled(
            record.status.to_string(),
            Style::default().fg(status_color(record.status)),
        ),
    ])
}

pub fn model_rows(records: &[ModelRecord]) -> Vec<Line<'static>> {
    records.iter().map(model_row).collect()
}

/// Header shown above an open workspace.
pub fn workspace_header(
    record: &ModelRecord,
    instance: Option<&InstanceSnapshot>,
) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(vec![
        Span::styled(
            record.name().to_string(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            record.status.to_string(),
            Style::default().fg(status_color(record.status)),
        ),
    ])];

    if let Some(instance) = instance {
        let mut state = format!(
            "Nodes: {}  Throughput: {:.1}k TPS",
            instance.nodes,
            instance.throughput_ktps()
        );
        if instance.scaling {
            state.push_str("  (scaling)");
        }
        if instance.terminating {
            state.push_str("  (terminating)");
        }
        lines.push(Line::from(Span::styled(
            state,
            Style::default().fg(Color::Blue),
        )));
        lines.push(Line::from(Span::styled(
            instance.endpoint.clone(),
            Style::default().fg(Color::DarkGray),
        )));
        lines.extend(instance.curl_example().lines().map(|row| {
            Line::from(Span::styled(row.to_string(), Style::default().fg(Color::Cyan)))
        }));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_models;
    use crate::view::lines_to_text;
    use uuid::Uuid;

    fn record(status: DeploymentStatus) -> ModelRecord {
        ModelRecord {
            spec: default_models().remove(0),
            status,
        }
    }

    #[test]
    fn row_contains_fields() {
        let text = lines_to_text(&[model_row(&record(DeploymentStatus::Active))]);
        assert!(text.starts_with("m1"));
        assert!(text.contains("Core LLM v4"));
        assert!(text.contains("NLP"));
        assert!(text.contains("12ms"));
        assert!(text.ends_with("Active"));
    }

    #[test]
    fn row_status_color() {
        let row = model_row(&record(DeploymentStatus::Deploying));
        assert_eq!(row.spans.last().unwrap().style.fg, Some(Color::Yellow));
    }

    #[test]
    fn header_with_instance() {
        let instance = InstanceSnapshot {
            instance_id: Uuid::new_v4(),
            model_id: "m1".into(),
            nodes: 6,
            scaling: true,
            terminating: false,
            endpoint: "https://api.adaptive.ai/v1/inference/m1".into(),
        };
        let text = lines_to_text(&workspace_header(
            &record(DeploymentStatus::Active),
            Some(&instance),
        ));
        assert!(text.contains("Nodes: 6  Throughput: 9.0k TPS  (scaling)"));
        assert!(text.contains("\nhttps://api.adaptive.ai/v1/inference/m1\n"));
        assert!(text.contains("curl -X POST https://api.adaptive.ai/v1/inference/m1 \\"));
        assert!(text.ends_with("-d '{\"input\": \"...\"}'"));
    }

    #[test]
    fn header_without_instance() {
        let lines = workspace_header(&record(DeploymentStatus::Idle), None);
        assert_eq!(lines.len(), 1);
    }
}
