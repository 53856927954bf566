use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use inference_console::commands::{self, Command, COMMANDS};
use inference_console::config::ConsoleConfig;
use inference_console::lifecycle::DeploymentController;
use inference_console::navigator::{CatalogNavigator, ConsoleError};
use inference_console::provider::anthropic::AnthropicProvider;
use inference_console::provider::{AdviceProvider, InferenceProvider, OfflineProvider};
use inference_console::session::SendOutcome;
use inference_console::view;

#[derive(Parser)]
#[command(
    name = "inference-console",
    about = "Deploy, scale and chat with hosted inference models."
)]
struct Cli {
    /// Config file (defaults to ~/.inference-console/console.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("inference_console=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = ConsoleConfig::load(cli.config.as_deref())?;
    let catalog = Arc::new(config.build_catalog()?);
    let controller = DeploymentController::new(catalog, config.lifecycle.clone());

    let (inference, advice) = match AnthropicProvider::from_settings(&config.provider) {
        Ok(provider) => {
            info!(model = provider.model(), "inference provider ready");
            shared(provider)
        }
        Err(e) => {
            warn!("running offline: {e}");
            shared(OfflineProvider::new(e.to_string()))
        }
    };

    let navigator = CatalogNavigator::new(controller, inference, advice);
    info!(models = navigator.models().len(), "inference console ready");
    show(&view::model_rows(&navigator.models()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt(&navigator);
    while let Some(line) = lines.next_line().await? {
        match commands::parse(&line) {
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => run(&navigator, command).await,
            Ok(None) => {}
            Err(e) => error(&e.to_string()),
        }
        prompt(&navigator);
    }
    Ok(())
}

async fn run(navigator: &CatalogNavigator, command: Command) {
    let result = match command {
        Command::List => {
            show(&view::model_rows(&navigator.models()));
            Ok(())
        }
        Command::Deploy(id) => navigator.deploy(&id),
        Command::Open(id) => navigator.open(&id).map(|_| status(navigator)),
        Command::Close => {
            navigator.close();
            Ok(())
        }
        Command::Scale(id) => match target(navigator, id) {
            Some(id) => navigator.scale(&id),
            None => Err(ConsoleError::NoWorkspaceOpen),
        },
        Command::Terminate(id) => match target(navigator, id) {
            Some(id) => navigator.terminate(&id),
            None => Err(ConsoleError::NoWorkspaceOpen),
        },
        Command::Send(text) => {
            let nav = navigator.clone();
            let log = navigator
                .selected()
                .and_then(|id| navigator.controller().event_log(&id).ok().flatten());
            let mark = log.as_ref().map_or(0, |log| log.len());
            tokio::spawn(async move {
                match nav.send(&text).await {
                    Ok(SendOutcome::Replied(turn)) => show(&view::render_reply(&turn.text)),
                    Ok(SendOutcome::ProviderFailed(reason)) => error(&reason),
                    Ok(SendOutcome::Signal) => {
                        if let Some(log) = log {
                            show(&view::log_lines(&log.entries_since(mark)));
                        }
                    }
                    Ok(SendOutcome::Discarded) => {}
                    Err(e) => error(&e.to_string()),
                }
            });
            Ok(())
        }
        Command::Logs(id) => {
            let entries = match id.or_else(|| navigator.selected()) {
                Some(id) => navigator
                    .controller()
                    .event_log(&id)
                    .map(|log| log.map(|l| l.entries()).unwrap_or_default())
                    .map_err(Into::into),
                None => Err(ConsoleError::NoWorkspaceOpen),
            };
            entries.map(|entries| show(&view::log_lines(&entries)))
        }
        Command::Status => {
            status(navigator);
            Ok(())
        }
        Command::Advice { tier, dataset } => {
            let tips = navigator.advice(&tier, &dataset).await;
            if tips.is_empty() {
                error("no advice available");
            }
            for tip in tips {
                show(&[
                    Line::from(Span::styled(
                        tip.title,
                        Style::default().fg(Color::Cyan),
                    )),
                    Line::from(tip.content),
                ]);
            }
            Ok(())
        }
        Command::Help => {
            let rows: Vec<Line> = COMMANDS
                .iter()
                .map(|c| Line::from(format!("{:<28}{}", c.usage, c.description)))
                .collect();
            show(&rows);
            Ok(())
        }
        Command::Quit => Ok(()),
    };
    if let Err(e) = result {
        error(&e.to_string());
    }
}

/// One provider behind both trait objects.
fn shared<P>(provider: P) -> (Arc<dyn InferenceProvider>, Arc<dyn AdviceProvider>)
where
    P: InferenceProvider + AdviceProvider + 'static,
{
    let provider = Arc::new(provider);
    (provider.clone(), provider)
}

/// Explicit id, or the open workspace's model.
fn target(navigator: &CatalogNavigator, id: Option<String>) -> Option<String> {
    id.or_else(|| navigator.selected())
}

fn status(navigator: &CatalogNavigator) {
    match navigator.workspace() {
        Some(ws) => {
            let mut lines = view::workspace_header(&ws.model, ws.instance.as_ref());
            lines.push(Line::default());
            lines.extend(view::render_turns(&ws.session.turns));
            if ws.session.awaiting {
                lines.push(Line::from(Span::styled(
                    "thinking...",
                    Style::default().fg(Color::DarkGray),
                )));
            }
            show(&lines);
        }
        None => show(&view::model_rows(&navigator.models())),
    }
}

fn prompt(navigator: &CatalogNavigator) {
    let label = navigator.selected().unwrap_or_else(|| "catalog".into());
    let mut out = std::io::stdout().lock();
    let _ = write!(out, "{label}> ");
    let _ = out.flush();
}

fn show(lines: &[Line]) {
    if let Err(e) = view::write_lines(&mut std::io::stdout().lock(), lines) {
        warn!("failed to write to terminal: {e}");
    }
}

fn error(message: &str) {
    show(&[Line::from(Span::styled(
        message.to_string(),
        Style::default().fg(Color::Red),
    ))]);
}
