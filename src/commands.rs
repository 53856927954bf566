//! Console commands for the line-oriented REPL.
//!
//! One command per input line. Lines that do not start with a known
//! command word are rejected; chat text goes through `send`.

/// A known command with its help text.
#[derive(Debug, PartialEq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub usage: &'static str,
    pub description: &'static str,
}

/// All known commands, in help order.
pub static COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "list",
        aliases: &["ls"],
        usage: "list",
        description: "Show the catalog with live status",
    },
    CommandSpec {
        name: "deploy",
        aliases: &[],
        usage: "deploy <id>",
        description: "Provision an idle model",
    },
    CommandSpec {
        name: "open",
        aliases: &[],
        usage: "open <id>",
        description: "Open the workspace of an active model",
    },
    CommandSpec {
        name: "close",
        aliases: &["back"],
        usage: "close",
        description: "Return to the catalog; the deployment keeps running",
    },
    CommandSpec {
        name: "scale",
        aliases: &[],
        usage: "scale [id]",
        description: "Add nodes (defaults to the open workspace)",
    },
    CommandSpec {
        name: "terminate",
        aliases: &["kill"],
        usage: "terminate [id]",
        description: "Tear down a deployment",
    },
    CommandSpec {
        name: "send",
        aliases: &["say"],
        usage: "send <text>",
        description: "Send a message to the open workspace",
    },
    CommandSpec {
        name: "logs",
        aliases: &[],
        usage: "logs [id]",
        description: "Show the event log",
    },
    CommandSpec {
        name: "status",
        aliases: &[],
        usage: "status",
        description: "Show the open workspace",
    },
    CommandSpec {
        name: "advice",
        aliases: &[],
        usage: "advice <tier> <dataset...>",
        description: "Fine-tuning tips for a model tier and dataset",
    },
    CommandSpec {
        name: "help",
        aliases: &["?"],
        usage: "help",
        description: "List available commands",
    },
    CommandSpec {
        name: "quit",
        aliases: &["exit"],
        usage: "quit",
        description: "Leave the console",
    },
];

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Deploy(String),
    Open(String),
    Close,
    Scale(Option<String>),
    Terminate(Option<String>),
    Send(String),
    Logs(Option<String>),
    Status,
    Advice { tier: String, dataset: String },
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command: {0} (try `help`)")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}

fn lookup(word: &str) -> Option<&'static CommandSpec> {
    COMMANDS
        .iter()
        .find(|c| c.name == word || c.aliases.contains(&word))
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let spec = lookup(word).ok_or_else(|| CommandError::Unknown(word.to_string()))?;
    let arg = (!rest.is_empty()).then(|| rest.to_string());
    let required = |arg: Option<String>| arg.ok_or(CommandError::Usage(spec.usage));

    let command = match spec.name {
        "list" => Command::List,
        "deploy" => Command::Deploy(required(arg)?),
        "open" => Command::Open(required(arg)?),
        "close" => Command::Close,
        "scale" => Command::Scale(arg),
        "terminate" => Command::Terminate(arg),
        "send" => Command::Send(required(arg)?),
        "logs" => Command::Logs(arg),
        "status" => Command::Status,
        "advice" => {
            let (tier, dataset) = rest
                .split_once(char::is_whitespace)
                .ok_or(CommandError::Usage(spec.usage))?;
            Command::Advice {
                tier: tier.to_string(),
                dataset: dataset.trim().to_string(),
            }
        }
        "help" => Command::Help,
        _ => Command::Quit,
    };
    Ok(Some(command))
}
