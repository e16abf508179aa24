//! Command-line parsing shared by the TUI (`:cmd`) and headless mode (`/cmd`).

use parley_core::{DiceRequest, SessionEvent, SheetField, Tone};
use thiserror::Error;

/// A parsed command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Quit,
    Help,
    /// Print the session state (headless only; the TUI shows it in the sidebar).
    Status,
    Event(SessionEvent),
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("{0}")]
    Invalid(String),
}

/// One line per command, shown by `:help` and in headless mode.
pub const COMMAND_HELP: [(&str, &str); 13] = [
    ("q", "Quit"),
    ("help", "Show this help"),
    ("status", "Show the session state"),
    ("reset", "Clear the chat"),
    ("roll 4d6dl1", "Roll dice (NdS, optional dlK drops the lowest K)"),
    ("login USER PASS", "Sign in to load your style profile (echo)"),
    ("logout", "Sign out (echo)"),
    ("train", "Start a training scenario (echo)"),
    ("endtrain", "End the training scenario (echo)"),
    ("begin", "Begin the adventure (party)"),
    ("rules", "Show or hide the rules"),
    ("tone NAME", "Friendly, Formal or Funny (clone, echo)"),
    ("sheet FIELD VALUE", "Edit the character sheet (solo)"),
];

/// Parse a command. A leading `:` or `/` is optional.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    let line = line
        .strip_prefix(':')
        .or_else(|| line.strip_prefix('/'))
        .unwrap_or(line);

    let mut parts = line.split_whitespace();
    let Some(name) = parts.next() else {
        return Err(CommandError::Usage(":help"));
    };
    let args: Vec<&str> = parts.collect();

    let event = match name.to_lowercase().as_str() {
        "q" | "quit" | "exit" => return Ok(Command::Quit),
        "help" | "h" => return Ok(Command::Help),
        "status" => return Ok(Command::Status),
        "reset" | "new" => SessionEvent::Reset,
        "roll" | "r" => {
            if args.is_empty() {
                return Err(CommandError::Usage("roll NdS[dlK], e.g. roll d20 or roll 4d6dl1"));
            }
            let request = DiceRequest::parse(&args.concat())
                .map_err(|e| CommandError::Invalid(e.to_string()))?;
            SessionEvent::Roll(request)
        }
        "login" => match args.as_slice() {
            [username, password] => SessionEvent::Login {
                username: username.to_string(),
                password: password.to_string(),
            },
            _ => return Err(CommandError::Usage("login USERNAME PASSWORD")),
        },
        "logout" => SessionEvent::Logout,
        "train" => SessionEvent::StartTraining,
        "endtrain" => SessionEvent::EndTraining,
        "begin" => SessionEvent::BeginAdventure,
        "rules" => SessionEvent::ToggleRules,
        "tone" => match args.as_slice() {
            [name] => SessionEvent::SetTone(name.parse::<Tone>().map_err(CommandError::Invalid)?),
            _ => return Err(CommandError::Usage("tone friendly|formal|funny")),
        },
        "sheet" => match args.split_first() {
            Some((field, value)) if !value.is_empty() => {
                let field = field.parse::<SheetField>().map_err(CommandError::Invalid)?;
                SessionEvent::UpdateSheet(field, value.join(" "))
            }
            _ => return Err(CommandError::Usage("sheet name|race|class|details|hp VALUE")),
        },
        other => return Err(CommandError::Unknown(other.to_string())),
    };

    Ok(Command::Event(event))
}
