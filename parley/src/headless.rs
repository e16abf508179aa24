//! Headless mode for the chat variants.
//!
//! A line-oriented interface for scripted runs and terminals without a TUI:
//! - Lines starting with `/` are commands (`/help` lists them)
//! - Any other line is sent as chat input
//! - Output lines are tagged `[STATUS]`, `[ROLL]`, `[ERROR]` or with the
//!   speaker's role

use std::io::{self, BufRead, Write};

use parley_core::persona::PARTY_INTRO;
use parley_core::{ChatMessage, ChatSession, Progress, Role, SessionEvent, SessionView, SheetField};
use tracing::debug;

use crate::commands::{parse_command, Command, COMMAND_HELP};

/// Run the session against stdin and stdout.
pub async fn run_headless_stdio(session: ChatSession) -> io::Result<()> {
    run_headless(session, io::stdin().lock(), io::stdout()).await
}

/// Run the session against arbitrary input and output streams.
pub async fn run_headless<R, W>(mut session: ChatSession, input: R, mut output: W) -> io::Result<()>
where
    R: BufRead,
    W: Write + Send,
{
    print_header(&session.view(), &mut output)?;

    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event = if line.starts_with('/') {
            match parse_command(line) {
                Ok(Command::Quit) => {
                    writeln!(output, "Goodbye!")?;
                    break;
                }
                Ok(Command::Help) => {
                    print_help(&mut output)?;
                    continue;
                }
                Ok(Command::Status) => {
                    print_status(&session.view(), &mut output)?;
                    continue;
                }
                Ok(Command::Event(event)) => event,
                Err(e) => {
                    writeln!(output, "[ERROR] {e}. Type /help for help.")?;
                    continue;
                }
            }
        } else {
            SessionEvent::Submit(line.to_string())
        };

        handle_event(&mut session, event, &mut output).await?;
        output.flush()?;
    }

    Ok(())
}

async fn handle_event<W: Write + Send>(
    session: &mut ChatSession,
    event: SessionEvent,
    output: &mut W,
) -> io::Result<()> {
    debug!(event = event.name(), "headless event");
    let variant = session.variant();
    let echoes_input = matches!(event, SessionEvent::Submit(_));
    let is_roll = matches!(event, SessionEvent::Roll(_));
    let shown_before = session.transcript().len();

    let mut streamed = false;
    let mut write_error = None;
    let result = session
        .handle(event, |progress| {
            if let Progress::Fragment(text) = progress {
                let written = if streamed {
                    write!(output, "{text}")
                } else {
                    write!(output, "[{}] {text}", Role::Assistant.label())
                };
                if let Err(e) = written.and_then(|()| output.flush()) {
                    write_error.get_or_insert(e);
                }
                streamed = true;
            }
        })
        .await;
    if let Some(e) = write_error {
        return Err(e);
    }
    if streamed {
        writeln!(output)?;
    }

    let view = session.view();
    match result {
        Ok(()) => {
            if is_roll {
                if let Some(roll) = &view.last_roll {
                    writeln!(output, "[ROLL] {} ({})", roll.label(), roll.trace())?;
                }
            }
            if let Some(notice) = &view.notice {
                writeln!(output, "[STATUS] {notice}")?;
            }

            // A shorter transcript means it was cleared
            let start = if view.messages.len() < shown_before {
                writeln!(output, "[STATUS] Chat cleared.")?;
                0
            } else {
                shown_before
            };
            let mut new_messages: &[ChatMessage] = &view.messages[start..];
            if streamed {
                if let Some((last, rest)) = new_messages.split_last() {
                    if last.role == Role::Assistant {
                        new_messages = rest;
                    }
                }
            }
            for message in new_messages {
                if echoes_input && message.role == Role::User {
                    continue;
                }
                print_message(message, output)?;
            }
        }
        Err(e) => writeln!(output, "[ERROR] {}", e.user_message(variant))?,
    }

    Ok(())
}

fn print_message<W: Write>(message: &ChatMessage, output: &mut W) -> io::Result<()> {
    writeln!(output, "[{}]", message.role.label())?;
    for paragraph in message.content.split("\n\n") {
        writeln!(output, "{paragraph}")?;
    }
    writeln!(output)
}

fn print_header<W: Write>(view: &SessionView, output: &mut W) -> io::Result<()> {
    writeln!(output, "=== {} (headless) ===", view.variant.title())?;
    writeln!(output, "Model: {}", view.model)?;
    writeln!(output)?;
    print_help(output)?;
    writeln!(output)?;

    if view.show_intro {
        writeln!(output, "{PARTY_INTRO}")?;
        writeln!(output, "Type /begin to begin the adventure.")?;
        writeln!(output)?;
    }
    writeln!(output, "{}", view.variant.input_hint(view.training_active))?;
    output.flush()
}

fn print_help<W: Write>(output: &mut W) -> io::Result<()> {
    writeln!(output, "Commands:")?;
    for (usage, description) in COMMAND_HELP {
        writeln!(output, "  /{usage:<18} - {description}")?;
    }
    writeln!(output, "  (anything else is sent as chat input)")
}

fn print_status<W: Write>(view: &SessionView, output: &mut W) -> io::Result<()> {
    writeln!(output, "[STATUS]")?;
    writeln!(output, "  Variant: {}", view.variant)?;
    writeln!(output, "  Model: {}", view.model)?;
    writeln!(output, "  Messages: {}", view.messages.len())?;
    writeln!(output, "  Tone: {}", view.tone.name())?;

    match view.variant {
        parley_core::Variant::Echo => {
            let account = view.username.as_deref().unwrap_or("(not signed in)");
            writeln!(output, "  Account: {account}")?;
            writeln!(output, "  Training: {}", view.training_active)?;
            writeln!(output, "  Style profile: {}", view.profile)?;
        }
        parley_core::Variant::Party => {
            writeln!(output, "  Adventure started: {}", view.game_started)?;
            writeln!(output, "  Last roll: {}", view.last_roll_label())?;
        }
        parley_core::Variant::Solo => {
            writeln!(output, "  Last roll: {}", view.last_roll_label())?;
            writeln!(output, "  Roll details: {}", view.roll_details())?;
            for field in SheetField::ALL {
                writeln!(output, "  {}: {}", field.label(), view.sheet.get(field))?;
            }
        }
        parley_core::Variant::Clone => {}
    }
    Ok(())
}
