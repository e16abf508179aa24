//! Terminal chat front-end for the parley persona variants.
//!
//! A vim-style terminal interface for chatting with a Gemini-backed persona:
//! the Clone mimic, the Echo style cloner, and two Dungeon Master bots.
//!
//! # Headless Mode
//!
//! Run with `--headless` for a line-oriented interface suitable for scripting:
//!
//! ```bash
//! cargo run -p parley -- --variant solo --headless
//! ```

mod ai_worker;
mod app;
mod commands;
mod config;
mod events;
mod headless;
mod ui;

use std::io::{self, stdout};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use gemini::Gemini;
use parley_core::{ChatSession, Variant};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use ai_worker::{spawn_worker, WorkerRequest};
use app::App;
use config::Config;
use events::{handle_event, EventResult};
use ui::render::render;

/// Chat with a Gemini-backed persona in the terminal.
#[derive(Debug, Parser)]
#[command(name = "parley", version, about)]
struct Args {
    /// Which persona to run: clone, echo, party or solo
    #[arg(short, long, default_value = "clone")]
    variant: Variant,

    /// Run in headless mode (text-only, no TUI)
    #[arg(long)]
    headless: bool,

    /// Model to use instead of the variant's default
    #[arg(short, long)]
    model: Option<String>,

    /// Transcript messages sent to the echo persona as context
    #[arg(long)]
    history_window: Option<usize>,

    /// Seed for the dice roller (reproducible rolls)
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // ── 1. Configuration ───────────────────────────────────────────────────────
    let mut cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    if let Some(model) = args.model.clone() {
        cfg.model = Some(model);
    }
    if let Some(window) = args.history_window {
        if window == 0 {
            eprintln!("Error: --history-window must be at least 1");
            std::process::exit(1);
        }
        cfg.history_window = window;
    }

    let api_key = match cfg.api_key() {
        Ok(key) => key.to_string(),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    // The TUI owns the terminal, so it logs to a file instead of stderr.
    let _guard = init_tracing(&cfg, args.headless)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        variant = %args.variant,
        headless = args.headless,
        "parley starting"
    );

    // ── 3. Session ─────────────────────────────────────────────────────────────
    let model_name = cfg.model_for(args.variant);
    let client = Gemini::new(api_key)
        .context("failed to create Gemini client")?
        .with_model(model_name.clone());

    let mut session_config = cfg.session_config(args.variant);
    if let Some(seed) = args.seed {
        session_config = session_config.with_dice_seed(seed);
    }
    let session = ChatSession::new(session_config, Arc::new(client));
    info!(session_id = %session.id(), model = %model_name, "session ready");

    // ── 4. Front-end ───────────────────────────────────────────────────────────
    if args.headless {
        headless::run_headless_stdio(session).await?;
        info!("parley stopped");
        return Ok(());
    }

    let (request_tx, response_rx, initial_view) = spawn_worker(session);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let app = App::new(request_tx.clone(), response_rx, initial_view);
    let result = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    let _ = request_tx.send(WorkerRequest::Shutdown).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
    }

    info!("parley stopped");
    Ok(())
}

/// Install the global subscriber. Returns the file writer's guard, which
/// must be held until exit so buffered lines are flushed.
fn init_tracing(cfg: &Config, headless: bool) -> anyhow::Result<Option<WorkerGuard>> {
    // Build the log-level filter, warning loudly if the configured value is
    // not a valid tracing filter expression.
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: PARLEY_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);

    if headless {
        subscriber.with_writer(io::stderr).init();
        return Ok(None);
    }

    let path = Path::new(&cfg.log_file);
    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .with_context(|| format!("PARLEY_LOG_FILE='{}' has no file name", cfg.log_file))?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    subscriber.with_writer(writer).with_ansi(false).init();
    Ok(Some(guard))
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, mut app: App) -> io::Result<()> {
    loop {
        // Apply whatever the worker has produced since the last frame
        app.poll_worker();

        // Render
        terminal.draw(|f| render(f, &app))?;

        // Poll for events with timeout for animations
        if event::poll(Duration::from_millis(100))? {
            let ev = event::read()?;
            if handle_event(&mut app, ev) == EventResult::Quit {
                return Ok(());
            }
        } else {
            // Tick animations
            app.tick();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
