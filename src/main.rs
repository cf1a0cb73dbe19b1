//! cardkeep: manage saved credit cards from the terminal.
//!
//! This is the crate root. It declares the module tree, defines the CLI, sets
//! up logging, and either runs one headless subcommand or the interactive
//! terminal UI.
//!
//! ## Module structure
//!
//! - `card`: Card data model (form fields, field errors, saved records)
//! - `validation`: Keystroke formatting and submit-time validation rules
//! - `error`: Repository error types
//! - `repository`: `CardRepository` trait and the HTTP implementation
//! - `notify`: Alert/confirm collaborator (`Notifier`) for TUI and console
//! - `controller`: Form state machine, run as its own task in the TUI
//! - `app`: TUI interaction state and key dispatch
//! - `ui`: Rendering
//! - `theme`: Dark/light palettes

// ── Module declarations ─────────────────────────────────────────────────────
// `mod` declarations tell Rust to look for a file named `<name>.rs` in the
// `src/` directory and include it as a child module of the crate root.
mod app;
mod card;
mod controller;
mod error;
mod notify;
mod repository;
mod theme;
mod ui;
mod validation;

// ── Imports ─────────────────────────────────────────────────────────────────

use std::io::Stdout;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

// `anyhow::Context` adds `.context("...")` to any `Result`, wrapping the
// underlying error with a human-readable explanation of what was being done.
use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use crossterm::{
    event::{Event as TermEvent, EventStream, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
// `StreamExt` adds `.next()` to the crossterm `EventStream`.
use n0_future::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::{mpsc, watch};
use tokio::time::interval;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use app::App;
use card::Field;
use controller::{DeleteOutcome, FormController, FormState, SubmitOutcome};
use notify::{ChannelNotifier, ConsoleNotifier, Notice};
use repository::{ApiConfig, HttpCardRepository, parse_base_url};
use ui::ui;

const DEFAULT_API_URL: &str = "http://localhost:5000/api/";

// ── CLI ──────────────────────────────────────────────────────────────────────

/// The top-level CLI struct.
///
/// Every flag can also come from the environment (`env = ...`), so a wrapper
/// script can point the client at another server without extra arguments.
/// With no subcommand the interactive UI starts.
#[derive(Parser)]
#[command(name = "cardkeep", version, about = "Manage saved credit cards from the terminal")]
struct Cli {
    /// Base URL of the card API
    ///
    /// `value_parser` runs `parse_base_url` on the raw string, so an invalid
    /// URL is rejected by clap with a normal usage error.
    #[arg(long, env = "CARDKEEP_API_URL", default_value = DEFAULT_API_URL, value_parser = parse_base_url)]
    api_url: String,

    /// Per-request timeout in seconds (no timeout when unset)
    #[arg(long, env = "CARDKEEP_REQUEST_TIMEOUT", value_name = "SECS")]
    request_timeout: Option<u64>,

    /// Log file used by the interactive UI
    #[arg(long, env = "CARDKEEP_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `cardkeep=trace` (RUST_LOG wins when set)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

/// Headless subcommands. Each runs the same controller as the UI, with a
/// console notifier in place of the on-screen banner and dialog.
#[derive(clap::Subcommand)]
enum Command {
    /// Print the saved cards
    List,
    /// Validate and save a new card
    Add {
        /// Card number (16 digits, spaces optional)
        #[arg(long)]
        number: String,
        /// Expiry date as MM/YY
        #[arg(long)]
        expiry: String,
        /// Cardholder name
        #[arg(long)]
        name: String,
        /// 3-digit security code
        #[arg(long)]
        cvv: String,
    },
    /// Delete a saved card
    Delete {
        /// Id of the card to delete
        id: String,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

// ── Main ─────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ApiConfig::new(cli.api_url.clone())
        .with_timeout(cli.request_timeout.map(Duration::from_secs));
    let repo = HttpCardRepository::new(&config).context("failed to build the HTTP client")?;

    match cli.command {
        Some(command) => {
            // Headless: stdout carries the output, so logs go to stderr.
            init_stderr_logging(&cli.log_level)?;
            run_headless(command, repo).await
        }
        None => {
            // The UI owns the terminal; logs go to a file instead.
            let log_path = cli
                .log_file
                .or_else(default_log_path)
                .context("no platform data directory; pass --log-file")?;
            // The guard flushes buffered log lines when it is dropped, so it
            // must live until the session ends.
            let _guard = init_file_logging(&log_path, &cli.log_level)?;
            info!(api = %config.base_url, "starting interactive session");
            let result = run_tui(repo).await;
            if let Err(err) = &result {
                error!(error = %err, "interactive session failed");
            }
            info!("session ended");
            result
        }
    }
}

// ── Logging ──────────────────────────────────────────────────────────────────

/// `<data dir>/cardkeep/cardkeep.log`
fn default_log_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("cardkeep").join("cardkeep.log"))
}

/// `RUST_LOG` when set, otherwise the `--log-level` value.
fn env_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).with_context(|| format!("invalid log filter `{level}`")),
    }
}

fn init_stderr_logging(level: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level)?)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!(e))
}

fn init_file_logging(path: &Path, level: &str) -> Result<WorkerGuard> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    let file_name = path
        .file_name()
        .with_context(|| format!("log path {} has no file name", path.display()))?;

    // `rolling::never` appends to one file forever; `non_blocking` moves the
    // writes onto a worker thread.
    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level)?)
        .with_ansi(false)
        .with_writer(writer)
        .try_init()
        .map_err(|e| anyhow!(e))?;
    Ok(guard)
}

// ── Headless subcommands ─────────────────────────────────────────────────────

async fn run_headless(command: Command, repo: HttpCardRepository) -> Result<()> {
    match command {
        Command::List => {
            let controller = FormController::new(repo, ConsoleNotifier::new(false));
            if !controller.load_cards().await {
                bail!("could not load the saved cards");
            }
            let state = controller.snapshot();
            if state.saved.is_empty() {
                println!("No saved cards");
            }
            for card in &state.saved {
                println!(
                    "{:<8} {}  {}  {}",
                    card.id,
                    card.masked_number(),
                    card.expiry_date,
                    card.cardholder_name
                );
            }
            Ok(())
        }

        Command::Add {
            number,
            expiry,
            name,
            cvv,
        } => {
            let controller = FormController::new(repo, ConsoleNotifier::new(false));
            // Same normalization path as typing into the form.
            controller.change(Field::CardNumber, &number);
            controller.change(Field::ExpiryDate, &expiry);
            controller.change(Field::CardholderName, &name);
            controller.change(Field::Cvv, &cvv);

            match controller.submit().await {
                SubmitOutcome::Saved(card) => {
                    println!("id: {}", card.id);
                    Ok(())
                }
                SubmitOutcome::Invalid => {
                    let state = controller.snapshot();
                    for (field, message) in state.errors.iter() {
                        eprintln!("  {}: {message}", field.label());
                    }
                    bail!("card not saved: invalid input")
                }
                SubmitOutcome::Failed => bail!("card not saved"),
            }
        }

        Command::Delete { id, yes } => {
            let controller = FormController::new(repo, ConsoleNotifier::new(yes));
            match controller.delete_card(&id).await {
                DeleteOutcome::Deleted => Ok(()),
                DeleteOutcome::Declined => {
                    println!("Nothing deleted.");
                    Ok(())
                }
                DeleteOutcome::Failed => bail!("card {id} was not deleted"),
            }
        }
    }
}

// ── Interactive UI ───────────────────────────────────────────────────────────

type Term = Terminal<CrosstermBackend<Stdout>>;

/// Run the full-screen UI until the user quits.
///
/// Three tasks' worth of plumbing meet here:
/// - the controller task receives `controller::Command`s over an unbounded
///   mpsc channel, applies edits on the spot and spawns a task per request,
/// - it publishes every state change on a `watch` channel,
/// - and it reaches the user through `Notice`s on an unbounded channel.
async fn run_tui(repo: HttpCardRepository) -> Result<()> {
    let (notice_tx, notice_rx) = mpsc::unbounded_channel::<Notice>();
    // Unbounded so a key press never waits on the controller.
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<controller::Command>();

    let controller = Arc::new(FormController::new(repo, ChannelNotifier::new(notice_tx)));
    let state_rx = controller.subscribe();
    let worker = tokio::spawn(controller.run(cmd_rx));

    // ── Terminal setup ───────────────────────────────────────────────────────
    enable_raw_mode()?;
    execute!(std::io::stdout(), EnterAlternateScreen)?;

    let result = match Terminal::new(CrosstermBackend::new(std::io::stdout())) {
        Ok(mut terminal) => event_loop(&mut terminal, state_rx, notice_rx, cmd_tx).await,
        Err(err) => Err(err.into()),
    };

    // ── Restore terminal ─────────────────────────────────────────────────────
    // Runs whether or not the loop failed, so an error never leaves the
    // user's shell in raw mode.
    let restored = disable_raw_mode()
        .and_then(|()| execute!(std::io::stdout(), LeaveAlternateScreen))
        .context("failed to restore the terminal");

    // Requests still in flight are dropped along with the task.
    worker.abort();

    result.and(restored)
}

async fn event_loop(
    terminal: &mut Term,
    mut state_rx: watch::Receiver<FormState>,
    mut notice_rx: mpsc::UnboundedReceiver<Notice>,
    cmd_tx: mpsc::UnboundedSender<controller::Command>,
) -> Result<()> {
    let mut app = App::new();
    let mut events = EventStream::new();
    // Redraw tick; also expires the footer banner.
    let mut tick = interval(Duration::from_millis(50));

    loop {
        // Clone the snapshot so no watch lock is held across the `select!`.
        let state = state_rx.borrow_and_update().clone();
        app.clamp_selection(state.saved.len());
        terminal.draw(|f| ui(f, &app, &state))?;

        tokio::select! {
            ev = events.next() => match ev {
                // Only presses; some platforms also report releases.
                Some(Ok(TermEvent::Key(key))) if key.kind == KeyEventKind::Press => {
                    if let Some(command) = app.handle_key(key, &state) {
                        cmd_tx.send(command).context("controller task stopped")?;
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err).context("reading terminal events"),
                None => break,
            },

            Some(notice) = notice_rx.recv() => {
                app.push_notice(notice, Instant::now());
            }

            changed = state_rx.changed() => {
                // The sender lives inside the controller task, so this only
                // fails if that task is gone.
                changed.context("controller task stopped")?;
            }

            _ = tick.tick() => {
                app.expire_banner(Instant::now());
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
