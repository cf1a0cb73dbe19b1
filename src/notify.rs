//! The "tell the user / ask the user" collaborator.
//!
//! The controller only knows the `Notifier` trait. The TUI plugs in a
//! `ChannelNotifier`, which forwards notices to the event loop and waits for
//! the dialog answer on a oneshot channel. The headless subcommands plug in a
//! `ConsoleNotifier`, which prints and prompts on the standard streams.

use std::future::Future;
use std::io::{BufRead, Write};

use tokio::sync::{mpsc, oneshot};
use tracing::warn;

/// Confirm/alert capability used by the controller.
pub trait Notifier: Send + Sync {
    fn notify_error(&self, title: &str, message: &str);

    fn notify_success(&self, title: &str, message: &str);

    /// Ask a yes/no question. Anything other than an explicit yes is `false`.
    fn confirm(&self, title: &str, message: &str) -> impl Future<Output = bool> + Send;
}

// ── TUI notifier ─────────────────────────────────────────────────────────────

/// A notice on its way from the controller task to the UI event loop.
#[derive(Debug)]
pub enum Notice {
    Error { title: String, message: String },
    Success { title: String, message: String },
    /// The UI shows a modal and answers through `reply`.
    Confirm {
        title: String,
        message: String,
        reply: oneshot::Sender<bool>,
    },
}

/// `Notifier` that hands every notice to the UI over an unbounded channel.
///
/// Unbounded because notices are rare and the sender must never block the
/// controller while the UI is busy drawing.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notice>,
}

impl ChannelNotifier {
    pub fn new(tx: mpsc::UnboundedSender<Notice>) -> Self {
        Self { tx }
    }

    fn send(&self, notice: Notice) {
        if self.tx.send(notice).is_err() {
            warn!("notice dropped: UI channel closed");
        }
    }
}

impl Notifier for ChannelNotifier {
    fn notify_error(&self, title: &str, message: &str) {
        self.send(Notice::Error {
            title: title.to_string(),
            message: message.to_string(),
        });
    }

    fn notify_success(&self, title: &str, message: &str) {
        self.send(Notice::Success {
            title: title.to_string(),
            message: message.to_string(),
        });
    }

    async fn confirm(&self, title: &str, message: &str) -> bool {
        let (reply, answer) = oneshot::channel();
        self.send(Notice::Confirm {
            title: title.to_string(),
            message: message.to_string(),
            reply,
        });
        // A dropped reply (UI gone, dialog discarded) counts as "no".
        answer.await.unwrap_or(false)
    }
}

// ── Console notifier ─────────────────────────────────────────────────────────

/// `Notifier` for the headless subcommands.
#[derive(Debug, Clone, Default)]
pub struct ConsoleNotifier {
    /// Answer every confirmation with yes (`--yes`).
    pub assume_yes: bool,
}

impl ConsoleNotifier {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify_error(&self, title: &str, message: &str) {
        eprintln!("{title} {message}");
    }

    fn notify_success(&self, title: &str, message: &str) {
        println!("{title} {message}");
    }

    async fn confirm(&self, title: &str, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        let prompt = format!("{title} {message} [y/N] ");
        // Reading stdin blocks, so keep it off the async worker threads.
        tokio::task::spawn_blocking(move || prompt_yes_no(&prompt))
            .await
            .unwrap_or(false)
    }
}

fn prompt_yes_no(prompt: &str) -> bool {
    let mut stdout = std::io::stdout();
    if write!(stdout, "{prompt}").and_then(|_| stdout.flush()).is_err() {
        return false;
    }
    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line).is_err() {
        return false;
    }
    is_yes(&line)
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

// ── Tests ────────────────────────────────────────────────────────────────────
