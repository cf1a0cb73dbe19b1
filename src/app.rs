//! TUI interaction state and key dispatch.
//!
//! The controller owns the card data. `App` owns everything that only matters
//! to the terminal session: which pane and field have focus, which saved card
//! is highlighted, the open confirm dialog, the footer banner, and the theme.
//! Key presses that change card data are turned into `Command`s for the
//! controller task; everything else is handled here directly.

use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::oneshot;

use crate::card::Field;
use crate::controller::{Command, Edit, FormState};
use crate::notify::Notice;
use crate::theme::Theme;

/// How long a success or error banner stays in the footer.
pub const BANNER_TTL: Duration = Duration::from_secs(4);

// ── Focus ────────────────────────────────────────────────────────────────────

/// Which pane receives keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// The new-card form; `App::field` says which input.
    Form,
    /// The saved-card list; `App::selected` says which entry.
    Saved,
}

// ── Confirm dialog ───────────────────────────────────────────────────────────

/// A pending yes/no question from the controller.
///
/// The controller task is parked on the other end of `reply` until the user
/// answers, so the dialog must always be answered or dropped.
#[derive(Debug)]
pub struct ConfirmDialog {
    pub title: String,
    pub message: String,
    reply: oneshot::Sender<bool>,
}

impl ConfirmDialog {
    /// Send the answer back. The controller may already be gone (aborted on
    /// quit), in which case there is nobody to tell.
    fn answer(self, yes: bool) {
        let _ = self.reply.send(yes);
    }
}

// ── Banner ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Error,
    Success,
}

/// A transient notice shown in the footer in place of the key hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub title: String,
    pub message: String,
    pub shown_at: Instant,
}

// ── App ──────────────────────────────────────────────────────────────────────

pub struct App {
    pub focus: Focus,
    /// Focused form input.
    pub field: Field,
    /// Highlighted entry in the saved-card list.
    pub selected: usize,
    /// `Some` while a confirm dialog is on screen. It captures every key.
    pub dialog: Option<ConfirmDialog>,
    pub banner: Option<Banner>,
    /// The active color theme (dark or light), toggled with Ctrl+T.
    pub theme: Theme,
    pub should_quit: bool,
}

impl App {
    pub fn new() -> Self {
        Self {
            focus: Focus::Form,
            field: Field::CardNumber,
            selected: 0,
            dialog: None,
            banner: None,
            theme: Theme::dark(),
            should_quit: false,
        }
    }

    /// Take a notice from the controller and put it on screen.
    ///
    /// A new banner replaces the previous one. A new confirm dialog replaces
    /// any open one; the replaced question is answered "no".
    pub fn push_notice(&mut self, notice: Notice, now: Instant) {
        match notice {
            Notice::Error { title, message } => {
                self.show_banner(BannerKind::Error, title, message, now);
            }
            Notice::Success { title, message } => {
                self.show_banner(BannerKind::Success, title, message, now);
            }
            Notice::Confirm {
                title,
                message,
                reply,
            } => {
                if let Some(previous) = self.dialog.take() {
                    previous.answer(false);
                }
                self.dialog = Some(ConfirmDialog {
                    title,
                    message,
                    reply,
                });
            }
        }
    }

    fn show_banner(&mut self, kind: BannerKind, title: String, message: String, now: Instant) {
        self.banner = Some(Banner {
            kind,
            title,
            message,
            shown_at: now,
        });
    }

    /// Drop the banner once it has been visible for `BANNER_TTL`.
    pub fn expire_banner(&mut self, now: Instant) {
        if self
            .banner
            .as_ref()
            .is_some_and(|b| now.duration_since(b.shown_at) >= BANNER_TTL)
        {
            self.banner = None;
        }
    }

    /// Keep the list selection inside a list of `len` entries.
    pub fn clamp_selection(&mut self, len: usize) {
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    /// Route one key press.
    ///
    /// Returns the command the controller should run, if any. `state` is the
    /// latest controller snapshot, read to resolve the selected card and to
    /// skip commands that would change nothing.
    pub fn handle_key(&mut self, key: KeyEvent, state: &FormState) -> Option<Command> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if ctrl && key.code == KeyCode::Char('c') {
            if let Some(dialog) = self.dialog.take() {
                dialog.answer(false);
            }
            self.should_quit = true;
            return None;
        }

        // The dialog is modal: nothing else sees keys while it is open.
        if self.dialog.is_some() {
            self.handle_dialog_key(key);
            return None;
        }

        if ctrl {
            return match key.code {
                KeyCode::Char('t') => {
                    self.theme.toggle();
                    None
                }
                KeyCode::Char('r') => Some(Command::Reload),
                KeyCode::Char('x') if !(state.fields.is_empty() && state.errors.is_empty()) => {
                    Some(Command::Cancel)
                }
                _ => None,
            };
        }

        match key.code {
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    Focus::Form => Focus::Saved,
                    Focus::Saved => Focus::Form,
                };
                self.clamp_selection(state.saved.len());
                None
            }
            _ => match self.focus {
                Focus::Form => self.handle_form_key(key),
                Focus::Saved => self.handle_saved_key(key, state),
            },
        }
    }

    fn handle_dialog_key(&mut self, key: KeyEvent) {
        let answer = match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => true,
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => false,
            _ => return,
        };
        if let Some(dialog) = self.dialog.take() {
            dialog.answer(answer);
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> Option<Command> {
        match key.code {
            KeyCode::Esc => {
                self.should_quit = true;
                None
            }
            KeyCode::Up => {
                self.field = self.field.prev();
                None
            }
            KeyCode::Down => {
                self.field = self.field.next();
                None
            }
            KeyCode::Enter => Some(Command::Submit),
            KeyCode::Backspace => Some(Command::Edit {
                field: self.field,
                edit: Edit::Backspace,
            }),
            // Alt combinations are terminal shortcuts, not text.
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::ALT) => {
                Some(Command::Edit {
                    field: self.field,
                    edit: Edit::Insert(c),
                })
            }
            _ => None,
        }
    }

    fn handle_saved_key(&mut self, key: KeyEvent, state: &FormState) -> Option<Command> {
        let len = state.saved.len();
        match key.code {
            KeyCode::Esc => {
                self.focus = Focus::Form;
                None
            }
            KeyCode::Up => {
                if len > 0 {
                    self.selected = if self.selected == 0 {
                        len - 1
                    } else {
                        self.selected - 1
                    };
                }
                None
            }
            KeyCode::Down => {
                if len > 0 {
                    self.selected = (self.selected + 1) % len;
                }
                None
            }
            KeyCode::Enter | KeyCode::Delete | KeyCode::Char('d') => {
                let card = state.saved.get(self.selected)?;
                // One confirm per card at a time.
                if state.deleting.contains(&card.id) {
                    return None;
                }
                Some(Command::Delete(card.id.clone()))
            }
            _ => None,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
