//! Form state controller.
//!
//! `FormController` owns the form fields, the error map, and the saved-card
//! list, and wires the validation rules to the repository and the notifier.
//! Its state lives inside a `tokio::sync::watch` channel: every mutation is a
//! `send_modify`, and the UI re-renders from the newest `FormState` snapshot
//! whenever the channel reports a change.
//!
//! Submission follows a small state machine:
//!
//! ```text
//! Editing --submit(invalid)--> Editing        errors shown, nothing sent
//! Editing --submit(valid)----> Submitting     create request in flight
//! Submitting --ok-----------> Editing         card appended, form cleared
//! Submitting --fail---------> Editing         form left as typed
//! ```
//!
//! Inside [`FormController::run`] edits and cancel are applied the moment they
//! arrive. Every repository call runs on its own task, so a slow or hung
//! request only keeps its own busy marker set while typing carries on.
//!
//! Handlers never return errors. Failures become a log line plus a user
//! notification, and the handler reports what happened through an outcome
//! value so callers (and tests) can react.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::card::{Field, FieldErrors, FormFields, SavedCard};
use crate::notify::Notifier;
use crate::repository::CardRepository;
use crate::validation;

// User-facing notification texts.
const OOPS: &str = "Oops...";
const LOAD_FAILED: &str = "Could not load the saved cards.";
const VALIDATION_TITLE: &str = "Validation error";
const VALIDATION_MESSAGE: &str = "Please correct the errors in the form.";
const SAVED_TITLE: &str = "Success!";
const SAVED_MESSAGE: &str = "The card was added successfully.";
const SAVE_FAILED: &str = "There was an error saving the card.";
const CONFIRM_TITLE: &str = "Are you sure?";
const CONFIRM_MESSAGE: &str = "You won't be able to revert this action.";
const DELETED_TITLE: &str = "Deleted!";
const DELETED_MESSAGE: &str = "The card has been deleted.";
const DELETE_FAILED: &str = "There was an error deleting the card.";

// ── State ────────────────────────────────────────────────────────────────────

/// Where the form is in its submit cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Editing,
    /// Validation passed and at least one create request is in flight.
    Submitting,
}

/// Everything the presentation layer needs to draw the screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    pub fields: FormFields,
    pub errors: FieldErrors,
    /// Saved cards in the order they were received or appended. Ids are unique.
    pub saved: Vec<SavedCard>,
    pub phase: Phase,
    /// The saved-card list request is in flight.
    pub loading: bool,
    /// Ids of the cards whose delete request is in flight.
    pub deleting: BTreeSet<String>,
    /// Create requests in flight.
    pub(crate) submitting: usize,
}

impl FormState {
    fn begin_create(&mut self) {
        self.submitting += 1;
        self.phase = Phase::Submitting;
    }

    fn end_create(&mut self) {
        self.submitting = self.submitting.saturating_sub(1);
        if self.submitting == 0 {
            self.phase = Phase::Editing;
        }
    }

    fn clear_form(&mut self) {
        self.fields = FormFields::default();
        self.errors.clear();
    }

    /// Append `card`, or replace the entry that already has its id.
    fn upsert(&mut self, card: SavedCard) {
        match self.saved.iter_mut().find(|c| c.id == card.id) {
            Some(existing) => {
                warn!(id = %card.id, "server returned an id already in the list");
                *existing = card;
            }
            None => self.saved.push(card),
        }
    }

    /// Replace the whole list, keeping the first occurrence of any id.
    fn replace_saved(&mut self, cards: Vec<SavedCard>) {
        self.saved.clear();
        for card in cards {
            if self.saved.iter().any(|c| c.id == card.id) {
                warn!(id = %card.id, "duplicate id in card list; keeping the first");
                continue;
            }
            self.saved.push(card);
        }
    }
}

// ── Commands ─────────────────────────────────────────────────────────────────

/// A change to a single field's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Insert(char),
    Backspace,
    /// Replace the whole raw value (paste, scripted input).
    Replace(String),
}

/// User intents sent from the UI to the controller task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Edit { field: Field, edit: Edit },
    Submit,
    Cancel,
    Delete(String),
    Reload,
}

// ── Outcomes ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Validation failed; the error map is populated and nothing was sent.
    Invalid,
    Saved(SavedCard),
    /// The create call failed; the form is unchanged.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The user did not confirm; nothing was sent.
    Declined,
    Deleted,
    /// The delete call failed; the local list is unchanged.
    Failed,
}

// ── Controller ───────────────────────────────────────────────────────────────

pub struct FormController<R, N> {
    repo: R,
    notifier: N,
    state: watch::Sender<FormState>,
}

impl<R: CardRepository, N: Notifier> FormController<R, N> {
    pub fn new(repo: R, notifier: N) -> Self {
        let (state, _) = watch::channel(FormState::default());
        Self {
            repo,
            notifier,
            state,
        }
    }

    /// A receiver that sees every state change from now on.
    pub fn subscribe(&self) -> watch::Receiver<FormState> {
        self.state.subscribe()
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> FormState {
        self.state.borrow().clone()
    }

    /// Fetch the saved cards and replace the local list with the result.
    ///
    /// On failure the list is left as it was and the user is notified.
    /// Returns whether the list was loaded.
    pub async fn load_cards(&self) -> bool {
        self.state.send_modify(|s| s.loading = true);
        let result = self.repo.list_cards().await;
        match result {
            Ok(cards) => {
                self.state.send_modify(|s| {
                    s.replace_saved(cards);
                    s.loading = false;
                });
                true
            }
            Err(err) => {
                error!(error = %err, "loading saved cards failed");
                self.state.send_modify(|s| s.loading = false);
                self.notifier.notify_error(OOPS, LOAD_FAILED);
                false
            }
        }
    }

    /// Store the normalized form of `raw` in `field`.
    pub fn change(&self, field: Field, raw: &str) {
        let value = validation::format_field(field, raw);
        self.state.send_modify(|s| s.fields.set(field, value));
    }

    /// Apply a keystroke-level edit to the current value of `field`.
    pub fn apply_edit(&self, field: Field, edit: Edit) {
        let current = self.state.borrow().fields.get(field).to_string();
        match edit {
            Edit::Insert(c) => {
                let mut raw = current;
                raw.push(c);
                self.change(field, &raw);
            }
            Edit::Backspace => {
                let value = validation::backspace(field, &current);
                self.state.send_modify(|s| s.fields.set(field, value));
            }
            Edit::Replace(raw) => self.change(field, &raw),
        }
    }

    /// Clear all fields and errors. Always allowed.
    pub fn cancel(&self) {
        self.state.send_modify(FormState::clear_form);
    }

    /// Validate the form and, when valid, create the card.
    pub async fn submit(&self) -> SubmitOutcome {
        match self.begin_submit() {
            Some(outgoing) => self.finish_submit(&outgoing).await,
            None => SubmitOutcome::Invalid,
        }
    }

    /// Synchronous half of a submit: validate the fields as they are right
    /// now. Returns the request body when valid, with the phase already moved
    /// to `Submitting`.
    fn begin_submit(&self) -> Option<FormFields> {
        let fields = self.state.borrow().fields.clone();
        let errors = validation::validate(&fields);
        if !errors.is_empty() {
            self.state.send_modify(|s| s.errors = errors);
            self.notifier.notify_error(VALIDATION_TITLE, VALIDATION_MESSAGE);
            return None;
        }

        self.state.send_modify(|s| {
            s.errors.clear();
            s.begin_create();
        });
        Some(validation::for_submission(&fields))
    }

    async fn finish_submit(&self, outgoing: &FormFields) -> SubmitOutcome {
        let result = self.repo.create_card(outgoing).await;
        match result {
            Ok(card) => {
                info!(id = %card.id, "card added");
                self.state.send_modify(|s| {
                    s.upsert(card.clone());
                    s.clear_form();
                    s.end_create();
                });
                self.notifier.notify_success(SAVED_TITLE, SAVED_MESSAGE);
                SubmitOutcome::Saved(card)
            }
            Err(err) => {
                error!(error = %err, "saving card failed");
                self.state.send_modify(FormState::end_create);
                self.notifier.notify_error(OOPS, SAVE_FAILED);
                SubmitOutcome::Failed
            }
        }
    }

    /// Ask for confirmation, then delete the card with `id`.
    ///
    /// The local entry is only removed after the server acknowledged the delete.
    pub async fn delete_card(&self, id: &str) -> DeleteOutcome {
        if !self.notifier.confirm(CONFIRM_TITLE, CONFIRM_MESSAGE).await {
            return DeleteOutcome::Declined;
        }

        self.state.send_modify(|s| {
            s.deleting.insert(id.to_string());
        });
        let result = self.repo.delete_card(id).await;
        match result {
            Ok(()) => {
                self.state.send_modify(|s| {
                    s.saved.retain(|c| c.id != id);
                    s.deleting.remove(id);
                });
                self.notifier.notify_success(DELETED_TITLE, DELETED_MESSAGE);
                DeleteOutcome::Deleted
            }
            Err(err) => {
                error!(error = %err, "deleting card failed");
                self.state.send_modify(|s| {
                    s.deleting.remove(id);
                });
                self.notifier.notify_error(OOPS, DELETE_FAILED);
                DeleteOutcome::Failed
            }
        }
    }
}

impl<R, N> FormController<R, N>
where
    R: CardRepository + 'static,
    N: Notifier + 'static,
{
    /// Controller task body. Loads the saved cards once, then takes commands
    /// until every sender is gone.
    ///
    /// Edits and cancel are applied inline. Submit, delete and reload each
    /// spawn a request task, so none of them holds up the commands behind it.
    /// Two submits in a row send two creates. Aborting the task that runs
    /// this future drops the requests still in flight.
    pub async fn run(self: Arc<Self>, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut requests = JoinSet::new();
        self.spawn_load(&mut requests);

        while let Some(command) = commands.recv().await {
            match command {
                Command::Edit { field, edit } => self.apply_edit(field, edit),
                Command::Cancel => self.cancel(),
                Command::Submit => {
                    if let Some(outgoing) = self.begin_submit() {
                        let this = Arc::clone(&self);
                        requests.spawn(async move {
                            this.finish_submit(&outgoing).await;
                        });
                    }
                }
                Command::Delete(id) => {
                    let this = Arc::clone(&self);
                    requests.spawn(async move {
                        this.delete_card(&id).await;
                    });
                }
                Command::Reload => {
                    if self.state.borrow().loading {
                        debug!("reload ignored; list request already in flight");
                    } else {
                        self.spawn_load(&mut requests);
                    }
                }
            }
            while requests.try_join_next().is_some() {}
        }

        info!("command channel closed; waiting for requests in flight");
        while requests.join_next().await.is_some() {}
    }

    fn spawn_load(self: &Arc<Self>, requests: &mut JoinSet<()>) {
        // Marked before the task starts so a quick Ctrl+R cannot double it.
        self.state.send_modify(|s| s.loading = true);
        let this = Arc::clone(self);
        requests.spawn(async move {
            this.load_cards().await;
        });
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
