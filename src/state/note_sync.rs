use super::{SaveKind, SaveState, SyncPhase};
use crate::api::{ApiError, ApiResult, NoteGateway};
use crate::cache::{load_note_snapshot, remove_note_snapshot, save_note_snapshot};
#[cfg(target_arch = "wasm32")]
use crate::config::EnvConfig;
use crate::drafts::{discard_draft, load_unsynced_draft, mark_draft_synced, touch_draft};
use crate::models::{Note, NoteContent, NoteId};
use crate::runtime::{Scheduler, TimerHandle};
use crate::storage::LocalStore;
use leptos::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

struct InFlight {
    revision: u64,
    kind: SaveKind,
}

/// Mutable half of the controller. Never borrowed across a call into the
/// scheduler or the gateway.
struct SyncSlot {
    open: bool,

    /// Last server-confirmed copy; the baseline local edits diverge from.
    confirmed: Note,
    current: NoteContent,

    /// Bumped on every accepted edit.
    revision: u64,
    saved_revision: u64,

    timer: Option<TimerHandle>,
    timer_gen: u64,

    /// Single save slot. While occupied, edits only bump `revision`.
    in_flight: Option<InFlight>,

    /// Explicit save asked for while another save was in flight.
    manual_requested: bool,
}

impl SyncSlot {
    fn is_dirty(&self) -> bool {
        self.revision > self.saved_revision
    }
}

/// Per-note sync controller: debounced autosave, explicit save, one save in
/// flight at a time, drafts persisted locally on every edit.
///
/// Cloning is cheap; clones share the same note session.
#[derive(Clone)]
pub struct NoteSyncController {
    note_id: NoteId,
    save_state: SaveState,
    phase: RwSignal<SyncPhase>,
    last_error: RwSignal<Option<String>>,
    autosave_ms: u32,
    scheduler: Rc<dyn Scheduler>,
    gateway: Rc<dyn NoteGateway>,
    store: LocalStore,
    slot: Rc<RefCell<SyncSlot>>,
}

impl NoteSyncController {
    /// Start an editing session on `note`.
    ///
    /// An unsynced local draft for the note takes precedence over the
    /// server copy and is queued for autosave right away.
    pub fn new(
        note: Note,
        autosave_ms: u32,
        scheduler: Rc<dyn Scheduler>,
        gateway: Rc<dyn NoteGateway>,
        store: LocalStore,
    ) -> Self {
        let note_id = note.id.clone();
        let draft = load_unsynced_draft(&store, &note_id);

        let (current, revision, saved_revision) = match &draft {
            Some(d) => (d.content.clone(), d.revision, d.synced_revision),
            None => (note.content(), 0, 0),
        };

        let slot = SyncSlot {
            open: true,
            confirmed: note,
            current,
            revision,
            saved_revision,
            timer: None,
            timer_gen: 0,
            in_flight: None,
            manual_requested: false,
        };

        let s = Self {
            note_id,
            save_state: SaveState::new(),
            phase: RwSignal::new(SyncPhase::Idle),
            last_error: RwSignal::new(None),
            autosave_ms,
            scheduler,
            gateway,
            store,
            slot: Rc::new(RefCell::new(slot)),
        };

        if let Some(d) = draft {
            tracing::info!(note_id = %s.note_id, revision = d.revision, "restoring unsynced draft");
            s.save_state.set_is_changed(true);
            s.set_phase(SyncPhase::Dirty);
            s.schedule_autosave();
        }

        s
    }

    /// Session wired to `setTimeout`, `localStorage` and the configured
    /// autosave delay.
    #[cfg(target_arch = "wasm32")]
    pub fn in_browser(note: Note, config: &EnvConfig, gateway: Rc<dyn NoteGateway>) -> Self {
        Self::new(
            note,
            config.autosave_ms,
            Rc::new(crate::runtime::BrowserScheduler),
            gateway,
            LocalStore::browser(),
        )
    }

    pub fn note_id(&self) -> &str {
        &self.note_id
    }

    pub fn save_state(&self) -> SaveState {
        self.save_state
    }

    pub fn phase(&self) -> ReadSignal<SyncPhase> {
        self.phase.read_only()
    }

    /// Message of the most recent failed save; cleared by the next success.
    pub fn last_error(&self) -> ReadSignal<Option<String>> {
        self.last_error.read_only()
    }

    /// Content the editor should show.
    pub fn current_content(&self) -> NoteContent {
        self.slot.borrow().current.clone()
    }

    pub fn confirmed_note(&self) -> Note {
        self.slot.borrow().confirmed.clone()
    }

    pub fn is_open(&self) -> bool {
        self.slot.borrow().open
    }

    fn set_phase(&self, next: SyncPhase) {
        let prev = self.phase.get_untracked();
        if prev != next {
            tracing::debug!(
                note_id = %self.note_id,
                from = prev.as_str(),
                to = next.as_str(),
                "sync phase"
            );
            self.phase.set(next);
        }
    }

    fn settle_idle(&self) {
        self.save_state.set_is_changed(false);
        self.set_phase(SyncPhase::Idle);
    }

    /// Called by the editor on every content change.
    pub fn on_content_changed(&self, content: NoteContent) {
        enum Edit {
            Ignored,
            BackToBaseline,
            Queued(u64),
            Fresh(u64),
        }

        let edit = {
            let mut slot = self.slot.borrow_mut();
            if !slot.open || slot.current == content {
                Edit::Ignored
            } else {
                slot.current = content.clone();
                slot.revision += 1;
                if slot.in_flight.is_some() {
                    Edit::Queued(slot.revision)
                } else if slot.confirmed.content() == content {
                    slot.saved_revision = slot.revision;
                    Edit::BackToBaseline
                } else {
                    Edit::Fresh(slot.revision)
                }
            }
        };

        match edit {
            Edit::Ignored => {}
            Edit::BackToBaseline => {
                self.cancel_autosave();
                discard_draft(&self.store, &self.note_id);
                self.settle_idle();
            }
            Edit::Queued(revision) => {
                touch_draft(
                    &self.store,
                    &self.note_id,
                    revision,
                    &content,
                    self.scheduler.now_ms(),
                );
                self.save_state.set_is_changed(true);
                tracing::debug!(note_id = %self.note_id, revision, "edit queued behind in-flight save");
            }
            Edit::Fresh(revision) => {
                touch_draft(
                    &self.store,
                    &self.note_id,
                    revision,
                    &content,
                    self.scheduler.now_ms(),
                );
                self.save_state.set_is_changed(true);
                self.set_phase(SyncPhase::Dirty);
                self.schedule_autosave();
            }
        }
    }

    /// Explicit save: cancels any pending debounce and saves now. If a save
    /// is already in flight, the explicit save runs as soon as it returns.
    ///
    /// Returns `false` when there is nothing unsaved.
    pub fn save_now(&self) -> bool {
        self.cancel_autosave();

        let in_flight = {
            let mut slot = self.slot.borrow_mut();
            if !slot.open || !slot.is_dirty() {
                return false;
            }
            match &slot.in_flight {
                Some(f) => {
                    if slot.revision > f.revision {
                        slot.manual_requested = true;
                    }
                    true
                }
                None => false,
            }
        };

        if !in_flight {
            self.flush(SaveKind::Manual);
        }
        true
    }

    /// Retry after a failed save.
    pub fn retry(&self) -> bool {
        self.save_now()
    }

    /// Drop local changes and go back to the last confirmed content, which
    /// is returned for the editor to reload.
    pub fn discard(&self) -> NoteContent {
        self.cancel_autosave();

        let (baseline, revision, saving) = {
            let mut slot = self.slot.borrow_mut();
            if !slot.open {
                return slot.current.clone();
            }
            let baseline = slot.confirmed.content();
            slot.current = baseline.clone();
            slot.revision += 1;
            slot.manual_requested = false;
            let saving = slot.in_flight.is_some();
            if !saving {
                slot.saved_revision = slot.revision;
            }
            (baseline, slot.revision, saving)
        };
        tracing::info!(note_id = %self.note_id, "local changes discarded");

        if saving {
            // The in-flight snapshot will move the server past the baseline,
            // so the revert is a pending edit that must outlive this session.
            touch_draft(
                &self.store,
                &self.note_id,
                revision,
                &baseline,
                self.scheduler.now_ms(),
            );
        } else {
            discard_draft(&self.store, &self.note_id);
            self.settle_idle();
        }
        baseline
    }

    /// End the session. A save already in flight still completes, but its
    /// outcome no longer touches this controller's signals.
    pub fn close(&self) {
        self.cancel_autosave();
        let mut slot = self.slot.borrow_mut();
        slot.open = false;
        slot.manual_requested = false;
        tracing::debug!(note_id = %self.note_id, "sync session closed");
    }

    fn cancel_autosave(&self) {
        let handle = {
            let mut slot = self.slot.borrow_mut();
            slot.timer_gen += 1;
            slot.timer.take()
        };
        if let Some(h) = handle {
            self.scheduler.cancel(h);
        }
    }

    fn schedule_autosave(&self) {
        self.cancel_autosave();
        let gen = self.slot.borrow().timer_gen;

        let s2 = self.clone();
        let handle = self.scheduler.schedule(
            self.autosave_ms,
            Box::new(move || s2.on_autosave_due(gen)),
        );
        self.slot.borrow_mut().timer = Some(handle);
        self.set_phase(SyncPhase::Debouncing);
    }

    fn on_autosave_due(&self, gen: u64) {
        {
            let mut slot = self.slot.borrow_mut();
            if slot.timer_gen != gen {
                return;
            }
            slot.timer = None;
        }
        self.flush(SaveKind::Auto);
    }

    /// Issue one remote save for the current snapshot if the save slot is
    /// free and there is something to save.
    fn flush(&self, kind: SaveKind) {
        let next = {
            let mut slot = self.slot.borrow_mut();
            if !slot.open || slot.in_flight.is_some() {
                return;
            }
            if slot.is_dirty() {
                slot.in_flight = Some(InFlight {
                    revision: slot.revision,
                    kind,
                });
                Some((slot.revision, slot.current.clone()))
            } else {
                None
            }
        };

        let Some((revision, snapshot)) = next else {
            self.settle_idle();
            return;
        };

        self.save_state.set_is_changed(true);
        self.save_state.begin_save(kind);
        self.set_phase(SyncPhase::Saving);
        tracing::info!(note_id = %self.note_id, revision, ?kind, "saving note");

        let s2 = self.clone();
        let gateway = self.gateway.clone();
        let note_id = self.note_id.clone();
        self.scheduler.spawn(Box::pin(async move {
            let result = gateway.save_note(&note_id, snapshot.clone()).await;
            s2.complete_save(revision, snapshot, result);
        }));
    }

    fn complete_save(&self, revision: u64, snapshot: NoteContent, result: ApiResult<String>) {
        let kind = {
            let mut slot = self.slot.borrow_mut();
            slot.in_flight.take().map(|f| f.kind)
        };

        match result {
            Ok(updated_at) => {
                let (confirmed, open, pending, manual, synced) = {
                    let mut slot = self.slot.borrow_mut();
                    slot.saved_revision = slot.saved_revision.max(revision);
                    slot.confirmed = slot.confirmed.clone().with_content(snapshot, updated_at);

                    // Edits made during the flight may have come back to the
                    // snapshot that was just saved.
                    let pending = slot.current != slot.confirmed.content();
                    if !pending {
                        slot.saved_revision = slot.revision;
                    }
                    (
                        slot.confirmed.clone(),
                        slot.open,
                        pending,
                        std::mem::take(&mut slot.manual_requested),
                        slot.saved_revision,
                    )
                };
                tracing::info!(note_id = %self.note_id, revision, ?kind, "note saved");

                mark_draft_synced(&self.store, &self.note_id, synced);
                save_note_snapshot(&self.store, &confirmed, self.scheduler.now_ms());

                if !open {
                    return;
                }

                self.save_state.end_save();
                self.last_error.set(None);

                if !pending {
                    self.settle_idle();
                } else if manual {
                    self.flush(SaveKind::Manual);
                } else {
                    self.set_phase(SyncPhase::Dirty);
                    self.schedule_autosave();
                }
            }
            Err(e) => {
                let (open, manual, clean) = {
                    let mut slot = self.slot.borrow_mut();
                    // A discard during the flight leaves nothing to save once
                    // the server keeps the baseline.
                    let clean = slot.current == slot.confirmed.content();
                    if clean {
                        slot.saved_revision = slot.revision;
                    }
                    (slot.open, std::mem::take(&mut slot.manual_requested), clean)
                };
                tracing::warn!(note_id = %self.note_id, revision, error = %e, "note save failed");

                if clean {
                    discard_draft(&self.store, &self.note_id);
                }
                if !open {
                    return;
                }

                self.save_state.end_save();
                self.last_error.set(Some(e.to_string()));
                self.set_phase(SyncPhase::SaveFailed);

                if clean {
                    self.settle_idle();
                    return;
                }

                self.save_state.set_is_changed(true);

                // No automatic retry: the next edit or an explicit save
                // picks it up.
                self.set_phase(SyncPhase::Dirty);
                if manual {
                    self.flush(SaveKind::Manual);
                }
            }
        }
    }
}

/// Outcome of opening a note.
#[derive(Clone, Debug)]
pub struct OpenedNote {
    pub note: Note,

    /// Served from the offline snapshot because the backend was unreachable.
    pub from_cache: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error("note not found: {0}")]
    NotFound(NoteId),

    #[error("note unavailable: {0}")]
    Unavailable(#[source] ApiError),
}

/// Fetch a note for editing, falling back to the offline snapshot when the
/// backend cannot be reached. Records the note as last viewed.
pub async fn open_note(
    gateway: &dyn NoteGateway,
    store: &LocalStore,
    note_id: &str,
    now_ms: i64,
) -> Result<OpenedNote, OpenError> {
    let opened = match gateway.fetch_note(note_id).await {
        Ok(note) => {
            save_note_snapshot(store, &note, now_ms);
            OpenedNote {
                note,
                from_cache: false,
            }
        }
        Err(e) if e.is_not_found() => {
            remove_note_snapshot(store, note_id);
            return Err(OpenError::NotFound(note_id.to_string()));
        }
        Err(e) if e.is_network() => {
            let Some(snap) = load_note_snapshot(store, note_id) else {
                return Err(OpenError::Unavailable(e));
            };
            tracing::info!(note_id, saved_ms = snap.saved_ms, error = %e, "opening note from offline snapshot");
            OpenedNote {
                note: snap.note,
                from_cache: true,
            }
        }
        Err(e) => return Err(OpenError::Unavailable(e)),
    };

    store.save_last_viewed_note(note_id);
    Ok(opened)
}
