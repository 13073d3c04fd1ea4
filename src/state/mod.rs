mod note_sync;

pub use note_sync::{open_note, NoteSyncController, OpenError, OpenedNote};

use leptos::prelude::*;

/// Where the sync controller is in its save pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Dirty,
    Debouncing,
    Saving,
    SaveFailed,
}

impl SyncPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Dirty => "dirty",
            SyncPhase::Debouncing => "debouncing",
            SyncPhase::Saving => "saving",
            SyncPhase::SaveFailed => "save-failed",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveKind {
    /// Debounce elapsed.
    Auto,
    /// User asked for it; bypasses the debounce.
    Manual,
}

/// Plain copy of the three flags, read without tracking.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SaveFlags {
    pub is_changed: bool,
    pub is_saving: bool,
    pub is_auto_saving: bool,
}

/// Save-state signals for one open note.
///
/// The UI reads them through the `ReadSignal` accessors and re-renders on
/// change. Only the sync controller writes them during normal operation.
#[derive(Clone, Copy)]
pub struct SaveState {
    is_changed: RwSignal<bool>,
    is_saving: RwSignal<bool>,
    is_auto_saving: RwSignal<bool>,
}

impl SaveState {
    pub fn new() -> Self {
        Self {
            is_changed: RwSignal::new(false),
            is_saving: RwSignal::new(false),
            is_auto_saving: RwSignal::new(false),
        }
    }

    pub fn is_changed(&self) -> ReadSignal<bool> {
        self.is_changed.read_only()
    }

    pub fn is_saving(&self) -> ReadSignal<bool> {
        self.is_saving.read_only()
    }

    pub fn is_auto_saving(&self) -> ReadSignal<bool> {
        self.is_auto_saving.read_only()
    }

    pub fn set_is_changed(&self, v: bool) {
        self.is_changed.set(v);
    }

    pub fn set_is_saving(&self, v: bool) {
        self.is_saving.set(v);
    }

    pub fn set_is_auto_saving(&self, v: bool) {
        self.is_auto_saving.set(v);
    }

    /// Raise exactly one of the two saving flags.
    pub(crate) fn begin_save(&self, kind: SaveKind) {
        match kind {
            SaveKind::Auto => {
                self.is_saving.set(false);
                self.is_auto_saving.set(true);
            }
            SaveKind::Manual => {
                self.is_auto_saving.set(false);
                self.is_saving.set(true);
            }
        }
    }

    pub(crate) fn end_save(&self) {
        self.is_saving.set(false);
        self.is_auto_saving.set(false);
    }

    pub fn flags(&self) -> SaveFlags {
        SaveFlags {
            is_changed: self.is_changed.get_untracked(),
            is_saving: self.is_saving.get_untracked(),
            is_auto_saving: self.is_auto_saving.get_untracked(),
        }
    }

    /// Make these signals reachable from child components.
    pub fn provide(self) {
        provide_context(self);
    }
}

impl Default for SaveState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn use_save_state() -> Option<SaveState> {
    use_context::<SaveState>()
}
