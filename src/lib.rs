//! Note sync and autosave engine for the Tasklytic web client.
//!
//! An open note gets a [`NoteSyncController`]: edits are written to a local
//! draft, coalesced behind a debounce, and saved through a [`NoteGateway`]
//! with at most one save in flight. Save progress is exposed as Leptos
//! signals through [`SaveState`].

pub mod api;
mod cache;
pub mod config;
pub mod drafts;
pub mod models;
pub mod runtime;
pub mod state;
pub mod storage;

pub use api::{ApiClient, ApiError, ApiErrorKind, ApiResult, NoteGateway};
pub use config::EnvConfig;
pub use models::{Block, Note, NoteContent, NoteId};
pub use runtime::{ManualScheduler, Scheduler, TimerHandle};
pub use state::{
    open_note, use_save_state, NoteSyncController, OpenError, OpenedNote, SaveFlags, SaveKind,
    SaveState, SyncPhase,
};
pub use storage::{KeyValueStore, LocalStore, MemoryStorage};

// Needed for `#[wasm_bindgen(start)]` on the wasm entrypoint.
#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;

// Only register the WASM start function for normal builds (not for tests),
// otherwise wasm-bindgen-test will end up with multiple entry symbols.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn start() {
    console_error_panic_hook::set_once();

    #[cfg(target_arch = "wasm32")]
    tracing_wasm::set_as_global_default();
}
