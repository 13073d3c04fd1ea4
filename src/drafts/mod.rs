mod note;

pub(crate) use note::{discard_draft, load_unsynced_draft, mark_draft_synced, touch_draft};
pub use note::NoteDraft;
