pub(crate) mod note_snapshot;

pub(crate) use note_snapshot::{load_note_snapshot, remove_note_snapshot, save_note_snapshot};
