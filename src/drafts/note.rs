use crate::models::{NoteContent, NoteId};
use crate::storage::LocalStore;
use serde::{Deserialize, Serialize};

/// Unsaved local shadow of a note.
///
/// `revision` counts edits within the note's editing history; the draft is
/// unsynced while `revision > synced_revision`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct NoteDraft {
    pub note_id: NoteId,
    pub revision: u64,
    pub synced_revision: u64,
    pub updated_ms: i64,
    pub content: NoteContent,
}

impl NoteDraft {
    pub fn is_unsynced(&self) -> bool {
        self.revision > self.synced_revision
    }
}

fn key(note_id: &str) -> String {
    format!("tasklytic_draft_note::{}", urlencoding::encode(note_id))
}

fn load_note_draft(store: &LocalStore, note_id: &str) -> Option<NoteDraft> {
    if note_id.trim().is_empty() {
        return None;
    }
    store.load_json::<NoteDraft>(&key(note_id))
}

pub(crate) fn touch_draft(
    store: &LocalStore,
    note_id: &str,
    revision: u64,
    content: &NoteContent,
    now_ms: i64,
) {
    if note_id.trim().is_empty() {
        return;
    }

    let mut d = load_note_draft(store, note_id).unwrap_or_else(|| NoteDraft {
        note_id: note_id.to_string(),
        ..Default::default()
    });
    d.revision = d.revision.max(revision);
    d.updated_ms = now_ms;
    d.content = content.clone();
    // Do not change synced_revision here.

    store.save_json(&key(note_id), &d);
}

/// Record that `revision` reached the server. Drops the draft once nothing
/// newer is left in it.
pub(crate) fn mark_draft_synced(store: &LocalStore, note_id: &str, revision: u64) {
    let Some(mut d) = load_note_draft(store, note_id) else {
        return;
    };

    d.synced_revision = d.synced_revision.max(revision);
    if d.is_unsynced() {
        store.save_json(&key(note_id), &d);
    } else {
        store.remove(&key(note_id));
    }
}

pub(crate) fn discard_draft(store: &LocalStore, note_id: &str) {
    if note_id.trim().is_empty() {
        return;
    }
    store.remove(&key(note_id));
}

pub(crate) fn load_unsynced_draft(store: &LocalStore, note_id: &str) -> Option<NoteDraft> {
    load_note_draft(store, note_id).filter(NoteDraft::is_unsynced)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(title: &str) -> NoteContent {
        NoteContent {
            title: title.to_string(),
            blocks: vec![],
        }
    }

    #[test]
    fn test_touch_then_load_unsynced() {
        let store = LocalStore::in_memory();
        touch_draft(&store, "n1", 1, &content("a"), 10);
        touch_draft(&store, "n1", 2, &content("ab"), 20);

        let d = load_unsynced_draft(&store, "n1").expect("draft should be unsynced");
        assert_eq!(d.revision, 2);
        assert_eq!(d.synced_revision, 0);
        assert_eq!(d.updated_ms, 20);
        assert_eq!(d.content.title, "ab");
    }

    #[test]
    fn test_mark_synced_at_latest_revision_drops_draft() {
        let store = LocalStore::in_memory();
        touch_draft(&store, "n1", 3, &content("x"), 10);
        mark_draft_synced(&store, "n1", 3);
        assert!(load_unsynced_draft(&store, "n1").is_none());
        assert!(store.load_string(&key("n1")).is_none());
    }

    #[test]
    fn test_mark_synced_at_older_revision_keeps_newer_content() {
        let store = LocalStore::in_memory();
        touch_draft(&store, "n1", 4, &content("newer"), 10);
        mark_draft_synced(&store, "n1", 2);

        let d = load_unsynced_draft(&store, "n1").expect("newer edit still unsynced");
        assert_eq!(d.synced_revision, 2);
        assert_eq!(d.content.title, "newer");
    }

    #[test]
    fn test_synced_revision_never_moves_backwards() {
        let store = LocalStore::in_memory();
        touch_draft(&store, "n1", 5, &content("x"), 10);
        mark_draft_synced(&store, "n1", 4);
        mark_draft_synced(&store, "n1", 1);
        let d = load_unsynced_draft(&store, "n1").expect("draft");
        assert_eq!(d.synced_revision, 4);
    }

    #[test]
    fn test_discard_removes_draft() {
        let store = LocalStore::in_memory();
        touch_draft(&store, "n1", 1, &content("x"), 10);
        discard_draft(&store, "n1");
        assert!(load_unsynced_draft(&store, "n1").is_none());
    }

    #[test]
    fn test_drafts_are_scoped_per_note() {
        let store = LocalStore::in_memory();
        touch_draft(&store, "n1", 1, &content("one"), 10);
        touch_draft(&store, "n2", 1, &content("two"), 10);
        discard_draft(&store, "n1");

        assert!(load_unsynced_draft(&store, "n1").is_none());
        assert_eq!(
            load_unsynced_draft(&store, "n2").map(|d| d.content.title),
            Some("two".to_string())
        );
    }

    #[test]
    fn test_blank_note_id_is_ignored() {
        let store = LocalStore::in_memory();
        touch_draft(&store, " ", 1, &content("x"), 10);
        assert!(load_unsynced_draft(&store, " ").is_none());
    }
}
