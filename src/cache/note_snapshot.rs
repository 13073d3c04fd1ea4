use crate::models::Note;
use crate::storage::LocalStore;
use serde::{Deserialize, Serialize};

fn key(note_id: &str) -> String {
    format!("tasklytic_note_snapshot::{}", urlencoding::encode(note_id))
}

/// Last server-confirmed copy of a note, for opening it offline.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct NoteSnapshot {
    pub saved_ms: i64,
    pub note: Note,
}

pub(crate) fn save_note_snapshot(store: &LocalStore, note: &Note, saved_ms: i64) {
    if note.id.trim().is_empty() {
        return;
    }

    let snap = NoteSnapshot {
        saved_ms,
        note: note.clone(),
    };
    store.save_json(&key(&note.id), &snap);
}

pub(crate) fn load_note_snapshot(store: &LocalStore, note_id: &str) -> Option<NoteSnapshot> {
    if note_id.trim().is_empty() {
        return None;
    }
    store.load_json::<NoteSnapshot>(&key(note_id))
}

pub(crate) fn remove_note_snapshot(store: &LocalStore, note_id: &str) {
    if note_id.trim().is_empty() {
        return;
    }
    store.remove(&key(note_id));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: &str, title: &str) -> Note {
        Note {
            id: id.to_string(),
            project_id: "p1".to_string(),
            title: title.to_string(),
            blocks: vec![],
            created_at: String::new(),
            updated_at: "t1".to_string(),
        }
    }

    #[test]
    fn test_snapshot_replaces_previous_copy() {
        let store = LocalStore::in_memory();
        save_note_snapshot(&store, &note("n1", "old"), 1);
        save_note_snapshot(&store, &note("n1", "new"), 2);

        let snap = load_note_snapshot(&store, "n1").expect("snapshot");
        assert_eq!(snap.note.title, "new");
        assert_eq!(snap.saved_ms, 2);
    }

    #[test]
    fn test_remove_snapshot() {
        let store = LocalStore::in_memory();
        save_note_snapshot(&store, &note("n1", "x"), 1);
        remove_note_snapshot(&store, "n1");
        assert!(load_note_snapshot(&store, "n1").is_none());
    }

    #[test]
    fn test_note_ids_with_separators_do_not_collide() {
        let store = LocalStore::in_memory();
        save_note_snapshot(&store, &note("a::b", "first"), 1);
        save_note_snapshot(&store, &note("a", "second"), 1);
        assert_eq!(
            load_note_snapshot(&store, "a::b").map(|s| s.note.title),
            Some("first".to_string())
        );
    }
}
