use serde::{Deserialize, Serialize};

pub type NoteId = String;

/// A note as the backend returns it.
///
/// Timestamps are kept as the backend's strings; the sync engine never
/// interprets them.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Note {
    pub id: NoteId,
    pub project_id: String,
    pub title: String,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Block {
    pub id: String,

    /// Back-reference to the owning note.
    pub note_id: NoteId,

    pub position: u32,

    /// Rich-text node tree produced by the editor. Opaque here.
    #[serde(default)]
    pub content: serde_json::Value,
}

/// The part of a note the editor changes and the sync engine ships.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct NoteContent {
    pub title: String,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl NoteContent {
    /// Rewrite block positions to follow sequence order and stamp the
    /// note back-reference on every block.
    pub fn normalized(mut self, note_id: &str) -> Self {
        for (i, b) in self.blocks.iter_mut().enumerate() {
            b.position = i as u32;
            if b.note_id != note_id {
                b.note_id = note_id.to_string();
            }
        }
        self
    }
}

impl Note {
    pub fn content(&self) -> NoteContent {
        let mut blocks = self.blocks.clone();
        blocks.sort_by_key(|b| b.position);
        NoteContent {
            title: self.title.clone(),
            blocks,
        }
    }

    /// Apply a confirmed save back onto the note.
    pub fn with_content(mut self, content: NoteContent, updated_at: String) -> Self {
        self.title = content.title;
        self.blocks = content.blocks;
        self.updated_at = updated_at;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(id: &str, note_id: &str, position: u32) -> Block {
        Block {
            id: id.to_string(),
            note_id: note_id.to_string(),
            position,
            content: serde_json::json!({"type": "paragraph", "text": id}),
        }
    }

    #[test]
    fn test_note_content_sorts_blocks_by_position() {
        let note = Note {
            id: "n1".to_string(),
            project_id: "p1".to_string(),
            title: "Plan".to_string(),
            blocks: vec![block("b", "n1", 2), block("a", "n1", 0)],
            created_at: String::new(),
            updated_at: String::new(),
        };

        let content = note.content();
        let ids: Vec<_> = content.blocks.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(content.title, "Plan");
    }

    #[test]
    fn test_normalized_rewrites_positions_and_back_reference() {
        let content = NoteContent {
            title: "t".to_string(),
            blocks: vec![block("x", "n1", 7), block("y", "other", 3)],
        }
        .normalized("n1");

        assert_eq!(content.blocks[0].position, 0);
        assert_eq!(content.blocks[1].position, 1);
        assert!(content.blocks.iter().all(|b| b.note_id == "n1"));
    }

    #[test]
    fn test_note_contract_deserialize_kebab_case() {
        let json = r#"{
            "id": "n1",
            "project-id": "p1",
            "title": "Groceries",
            "blocks": [{"id": "b1", "note-id": "n1", "position": 0, "content": {"text": "milk"}}],
            "created-at": "2026-01-01T00:00:00Z",
            "updated-at": "2026-01-02T00:00:00Z"
        }"#;
        let note: Note = serde_json::from_str(json).expect("note should parse");
        assert_eq!(note.project_id, "p1");
        assert_eq!(note.blocks.len(), 1);
        assert_eq!(note.blocks[0].content["text"], "milk");
    }

    #[test]
    fn test_note_deserialize_without_blocks() {
        let json = r#"{"id": "n1", "project-id": "p1", "title": "Empty"}"#;
        let note: Note = serde_json::from_str(json).expect("note should parse");
        assert!(note.blocks.is_empty());
        assert!(note.updated_at.is_empty());
    }
}
