use crate::models::NoteId;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub(crate) const LAST_NOTE_KEY: &str = "last-note-id";

/// Raw string key/value persistence.
///
/// Implementations swallow their own failures: a rejected write returns
/// `false`, a broken read returns `None`.
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str) -> bool;
    fn remove_item(&self, key: &str);
}

/// `window.localStorage`.
#[cfg(target_arch = "wasm32")]
pub struct BrowserStorage(web_sys::Storage);

#[cfg(target_arch = "wasm32")]
impl BrowserStorage {
    pub fn open() -> Option<Self> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok().flatten())
            .map(Self)
    }
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for BrowserStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.0.get_item(key).ok().flatten()
    }

    fn set_item(&self, key: &str, value: &str) -> bool {
        self.0.set_item(key, value).is_ok()
    }

    fn remove_item(&self, key: &str) {
        let _ = self.0.remove_item(key);
    }
}

/// Process-local map, for headless hosts and tests.
#[derive(Default)]
pub struct MemoryStorage {
    items: RefCell<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> bool {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        true
    }

    fn remove_item(&self, key: &str) {
        self.items.borrow_mut().remove(key);
    }
}

/// Local draft store handle.
///
/// Without a backend (server render, storage disabled by the browser) every
/// write is skipped and every read comes back absent.
#[derive(Clone, Default)]
pub struct LocalStore {
    backend: Option<Rc<dyn KeyValueStore>>,
}

impl LocalStore {
    pub fn browser() -> Self {
        #[cfg(target_arch = "wasm32")]
        {
            if let Some(storage) = BrowserStorage::open() {
                return Self::with_backend(Rc::new(storage));
            }
        }

        tracing::debug!("local storage unavailable; drafts will not persist");
        Self::unavailable()
    }

    pub fn in_memory() -> Self {
        Self::with_backend(Rc::new(MemoryStorage::default()))
    }

    pub fn unavailable() -> Self {
        Self { backend: None }
    }

    pub fn with_backend(backend: Rc<dyn KeyValueStore>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    pub(crate) fn load_string(&self, key: &str) -> Option<String> {
        self.backend.as_ref()?.get_item(key)
    }

    pub(crate) fn save_string(&self, key: &str, value: &str) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };
        if !backend.set_item(key, value) {
            tracing::debug!(key, "local storage write rejected");
        }
    }

    pub(crate) fn remove(&self, key: &str) {
        if let Some(backend) = self.backend.as_ref() {
            backend.remove_item(key);
        }
    }

    pub(crate) fn load_json<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        let json = self.load_string(key)?;
        match serde_json::from_str(&json) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::debug!(key, error = %e, "ignoring unreadable local entry");
                None
            }
        }
    }

    pub(crate) fn save_json<T: Serialize>(&self, key: &str, value: &T) {
        if let Ok(json) = serde_json::to_string(value) {
            self.save_string(key, &json);
        }
    }

    pub fn save_last_viewed_note(&self, note_id: &str) {
        if note_id.trim().is_empty() {
            return;
        }
        self.save_string(LAST_NOTE_KEY, note_id);
    }

    pub fn get_last_viewed_note(&self) -> Option<NoteId> {
        self.load_string(LAST_NOTE_KEY)
            .filter(|id| !id.trim().is_empty())
    }

    pub fn clear_last_viewed_note(&self) {
        self.remove(LAST_NOTE_KEY);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_viewed_note_roundtrip() {
        let store = LocalStore::in_memory();
        store.save_last_viewed_note("n1");
        assert_eq!(store.get_last_viewed_note().as_deref(), Some("n1"));

        store.clear_last_viewed_note();
        assert!(store.get_last_viewed_note().is_none());
    }

    #[test]
    fn test_last_viewed_note_last_write_wins() {
        let store = LocalStore::in_memory();
        store.save_last_viewed_note("n1");
        store.save_last_viewed_note("n2");
        assert_eq!(store.get_last_viewed_note().as_deref(), Some("n2"));
    }

    #[test]
    fn test_clear_last_viewed_note_is_idempotent() {
        let store = LocalStore::in_memory();
        store.save_last_viewed_note("n1");
        store.clear_last_viewed_note();
        store.clear_last_viewed_note();
        assert!(store.get_last_viewed_note().is_none());

        // Clearing an empty store is fine too.
        LocalStore::in_memory().clear_last_viewed_note();
    }

    #[test]
    fn test_blank_note_id_is_not_stored() {
        let store = LocalStore::in_memory();
        store.save_last_viewed_note("n1");
        store.save_last_viewed_note("   ");
        assert_eq!(store.get_last_viewed_note().as_deref(), Some("n1"));
    }

    #[test]
    fn test_unavailable_store_degrades_to_noop() {
        let store = LocalStore::unavailable();
        assert!(!store.is_available());

        store.save_last_viewed_note("n1");
        assert!(store.get_last_viewed_note().is_none());
        store.clear_last_viewed_note();
        assert!(store.load_json::<Vec<String>>("anything").is_none());
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_native_browser_store_is_unavailable() {
        assert!(!LocalStore::browser().is_available());
    }

    #[test]
    fn test_clones_share_backend() {
        let a = LocalStore::in_memory();
        let b = a.clone();
        a.save_last_viewed_note("n9");
        assert_eq!(b.get_last_viewed_note().as_deref(), Some("n9"));
    }

    #[test]
    fn test_unreadable_json_reads_as_absent() {
        let store = LocalStore::in_memory();
        store.save_string("k", "{not json");
        assert!(store.load_json::<serde_json::Value>("k").is_none());
    }
}
