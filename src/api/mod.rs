use crate::config::EnvConfig;
use crate::models::{Block, Note, NoteContent};
use crate::storage::LocalStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub(crate) const TOKEN_KEY: &str = "tasklytic_token";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiErrorKind {
    NotFound,
    Unauthorized,
    Network,
    Http,
    Parse,
}

#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    fn network(e: reqwest::Error) -> Self {
        Self {
            kind: ApiErrorKind::Network,
            message: e.to_string(),
        }
    }

    fn parse(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Parse,
            message: e.to_string(),
        }
    }

    pub(crate) fn not_found(note_id: &str) -> Self {
        Self {
            kind: ApiErrorKind::NotFound,
            message: format!("Note not found: {note_id}"),
        }
    }

    fn unauthorized() -> Self {
        Self {
            kind: ApiErrorKind::Unauthorized,
            message: "Unauthorized".to_string(),
        }
    }

    /// Map a non-success HTTP answer onto the error taxonomy.
    pub(crate) fn from_status(status: u16, body: String, ctx: &str) -> Self {
        match status {
            401 => Self::unauthorized(),
            404 => Self {
                kind: ApiErrorKind::NotFound,
                message: format!("{ctx} (404): {body}"),
            },
            _ => Self {
                kind: ApiErrorKind::Http,
                message: format!("{ctx} ({status}): {body}"),
            },
        }
    }

    pub fn is_network(&self) -> bool {
        self.kind == ApiErrorKind::Network
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ApiErrorKind::NotFound
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Remote note store the sync controller talks to.
#[async_trait(?Send)]
pub trait NoteGateway {
    async fn fetch_note(&self, note_id: &str) -> ApiResult<Note>;

    /// Persist `content`; returns the server's new `updated-at`.
    async fn save_note(&self, note_id: &str, content: NoteContent) -> ApiResult<String>;
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct GetNoteRequest {
    #[serde(rename = "note-id")]
    pub note_id: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct SaveNoteRequest {
    #[serde(rename = "note-id")]
    pub note_id: String,
    pub title: String,
    pub blocks: Vec<Block>,
}

#[derive(Clone)]
pub struct ApiClient {
    pub(crate) base_url: String,
    pub(crate) token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            token: None,
        }
    }

    pub fn from_config(config: &EnvConfig) -> Self {
        Self::new(config.api_url.clone())
    }

    pub fn load_from_storage(config: &EnvConfig, store: &LocalStore) -> Self {
        Self {
            base_url: config.api_url.clone(),
            token: store.load_string(TOKEN_KEY),
        }
    }

    pub fn save_to_storage(&self, store: &LocalStore) {
        if let Some(token) = &self.token {
            store.save_string(TOKEN_KEY, token);
        }
    }

    pub fn clear_storage(store: &LocalStore) {
        store.remove(TOKEN_KEY);
    }

    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub fn get_token(&self) -> Option<&String> {
        self.token.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn get_auth_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {}", t))
    }

    fn with_auth_headers(
        mut req: reqwest::RequestBuilder,
        auth_header: Option<String>,
    ) -> reqwest::RequestBuilder {
        if let Some(header) = auth_header {
            req = req.header("Authorization", header);
        }
        req
    }

    async fn request_api<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> ApiResult<T> {
        let client = reqwest::Client::new();
        let url = format!("{}{}", self.base_url, path);
        let req = Self::with_auth_headers(client.post(url), self.get_auth_header());

        let res = req.json(body).send().await.map_err(ApiError::network)?;

        let status = res.status();
        if status.is_success() {
            res.json().await.map_err(ApiError::parse)
        } else {
            let body = res.text().await.unwrap_or_default();
            Err(ApiError::from_status(status.as_u16(), body, path))
        }
    }

    /// Accepts `{"note": {...}}` or a bare note object. A missing or null
    /// note means the backend has no such note.
    pub(crate) fn parse_note_response(note_id: &str, data: serde_json::Value) -> ApiResult<Note> {
        let item = if data.get("note").is_some() {
            data["note"].clone()
        } else if data.get("id").is_some() {
            data
        } else {
            serde_json::Value::Null
        };
        if item.is_null() {
            return Err(ApiError::not_found(note_id));
        }

        let note: Note = serde_json::from_value(item).map_err(ApiError::parse)?;
        if note.id.trim().is_empty() {
            return Err(ApiError::parse("note response is missing an id"));
        }
        Ok(note)
    }

    pub(crate) fn parse_save_response(data: serde_json::Value) -> ApiResult<String> {
        data.get("updated-at")
            .or_else(|| data.get("note").and_then(|n| n.get("updated-at")))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| ApiError::parse(format!("save response is missing updated-at: {data}")))
    }
}

#[async_trait(?Send)]
impl NoteGateway for ApiClient {
    async fn fetch_note(&self, note_id: &str) -> ApiResult<Note> {
        let data: serde_json::Value = self
            .request_api(
                "/tasklytic/get-note",
                &GetNoteRequest {
                    note_id: note_id.to_string(),
                },
            )
            .await?;
        Self::parse_note_response(note_id, data)
    }

    async fn save_note(&self, note_id: &str, content: NoteContent) -> ApiResult<String> {
        let content = content.normalized(note_id);
        let data: serde_json::Value = self
            .request_api(
                "/tasklytic/save-note",
                &SaveNoteRequest {
                    note_id: note_id.to_string(),
                    title: content.title,
                    blocks: content.blocks,
                },
            )
            .await?;
        Self::parse_save_response(data)
    }
}
