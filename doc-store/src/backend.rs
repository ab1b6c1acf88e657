//! Durable storage for the document.
//!
//! ## File Layout
//!
//! ```text
//! <data_path>          pretty-printed StoreDocument, trailing newline
//! ```
//!
//! Writes overwrite the file in place. There is no temp-file-and-rename step,
//! so a crash mid-write can leave a truncated file; the next load reports it
//! as [`BackendError::Corrupt`] and the store falls back to defaults.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::Error as _;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::document::StoreDocument;
use crate::errors::BackendError;

/// Storage location backing a [`Store`](crate::store::Store).
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Read the raw persisted value.
    ///
    /// Returns [`BackendError::NotFound`] when nothing has been stored yet and
    /// [`BackendError::Corrupt`] when the content is not a JSON object. That
    /// includes valid JSON such as `null` or `[1, 2]`: the store treats those
    /// like unparseable text and overwrites them with the defaults.
    async fn load(&self) -> Result<Value, BackendError>;

    /// Serialize and overwrite the stored document.
    async fn save(&self, document: &StoreDocument) -> Result<(), BackendError>;

    /// Human-readable location for log lines.
    fn location(&self) -> String;
}

/// Parse persisted text, rejecting anything that is not a JSON object.
fn parse_document(path: &Path, bytes: &[u8]) -> Result<Value, BackendError> {
    let value: Value = serde_json::from_slice(bytes).map_err(|source| BackendError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    if !value.is_object() {
        return Err(BackendError::Corrupt {
            path: path.to_path_buf(),
            source: serde_json::Error::custom("top-level value is not an object"),
        });
    }
    Ok(value)
}

fn render_document(document: &StoreDocument) -> Result<String, BackendError> {
    let mut json = serde_json::to_string_pretty(document).map_err(BackendError::Serialize)?;
    json.push('\n');
    Ok(json)
}

// ── File backend ─────────────────────────────────────────────────────────────

/// Single JSON file on local disk.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_parent_dir(&self) -> Result<(), BackendError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentBackend for FileBackend {
    async fn load(&self) -> Result<Value, BackendError> {
        self.ensure_parent_dir().await?;
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BackendError::NotFound {
                    path: self.path.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        parse_document(&self.path, &bytes)
    }

    async fn save(&self, document: &StoreDocument) -> Result<(), BackendError> {
        self.ensure_parent_dir().await?;
        let json = render_document(document)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

// ── Memory backend ───────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct MemoryState {
    content: Option<String>,
    fail_saves: bool,
    saves: usize,
}

/// In-process backend holding the serialized text.
///
/// Behaves like [`FileBackend`] (same parsing and rendering) and can be told
/// to fail writes, which makes it handy for embedding and for tests.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `content` already "on disk", parseable or not.
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                content: Some(content.into()),
                ..MemoryState::default()
            }),
        }
    }

    /// Currently stored text, if any.
    pub async fn contents(&self) -> Option<String> {
        self.state.lock().await.content.clone()
    }

    /// Make every subsequent `save` fail with an I/O error.
    pub async fn set_fail_saves(&self, fail: bool) {
        self.state.lock().await.fail_saves = fail;
    }

    /// Number of successful saves so far.
    pub async fn save_count(&self) -> usize {
        self.state.lock().await.saves
    }
}

#[async_trait]
impl DocumentBackend for MemoryBackend {
    async fn load(&self) -> Result<Value, BackendError> {
        let state = self.state.lock().await;
        match &state.content {
            Some(text) => parse_document(Path::new("memory"), text.as_bytes()),
            None => Err(BackendError::NotFound {
                path: PathBuf::from("memory"),
            }),
        }
    }

    async fn save(&self, document: &StoreDocument) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        if state.fail_saves {
            return Err(BackendError::Io(std::io::Error::other("injected save failure")));
        }
        state.content = Some(render_document(document)?);
        state.saves += 1;
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
