//! # Chat Store
//!
//! Owns every `ChatRecord` and persists them to the chats file (a JSON array).
//! Each record sits behind its own lock so turns for different chats never wait on
//! each other, while the index itself is guarded by a store-wide lock.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

use crate::domain::error::StoreError;
use crate::domain::types::{ChatId, ChatRecord};
use crate::strings::logs;

pub type SharedChat = Arc<Mutex<ChatRecord>>;

#[derive(Default)]
struct Index {
    /// Registration order.
    order: Vec<ChatId>,
    chats: HashMap<ChatId, SharedChat>,
}

impl Index {
    fn insert(&mut self, record: ChatRecord) -> SharedChat {
        let cid = record.cid.clone();
        let shared = Arc::new(Mutex::new(record));
        self.order.push(cid.clone());
        self.chats.insert(cid, shared.clone());
        shared
    }
}

/// What `load` does with a chats file that is not a JSON array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Move the file aside so the next save starts clean. Used by the running bot.
    Quarantine,
    /// Leave the file untouched. Used by reporting commands.
    ReadOnly,
}

pub struct ChatStore {
    path: PathBuf,
    index: Mutex<Index>,
    /// Held from snapshot to rename so the newest snapshot is always written last.
    save_lock: Mutex<()>,
}

impl ChatStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            index: Mutex::new(Index::default()),
            save_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn len(&self) -> usize {
        self.index.lock().await.order.len()
    }

    /// Returns the record for `cid`, registering a new one in state NEW if the chat is unseen.
    /// The flag is `true` when the record was created by this call.
    pub async fn lookup_or_create(
        &self,
        cid: &ChatId,
        display_name: &str,
        handle: &str,
    ) -> (SharedChat, bool) {
        let mut index = self.index.lock().await;
        if let Some(existing) = index.chats.get(cid) {
            tracing::debug!("Reusing chat state {}", cid);
            return (existing.clone(), false);
        }
        tracing::info!("Registering new chat {} (@{})", cid, handle);
        (
            index.insert(ChatRecord::new(cid.clone(), display_name, handle)),
            true,
        )
    }

    /// Clones every record in registration order, each read under its own lock.
    pub async fn snapshot(&self) -> Vec<ChatRecord> {
        let shared: Vec<SharedChat> = {
            let index = self.index.lock().await;
            index
                .order
                .iter()
                .filter_map(|cid| index.chats.get(cid).cloned())
                .collect()
        };

        let mut records = Vec::with_capacity(shared.len());
        for chat in shared {
            records.push(chat.lock().await.clone());
        }
        records
    }

    /// Writes all records to the chats file. The file is replaced atomically.
    pub async fn save_all(&self) -> Result<usize, StoreError> {
        let _saving = self.save_lock.lock().await;
        let records = self.snapshot().await;
        let content = serde_json::to_string_pretty(&records)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| self.write_error(source))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|source| self.write_error(source))?;
        fs::rename(&tmp, &self.path).map_err(|source| self.write_error(source))?;

        tracing::info!(
            "{}",
            logs::chats_saved(records.len(), &self.path.display().to_string())
        );
        Ok(records.len())
    }

    /// Repopulates the store from the chats file.
    ///
    /// A missing or blank file is a fresh start. Records that fail to parse are skipped.
    /// A file that is not a JSON array is moved aside and the store starts empty;
    /// the returned `StoreError::Corrupt` tells the caller where the backup went.
    pub async fn load_all(&self) -> Result<usize, StoreError> {
        self.load(LoadMode::Quarantine).await
    }

    /// Loads with an explicit policy for a corrupt file. `Quarantine` behaves like
    /// `load_all`; `ReadOnly` returns `StoreError::Unparseable` and never touches the file.
    pub async fn load(&self, mode: LoadMode) -> Result<usize, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No chats file at {}, starting fresh", self.path.display());
                return Ok(0);
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if content.trim().is_empty() {
            return Ok(0);
        }

        let raw: Vec<serde_json::Value> = match serde_json::from_str(&content) {
            Ok(raw) => raw,
            Err(e) if mode == LoadMode::Quarantine => return Err(self.quarantine(&e.to_string())),
            Err(e) => {
                return Err(StoreError::Unparseable {
                    path: self.path.clone(),
                    reason: e.to_string(),
                });
            }
        };

        let mut index = self.index.lock().await;
        let mut loaded = 0;
        for (i, value) in raw.into_iter().enumerate() {
            match serde_json::from_value::<ChatRecord>(value) {
                Ok(record) if index.chats.contains_key(&record.cid) => {
                    tracing::warn!("Duplicate chat {} in chats file, keeping the first", record.cid);
                }
                Ok(record) => {
                    index.insert(record);
                    loaded += 1;
                }
                Err(e) => tracing::warn!("{}", logs::record_skipped(i, &e.to_string())),
            }
        }

        tracing::info!(
            "{}",
            logs::chats_loaded(loaded, &self.path.display().to_string())
        );
        Ok(loaded)
    }

    fn quarantine(&self, reason: &str) -> StoreError {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let mut backup = self.path.clone().into_os_string();
        backup.push(format!(".corrupt-{stamp}"));
        let backup = PathBuf::from(backup);

        if let Err(e) = fs::rename(&self.path, &backup) {
            tracing::error!("Failed to move corrupt chats file aside: {}", e);
        }
        StoreError::Corrupt {
            path: self.path.clone(),
            backup,
            reason: reason.to_string(),
        }
    }

    fn write_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Write {
            path: self.path.clone(),
            source,
        }
    }
}
