//! JSONL-backed document store for user records.
//!
//! Every mutation is appended as a JSON line and applied to an in-memory
//! map of user records; reopening the store replays the log to rebuild
//! state. A single lock serializes operations, so appends for a given user
//! are atomic with respect to each other and the read-append-return of one
//! operation can never interleave with another's.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::domain::{ChatMessage, UserRecord};
use crate::history::MESSAGES_FIELD;

/// Errors from the history store
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store is closed")]
    Closed,
}

/// One entry in the op log (append-only)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HistoryOp {
    timestamp: DateTime<Utc>,
    user_id: String,
    op: OpType,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum OpType {
    UserCreated,
    FieldAppended,
    FieldCleared,
}

struct Inner {
    users: HashMap<String, UserRecord>,
    /// Open append handle; None once the store is closed
    log: Option<File>,
}

/// Handle to the conversation history store.
///
/// Constructed explicitly with [`HistoryStore::open`] and shut down with
/// [`HistoryStore::close`]; callers receive it by injection rather than
/// through a process-wide singleton.
pub struct HistoryStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl HistoryStore {
    /// Open the store at `path`, replaying any existing log
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let users = Self::replay(&path).await?;
        debug!(users = users.len(), path = %path.display(), "history store opened");

        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            inner: Mutex::new(Inner {
                users,
                log: Some(log),
            }),
        })
    }

    /// Path of the backing log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and release the log handle; later operations fail with
    /// [`HistoryError::Closed`]
    pub async fn close(&self) -> Result<(), HistoryError> {
        let mut inner = self.inner.lock().await;
        if let Some(mut log) = inner.log.take() {
            log.flush().await?;
            info!(path = %self.path.display(), "history store closed");
        }
        Ok(())
    }

    /// Find a user record, inserting an empty one if absent
    pub async fn find_or_create_user(&self, user_id: &str) -> Result<UserRecord, HistoryError> {
        let mut inner = self.inner.lock().await;

        if let Some(user) = inner.users.get(user_id) {
            return Ok(user.clone());
        }

        let op = HistoryOp {
            timestamp: Utc::now(),
            user_id: user_id.to_string(),
            op: OpType::UserCreated,
            field: None,
            value: None,
        };
        Self::append_op(&mut inner, &op).await?;
        Self::apply(&mut inner.users, op);

        Ok(Self::snapshot(&inner, user_id))
    }

    /// Append `value` to a named array field, creating the field as a
    /// singleton (and the user, if absent) on first append. Returns the
    /// updated record.
    pub async fn append_to_array_field(
        &self,
        user_id: &str,
        field: &str,
        value: Value,
    ) -> Result<UserRecord, HistoryError> {
        let mut inner = self.inner.lock().await;

        if !inner.users.contains_key(user_id) {
            let created = HistoryOp {
                timestamp: Utc::now(),
                user_id: user_id.to_string(),
                op: OpType::UserCreated,
                field: None,
                value: None,
            };
            Self::append_op(&mut inner, &created).await?;
            Self::apply(&mut inner.users, created);
        }

        let op = HistoryOp {
            timestamp: Utc::now(),
            user_id: user_id.to_string(),
            op: OpType::FieldAppended,
            field: Some(field.to_string()),
            value: Some(value),
        };
        Self::append_op(&mut inner, &op).await?;
        Self::apply(&mut inner.users, op);

        Ok(Self::snapshot(&inner, user_id))
    }

    /// Empty a named array field, keeping the record itself. Returns the
    /// updated record.
    pub async fn clear_array_field(
        &self,
        user_id: &str,
        field: &str,
    ) -> Result<UserRecord, HistoryError> {
        let mut inner = self.inner.lock().await;

        if !inner.users.contains_key(user_id) {
            let created = HistoryOp {
                timestamp: Utc::now(),
                user_id: user_id.to_string(),
                op: OpType::UserCreated,
                field: None,
                value: None,
            };
            Self::append_op(&mut inner, &created).await?;
            Self::apply(&mut inner.users, created);
        }

        let op = HistoryOp {
            timestamp: Utc::now(),
            user_id: user_id.to_string(),
            op: OpType::FieldCleared,
            field: Some(field.to_string()),
            value: None,
        };
        Self::append_op(&mut inner, &op).await?;
        Self::apply(&mut inner.users, op);

        Ok(Self::snapshot(&inner, user_id))
    }

    /// Append a conversation message for a user
    pub async fn append_message(
        &self,
        user_id: &str,
        message: ChatMessage,
    ) -> Result<UserRecord, HistoryError> {
        let value = serde_json::to_value(&message)?;
        self.append_to_array_field(user_id, MESSAGES_FIELD, value)
            .await
    }

    /// Clear a user's conversation history
    pub async fn clear_messages(&self, user_id: &str) -> Result<UserRecord, HistoryError> {
        self.clear_array_field(user_id, MESSAGES_FIELD).await
    }

    /// Cloned view of a user record, present by construction after apply
    fn snapshot(inner: &Inner, user_id: &str) -> UserRecord {
        inner
            .users
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| UserRecord::new(user_id))
    }

    /// Write one op line and flush
    async fn append_op(inner: &mut Inner, op: &HistoryOp) -> Result<(), HistoryError> {
        let log = inner.log.as_mut().ok_or(HistoryError::Closed)?;
        let json = serde_json::to_string(op)?;
        log.write_all(format!("{}\n", json).as_bytes()).await?;
        log.flush().await?;
        Ok(())
    }

    /// Replay the log into a fresh user map
    async fn replay(path: &Path) -> Result<HashMap<String, UserRecord>, HistoryError> {
        let mut users = HashMap::new();

        if !path.exists() {
            return Ok(users);
        }

        let file = File::open(path).await?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let op: HistoryOp = serde_json::from_str(&line)?;
            Self::apply(&mut users, op);
        }

        Ok(users)
    }

    /// Apply a single op to the state
    fn apply(users: &mut HashMap<String, UserRecord>, op: HistoryOp) {
        match op.op {
            OpType::UserCreated => {
                users
                    .entry(op.user_id.clone())
                    .or_insert_with(|| UserRecord::new(op.user_id));
            }
            OpType::FieldAppended => {
                if let (Some(field), Some(value)) = (op.field, op.value) {
                    let user = users
                        .entry(op.user_id.clone())
                        .or_insert_with(|| UserRecord::new(op.user_id));
                    user.fields.entry(field).or_default().push(value);
                }
            }
            OpType::FieldCleared => {
                if let Some(field) = op.field {
                    let user = users
                        .entry(op.user_id.clone())
                        .or_insert_with(|| UserRecord::new(op.user_id));
                    user.fields.insert(field, Vec::new());
                }
            }
        }
    }
}
