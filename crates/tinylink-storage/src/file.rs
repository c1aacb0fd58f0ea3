use crate::index::MappingIndex;
use crate::Result;
use async_trait::async_trait;
use jiff::Timestamp;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tinylink_core::{
    InsertOutcome, MappingStore, OwnerId, ReadStore, Resolved, ShortCode, ShortMapping,
    StorageError, StoreStats,
};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

/// One line of the log: a full snapshot of a mapping at the time of writing.
///
/// Older logs stored the complete short link in `short_url` and may lack the
/// owner, tombstone, and timestamp fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LogRecord {
    #[serde(default)]
    uuid: String,
    short_url: String,
    original_url: String,
    #[serde(default)]
    user_uuid: String,
    #[serde(default)]
    is_deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<Timestamp>,
}

impl From<&ShortMapping> for LogRecord {
    fn from(mapping: &ShortMapping) -> Self {
        Self {
            uuid: mapping.id.to_string(),
            short_url: mapping.short_code.to_string(),
            original_url: mapping.original_url.clone(),
            user_uuid: mapping.owner_id.as_str().to_string(),
            is_deleted: mapping.deleted,
            created_at: Some(mapping.created_at),
        }
    }
}

impl LogRecord {
    fn into_mapping(self) -> Result<ShortMapping> {
        let raw_code = self
            .short_url
            .rsplit('/')
            .next()
            .unwrap_or(self.short_url.as_str());
        let short_code = ShortCode::new(raw_code)
            .map_err(|e| StorageError::InvalidData(format!("record '{}': {e}", self.short_url)))?;

        let id = Uuid::parse_str(&self.uuid).unwrap_or_else(|_| {
            debug!(code = %short_code, "record has no usable uuid, assigning one");
            Uuid::new_v4()
        });

        Ok(ShortMapping {
            id,
            short_code,
            original_url: self.original_url,
            owner_id: OwnerId::new(self.user_uuid),
            deleted: self.is_deleted,
            created_at: self.created_at.unwrap_or(Timestamp::UNIX_EPOCH),
        })
    }
}

struct Replayed {
    index: MappingIndex,
    /// Length to cut the log back to when its last record is torn.
    truncate_to: Option<u64>,
    needs_newline: bool,
}

/// The open log and the length of its last complete record.
#[derive(Debug)]
struct LogFile {
    file: File,
    committed: u64,
}

fn io_error(path: &Path, err: std::io::Error) -> StorageError {
    StorageError::Unavailable(format!("{}: {err}", path.display()))
}

/// Append-only file log with an in-memory index.
///
/// Every insert and every tombstone appends one JSON line. On open the whole
/// log is replayed in order; the last record for a short code wins, and so
/// does the last record for an original URL. The log is never compacted.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    index: Mutex<MappingIndex>,
    /// Held for the whole check-append-apply sequence of every mutation, so
    /// the log order matches the order in which the index changed.
    log: tokio::sync::Mutex<LogFile>,
}

impl FileStore {
    /// Opens (creating if needed) the log at `path` and rebuilds the index.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let Replayed {
            index,
            truncate_to,
            needs_newline,
        } = Self::replay(&path).await?;

        if let Some(len) = truncate_to {
            let file = OpenOptions::new()
                .write(true)
                .open(&path)
                .await
                .map_err(|e| io_error(&path, e))?;
            file.set_len(len).await.map_err(|e| io_error(&path, e))?;
        }

        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| io_error(&path, e))?;

        if needs_newline {
            // Terminate a torn trailing line so the next record starts cleanly.
            log.write_all(b"\n").await.map_err(|e| io_error(&path, e))?;
            log.flush().await.map_err(|e| io_error(&path, e))?;
        }

        let committed = log
            .metadata()
            .await
            .map_err(|e| io_error(&path, e))?
            .len();

        info!(path = %path.display(), mappings = index.len(), "opened file store");

        Ok(Self {
            path,
            index: Mutex::new(index),
            log: tokio::sync::Mutex::new(LogFile {
                file: log,
                committed,
            }),
        })
    }

    /// Returns the path of the backing log.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn replay(path: &Path) -> Result<Replayed> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(err) => return Err(io_error(path, err)),
        };

        // (line number, byte offset of the line start, line text)
        let mut lines = Vec::new();
        let mut offset = 0;
        for (line_no, raw) in contents.split_inclusive('\n').enumerate() {
            if !raw.trim().is_empty() {
                lines.push((line_no + 1, offset, raw.trim_end_matches(['\n', '\r'])));
            }
            offset += raw.len();
        }

        let mut index = MappingIndex::new();
        let mut truncate_to = None;
        for (position, &(line_no, start, line)) in lines.iter().enumerate() {
            match serde_json::from_str::<LogRecord>(line) {
                Ok(record) => index.apply(record.into_mapping()?),
                Err(err) if position + 1 == lines.len() => {
                    warn!(
                        path = %path.display(),
                        line = line_no,
                        error = %err,
                        "dropping truncated trailing record"
                    );
                    truncate_to = Some(start as u64);
                }
                Err(err) => {
                    return Err(StorageError::InvalidData(format!(
                        "{} line {line_no}: {err}",
                        path.display()
                    )));
                }
            }
        }

        let needs_newline =
            truncate_to.is_none() && !contents.is_empty() && !contents.ends_with('\n');

        Ok(Replayed {
            index,
            truncate_to,
            needs_newline,
        })
    }

    /// Appends one record. Whatever a failed write leaves behind is cut off,
    /// so the log only ever grows by complete lines.
    async fn append(&self, log: &mut LogFile, mapping: &ShortMapping) -> Result<()> {
        let mut line = serde_json::to_string(&LogRecord::from(mapping))
            .map_err(|e| StorageError::Operation(format!("serialize record: {e}")))?;
        line.push('\n');

        let on_disk = log
            .file
            .metadata()
            .await
            .map_err(|e| io_error(&self.path, e))?
            .len();
        if on_disk != log.committed {
            warn!(
                path = %self.path.display(),
                committed = log.committed,
                on_disk,
                "discarding partial record left by a failed write"
            );
            log.file
                .set_len(log.committed)
                .await
                .map_err(|e| io_error(&self.path, e))?;
        }

        let written = match log.file.write_all(line.as_bytes()).await {
            Ok(()) => log.file.flush().await,
            Err(err) => Err(err),
        };
        if let Err(err) = written {
            if let Err(rollback) = log.file.set_len(log.committed).await {
                error!(
                    path = %self.path.display(),
                    error = %rollback,
                    "failed to roll back partial record"
                );
            }
            return Err(io_error(&self.path, err));
        }

        log.committed += line.len() as u64;
        Ok(())
    }
}

#[async_trait]
impl ReadStore for FileStore {
    async fn resolve(&self, code: &ShortCode) -> Result<Option<Resolved>> {
        Ok(self.index.lock().resolve(code))
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<ShortMapping>> {
        Ok(self.index.lock().list_by_owner(owner))
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats> {
        Ok(self.index.lock().stats())
    }
}

#[async_trait]
impl MappingStore for FileStore {
    async fn insert(&self, mapping: ShortMapping) -> Result<InsertOutcome> {
        let mut log = self.log.lock().await;

        let existing = self.index.lock().existing_code(&mapping)?;
        if let Some(existing) = existing {
            return Ok(InsertOutcome::AlreadyExists(existing));
        }

        self.append(&mut log, &mapping).await?;
        trace!(code = %mapping.short_code, "appended mapping to log");
        self.index.lock().apply(mapping);
        Ok(InsertOutcome::Inserted)
    }

    async fn mark_deleted(&self, code: &ShortCode, owner: &OwnerId) -> Result<bool> {
        let mut log = self.log.lock().await;

        let tombstoned = self.index.lock().tombstone_of(code, owner);
        let Some(tombstoned) = tombstoned else {
            return Ok(false);
        };

        self.append(&mut log, &tombstoned).await?;
        trace!(code = %code, "appended tombstone to log");
        self.index.lock().apply(tombstoned);
        Ok(true)
    }
}
