// ABOUTME: LogStore — durable per-session message history on the local filesystem.
// ABOUTME: One file per session, reopened on every call, guarded by per-session RW locks.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::config::StoreConfig;

use super::error::{HistoryError, HistoryResult};
use super::format::Format;
use super::message::{Entry, Message};
use super::paths::{session_id_from_path, session_path};

/// Everything decoded from a session log, plus the number of records that
/// were skipped because they could not be decoded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadReport {
    pub entries: Vec<Entry>,
    pub skipped: usize,
}

impl ReadReport {
    pub fn into_messages(self) -> Vec<Message> {
        self.entries.into_iter().map(|entry| entry.message).collect()
    }
}

/// Append-only conversation history keyed by session id.
///
/// Every operation opens the session's file, does its work, and closes it
/// again; nothing is cached between calls. Locking is in-process only: two
/// processes sharing a base directory are not coordinated.
pub struct LogStore {
    base_dir: PathBuf,
    format: Format,
    max_file_size: Option<u64>,
    /// Held shared by per-session operations, exclusively by listing.
    dir_lock: RwLock<()>,
    session_locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl LogStore {
    /// Open a store rooted at `base_dir`, creating the directory if needed.
    ///
    /// `format` defaults to JSONL.
    pub fn new(base_dir: impl Into<PathBuf>, format: Option<Format>) -> HistoryResult<Self> {
        let base_dir = base_dir.into();
        if base_dir.as_os_str().is_empty() {
            return Err(HistoryError::EmptyBaseDir);
        }
        fs::create_dir_all(&base_dir)
            .map_err(|source| HistoryError::io("creating base directory", &base_dir, source))?;

        let format = format.unwrap_or_default();
        info!(base_dir = %base_dir.display(), %format, "opened session log store");

        Ok(Self {
            base_dir,
            format,
            max_file_size: None,
            dir_lock: RwLock::new(()),
            session_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Build a store from the `[store]` config section.
    pub fn from_config(config: &StoreConfig) -> HistoryResult<Self> {
        let store = Self::new(config.resolved_base_dir(), Some(config.format))?;
        Ok(match config.max_file_size {
            Some(max) => store.with_max_file_size(max),
            None => store,
        })
    }

    /// Refuse to read session files larger than `max` bytes.
    pub fn with_max_file_size(mut self, max: u64) -> Self {
        self.max_file_size = Some(max);
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn max_file_size(&self) -> Option<u64> {
        self.max_file_size
    }

    pub fn path_for(&self, session_id: &str) -> PathBuf {
        session_path(&self.base_dir, session_id, self.format)
    }

    /// Append one message to the session's log.
    pub fn write(&self, session_id: &str, message: &Message) -> HistoryResult<()> {
        self.write_entry(session_id, &Entry::from(message.clone()))
    }

    pub fn write_entry(&self, session_id: &str, entry: &Entry) -> HistoryResult<()> {
        self.append_entries(session_id, std::slice::from_ref(entry))
    }

    /// Append messages in order as one batch.
    ///
    /// The batch is written with a single append but is not atomic across a
    /// crash: a torn final record is skipped on the next read.
    pub fn append(&self, session_id: &str, messages: &[Message]) -> HistoryResult<()> {
        let entries: Vec<Entry> = messages.iter().cloned().map(Entry::from).collect();
        self.append_entries(session_id, &entries)
    }

    pub fn append_entries(&self, session_id: &str, entries: &[Entry]) -> HistoryResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        self.with_session_write(session_id, |path| {
            let mut buffer = String::new();
            for entry in entries {
                let block = self
                    .format
                    .encode(entry)
                    .map_err(|source| HistoryError::serialize(path, source))?;
                buffer.push_str(&block);
            }

            ensure_parent_dir(path)?;
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| HistoryError::io("opening session log for append", path, source))?;
            file.write_all(buffer.as_bytes())
                .map_err(|source| HistoryError::io("appending to session log", path, source))?;

            debug!(
                session = session_id,
                path = %path.display(),
                records = entries.len(),
                "appended records"
            );
            Ok(())
        })
    }

    /// All messages in file order. A session that was never written reads
    /// as empty.
    pub fn read(&self, session_id: &str) -> HistoryResult<Vec<Message>> {
        Ok(self.read_entries(session_id)?.into_messages())
    }

    /// Like `read`, but keeps entry timestamps/metadata and reports how many
    /// records were skipped as undecodable.
    pub fn read_entries(&self, session_id: &str) -> HistoryResult<ReadReport> {
        self.with_session_read(session_id, |path| {
            let Some(content) = self.load(path)? else {
                return Ok(ReadReport::default());
            };

            let report = self.format.decode_all(&content);
            if report.skipped > 0 {
                warn!(
                    session = session_id,
                    path = %path.display(),
                    skipped = report.skipped,
                    "skipped undecodable records"
                );
            }
            debug!(
                session = session_id,
                records = report.entries.len(),
                "read session log"
            );
            Ok(report)
        })
    }

    /// The final `n` messages in order, or all of them if there are fewer.
    pub fn last_n(&self, session_id: &str, n: usize) -> HistoryResult<Vec<Message>> {
        let entries = self.last_n_entries(session_id, n)?;
        Ok(entries.into_iter().map(|entry| entry.message).collect())
    }

    /// Like `last_n`, keeping entry timestamps/metadata.
    pub fn last_n_entries(&self, session_id: &str, n: usize) -> HistoryResult<Vec<Entry>> {
        let mut entries = self.read_entries(session_id)?.entries;
        let start = entries.len().saturating_sub(n);
        Ok(entries.split_off(start))
    }

    /// Truncate the session's log. The file stays in place; a missing file
    /// is left missing.
    pub fn clear(&self, session_id: &str) -> HistoryResult<()> {
        self.with_session_write(session_id, |path| {
            match OpenOptions::new().write(true).truncate(true).open(path) {
                Ok(_) => {
                    debug!(session = session_id, "cleared session log");
                    Ok(())
                }
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(HistoryError::io("truncating session log", path, e)),
            }
        })
    }

    /// Remove the session's log file. Deleting a missing session is not an error.
    pub fn delete(&self, session_id: &str) -> HistoryResult<()> {
        self.with_session_write(session_id, |path| match fs::remove_file(path) {
            Ok(()) => {
                debug!(session = session_id, "deleted session log");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(HistoryError::io("removing session log", path, e)),
        })
    }

    /// Whether the session's log file is present (an empty, cleared file counts).
    pub fn exists(&self, session_id: &str) -> HistoryResult<bool> {
        self.with_session_read(session_id, |path| match fs::metadata(path) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(HistoryError::io("checking session log", path, e)),
        })
    }

    /// Ids of every session stored in the active format, sorted.
    pub fn sessions(&self) -> HistoryResult<Vec<String>> {
        let _dir = self.dir_lock.write().unwrap_or_else(PoisonError::into_inner);

        let entries = match fs::read_dir(&self.base_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(HistoryError::io("listing sessions", &self.base_dir, e)),
        };

        let mut sessions = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|source| HistoryError::io("listing sessions", &self.base_dir, source))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(id) = session_id_from_path(&path, self.format) {
                sessions.push(id);
            }
        }
        sessions.sort();
        Ok(sessions)
    }

    /// A handle on the session, creating its (empty) log file if absent.
    ///
    /// The boolean is true when this call created the file.
    pub fn get_or_create(&self, session_id: &str) -> HistoryResult<(SessionHandle<'_>, bool)> {
        let created = self.with_session_write(session_id, |path| {
            ensure_parent_dir(path)?;
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(_) => {
                    debug!(session = session_id, "created session log");
                    Ok(true)
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
                Err(e) => Err(HistoryError::io("creating session log", path, e)),
            }
        })?;
        Ok((self.session(session_id), created))
    }

    /// A handle on the session without touching the filesystem.
    pub fn session(&self, session_id: &str) -> SessionHandle<'_> {
        SessionHandle {
            store: self,
            id: session_id.to_string(),
        }
    }

    fn session_lock(&self, session_id: &str) -> Arc<RwLock<()>> {
        let mut locks = self
            .session_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks.entry(session_id.to_string()).or_default().clone()
    }

    fn with_session_read<T>(
        &self,
        session_id: &str,
        op: impl FnOnce(&Path) -> HistoryResult<T>,
    ) -> HistoryResult<T> {
        let _dir = self.dir_lock.read().unwrap_or_else(PoisonError::into_inner);
        let lock = self.session_lock(session_id);
        let _guard = lock.read().unwrap_or_else(PoisonError::into_inner);
        op(&self.path_for(session_id))
    }

    fn with_session_write<T>(
        &self,
        session_id: &str,
        op: impl FnOnce(&Path) -> HistoryResult<T>,
    ) -> HistoryResult<T> {
        let _dir = self.dir_lock.read().unwrap_or_else(PoisonError::into_inner);
        let lock = self.session_lock(session_id);
        let _guard = lock.write().unwrap_or_else(PoisonError::into_inner);
        op(&self.path_for(session_id))
    }

    /// Read a session file into memory, honoring the size limit.
    /// `None` means the file does not exist.
    fn load(&self, path: &Path) -> HistoryResult<Option<String>> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(HistoryError::io("opening session log", path, e)),
        };

        let too_large = |size: u64, max: u64| HistoryError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            max,
        };

        let bytes = match self.max_file_size {
            Some(max) => {
                let size = file
                    .metadata()
                    .map_err(|source| HistoryError::io("checking session log size", path, source))?
                    .len();
                if size > max {
                    return Err(too_large(size, max));
                }
                // The file may have grown since the stat.
                read_capped(&file, max)
                    .map_err(|source| HistoryError::io("reading session log", path, source))?
                    .map_err(|read| too_large(read, max))?
            }
            None => {
                let mut bytes = Vec::new();
                (&file)
                    .read_to_end(&mut bytes)
                    .map_err(|source| HistoryError::io("reading session log", path, source))?;
                bytes
            }
        };
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }
}

/// Read at most `max` bytes. `Err(n)` reports that more than `max` bytes
/// were available (`n` is how many were read before stopping).
fn read_capped(reader: impl Read, max: u64) -> std::io::Result<Result<Vec<u8>, u64>> {
    let mut bytes = Vec::new();
    reader.take(max.saturating_add(1)).read_to_end(&mut bytes)?;
    let read = bytes.len() as u64;
    Ok(if read > max { Err(read) } else { Ok(bytes) })
}

fn ensure_parent_dir(path: &Path) -> HistoryResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|source| HistoryError::io("creating session directory", parent, source))?;
    }
    Ok(())
}

/// A store bound to one session id.
pub struct SessionHandle<'a> {
    store: &'a LogStore,
    id: String,
}

impl SessionHandle<'_> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> PathBuf {
        self.store.path_for(&self.id)
    }

    pub fn write(&self, message: &Message) -> HistoryResult<()> {
        self.store.write(&self.id, message)
    }

    pub fn append(&self, messages: &[Message]) -> HistoryResult<()> {
        self.store.append(&self.id, messages)
    }

    pub fn read(&self) -> HistoryResult<Vec<Message>> {
        self.store.read(&self.id)
    }

    pub fn last_n(&self, n: usize) -> HistoryResult<Vec<Message>> {
        self.store.last_n(&self.id, n)
    }

    pub fn clear(&self) -> HistoryResult<()> {
        self.store.clear(&self.id)
    }

    pub fn exists(&self) -> HistoryResult<bool> {
        self.store.exists(&self.id)
    }
}
