// ABOUTME: Session module — durable per-session conversation history.
// ABOUTME: JSONL or Markdown transcript logs, one file per session id.

pub mod error;
pub mod format;
pub mod message;
pub mod paths;
pub mod store;
pub mod transcript;

pub use error::{DecodeError, HistoryError, HistoryResult};
pub use format::Format;
pub use message::{Entry, Message, Role};
pub use paths::{session_id_from_path, session_path};
pub use store::{LogStore, ReadReport, SessionHandle};
pub use transcript::{ParsedTranscript, TranscriptParser};
