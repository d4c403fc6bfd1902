// ABOUTME: Serialization formats for session logs — JSONL records and Markdown transcripts.
// ABOUTME: A closed enum; Markdown decoding is delegated whole-file to the transcript parser.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::error::DecodeError;
use super::message::{Entry, Role};
use super::store::ReadReport;
use super::transcript::{
    ASSISTANT_HEADER, SYSTEM_HEADER, TOOL_HEADER, TranscriptParser, USER_HEADER,
};

/// Timestamp layout used in transcript headers. Written, never parsed back.
pub const TRANSCRIPT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// On-disk representation of a session log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Format {
    /// One JSON record per line, for machine replay.
    #[default]
    Jsonl,
    /// Headed prose blocks, for humans.
    Markdown,
}

impl Format {
    pub fn extension(self) -> &'static str {
        match self {
            Format::Jsonl => "jsonl",
            Format::Markdown => "md",
        }
    }

    /// Encode one entry as a complete on-disk block, trailing line break included.
    pub fn encode(self, entry: &Entry) -> Result<String, serde_json::Error> {
        match self {
            Format::Jsonl => {
                let mut line = serde_json::to_string(entry)?;
                line.push('\n');
                Ok(line)
            }
            Format::Markdown => Ok(render_transcript_block(entry)),
        }
    }

    /// Encode entries back to back, for display.
    pub fn render(self, entries: &[Entry]) -> Result<String, serde_json::Error> {
        entries.iter().map(|entry| self.encode(entry)).collect()
    }

    /// Decode a single record.
    ///
    /// Transcripts can't be reconstructed line by line, so `Markdown` always
    /// reports `LineDecodeUnsupported`; use `decode_all` instead.
    pub fn decode_line(self, line: &str) -> Result<Entry, DecodeError> {
        match self {
            Format::Jsonl => {
                let line = line.trim();
                if line.is_empty() {
                    return Err(DecodeError::Blank);
                }
                Ok(serde_json::from_str(line)?)
            }
            Format::Markdown => Err(DecodeError::LineDecodeUnsupported),
        }
    }

    /// Decode a whole file's contents, skipping what can't be decoded.
    pub fn decode_all(self, content: &str) -> ReadReport {
        match self {
            Format::Jsonl => {
                let mut report = ReadReport::default();
                for line in split_records(content) {
                    match self.decode_line(line) {
                        Ok(entry) => report.entries.push(entry),
                        Err(DecodeError::Blank) => {}
                        Err(_) => report.skipped += 1,
                    }
                }
                report
            }
            Format::Markdown => TranscriptParser::parse(content).into(),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Jsonl => f.write_str("jsonl"),
            Format::Markdown => f.write_str("markdown"),
        }
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jsonl" | "structured" => Ok(Format::Jsonl),
            "markdown" | "md" | "transcript" => Ok(Format::Markdown),
            other => Err(format!(
                "unknown format '{}', expected jsonl or markdown",
                other
            )),
        }
    }
}

impl TryFrom<String> for Format {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Split file contents into lines on LF, CRLF, or bare CR.
///
/// A CRLF pair yields an empty piece between the two breaks; callers skip
/// blank lines anyway.
pub(crate) fn split_records(content: &str) -> impl Iterator<Item = &str> {
    content.split(['\n', '\r'])
}

fn render_transcript_block(entry: &Entry) -> String {
    let stamp = match entry.timestamp {
        Some(ts) => DateTime::<Local>::from(ts),
        None => Local::now(),
    }
    .format(TRANSCRIPT_TIME_FORMAT);

    let message = &entry.message;
    let header = match &message.role {
        Role::System => format!("{} [{}]", SYSTEM_HEADER, stamp),
        Role::User => format!("{} [{}]", USER_HEADER, stamp),
        Role::Assistant => format!("{} [{}]", ASSISTANT_HEADER, stamp),
        Role::Tool => format!(
            "{} {} [{}]",
            TOOL_HEADER,
            message.tool_call_id.as_deref().unwrap_or_default(),
            stamp
        ),
        Role::Other(role) => format!("### {} [{}]", role, stamp),
    };

    format!("\n{}\n\n{}\n", header, message.content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::message::Message;
    use chrono::{TimeZone, Utc};

    #[test]
    fn extensions_differ_by_format() {
        assert_eq!(Format::Jsonl.extension(), "jsonl");
        assert_eq!(Format::Markdown.extension(), "md");
        assert_eq!(Format::default(), Format::Jsonl);
    }

    #[test]
    fn jsonl_encode_is_single_line_without_empty_fields() {
        let line = Format::Jsonl
            .encode(&Entry::from(Message::user("multi\nline")))
            .unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        assert_eq!(line, "{\"role\":\"user\",\"content\":\"multi\\nline\"}\n");
    }

    #[test]
    fn jsonl_decode_rejects_garbage() {
        let err = Format::Jsonl.decode_line("{not json").unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[test]
    fn markdown_line_decode_is_unsupported() {
        let err = Format::Markdown.decode_line("### User [x]").unwrap_err();
        assert!(matches!(err, DecodeError::LineDecodeUnsupported));
    }

    #[test]
    fn jsonl_decode_all_handles_mixed_line_endings() {
        let content = "{\"role\":\"user\",\"content\":\"a\"}\r\n\
                       {\"role\":\"assistant\",\"content\":\"b\"}\r\
                       {\"role\":\"user\",\"content\":\"c\"}";
        let report = Format::Jsonl.decode_all(content);
        assert_eq!(report.skipped, 0);
        let texts: Vec<_> = report
            .entries
            .iter()
            .map(|e| e.message.content.as_str())
            .collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn markdown_headers_by_role() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let stamp = DateTime::<Local>::from(ts)
            .format(TRANSCRIPT_TIME_FORMAT)
            .to_string();
        let block = |msg: Message| {
            let entry = Entry {
                message: msg,
                timestamp: Some(ts),
                metadata: None,
            };
            Format::Markdown.encode(&entry).unwrap()
        };

        assert_eq!(
            block(Message::system("be brief")),
            format!("\n## System [{}]\n\nbe brief\n", stamp)
        );
        assert_eq!(
            block(Message::user("hi")),
            format!("\n### User [{}]\n\nhi\n", stamp)
        );
        assert_eq!(
            block(Message::assistant("hello")),
            format!("\n### Assistant [{}]\n\nhello\n", stamp)
        );
        assert_eq!(
            block(Message::tool("call-1", "done")),
            format!("\n#### Tool: call-1 [{}]\n\ndone\n", stamp)
        );
        assert_eq!(
            block(Message::new(Role::from("critic"), "meh")),
            format!("\n### critic [{}]\n\nmeh\n", stamp)
        );
    }

    #[test]
    fn format_parses_aliases() {
        assert_eq!("structured".parse::<Format>().unwrap(), Format::Jsonl);
        assert_eq!("MD".parse::<Format>().unwrap(), Format::Markdown);
        assert_eq!("transcript".parse::<Format>().unwrap(), Format::Markdown);
        assert!("yaml".parse::<Format>().is_err());
    }

    #[test]
    fn serde_accepts_the_same_spellings_as_from_str() {
        for (text, want) in [
            ("\"Markdown\"", Format::Markdown),
            ("\"MD\"", Format::Markdown),
            ("\"transcript\"", Format::Markdown),
            ("\"JSONL\"", Format::Jsonl),
            ("\"structured\"", Format::Jsonl),
        ] {
            assert_eq!(serde_json::from_str::<Format>(text).unwrap(), want);
        }
        assert!(serde_json::from_str::<Format>("\"yaml\"").is_err());
        assert_eq!(serde_json::to_string(&Format::Markdown).unwrap(), "\"markdown\"");
    }

    #[test]
    fn render_keeps_entry_timestamps() {
        let ts = Utc.with_ymd_and_hms(2020, 1, 1, 8, 30, 0).unwrap();
        let entries = vec![
            Entry {
                message: Message::user("old"),
                timestamp: Some(ts),
                metadata: None,
            },
            Entry::from(Message::assistant("reply")),
        ];

        let raw = Format::Jsonl.render(&entries).unwrap();
        assert_eq!(raw.lines().count(), 2);
        assert!(raw.lines().next().unwrap().contains("\"timestamp\":\"2020-01-01T08:30:00"));

        let stamp = DateTime::<Local>::from(ts)
            .format(TRANSCRIPT_TIME_FORMAT)
            .to_string();
        let transcript = Format::Markdown.render(&entries).unwrap();
        assert!(transcript.starts_with(&format!("\n### User [{}]\n\nold\n", stamp)));
    }
}
