// ABOUTME: Stateful scanner that rebuilds messages from a Markdown transcript.
// ABOUTME: Headers open messages, tool headers emit immediately, stray `#` lines are noise.

use super::message::{Entry, Message, Role};
use super::store::ReadReport;

pub const SYSTEM_HEADER: &str = "## System";
pub const USER_HEADER: &str = "### User";
pub const ASSISTANT_HEADER: &str = "### Assistant";
pub const TOOL_HEADER: &str = "#### Tool:";

const HEADER_MARKER: char = '#';

/// Messages recovered from a transcript, plus how many non-blank lines
/// could not be attributed to any message.
#[derive(Debug, Default)]
pub struct ParsedTranscript {
    pub messages: Vec<Message>,
    pub skipped: usize,
}

impl From<ParsedTranscript> for ReadReport {
    fn from(parsed: ParsedTranscript) -> Self {
        ReadReport {
            entries: parsed.messages.into_iter().map(Entry::from).collect(),
            skipped: parsed.skipped,
        }
    }
}

#[derive(Debug)]
enum State {
    Idle,
    Accumulating { role: Role, content: String },
}

/// Line-fed transcript decoder.
///
/// Tool headers carry no body: the tool message is emitted with empty
/// content and the parser returns to idle, so prose written under a tool
/// header is dropped. Transcripts are for reading; replay should use JSONL.
#[derive(Debug)]
pub struct TranscriptParser {
    state: State,
    messages: Vec<Message>,
    skipped: usize,
}

impl Default for TranscriptParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptParser {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            messages: Vec::new(),
            skipped: 0,
        }
    }

    /// Parse a whole transcript.
    pub fn parse(content: &str) -> ParsedTranscript {
        let mut parser = Self::new();
        for line in content.split('\n') {
            parser.feed_line(line.strip_suffix('\r').unwrap_or(line));
        }
        parser.finish()
    }

    /// Feed one line, without its line break.
    pub fn feed_line(&mut self, line: &str) {
        if is_header(line, TOOL_HEADER) {
            self.close_current();
            let tool_call_id = parse_tool_call_id(line);
            self.messages.push(Message {
                role: Role::Tool,
                content: String::new(),
                tool_call_id,
            });
            return;
        }

        if let Some(role) = header_role(line) {
            self.close_current();
            self.state = State::Accumulating {
                role,
                content: String::new(),
            };
            return;
        }

        if line.starts_with(HEADER_MARKER) {
            self.skipped += 1;
            return;
        }

        match &mut self.state {
            State::Accumulating { content, .. } => {
                content.push_str(line);
                content.push('\n');
            }
            State::Idle => {
                if !line.trim().is_empty() {
                    self.skipped += 1;
                }
            }
        }
    }

    /// Flush the in-progress message, if it has any content, and return
    /// everything decoded.
    pub fn finish(mut self) -> ParsedTranscript {
        if let State::Accumulating { role, content } =
            std::mem::replace(&mut self.state, State::Idle)
        {
            let content = content.trim();
            if !content.is_empty() {
                self.messages.push(Message::new(role, content));
            }
        }
        ParsedTranscript {
            messages: self.messages,
            skipped: self.skipped,
        }
    }

    fn close_current(&mut self) {
        if let State::Accumulating { role, content } =
            std::mem::replace(&mut self.state, State::Idle)
        {
            self.messages.push(Message::new(role, content.trim()));
        }
    }
}

/// `header` followed by a space or the end of the line, so `### Userbot`
/// is not mistaken for `### User`.
fn is_header(line: &str, header: &str) -> bool {
    line.strip_prefix(header)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(' '))
}

fn header_role(line: &str) -> Option<Role> {
    if is_header(line, SYSTEM_HEADER) {
        Some(Role::System)
    } else if is_header(line, USER_HEADER) {
        Some(Role::User)
    } else if is_header(line, ASSISTANT_HEADER) {
        Some(Role::Assistant)
    } else {
        None
    }
}

/// `#### Tool: <id> [<timestamp>]` → `<id>`. A header written without an id
/// goes straight to the bracketed timestamp.
fn parse_tool_call_id(line: &str) -> Option<String> {
    line.split_whitespace()
        .nth(2)
        .filter(|token| !token.starts_with('['))
        .map(str::to_string)
}
