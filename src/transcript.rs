use crate::models::{Message, MessageRole};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Leading marker on messages the CLI injects about itself; such messages are
/// never used for conversation naming.
pub const CAVEAT_PREFIX: &str = "Caveat:";
const CAVEAT: &str = "Caveat";

/// Sentinel creation date used when neither a timestamp nor a file mtime is
/// available.
pub const EPOCH_FALLBACK: &str = "2000-01-01T00:00:00.000Z";

pub const EMPTY_CONVERSATION_NAME: &str = "Empty conversation";
pub const UNREADABLE_CONVERSATION_NAME: &str = "Unable to read conversation";

const NAME_MAX_CHARS: usize = 60;

/// One parsed transcript line. Every record keeps its timestamp regardless of
/// kind, because creation-date derivation takes the first timestamp it sees
/// even on record types we otherwise ignore.
#[derive(Debug)]
pub struct TranscriptRecord {
    pub kind: RecordKind,
    pub timestamp: Option<String>,
}

#[derive(Debug)]
pub enum RecordKind {
    Summary { summary: String },
    User { message: Value },
    Assistant { message: Value },
    /// Any type tag we do not know (e.g. "file-history-snapshot").
    Other { record_type: String },
}

/// Parse a single transcript line. Blank lines and lines that are not valid
/// JSON yield `None`; a bad line never aborts reading the rest of the file.
pub fn parse_record(line: &str) -> Option<TranscriptRecord> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let obj: Value = serde_json::from_str(line).ok()?;

    let timestamp = obj
        .get("timestamp")
        .and_then(Value::as_str)
        .map(String::from);
    let record_type = obj.get("type").and_then(Value::as_str).unwrap_or("");

    let kind = match record_type {
        "summary" => RecordKind::Summary {
            summary: obj
                .get("summary")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
        },
        "user" => RecordKind::User {
            message: obj.get("message").cloned().unwrap_or(Value::Null),
        },
        "assistant" => RecordKind::Assistant {
            message: obj.get("message").cloned().unwrap_or(Value::Null),
        },
        other => RecordKind::Other {
            record_type: other.to_string(),
        },
    };

    Some(TranscriptRecord { kind, timestamp })
}

/// Derive a display name for a transcript.
///
/// The first parsed record wins if it is a summary whose text is non-empty
/// and free of the caveat marker. Otherwise the first user message with
/// usable text (after tag stripping, trimming and the caveat check) is
/// truncated to 60 characters. A transcript with no usable message still gets
/// a name.
pub fn derive_name(transcript_path: &Path) -> String {
    let content = match fs::read_to_string(transcript_path) {
        Ok(c) => c,
        Err(err) => {
            debug!(path = %transcript_path.display(), %err, "transcript unreadable");
            return UNREADABLE_CONVERSATION_NAME.to_string();
        }
    };

    let mut records = content.lines().filter_map(parse_record);

    let first = records.next();
    if let Some(TranscriptRecord {
        kind: RecordKind::Summary { summary },
        ..
    }) = &first
    {
        if !summary.is_empty() && !summary.contains(CAVEAT) {
            return summary.clone();
        }
    }

    for record in first.into_iter().chain(records) {
        if let RecordKind::User { message } = &record.kind {
            if let Some(name) = name_from_user_message(message) {
                return name;
            }
        }
    }

    EMPTY_CONVERSATION_NAME.to_string()
}

fn name_from_user_message(message: &Value) -> Option<String> {
    let content = message.get("content")?;
    match content {
        Value::String(text) => usable_name_text(text),
        Value::Array(items) => items
            .iter()
            .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|item| item.get("text").and_then(Value::as_str))
            .find_map(usable_name_text),
        _ => None,
    }
}

fn usable_name_text(text: &str) -> Option<String> {
    let cleaned = strip_angle_tags(text);
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned.starts_with(CAVEAT_PREFIX) {
        return None;
    }
    Some(truncate_str(cleaned, NAME_MAX_CHARS))
}

/// Remove `<...>` spans the way the CLI embeds system tags into user content.
fn strip_angle_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

pub(crate) fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Derive the creation date of a transcript as an ISO-8601 string: the first
/// record carrying a timestamp, else the file's mtime, else a fixed sentinel.
pub fn derive_creation_date(transcript_path: &Path) -> String {
    if let Ok(content) = fs::read_to_string(transcript_path) {
        for record in content.lines().filter_map(parse_record) {
            if let Some(ts) = record.timestamp {
                return ts;
            }
        }
    }

    if let Ok(metadata) = fs::metadata(transcript_path) {
        if let Ok(modified) = metadata.modified() {
            let dt: DateTime<Utc> = modified.into();
            return dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
        }
    }

    EPOCH_FALLBACK.to_string()
}

/// Count user + assistant turns. An unreadable transcript counts as zero.
pub fn count_messages(transcript_path: &Path) -> usize {
    let content = match fs::read_to_string(transcript_path) {
        Ok(c) => c,
        Err(_) => return 0,
    };
    content
        .lines()
        .filter_map(parse_record)
        .filter(|record| {
            matches!(
                record.kind,
                RecordKind::User { .. } | RecordKind::Assistant { .. }
            )
        })
        .count()
}

/// Parse an ISO 8601 timestamp string (e.g. "2026-01-30T03:17:44.781Z").
pub fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    if ts.is_empty() {
        return None;
    }
    ts.parse::<DateTime<Utc>>().ok()
}

/// Flatten a message object into human-readable text for the viewer.
///
/// String content is taken verbatim. List content concatenates text items,
/// tool invocations (name header plus one line per input key) and tool
/// results (first 3 lines plus a truncation count). Returns an empty string
/// when nothing is extractable; callers treat that as "no content", not an
/// error.
pub fn extract_message_content(message: &Value) -> String {
    let Some(obj) = message.as_object() else {
        return String::new();
    };

    match obj.get("content") {
        Some(Value::String(s)) if !s.trim().is_empty() => return s.clone(),
        Some(Value::Array(items)) => {
            let mut parts: Vec<String> = Vec::new();
            for item in items {
                render_content_item(item, &mut parts);
            }
            if !parts.is_empty() {
                return parts.join("\n");
            }
        }
        _ => {}
    }

    // Some records put their text directly on the message object.
    for field in ["text", "body"] {
        if let Some(s) = obj.get(field).and_then(Value::as_str) {
            if !s.trim().is_empty() {
                return s.to_string();
            }
        }
    }

    String::new()
}

fn render_content_item(item: &Value, parts: &mut Vec<String>) {
    let Some(obj) = item.as_object() else {
        return;
    };
    match obj.get("type").and_then(Value::as_str).unwrap_or("") {
        "text" => {
            if let Some(text) = obj.get("text").and_then(Value::as_str) {
                if !text.trim().is_empty() {
                    parts.push(text.to_string());
                }
            }
        }
        "tool_use" => {
            let name = obj
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("unknown_tool");
            parts.push(format!("Tool: {}", name));
            match obj.get("input") {
                Some(Value::Object(input)) => {
                    for (key, value) in input {
                        parts.push(format!("  {}: {}", key, plain_value(value)));
                    }
                }
                Some(Value::Null) | None => {}
                Some(other) => parts.push(format!("  input: {}", plain_value(other))),
            }
        }
        "tool_result" => match obj.get("content") {
            Some(Value::String(text)) if !text.trim().is_empty() => {
                let lines: Vec<&str> = text.split('\n').collect();
                if lines.len() <= 3 {
                    parts.push(format!("Tool result:\n{}", text));
                } else {
                    parts.push(format!(
                        "Tool result:\n{}\n... ({} more lines)",
                        lines[..3].join("\n"),
                        lines.len() - 3
                    ));
                }
            }
            Some(Value::Null) | None => {}
            Some(other) => parts.push(format!("Tool result: {}", plain_value(other))),
        },
        _ => {
            for field in ["text", "content"] {
                if let Some(s) = obj.get(field).and_then(Value::as_str) {
                    if !s.trim().is_empty() {
                        parts.push(s.to_string());
                        break;
                    }
                }
            }
        }
    }
}

fn plain_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Load all user/assistant messages of a transcript for the conversation
/// viewer, in file order. Messages with no extractable content are dropped.
pub fn load_messages(transcript_path: &Path) -> Vec<Message> {
    let content = match fs::read_to_string(transcript_path) {
        Ok(c) => c,
        Err(_) => return Vec::new(),
    };

    let mut messages = Vec::new();
    for record in content.lines().filter_map(parse_record) {
        let (role, message) = match &record.kind {
            RecordKind::User { message } => (MessageRole::User, message),
            RecordKind::Assistant { message } => (MessageRole::Assistant, message),
            _ => continue,
        };
        let text = extract_message_content(message);
        if text.is_empty() {
            continue;
        }
        messages.push(Message {
            role,
            text,
            timestamp: record.timestamp.clone(),
        });
    }
    messages
}
