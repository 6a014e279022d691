use crate::metadata::ConversationMetadata;
use crate::transcript;
use std::path::PathBuf;

/// One discovered project, rebuilt fresh on every scan.
#[derive(Debug, Clone)]
pub struct ProjectInfo {
    /// Encoded directory name under the projects root; sidecar/lookup key.
    pub encoded_path: String,
    /// Human-facing name: custom override if present, else decoded path.
    pub display_path: String,
    /// Directory the CLI is launched in: corrected override if present,
    /// else decoded path.
    pub working_path: String,
    /// Earliest creation date among the project's conversations.
    pub creation_date: String,
    pub conversation_count: usize,
    pub total_messages: usize,
    /// Sorted by creation date descending.
    pub conversations: Vec<ConversationInfo>,
}

impl ProjectInfo {
    pub fn creation_date_str(&self) -> String {
        format_date(&self.creation_date)
    }
}

/// One conversation within a project. The fields are a read-mostly projection
/// of the owned metadata store, captured at scan time.
#[derive(Debug, Clone)]
pub struct ConversationInfo {
    pub session_id: String,
    pub name: String,
    pub creation_date: String,
    pub message_count: usize,
    pub transcript_path: PathBuf,
    pub metadata: ConversationMetadata,
}

impl ConversationInfo {
    pub fn creation_date_str(&self) -> String {
        format_date(&self.creation_date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

/// A single rendered turn for the conversation viewer.
#[derive(Debug, Clone)]
pub struct Message {
    pub role: MessageRole,
    pub text: String,
    pub timestamp: Option<String>,
}

impl Message {
    pub fn role_label(&self) -> &'static str {
        match self.role {
            MessageRole::User => "USER",
            MessageRole::Assistant => "ASSISTANT",
        }
    }

    pub fn timestamp_str(&self) -> String {
        self.timestamp
            .as_deref()
            .and_then(transcript::parse_timestamp)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default()
    }
}

/// Format an ISO timestamp as a short date for list rows.
pub fn format_date(timestamp: &str) -> String {
    transcript::parse_timestamp(timestamp)
        .map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Format a count with a k/M suffix for narrow table columns.
pub fn format_count(count: usize) -> String {
    if count >= 1_000_000 {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.1}k", count as f64 / 1_000.0)
    } else {
        count.to_string()
    }
}
