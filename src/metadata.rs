use crate::transcript;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Per-conversation sidecars live next to the transcript as
/// `<stem>.convos.json`; per-project sidecars inside the project directory.
const CONVERSATION_SIDECAR_SUFFIX: &str = "convos.json";
const PROJECT_SIDECAR_NAME: &str = ".convos_project.json";

/// Persisted per-conversation metadata. `name` is the derived default;
/// `custom_name`, when set, takes precedence for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub custom_name: Option<String>,
    #[serde(default)]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub message_count: Option<usize>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

pub(crate) fn sidecar_path_for(transcript_path: &Path) -> PathBuf {
    let stem = transcript_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    transcript_path.with_file_name(format!("{}.{}", stem, CONVERSATION_SIDECAR_SUFFIX))
}

/// Metadata store for one conversation, keyed by its transcript path.
///
/// Construction loads the sidecar if present; otherwise (or when the sidecar
/// is unreadable/malformed) it synthesizes a fresh record from the transcript
/// and persists it immediately. Once a sidecar exists, its `name` and
/// `creation_date` are stable identity; rescans do not re-derive them.
#[derive(Debug, Clone)]
pub struct ConversationMetadata {
    transcript_path: PathBuf,
    sidecar_path: PathBuf,
    record: ConversationRecord,
}

impl ConversationMetadata {
    pub fn load(transcript_path: &Path) -> Self {
        let sidecar_path = sidecar_path_for(transcript_path);

        if let Ok(content) = fs::read_to_string(&sidecar_path) {
            match serde_json::from_str::<ConversationRecord>(&content) {
                Ok(record) => {
                    return Self {
                        transcript_path: transcript_path.to_path_buf(),
                        sidecar_path,
                        record,
                    };
                }
                Err(err) => {
                    warn!(path = %sidecar_path.display(), %err, "malformed sidecar, regenerating");
                }
            }
        }

        let creation_date = transcript::derive_creation_date(transcript_path);
        let record = ConversationRecord {
            name: transcript::derive_name(transcript_path),
            custom_name: None,
            creation_date: Some(creation_date.clone()),
            message_count: Some(transcript::count_messages(transcript_path)),
            last_updated: Some(creation_date),
        };

        let store = Self {
            transcript_path: transcript_path.to_path_buf(),
            sidecar_path,
            record,
        };
        if let Err(err) = store.save() {
            warn!(path = %store.sidecar_path.display(), %err, "could not persist fresh sidecar");
        }
        store
    }

    /// Session identifier used to resume the conversation via the CLI.
    pub fn session_id(&self) -> String {
        self.transcript_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn sidecar_path(&self) -> &Path {
        &self.sidecar_path
    }

    /// Display name: the custom name when set, else the derived default.
    ///
    /// Sidecars written by older versions could capture the CLI's injected
    /// caveat text as the derived name. Such a value is treated as stale:
    /// re-derive from the transcript, rewrite the sidecar, and return the
    /// regenerated name, so the stale value is never served twice.
    pub fn name(&mut self) -> String {
        if let Some(custom) = &self.record.custom_name {
            if !custom.is_empty() {
                return custom.clone();
            }
        }
        if self.record.name.starts_with(transcript::CAVEAT_PREFIX) {
            self.record.name = transcript::derive_name(&self.transcript_path);
            if let Err(err) = self.save() {
                warn!(path = %self.sidecar_path.display(), %err, "could not persist healed name");
            }
        }
        self.record.name.clone()
    }

    pub fn creation_date(&self) -> String {
        self.record
            .creation_date
            .clone()
            .unwrap_or_else(|| transcript::EPOCH_FALLBACK.to_string())
    }

    pub fn message_count(&self) -> usize {
        self.record.message_count.unwrap_or(0)
    }

    /// Set the custom name and persist it write-through.
    pub fn set_custom_name(&mut self, name: &str) -> Result<()> {
        self.record.custom_name = Some(name.to_string());
        self.save()
    }

    /// Recompute `message_count` from the transcript and persist. The derived
    /// name and creation date are left alone so display history and sort
    /// order stay stable across rescans.
    pub fn refresh(&mut self) -> Result<()> {
        self.record.message_count = Some(transcript::count_messages(&self.transcript_path));
        self.save()
    }

    fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.record)?;
        fs::write(&self.sidecar_path, json)
            .with_context(|| format!("writing sidecar {}", self.sidecar_path.display()))?;
        Ok(())
    }
}

/// Persisted per-project metadata: user overrides only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_path: Option<String>,
}

pub(crate) fn project_sidecar_path(project_dir: &Path) -> PathBuf {
    project_dir.join(PROJECT_SIDECAR_NAME)
}

/// Read the project sidecar. Absent or malformed files yield an empty record;
/// reading never creates the file (asymmetric with the conversation store).
pub fn load_project_record(project_dir: &Path) -> ProjectRecord {
    let path = project_sidecar_path(project_dir);
    fs::read_to_string(&path)
        .ok()
        .and_then(|content| serde_json::from_str(&content).ok())
        .unwrap_or_default()
}

/// Set the project's display name. `original_path` records the display path
/// at the time of the write, for reference.
pub fn set_project_custom_name(project_dir: &Path, name: &str, original_path: &str) -> Result<()> {
    let mut record = load_project_record(project_dir);
    record.custom_name = Some(name.to_string());
    record.original_path = Some(original_path.to_string());
    save_project_record(project_dir, &record)
}

/// Set the corrected working directory used when launching the CLI.
pub fn set_project_corrected_path(
    project_dir: &Path,
    corrected_path: &str,
    original_path: &str,
) -> Result<()> {
    let mut record = load_project_record(project_dir);
    record.corrected_path = Some(corrected_path.to_string());
    record.original_path = Some(original_path.to_string());
    save_project_record(project_dir, &record)
}

fn save_project_record(project_dir: &Path, record: &ProjectRecord) -> Result<()> {
    let path = project_sidecar_path(project_dir);
    let json = serde_json::to_string_pretty(record)?;
    fs::write(&path, json)
        .with_context(|| format!("writing project sidecar {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write_transcript(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    const SIMPLE: &str = r#"{"type":"user","timestamp":"2026-01-15T10:00:00Z","message":{"content":"Hello world"}}
{"type":"assistant","timestamp":"2026-01-15T10:01:00Z","message":{"content":"Hi"}}"#;

    // ================================================================
    // ConversationMetadata
    // ================================================================

    #[test]
    fn load_creates_sidecar_with_derived_values() {
        let tmp = TempDir::new().unwrap();
        let transcript = write_transcript(&tmp, "sess-1.jsonl", SIMPLE);

        let mut meta = ConversationMetadata::load(&transcript);
        assert_eq!(meta.name(), "Hello world");
        assert_eq!(meta.creation_date(), "2026-01-15T10:00:00Z");
        assert_eq!(meta.message_count(), 2);
        assert_eq!(meta.session_id(), "sess-1");

        let sidecar = tmp.path().join("sess-1.convos.json");
        assert!(sidecar.exists());
        let stored: ConversationRecord =
            serde_json::from_str(&fs::read_to_string(&sidecar).unwrap()).unwrap();
        assert_eq!(stored.name, "Hello world");
        assert_eq!(stored.custom_name, None);
        assert_eq!(stored.last_updated.as_deref(), Some("2026-01-15T10:00:00Z"));
    }

    #[test]
    fn repeated_load_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let transcript = write_transcript(&tmp, "sess-1.jsonl", SIMPLE);

        let mut first = ConversationMetadata::load(&transcript);
        let (name, date, count) = (first.name(), first.creation_date(), first.message_count());

        let mut second = ConversationMetadata::load(&transcript);
        assert_eq!(second.name(), name);
        assert_eq!(second.creation_date(), date);
        assert_eq!(second.message_count(), count);
    }

    #[test]
    fn sidecar_wins_over_transcript_once_created() {
        let tmp = TempDir::new().unwrap();
        let transcript = write_transcript(&tmp, "sess-1.jsonl", SIMPLE);
        ConversationMetadata::load(&transcript);

        // Appending to the transcript must not change the persisted identity.
        let mut content = fs::read_to_string(&transcript).unwrap();
        content.push_str("\n{\"type\":\"user\",\"timestamp\":\"2026-02-01T00:00:00Z\",\"message\":{\"content\":\"later\"}}");
        fs::write(&transcript, content).unwrap();

        let mut meta = ConversationMetadata::load(&transcript);
        assert_eq!(meta.name(), "Hello world");
        assert_eq!(meta.creation_date(), "2026-01-15T10:00:00Z");
        assert_eq!(meta.message_count(), 2);
    }

    #[test]
    fn custom_name_takes_precedence() {
        let tmp = TempDir::new().unwrap();
        let transcript = write_transcript(&tmp, "sess-1.jsonl", SIMPLE);

        let mut meta = ConversationMetadata::load(&transcript);
        meta.set_custom_name("My rename").unwrap();
        assert_eq!(meta.name(), "My rename");

        // A fresh store sees the persisted custom name.
        let mut reloaded = ConversationMetadata::load(&transcript);
        assert_eq!(reloaded.name(), "My rename");
    }

    #[test]
    fn empty_custom_name_falls_back_to_derived() {
        let tmp = TempDir::new().unwrap();
        let transcript = write_transcript(&tmp, "sess-1.jsonl", SIMPLE);
        let sidecar = sidecar_path_for(&transcript);
        fs::write(
            &sidecar,
            json!({
                "name": "Derived",
                "custom_name": "",
                "creation_date": "2026-01-15T10:00:00Z",
                "message_count": 2,
                "last_updated": "2026-01-15T10:00:00Z"
            })
            .to_string(),
        )
        .unwrap();

        let mut meta = ConversationMetadata::load(&transcript);
        assert_eq!(meta.name(), "Derived");
    }

    #[test]
    fn caveat_name_is_healed_and_rewritten() {
        let tmp = TempDir::new().unwrap();
        let transcript = write_transcript(
            &tmp,
            "sess-1.jsonl",
            r#"{"type":"user","timestamp":"2026-01-15T10:00:00Z","message":{"content":"Hello world"}}"#,
        );
        let sidecar = sidecar_path_for(&transcript);
        fs::write(
            &sidecar,
            json!({
                "name": "Caveat: do not use",
                "custom_name": null,
                "creation_date": "2026-01-15T10:00:00Z",
                "message_count": 1,
                "last_updated": "2026-01-15T10:00:00Z"
            })
            .to_string(),
        )
        .unwrap();

        let mut meta = ConversationMetadata::load(&transcript);
        assert_eq!(meta.name(), "Hello world");

        // The heal was persisted: a second independent load must not need
        // the transcript to produce the regenerated name.
        fs::remove_file(&transcript).unwrap();
        let mut healed = ConversationMetadata::load(&transcript);
        assert_eq!(healed.name(), "Hello world");
    }

    #[test]
    fn caveat_name_not_healed_when_custom_name_set() {
        let tmp = TempDir::new().unwrap();
        let transcript = write_transcript(&tmp, "sess-1.jsonl", SIMPLE);
        let sidecar = sidecar_path_for(&transcript);
        fs::write(
            &sidecar,
            json!({
                "name": "Caveat: stale",
                "custom_name": "Picked by hand",
                "creation_date": "2026-01-15T10:00:00Z",
                "message_count": 2,
                "last_updated": "2026-01-15T10:00:00Z"
            })
            .to_string(),
        )
        .unwrap();

        let mut meta = ConversationMetadata::load(&transcript);
        assert_eq!(meta.name(), "Picked by hand");
    }

    #[test]
    fn legacy_sidecar_missing_fields_uses_fallbacks() {
        let tmp = TempDir::new().unwrap();
        let transcript = write_transcript(&tmp, "sess-1.jsonl", SIMPLE);
        let sidecar = sidecar_path_for(&transcript);
        fs::write(&sidecar, json!({"name": "Old"}).to_string()).unwrap();

        let mut meta = ConversationMetadata::load(&transcript);
        assert_eq!(meta.name(), "Old");
        assert_eq!(meta.creation_date(), transcript::EPOCH_FALLBACK);
        assert_eq!(meta.message_count(), 0);
    }

    #[test]
    fn malformed_sidecar_is_regenerated() {
        let tmp = TempDir::new().unwrap();
        let transcript = write_transcript(&tmp, "sess-1.jsonl", SIMPLE);
        let sidecar = sidecar_path_for(&transcript);
        fs::write(&sidecar, "{broken json").unwrap();

        let mut meta = ConversationMetadata::load(&transcript);
        assert_eq!(meta.name(), "Hello world");
        assert_eq!(meta.message_count(), 2);

        let stored: ConversationRecord =
            serde_json::from_str(&fs::read_to_string(&sidecar).unwrap()).unwrap();
        assert_eq!(stored.name, "Hello world");
    }

    #[test]
    fn refresh_recomputes_count_only() {
        let tmp = TempDir::new().unwrap();
        let transcript = write_transcript(&tmp, "sess-1.jsonl", SIMPLE);
        let mut meta = ConversationMetadata::load(&transcript);

        let mut content = fs::read_to_string(&transcript).unwrap();
        content.push_str("\n{\"type\":\"assistant\",\"timestamp\":\"2026-02-01T00:00:00Z\",\"message\":{\"content\":\"more\"}}");
        fs::write(&transcript, content).unwrap();

        meta.refresh().unwrap();
        assert_eq!(meta.message_count(), 3);
        assert_eq!(meta.creation_date(), "2026-01-15T10:00:00Z");
        assert_eq!(meta.name(), "Hello world");

        let reloaded = ConversationMetadata::load(&transcript);
        assert_eq!(reloaded.message_count(), 3);
    }

    // ================================================================
    // Project sidecar
    // ================================================================

    #[test]
    fn load_project_record_absent_is_empty_and_creates_nothing() {
        let tmp = TempDir::new().unwrap();
        let record = load_project_record(tmp.path());
        assert_eq!(record.custom_name, None);
        assert_eq!(record.corrected_path, None);
        assert!(!project_sidecar_path(tmp.path()).exists());
    }

    #[test]
    fn load_project_record_malformed_is_empty() {
        let tmp = TempDir::new().unwrap();
        fs::write(project_sidecar_path(tmp.path()), "not json").unwrap();
        let record = load_project_record(tmp.path());
        assert_eq!(record.custom_name, None);
    }

    #[test]
    fn project_writes_merge_existing_keys() {
        let tmp = TempDir::new().unwrap();
        set_project_custom_name(tmp.path(), "My Project", "/decoded/path").unwrap();
        set_project_corrected_path(tmp.path(), "/real/path", "/decoded/path").unwrap();

        let record = load_project_record(tmp.path());
        assert_eq!(record.custom_name.as_deref(), Some("My Project"));
        assert_eq!(record.corrected_path.as_deref(), Some("/real/path"));
        assert_eq!(record.original_path.as_deref(), Some("/decoded/path"));
    }
}
