use crate::metadata::{self, ConversationMetadata};
use crate::models::{ConversationInfo, ProjectInfo};
use crate::paths;
use crate::transcript;
use anyhow::{Result, bail};
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Generic path segments that carry no identity: mount markers, drive
/// letters, the Windows home folder. Dropped before fuzzy matching.
const GENERIC_SEGMENTS: &[&str] = &["mnt", "c", "Users"];

/// Scans the projects root and builds project/conversation records by
/// combining the path codec, both metadata stores and the transcript reader.
///
/// The result of the last `scan_projects` call is cached for path lookups
/// until the next scan. Mutations do not patch the cache themselves; callers
/// apply a mutation and then call `refresh_project` on the affected project
/// (or rescan everything).
pub struct ProjectScanner {
    projects_dir: PathBuf,
    projects: Option<Vec<ProjectInfo>>,
}

impl ProjectScanner {
    pub fn new() -> Self {
        Self::with_dir(paths::claude_projects_dir().unwrap_or_default())
    }

    pub fn with_dir(projects_dir: PathBuf) -> Self {
        Self {
            projects_dir,
            projects: None,
        }
    }

    /// Scan all projects and return them sorted by creation date descending.
    ///
    /// Project directories that cannot be listed, and directories without a
    /// single transcript, are excluded rather than reported.
    pub fn scan_projects(&mut self) -> Vec<ProjectInfo> {
        let mut projects = Vec::new();

        if let Ok(entries) = fs::read_dir(&self.projects_dir) {
            let mut dirs: Vec<_> = entries
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().map(|ft| ft.is_dir()).unwrap_or(false))
                .collect();
            // Deterministic enumeration order so equal-date sorts are stable
            // across repeated scans.
            dirs.sort_by_key(|e| e.file_name());

            for entry in dirs {
                if let Some(project) = self.scan_project(&entry.path()) {
                    projects.push(project);
                }
            }
        }

        projects.sort_by(|a, b| compare_dates(&b.creation_date, &a.creation_date));

        self.projects = Some(projects.clone());
        projects
    }

    fn scan_project(&self, project_dir: &Path) -> Option<ProjectInfo> {
        let entries = match fs::read_dir(project_dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(path = %project_dir.display(), %err, "skipping unlistable project dir");
                return None;
            }
        };

        let mut transcripts: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|ext| ext == "jsonl").unwrap_or(false))
            .collect();
        if transcripts.is_empty() {
            return None;
        }
        transcripts.sort();

        let mut conversations = Vec::new();
        let mut total_messages = 0usize;
        let mut earliest: Option<String> = None;

        for transcript_path in &transcripts {
            let mut meta = ConversationMetadata::load(transcript_path);
            let info = ConversationInfo {
                session_id: meta.session_id(),
                name: meta.name(),
                creation_date: meta.creation_date(),
                message_count: meta.message_count(),
                transcript_path: transcript_path.clone(),
                metadata: meta,
            };

            total_messages += info.message_count;
            let is_earlier = earliest
                .as_deref()
                .map(|e| compare_dates(&info.creation_date, e) == Ordering::Less)
                .unwrap_or(true);
            if is_earlier {
                earliest = Some(info.creation_date.clone());
            }
            conversations.push(info);
        }

        conversations.sort_by(|a, b| compare_dates(&b.creation_date, &a.creation_date));

        let encoded_path = project_dir.file_name()?.to_string_lossy().into_owned();
        let decoded = paths::decode_project_path(&encoded_path);
        let record = metadata::load_project_record(project_dir);
        let display_path = record
            .custom_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| decoded.clone());
        let working_path = record
            .corrected_path
            .filter(|path| !path.is_empty())
            .unwrap_or(decoded);

        Some(ProjectInfo {
            encoded_path,
            display_path,
            working_path,
            creation_date: earliest.unwrap_or_else(|| transcript::EPOCH_FALLBACK.to_string()),
            conversation_count: conversations.len(),
            total_messages,
            conversations,
        })
    }

    /// Resolve a directory path to a known project.
    ///
    /// First pass: exact match on lexically normalized working paths. Second
    /// pass: because the decoded path may be wrong (lossy encoding, moved
    /// directories), fall back to matching the tail of the encoded name's
    /// significant parts as substrings of the input.
    pub fn get_project_by_path(&mut self, path: &str) -> Option<ProjectInfo> {
        if self.projects.is_none() {
            self.scan_projects();
        }
        let projects = self.projects.as_ref()?;
        let current = paths::normalize_path(path);

        for project in projects {
            if paths::normalize_path(&project.working_path) == current {
                return Some(project.clone());
            }
        }

        let current_lower = current.to_lowercase();
        for project in projects {
            let parts = significant_parts(&project.encoded_path);
            // Only trust the heuristic when enough unique parts remain.
            if parts.len() > 2 {
                let tail = &parts[parts.len() - 3..];
                if tail
                    .iter()
                    .all(|part| current_lower.contains(&part.to_lowercase()))
                {
                    return Some(project.clone());
                }
            }
        }

        None
    }

    /// Resolve the process working directory to a known project. Any failure
    /// to read the working directory yields `None`.
    pub fn current_dir_project(&mut self) -> Option<ProjectInfo> {
        let cwd = std::env::current_dir().ok()?;
        self.get_project_by_path(&cwd.to_string_lossy())
    }

    /// Delete a conversation's transcript and sidecar. An already-deleted
    /// conversation fails; a partial deletion (transcript removed, sidecar
    /// not) is possible and not rolled back.
    pub fn delete_conversation(&self, conversation: &ConversationInfo) -> Result<()> {
        let transcript_path = &conversation.transcript_path;
        if !transcript_path.exists() {
            bail!("transcript already deleted: {}", transcript_path.display());
        }
        fs::remove_file(transcript_path)?;

        let sidecar = conversation.metadata.sidecar_path();
        if sidecar.exists() {
            fs::remove_file(sidecar)?;
        }
        Ok(())
    }

    /// Persist a custom display name for a project. The cached `ProjectInfo`
    /// is not touched; call `refresh_project` afterwards.
    pub fn rename_project(&self, project: &ProjectInfo, new_name: &str) -> Result<()> {
        let project_dir = self.projects_dir.join(&project.encoded_path);
        metadata::set_project_custom_name(&project_dir, new_name, &project.display_path)
    }

    /// Persist a corrected working directory for a project. The cached
    /// `ProjectInfo` is not touched; call `refresh_project` afterwards.
    pub fn set_project_path(&self, project: &ProjectInfo, corrected_path: &str) -> Result<()> {
        let project_dir = self.projects_dir.join(&project.encoded_path);
        metadata::set_project_corrected_path(&project_dir, corrected_path, &project.display_path)
    }

    /// Rescan a single project directory and patch the cached result set.
    /// Returns the refreshed record, or `None` when the project no longer
    /// qualifies (in which case it is dropped from the cache too).
    pub fn refresh_project(&mut self, project: &ProjectInfo) -> Option<ProjectInfo> {
        let project_dir = self.projects_dir.join(&project.encoded_path);
        let refreshed = self.scan_project(&project_dir);

        if let Some(projects) = &mut self.projects {
            match &refreshed {
                Some(fresh) => {
                    if let Some(slot) = projects
                        .iter_mut()
                        .find(|p| p.encoded_path == project.encoded_path)
                    {
                        *slot = fresh.clone();
                    }
                }
                None => projects.retain(|p| p.encoded_path != project.encoded_path),
            }
        }

        refreshed
    }
}

impl Default for ProjectScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Compare two ISO-8601 strings chronologically, falling back to plain string
/// order when either side does not parse. For the UTC timestamps the CLI
/// writes, the two orders are identical.
fn compare_dates(a: &str, b: &str) -> Ordering {
    match (
        transcript::parse_timestamp(a),
        transcript::parse_timestamp(b),
    ) {
        (Some(da), Some(db)) => da.cmp(&db),
        _ => a.cmp(b),
    }
}

/// Split an encoded project name on separator characters and drop empty and
/// generic tokens, leaving the parts that identify the project.
fn significant_parts(encoded_path: &str) -> Vec<String> {
    encoded_path
        .split(['-', '_'])
        .filter(|part| !part.is_empty() && !GENERIC_SEGMENTS.contains(part))
        .map(str::to_string)
        .collect()
}
