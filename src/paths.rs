use std::path::{Component, Path, PathBuf};

/// Root directory Claude Code writes project transcripts under.
pub fn claude_projects_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".claude").join("projects"))
}

/// Decode a project directory name back to the original filesystem path.
///
/// The CLI encodes `/mnt/c/Users/roger/Desktop/tools` as
/// `-mnt-c-Users-roger-Desktop-tools`: a leading dash plus dashes for every
/// separator. Decoding strips the leading dash, turns the rest back into
/// separators and prepends the root. A name without the leading dash is
/// returned unchanged.
///
/// The encoding is lossy: a path segment that itself contains a dash cannot
/// be told apart from a directory boundary, so the decoded path may be wrong.
/// Callers that need to match a real directory use the fuzzy pass in
/// `ProjectScanner::get_project_by_path` to compensate.
pub fn decode_project_path(encoded: &str) -> String {
    match encoded.strip_prefix('-') {
        Some(rest) => format!("/{}", rest.replace('-', "/")),
        None => encoded.to_string(),
    }
}

/// Lexically normalize a path: resolve `.` and `..`, collapse redundant
/// separators, drop any trailing separator. Never touches the filesystem.
pub fn normalize_path(path: &str) -> String {
    let mut out = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push(Component::ParentDir);
                }
            }
            other => out.push(other),
        }
    }
    out.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_absolute_path() {
        assert_eq!(
            decode_project_path("-mnt-c-Users-roger-Desktop-tools"),
            "/mnt/c/Users/roger/Desktop/tools"
        );
    }

    #[test]
    fn decode_home_path() {
        assert_eq!(
            decode_project_path("-home-alice-src-myapp"),
            "/home/alice/src/myapp"
        );
    }

    #[test]
    fn decode_without_leading_dash_is_passthrough() {
        assert_eq!(decode_project_path("already/plain"), "already/plain");
    }

    #[test]
    fn decode_empty() {
        assert_eq!(decode_project_path(""), "");
    }

    #[test]
    fn decode_is_lossy_for_dashed_segments() {
        // "my-app" as a directory name decodes as two segments; accepted
        // limitation, the fuzzy matcher covers it.
        assert_eq!(decode_project_path("-home-alice-my-app"), "/home/alice/my/app");
    }

    #[test]
    fn normalize_collapses_dot_segments() {
        assert_eq!(normalize_path("/home/alice/./src"), "/home/alice/src");
        assert_eq!(normalize_path("/home/alice/../bob"), "/home/bob");
    }

    #[test]
    fn normalize_strips_trailing_slash() {
        assert_eq!(normalize_path("/home/alice/"), "/home/alice");
    }

    #[test]
    fn normalize_collapses_double_separators() {
        assert_eq!(normalize_path("/home//alice"), "/home/alice");
    }

    #[test]
    fn normalize_keeps_plain_path() {
        assert_eq!(normalize_path("/home/alice"), "/home/alice");
    }

    #[test]
    fn normalize_parent_at_root_stays_at_root() {
        assert_eq!(normalize_path("/.."), "/");
    }
}
