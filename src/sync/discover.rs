//! Enumerate candidate session files under a host session root.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Every `.jsonl` file under `root`, one level of per-project directories
/// deep or arbitrarily nested — the host may reorganize within a project
/// directory, so this walks the whole tree rather than assuming a fixed
/// depth.
pub fn session_files(root: &Path) -> Vec<PathBuf> {
    if !root.is_dir() {
        return Vec::new();
    }
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("jsonl"))
        .collect()
}

/// The project directory a session file lives under, i.e. `root`'s
/// immediate child directory on the path to `file`.
pub fn project_dir_name(root: &Path, file: &Path) -> Option<String> {
    file.strip_prefix(root)
        .ok()
        .and_then(|rel| rel.components().next())
        .map(|c| c.as_os_str().to_string_lossy().to_string())
}

/// Session id derived from the file stem: `<uuid>.jsonl` and
/// `agent-<id>.jsonl` both yield their stem verbatim, per §6's two named
/// session-file shapes.
pub fn session_id_from_path(file: &Path) -> String {
    file.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| file.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn finds_jsonl_files_recursively() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("-Users-alice-project");
        std::fs::create_dir_all(&project).unwrap();
        std::fs::write(project.join("abc123.jsonl"), "").unwrap();
        std::fs::write(project.join("notes.txt"), "").unwrap();

        let files = session_files(dir.path());
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name().unwrap(), "abc123.jsonl");
    }

    #[test]
    fn non_directory_root_yields_no_files() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");
        assert!(session_files(&missing).is_empty());
    }

    #[test]
    fn project_dir_name_is_first_path_component() {
        let root = Path::new("/home/user/.host-sessions");
        let file = Path::new("/home/user/.host-sessions/-Users-alice-project/abc.jsonl");
        assert_eq!(
            project_dir_name(root, file).as_deref(),
            Some("-Users-alice-project")
        );
    }

    #[test]
    fn session_id_is_file_stem() {
        let file = Path::new("/x/agent-42.jsonl");
        assert_eq!(session_id_from_path(file), "agent-42");
    }
}
