//! Key-addressed access to quest content.
//!
//! Story data is looked up by slash-delimited keys rooted at a per-quest
//! folder (`quests/<name>/...`). The repository hands back raw text
//! records and opaque media handles; parsing records into a story graph
//! is the loader's job, and playing media is the host's.

use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

/// Errors from content lookup.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content not found: {0}")]
    NotFound(String),

    #[error("IO error reading {key}: {source}")]
    Io { key: String, source: io::Error },
}

/// A raw text record returned by [`ContentRepository::list`].
#[derive(Debug, Clone)]
pub struct ContentEntry {
    /// Record name relative to the listed prefix, without extension.
    pub name: String,

    /// Raw record text.
    pub text: String,
}

/// An opaque reference to a playable media asset.
///
/// The engine never opens media itself; handles are resolved at load
/// time and passed to the injected [`crate::media::MediaPlayer`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClipHandle {
    /// The content key the handle was resolved from.
    pub key: String,
}

impl ClipHandle {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Key-addressed access to quest content.
pub trait ContentRepository {
    /// Fetch a single text record by key.
    fn get_text(&self, key: &str) -> Result<String, ContentError>;

    /// List all text records under a key prefix, sorted by name.
    ///
    /// A prefix with no records yields an empty list, not an error;
    /// callers decide whether that is a problem.
    fn list(&self, key_prefix: &str) -> Result<Vec<ContentEntry>, ContentError>;

    /// Resolve a media asset by key. Missing media is not an error at
    /// this layer.
    fn get_media(&self, key: &str) -> Option<ClipHandle>;
}

/// Filesystem-backed content repository.
///
/// Text keys map to `<root>/<key>.yaml`. Media keys match any file in
/// the key's directory whose stem equals the final key segment, so the
/// asset pipeline is free to pick the container format.
pub struct FsContentRepository {
    root: PathBuf,
}

impl FsContentRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory all keys are resolved under.
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn text_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.yaml"))
    }
}

impl ContentRepository for FsContentRepository {
    fn get_text(&self, key: &str) -> Result<String, ContentError> {
        let path = self.text_path(key);
        if !path.is_file() {
            return Err(ContentError::NotFound(key.to_string()));
        }
        debug!(key, path = %path.display(), "reading content record");
        fs::read_to_string(&path).map_err(|source| ContentError::Io {
            key: key.to_string(),
            source,
        })
    }

    fn list(&self, key_prefix: &str) -> Result<Vec<ContentEntry>, ContentError> {
        let dir = self.root.join(key_prefix);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        let read = fs::read_dir(&dir).map_err(|source| ContentError::Io {
            key: key_prefix.to_string(),
            source,
        })?;

        for entry in read {
            let entry = entry.map_err(|source| ContentError::Io {
                key: key_prefix.to_string(),
                source,
            })?;
            let path = entry.path();
            if !path.extension().map(|e| e == "yaml").unwrap_or(false) {
                continue;
            }
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let text = fs::read_to_string(&path).map_err(|source| ContentError::Io {
                key: format!("{key_prefix}/{name}"),
                source,
            })?;
            entries.push(ContentEntry { name, text });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn get_media(&self, key: &str) -> Option<ClipHandle> {
        let path = self.root.join(key);
        let dir = path.parent()?;
        let stem = path.file_name()?;

        for entry in fs::read_dir(dir).ok()?.flatten() {
            let candidate = entry.path();
            if candidate.is_file() && candidate.file_stem().map(|s| s == stem).unwrap_or(false) {
                debug!(key, path = %candidate.display(), "resolved media");
                return Some(ClipHandle::new(key));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture_repo() -> (TempDir, FsContentRepository) {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let root = dir.path();

        fs::create_dir_all(root.join("quests/demo/summary_parts")).unwrap();
        fs::create_dir_all(root.join("quests/demo/video/char1")).unwrap();
        fs::write(root.join("quests/demo/game_meta.yaml"), "game_name: Demo\n").unwrap();
        fs::write(
            root.join("quests/demo/summary_parts/part_1.yaml"),
            "index: 1\n",
        )
        .unwrap();
        fs::write(
            root.join("quests/demo/summary_parts/part_0.yaml"),
            "index: 0\n",
        )
        .unwrap();
        fs::write(
            root.join("quests/demo/summary_parts/notes.txt"),
            "not a record",
        )
        .unwrap();
        fs::write(root.join("quests/demo/video/char1/latest_u_d.webm"), b"").unwrap();

        let repo = FsContentRepository::new(root);
        (dir, repo)
    }

    #[test]
    fn test_get_text() {
        let (_dir, repo) = fixture_repo();

        let text = repo.get_text("quests/demo/game_meta").unwrap();
        assert!(text.contains("Demo"));
    }

    #[test]
    fn test_get_text_missing() {
        let (_dir, repo) = fixture_repo();

        let err = repo.get_text("quests/demo/no_such_record").unwrap_err();
        assert!(matches!(err, ContentError::NotFound(_)));
    }

    #[test]
    fn test_list_sorted_and_filtered() {
        let (_dir, repo) = fixture_repo();

        let entries = repo.list("quests/demo/summary_parts").unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();

        // Sorted, and the stray .txt file is not a record
        assert_eq!(names, vec!["part_0", "part_1"]);
    }

    #[test]
    fn test_list_missing_prefix_is_empty() {
        let (_dir, repo) = fixture_repo();

        let entries = repo.list("quests/demo/no_such_folder").unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_get_media_matches_by_stem() {
        let (_dir, repo) = fixture_repo();

        let clip = repo.get_media("quests/demo/video/char1/latest_u_d");
        assert_eq!(
            clip,
            Some(ClipHandle::new("quests/demo/video/char1/latest_u_d"))
        );

        assert!(repo.get_media("quests/demo/video/char2/latest_u_d").is_none());
    }
}
