//! Small JSON documents on local disk.
//!
//! Reads never fail: a missing, unreadable or malformed file yields the
//! caller's fallback. Writes go through a temp file in the same directory
//! followed by a rename, so readers see either the old or the new document.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Distinguishes temp files of concurrent writes within one process
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// A JSON document stored at a fixed path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the path to the document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the document, or return `fallback` on any failure
    pub fn load_or<T: DeserializeOwned>(&self, fallback: T) -> T {
        match self.load() {
            Ok(value) => value,
            Err(e) => {
                debug!("Using fallback for {}: {:#}", self.path.display(), e);
                fallback
            }
        }
    }

    /// Read and parse the document, falling back to `T::default()`
    pub fn load_or_default<T: DeserializeOwned + Default>(&self) -> T {
        self.load_or(T::default())
    }

    fn load<T: DeserializeOwned>(&self) -> Result<T> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    /// Atomically replace the document with compact JSON
    pub fn save<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let json = serde_json::to_vec(value).context("Failed to serialize document")?;
        self.replace(&json)
    }

    /// Atomically replace the document with indented JSON and a trailing newline
    pub fn save_pretty<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let mut json = serde_json::to_vec_pretty(value).context("Failed to serialize document")?;
        json.push(b'\n');
        self.replace(&json)
    }

    fn replace(&self, bytes: &[u8]) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create directory {}", dir.display()))?;
            }
        }

        let temp_path = self.temp_path();
        let result = write_then_rename(&temp_path, &self.path, bytes);
        if result.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        result
    }

    /// Temp file next to the target, unique per process and write
    fn temp_path(&self) -> PathBuf {
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path
            .with_file_name(format!("{name}.{}.{seq}.tmp", std::process::id()))
    }
}

fn write_then_rename(temp_path: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    // create_new refuses to follow a planted symlink
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp_path)
        .with_context(|| format!("Failed to create temp file {}", temp_path.display()))?;

    file.write_all(bytes)
        .with_context(|| format!("Failed to write temp file {}", temp_path.display()))?;
    file.sync_all()
        .with_context(|| format!("Failed to sync temp file {}", temp_path.display()))?;
    drop(file);

    fs::rename(temp_path, path)
        .with_context(|| format!("Failed to rename into {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use std::sync::Arc;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Doc {
        name: String,
        count: u64,
    }

    #[test]
    fn test_missing_file_returns_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("missing.json"));
        let doc: Doc = file.load_or(Doc {
            name: "fallback".to_string(),
            count: 7,
        });
        assert_eq!(doc.name, "fallback");
        assert_eq!(doc.count, 7);
    }

    #[test]
    fn test_malformed_file_returns_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{\"name\": \"half").unwrap();

        let doc: Doc = JsonFile::new(&path).load_or_default();
        assert_eq!(doc, Doc::default());
    }

    #[test]
    fn test_save_creates_directories_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("a").join("b").join("doc.json"));
        let doc = Doc {
            name: "written".to_string(),
            count: 3,
        };

        file.save(&doc).unwrap();
        assert_eq!(file.load_or_default::<Doc>(), doc);
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("doc.json"));
        file.save(&Doc::default()).unwrap();
        file.save_pretty(&Doc::default()).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["doc.json".to_string()]);
    }

    #[test]
    fn test_save_pretty_ends_with_newline() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("settings.json"));
        file.save_pretty(&serde_json::json!({"a": 1})).unwrap();

        let content = fs::read_to_string(file.path()).unwrap();
        assert!(content.ends_with("}\n"));
        assert!(content.contains("\n  \"a\": 1"));
    }

    #[test]
    fn test_concurrent_writers_never_tear() {
        let dir = tempfile::tempdir().unwrap();
        let file = Arc::new(JsonFile::new(dir.path().join("shared.json")));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let file = Arc::clone(&file);
                std::thread::spawn(move || {
                    for n in 0..25 {
                        let doc = Doc {
                            name: "x".repeat(64 * (i + 1)),
                            count: n,
                        };
                        file.save(&doc).unwrap();
                        let read: Option<Doc> = file.load_or(None);
                        assert!(read.is_some(), "reader observed a torn document");
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let last: Option<Doc> = file.load_or(None);
        assert!(last.is_some());
    }
}
