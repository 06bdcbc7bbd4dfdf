// SPDX-License-Identifier: MIT

//! On-disk store of matched pastes
//!
//! Each match is one file named `<label>__<title>` inside the result
//! directory. The directory listing is the index; nothing else is persisted.
//!
//! A match is written in full under `.partial/` first and then hard-linked
//! to its final name, so a name never points at a half-written file.

use super::error::{PastegoError, Result};
use super::feed::PasteEntry;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// A saved match as shown to reviewers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedMatch {
    pub name: String,
    pub size: u64,
    /// Modification time, RFC 3339
    pub modified: Option<String>,
}

/// Staging directory for saves in progress; `list` skips directories
const STAGING_DIR: &str = ".partial";

/// Longest label or title part of a file name, in bytes
const MAX_PART_BYTES: usize = 100;

static STAGED: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct ResultStore {
    root: PathBuf,
}

impl ResultStore {
    /// Open (creating if needed) the result directory
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let root = absolute_clean(dir.as_ref())?;
        fs::create_dir_all(&root).await?;
        let store = Self { root };
        store.sweep_staging().await?;
        Ok(store)
    }

    /// Drop leftovers of saves interrupted by a crash or cancellation
    async fn sweep_staging(&self) -> Result<()> {
        let staging = self.root.join(STAGING_DIR);
        let mut entries = match fs::read_dir(&staging).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            log::debug!("Removing unfinished save {}", entry.path().display());
            if let Err(e) = fs::remove_file(entry.path()).await {
                log::warn!("Cannot remove {}: {}", entry.path().display(), e);
            }
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File name a paste matched by `label` is saved under.
    ///
    /// Label and title are each cut to [`MAX_PART_BYTES`] on a char boundary.
    pub fn file_name_for(entry: &PasteEntry, label: &str) -> String {
        let title = if entry.title.is_empty() {
            &entry.key
        } else {
            &entry.title
        };
        let label = safe_label(label);
        let title = safe_file_name(&title.replace('/', "_"));
        format!(
            "{}__{}",
            clip(&label, MAX_PART_BYTES),
            clip(&title, MAX_PART_BYTES)
        )
    }

    /// Save a matched paste.
    ///
    /// Returns the file name when written, `None` when that match was
    /// already saved.
    pub async fn save(&self, entry: &PasteEntry, label: &str, text: &str) -> Result<Option<String>> {
        let name = Self::file_name_for(entry, label);
        let path = self.root.join(&name);
        if fs::try_exists(&path).await? {
            return Ok(None);
        }

        let staging = self.root.join(STAGING_DIR);
        fs::create_dir_all(&staging).await?;
        let staged = staging.join(format!(
            "{}.{}-{}",
            name,
            std::process::id(),
            STAGED.fetch_add(1, Ordering::Relaxed)
        ));

        if let Err(e) = write_staged(&staged, text).await {
            discard(&staged).await;
            return Err(e.into());
        }

        // hard_link never replaces an existing name
        let linked = fs::hard_link(&staged, &path).await;
        discard(&staged).await;
        match linked {
            Ok(()) => {
                log::debug!("Saved {}", path.display());
                Ok(Some(name))
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All saved matches, sorted by name
    pub async fn list(&self) -> Result<Vec<SavedMatch>> {
        let mut matches = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let modified = metadata
                .modified()
                .ok()
                .map(|t| DateTime::<Utc>::from(t).to_rfc3339());
            matches.push(SavedMatch {
                name,
                size: metadata.len(),
                modified,
            });
        }
        matches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(matches)
    }

    /// Content of one saved match
    pub async fn read(&self, name: &str) -> Result<String> {
        let path = self.resolve(name)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(PastegoError::NotFound(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete one saved match; returns whether a file was removed
    pub async fn delete(&self, name: &str) -> Result<bool> {
        let path = self.resolve(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let mut components = Path::new(name).components();
        let valid = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) && !name.contains(['/', '\\'])
            && name != STAGING_DIR;
        if !valid {
            return Err(PastegoError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }
}

async fn write_staged(path: &Path, text: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(text.as_bytes()).await?;
    file.sync_all().await?;
    Ok(())
}

async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            log::warn!("Cannot remove {}: {}", path.display(), e);
        }
    }
}

/// Longest prefix of `s` within `max` bytes that ends on a char boundary
fn clip(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn absolute_clean(dir: &Path) -> Result<PathBuf> {
    let base = if dir.is_absolute() {
        PathBuf::new()
    } else {
        std::env::current_dir()?
    };
    let mut out = base;
    for component in dir.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

/// Keep the label readable but never let it act as a path
fn safe_label(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Lower-case, dash-separated, `[a-z0-9.-]` only
pub fn safe_file_name(name: &str) -> String {
    let mapped: String = name
        .trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' | '&' | '_' | '=' | '+' | ':' => Some('-'),
            c if c.is_ascii_alphanumeric() || c == '-' || c == '.' => Some(c),
            _ => None,
        })
        .collect();

    let mut out = String::with_capacity(mapped.len());
    for c in mapped.chars() {
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }

    if out.chars().all(|c| c == '.') {
        return "untitled".to_string();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, title: &str) -> PasteEntry {
        PasteEntry {
            key: key.to_string(),
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("My Secret Stuff"), "my-secret-stuff");
        assert_eq!(safe_file_name("a & b = c"), "a-b-c");
        assert_eq!(safe_file_name("config.php"), "config.php");
        assert_eq!(safe_file_name("<script>!"), "script");
        assert_eq!(safe_file_name(".."), "untitled");
        assert_eq!(safe_file_name("***"), "untitled");
    }

    #[test]
    fn test_file_name_uses_title_then_key() {
        assert_eq!(
            ResultStore::file_name_for(&entry("0CeaNm8Y", "Dump of db/users"), "password"),
            "password__dump-of-db-users"
        );
        assert_eq!(
            ResultStore::file_name_for(&entry("0CeaNm8Y", ""), "password"),
            "password__0ceanm8y"
        );
    }

    #[test]
    fn test_label_cannot_escape() {
        assert_eq!(
            ResultStore::file_name_for(&entry("k", "t"), "../etc"),
            ".._etc__t"
        );
    }

    #[test]
    fn test_long_names_are_clipped() {
        let label = "é".repeat(500);
        let title = "word ".repeat(200);
        let name = ResultStore::file_name_for(&entry("k", &title), &label);

        let (label_part, title_part) = name.split_once("__").unwrap();
        assert_eq!(label_part, "é".repeat(50));
        assert_eq!(title_part.len(), MAX_PART_BYTES);
        assert!(title_part.starts_with("word-word-"));
    }

    #[test]
    fn test_clip_respects_char_boundaries() {
        assert_eq!(clip("short", 100), "short");
        assert_eq!(clip("aé", 2), "a");
        assert_eq!(clip("日本語", 7), "日本");
    }

    #[tokio::test]
    async fn test_save_long_label() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::open(dir.path()).await.unwrap();
        let label = "BEGIN RSA PRIVATE KEY ".repeat(40);
        let paste = entry("k", &"title ".repeat(100));

        let name = store.save(&paste, &label, "-----BEGIN").await.unwrap().unwrap();
        assert!(name.len() <= 2 * MAX_PART_BYTES + 2);
        assert_eq!(store.read(&name).await.unwrap(), "-----BEGIN");
    }

    #[tokio::test]
    async fn test_failed_save_leaves_no_match() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::open(dir.path()).await.unwrap();
        let paste = entry("k1", "creds");

        // A plain file where the staging directory belongs makes the write fail
        fs::write(dir.path().join(STAGING_DIR), b"").await.unwrap();
        assert!(store.save(&paste, "password", "hunter2").await.is_err());
        assert!(store.list().await.unwrap().iter().all(|m| m.name != "password__creds"));
        assert!(matches!(
            store.read("password__creds").await,
            Err(PastegoError::NotFound(_))
        ));

        fs::remove_file(dir.path().join(STAGING_DIR)).await.unwrap();
        let saved = store.save(&paste, "password", "hunter2").await.unwrap();
        assert_eq!(saved.as_deref(), Some("password__creds"));
        assert_eq!(store.read("password__creds").await.unwrap(), "hunter2");
    }

    #[tokio::test]
    async fn test_cancelled_save_is_never_half_visible() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::open(dir.path()).await.unwrap();
        let paste = entry("k1", "dump");
        let big = "x".repeat(8 * 1024 * 1024);

        let _ = tokio::time::timeout(
            std::time::Duration::from_millis(1),
            store.save(&paste, "password", &big),
        )
        .await;

        let retried = store.save(&paste, "password", "retry").await.unwrap();
        let content = store.read("password__dump").await.unwrap();
        match retried {
            Some(_) => assert_eq!(content, "retry"),
            None => assert_eq!(content.len(), big.len()),
        }
    }

    #[tokio::test]
    async fn test_open_sweeps_unfinished_saves() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join(STAGING_DIR);
        fs::create_dir_all(&staging).await.unwrap();
        fs::write(staging.join("password__creds.1-0"), b"hun").await.unwrap();

        let store = ResultStore::open(dir.path()).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
        let mut left = fs::read_dir(&staging).await.unwrap();
        assert!(left.next_entry().await.unwrap().is_none());

        let saved = store.save(&entry("k1", "creds"), "password", "hunter2").await.unwrap();
        assert_eq!(saved.as_deref(), Some("password__creds"));
        let mut left = fs::read_dir(&staging).await.unwrap();
        assert!(left.next_entry().await.unwrap().is_none());
    }

    #[test]
    fn test_absolute_clean() {
        let cleaned = absolute_clean(Path::new("/tmp/./a/../results")).unwrap();
        assert_eq!(cleaned, PathBuf::from("/tmp/results"));
        assert!(absolute_clean(Path::new("results")).unwrap().is_absolute());
    }

    #[tokio::test]
    async fn test_save_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::open(dir.path()).await.unwrap();
        let paste = entry("k1", "creds");

        let first = store.save(&paste, "password", "first").await.unwrap();
        assert_eq!(first.as_deref(), Some("password__creds"));

        let second = store.save(&paste, "password", "second").await.unwrap();
        assert_eq!(second, None);
        assert_eq!(store.read("password__creds").await.unwrap(), "first");
    }

    #[tokio::test]
    async fn test_open_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = ResultStore::open(&nested).await.unwrap();
        assert!(store.root().is_dir());
    }

    #[tokio::test]
    async fn test_list_read_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::open(dir.path()).await.unwrap();
        store.save(&entry("b", "beta"), "quake", "q").await.unwrap();
        store.save(&entry("a", "alpha"), "password", "pw!").await.unwrap();
        fs::create_dir(dir.path().join("subdir")).await.unwrap();

        let listed = store.list().await.unwrap();
        let names: Vec<&str> = listed.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["password__alpha", "quake__beta"]);
        assert_eq!(listed[0].size, 3);
        assert!(listed[0].modified.is_some());

        assert!(store.delete("quake__beta").await.unwrap());
        assert!(!store.delete("quake__beta").await.unwrap());
        assert!(matches!(
            store.read("quake__beta").await,
            Err(PastegoError::NotFound(_))
        ));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_path_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::open(dir.path()).await.unwrap();
        for name in ["../secret", "a/b", "..", ".", "", "a\\b", STAGING_DIR] {
            assert!(
                matches!(store.read(name).await, Err(PastegoError::InvalidName(_))),
                "{:?}",
                name
            );
        }
        assert!(matches!(
            store.delete("/etc/passwd").await,
            Err(PastegoError::InvalidName(_))
        ));
    }
}
