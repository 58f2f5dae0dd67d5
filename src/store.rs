//! On-disk blob storage under the cache root.
//!
//! Blobs are plain files directly inside the root, named after the record
//! title. Identity is the SHA-256 of the bytes, never the file name.

use crate::index::INDEX_FILE_NAME;
use crate::{Error, Result};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const DEFAULT_EXTENSION: &str = "jpg";
const UNTITLED: &str = "untitled";
const SHORT_DIGEST_LEN: usize = 12;
/// Leaves room for the `.<name>.partial` temp file and a digest suffix.
const MAX_STEM_LEN: usize = 200;

/// Lowercase hex SHA-256 of a blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentDigest(String);

impl ContentDigest {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short(&self) -> &str {
        &self.0[..SHORT_DIGEST_LEN]
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn compute_digest(bytes: &[u8]) -> ContentDigest {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    ContentDigest(hex::encode(hasher.finalize()))
}

/// Reference to a blob written by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRef {
    pub path: PathBuf,
}

/// Turns a record title into a filesystem-safe token.
pub fn sanitize_title(title: &str) -> String {
    let joined = title.split_whitespace().collect::<Vec<_>>().join("_");
    let clean: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .take(MAX_STEM_LEN)
        .collect();

    if clean.is_empty() {
        UNTITLED.to_string()
    } else {
        clean
    }
}

/// Lowercased extension of the last path segment of `media_url`.
pub fn media_extension(media_url: &str) -> String {
    let path = match reqwest::Url::parse(media_url) {
        Ok(url) => url.path().to_string(),
        Err(_) => media_url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    let segment = path.rsplit('/').next().unwrap_or_default();
    match segment.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            ext.to_lowercase()
        }
        _ => DEFAULT_EXTENSION.to_string(),
    }
}

pub fn blob_file_name(title: &str, media_url: &str) -> String {
    format!("{}.{}", sanitize_title(title), media_extension(media_url))
}

pub struct ContentStore {
    root: PathBuf,
    created: bool,
}

impl ContentStore {
    /// Opens the cache root, creating it when missing.
    pub fn ensure_root(path: &Path) -> Result<Self> {
        let unavailable = |reason: String| Error::StorageUnavailable {
            path: path.to_path_buf(),
            reason,
        };

        let created = match fs::metadata(path) {
            Ok(meta) if meta.is_dir() => {
                if meta.permissions().readonly() {
                    return Err(unavailable("directory is not writable".to_string()));
                }
                false
            }
            Ok(_) => return Err(unavailable("path exists and is not a directory".to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fs::create_dir_all(path).map_err(|e| unavailable(e.to_string()))?;
                debug!(root = %path.display(), "created cache root");
                true
            }
            Err(e) => return Err(unavailable(e.to_string())),
        };

        tempfile::Builder::new()
            .prefix(".writable")
            .tempfile_in(path)
            .map_err(|e| unavailable(format!("directory is not writable: {}", e)))?;

        Ok(Self {
            root: path.to_path_buf(),
            created,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `ensure_root` had to create the directory.
    pub fn was_created(&self) -> bool {
        self.created
    }

    pub fn blob_path(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    /// Picks the name a blob with `digest` should be stored under.
    ///
    /// The preferred name is kept when it is free or already holds the same
    /// bytes. Otherwise a digest suffix is appended so that different content
    /// never overwrites an existing blob.
    pub fn resolve_file_name(&self, preferred: &str, digest: &ContentDigest) -> Result<String> {
        let path = self.blob_path(preferred);
        if !path.exists() {
            return Ok(preferred.to_string());
        }

        let existing = fs::read(&path).map_err(|source| Error::StorageIo {
            path: path.clone(),
            source,
        })?;
        if compute_digest(&existing) == *digest {
            debug!(file = preferred, "existing blob has matching content, reusing name");
            return Ok(preferred.to_string());
        }

        let renamed = match preferred.rsplit_once('.') {
            Some((stem, ext)) => format!("{}-{}.{}", stem, digest.short(), ext),
            None => format!("{}-{}", preferred, digest.short()),
        };
        warn!(
            file = preferred,
            renamed = %renamed,
            "file name taken by different content"
        );
        Ok(renamed)
    }

    /// Writes `bytes` to `file_name` through a partial file and a rename.
    pub fn write_blob(&self, file_name: &str, bytes: &[u8]) -> Result<BlobRef> {
        let dest = self.blob_path(file_name);
        let tmp = self.root.join(format!(".{}.partial", file_name));

        let written = File::create(&tmp).and_then(|mut file| {
            file.write_all(bytes)?;
            file.flush()?;
            file.sync_all()
        });
        if let Err(source) = written {
            let _ = fs::remove_file(&tmp);
            return Err(Error::StorageIo { path: tmp, source });
        }

        if let Err(source) = fs::rename(&tmp, &dest) {
            let _ = fs::remove_file(&tmp);
            return Err(Error::StorageIo { path: dest, source });
        }

        debug!(blob = %dest.display(), size = bytes.len(), "blob written");
        Ok(BlobRef { path: dest })
    }

    /// Regular files in the root, excluding dotfiles and the index.
    pub fn list_blobs(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.root).map_err(|source| Error::StorageIo {
            path: self.root.clone(),
            source,
        })?;

        let mut blobs = Vec::new();
        for entry in entries.filter_map(|e| e.ok()) {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') || name == INDEX_FILE_NAME {
                continue;
            }
            if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                blobs.push(entry.path());
            }
        }

        blobs.sort();
        Ok(blobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn digest_is_stable_and_distinguishes_content() {
        let a = compute_digest(b"andromeda");
        assert_eq!(a, compute_digest(b"andromeda"));
        assert_ne!(a, compute_digest(b"andromedb"));
        assert_eq!(
            compute_digest(b"").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().chars().all(|c| !c.is_ascii_uppercase()));
    }

    #[test]
    fn file_name_from_title_and_url() {
        assert_eq!(
            blob_file_name("Galaxy View", "https://apod.nasa.gov/apod/image/2001/galaxy.jpg"),
            "Galaxy_View.jpg"
        );
        assert_eq!(
            blob_file_name("  M31:  The Andromeda Galaxy ", "https://x.org/a/B.JPEG?size=hd"),
            "M31_The_Andromeda_Galaxy.jpeg"
        );
        assert_eq!(blob_file_name("???", "https://x.org/img/pic.png"), "untitled.png");
        assert_eq!(blob_file_name("Comet", "https://x.org/img/noext"), "Comet.jpg");
        assert_eq!(blob_file_name("Comet", "not a url/thumb.Gif"), "Comet.gif");
    }

    #[test]
    fn ensure_root_is_idempotent() -> Result<()> {
        let dir = tempdir()?;
        let root = dir.path().join("cache");

        let first = ContentStore::ensure_root(&root)?;
        assert!(first.was_created());
        assert!(root.is_dir());

        let second = ContentStore::ensure_root(&root)?;
        assert!(!second.was_created());
        Ok(())
    }

    #[test]
    fn ensure_root_rejects_plain_file() -> Result<()> {
        let dir = tempdir()?;
        let root = dir.path().join("cache");
        fs::write(&root, b"not a dir")?;

        let err = ContentStore::ensure_root(&root).err();
        assert!(matches!(err, Some(Error::StorageUnavailable { .. })));
        Ok(())
    }

    #[test]
    fn ensure_root_rejects_readonly_dir() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir()?;
        let root = dir.path().join("cache");
        fs::create_dir(&root)?;
        fs::set_permissions(&root, fs::Permissions::from_mode(0o555))?;

        let result = ContentStore::ensure_root(&root);
        fs::set_permissions(&root, fs::Permissions::from_mode(0o755))?;

        match result {
            Err(err @ Error::StorageUnavailable { .. }) => assert_eq!(err.stage(), "storage"),
            Err(other) => panic!("unexpected error {:?}", other),
            Ok(_) => panic!("read-only root should be rejected"),
        }
        Ok(())
    }

    #[test]
    fn ensure_root_writability_check_leaves_nothing_behind() -> Result<()> {
        let dir = tempdir()?;
        ContentStore::ensure_root(dir.path())?;
        ContentStore::ensure_root(dir.path())?;

        assert_eq!(fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn write_blob_failure_leaves_no_partial() -> Result<()> {
        let dir = tempdir()?;
        let store = ContentStore::ensure_root(dir.path())?;
        fs::create_dir(dir.path().join("Blocked.jpg"))?;

        match store.write_blob("Blocked.jpg", b"pixels") {
            Err(Error::StorageIo { path, .. }) => assert_eq!(path, dir.path().join("Blocked.jpg")),
            other => panic!("expected storage I/O error, got {:?}", other.map(|b| b.path)),
        }
        assert!(!dir.path().join(".Blocked.jpg.partial").exists());
        assert!(dir.path().join("Blocked.jpg").is_dir());
        Ok(())
    }

    #[test]
    fn long_titles_are_capped_so_the_temp_name_fits() -> Result<()> {
        let dir = tempdir()?;
        let store = ContentStore::ensure_root(dir.path())?;
        let title = "Sagittarius ".repeat(30);

        let name = blob_file_name(&title, "https://x.org/img/long.jpeg");
        assert_eq!(name.len(), MAX_STEM_LEN + ".jpeg".len());

        let blob = store.write_blob(&name, b"long")?;
        assert_eq!(fs::read(&blob.path)?, b"long");
        Ok(())
    }

    #[test]
    fn write_blob_leaves_no_partial_file() -> Result<()> {
        let dir = tempdir()?;
        let store = ContentStore::ensure_root(dir.path())?;

        let blob = store.write_blob("Nebula.png", b"pixels")?;
        assert_eq!(fs::read(&blob.path)?, b"pixels");
        assert!(!dir.path().join(".Nebula.png.partial").exists());
        assert_eq!(store.list_blobs()?, vec![blob.path]);
        Ok(())
    }

    #[test]
    fn resolve_file_name_avoids_overwriting_other_content() -> Result<()> {
        let dir = tempdir()?;
        let store = ContentStore::ensure_root(dir.path())?;
        store.write_blob("Moon.jpg", b"first moon")?;

        let same = compute_digest(b"first moon");
        assert_eq!(store.resolve_file_name("Moon.jpg", &same)?, "Moon.jpg");

        let other = compute_digest(b"second moon");
        let renamed = store.resolve_file_name("Moon.jpg", &other)?;
        assert_eq!(renamed, format!("Moon-{}.jpg", other.short()));

        assert_eq!(store.resolve_file_name("Sun.jpg", &other)?, "Sun.jpg");
        Ok(())
    }

    #[test]
    fn list_blobs_skips_index_and_dotfiles() -> Result<()> {
        let dir = tempdir()?;
        let store = ContentStore::ensure_root(dir.path())?;
        fs::write(dir.path().join(INDEX_FILE_NAME), b"db")?;
        fs::write(dir.path().join(".lock"), b"")?;
        fs::create_dir(dir.path().join("nested"))?;
        let blob = store.write_blob("Star.jpg", b"star")?;

        assert_eq!(store.list_blobs()?, vec![blob.path]);
        Ok(())
    }
}
