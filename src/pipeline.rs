//! Fetch, hash, dedup, store and index one APOD entry.
//!
//! The blob write and the index insert are not transactional. If the insert
//! fails the blob stays on disk as an orphan; a later run with the same bytes
//! finds no record, resolves to the same file name (its content matches) and
//! commits normally.

use crate::apod::{ApodClient, ApodEntry};
use crate::date::DATE_FORMAT;
use crate::index::{MetadataIndex, NewRecord, Record, RecordId, INDEX_FILE_NAME};
use crate::lock::CacheLock;
use crate::store::{blob_file_name, compute_digest, ContentDigest, ContentStore};
use crate::Result;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// New blob and record were written.
    Committed {
        id: RecordId,
        blob: PathBuf,
        digest: ContentDigest,
    },
    /// The content was already indexed; nothing was written.
    Skipped(Record),
}

impl IngestOutcome {
    /// Cached file for this entry, whether just written or already present.
    pub fn image_path(&self) -> &Path {
        match self {
            IngestOutcome::Committed { blob, .. } => blob,
            IngestOutcome::Skipped(record) => &record.image_file,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, IngestOutcome::Skipped(_))
    }
}

pub struct IngestPipeline {
    store: ContentStore,
    index: MetadataIndex,
    _lock: CacheLock,
}

impl IngestPipeline {
    /// Opens the cache at `root` and holds its lock until dropped.
    pub fn open(root: &Path) -> Result<Self> {
        let store = ContentStore::ensure_root(root)?;
        if store.was_created() {
            println!("Created image cache directory: {}", root.display());
        }

        let lock = CacheLock::acquire(store.root())?;

        let index = MetadataIndex::ensure_schema(store.root())?;
        if index.was_created() {
            println!("Created APOD database: {}", index.path().display());
        }

        Ok(Self {
            store,
            index,
            _lock: lock,
        })
    }

    /// Opens the cache only if a previous run created it; never creates anything.
    pub fn open_existing(root: &Path) -> Result<Option<Self>> {
        if !root.is_dir() || !root.join(INDEX_FILE_NAME).is_file() {
            return Ok(None);
        }
        Self::open(root).map(Some)
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    pub fn index(&self) -> &MetadataIndex {
        &self.index
    }

    #[instrument(skip(self, client))]
    pub async fn run(&self, client: &ApodClient, date: NaiveDate) -> Result<IngestOutcome> {
        println!("Selected APOD date: {}", date.format(DATE_FORMAT));

        let entry = client.fetch_entry(date).await?;
        let media_url = entry.media_url()?;
        println!("APOD title: {}", entry.title);
        println!("URL of the APOD image file: {}", media_url);

        println!("Downloading APOD image");
        let bytes = client.download(media_url).await?;

        self.commit(&entry, media_url, &bytes)
    }

    /// Hashes `bytes` and stores them unless the digest is already indexed.
    pub fn commit(&self, entry: &ApodEntry, media_url: &str, bytes: &[u8]) -> Result<IngestOutcome> {
        let digest = compute_digest(bytes);
        println!("SHA-256 hash value of the APOD image: {}", digest);

        if let Some(existing) = self.index.find_by_hash(&digest)? {
            println!(
                "The image already exists in the cache: {}",
                existing.image_file.display()
            );
            info!(id = existing.id, "content already cached, skipping");
            return Ok(IngestOutcome::Skipped(existing));
        }

        let preferred = blob_file_name(&entry.title, media_url);
        let file_name = self.store.resolve_file_name(&preferred, &digest)?;

        println!("Saving the APOD image to the cache");
        let blob = self.store.write_blob(&file_name, bytes)?;
        println!(
            "Full path of the APOD image file saved to the cache: {}",
            blob.path.display()
        );

        let id = self.index.insert(NewRecord {
            title: &entry.title,
            explanation: &entry.explanation,
            image_file: &blob.path,
            hash: &digest,
        })?;
        println!("Adding the image to the database");
        info!(id, blob = %blob.path.display(), "entry committed");

        Ok(IngestOutcome::Committed {
            id,
            blob: blob.path,
            digest,
        })
    }

    /// Blobs in the cache root that no record points at.
    pub fn orphan_blobs(&self) -> Result<Vec<PathBuf>> {
        let referenced: HashSet<PathBuf> = self
            .index
            .records()?
            .into_iter()
            .map(|record| record.image_file)
            .collect();

        Ok(self
            .store
            .list_blobs()?
            .into_iter()
            .filter(|blob| !referenced.contains(blob))
            .collect())
    }
}
