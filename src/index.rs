use crate::store::ContentDigest;
use crate::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const INDEX_FILE_NAME: &str = "NASA_APOD.db";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS apod_images (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT,
        explanation TEXT,
        image_file TEXT,
        hash TEXT
    );
";

const RECORD_COLUMNS: &str = "id, title, explanation, image_file, hash";

pub type RecordId = i64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: RecordId,
    pub title: String,
    pub explanation: String,
    pub image_file: PathBuf,
    pub hash: String,
}

impl Record {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            explanation: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            image_file: PathBuf::from(row.get::<_, Option<String>>(3)?.unwrap_or_default()),
            hash: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        })
    }
}

/// Row to be appended by [`MetadataIndex::insert`].
#[derive(Debug, Clone, Copy)]
pub struct NewRecord<'a> {
    pub title: &'a str,
    pub explanation: &'a str,
    pub image_file: &'a Path,
    pub hash: &'a ContentDigest,
}

pub struct MetadataIndex {
    conn: Connection,
    path: PathBuf,
    created: bool,
}

impl MetadataIndex {
    /// Opens `NASA_APOD.db` under `root`, creating the table on first use.
    pub fn ensure_schema(root: &Path) -> Result<Self> {
        let path = root.join(INDEX_FILE_NAME);
        let created = !path.exists();

        let conn = Connection::open(&path).map_err(|e| Error::StorageUnavailable {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        conn.execute_batch(SCHEMA)?;

        if created {
            debug!(index = %path.display(), "created metadata index");
        }
        Ok(Self {
            conn,
            path,
            created,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn was_created(&self) -> bool {
        self.created
    }

    pub fn find_by_hash(&self, digest: &ContentDigest) -> Result<Option<Record>> {
        let record = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM apod_images WHERE hash = ?1 ORDER BY id LIMIT 1",
                    RECORD_COLUMNS
                ),
                params![digest.as_str()],
                Record::from_row,
            )
            .optional()?;
        Ok(record)
    }

    pub fn insert(&self, record: NewRecord<'_>) -> Result<RecordId> {
        let image_file = record.image_file.to_string_lossy();
        self.conn
            .execute(
                "INSERT INTO apod_images (title, explanation, image_file, hash) VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.title,
                    record.explanation,
                    &*image_file,
                    record.hash.as_str()
                ],
            )
            .map_err(|source| Error::IndexWrite {
                blob: record.image_file.to_path_buf(),
                source,
            })?;

        let id = self.conn.last_insert_rowid();
        debug!(id, hash = %record.hash, "record inserted");
        Ok(id)
    }

    pub fn records(&self) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM apod_images ORDER BY id",
            RECORD_COLUMNS
        ))?;
        let records = stmt
            .query_map([], Record::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM apod_images", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::compute_digest;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn schema_is_created_once() -> Result<()> {
        let dir = tempdir()?;

        let first = MetadataIndex::ensure_schema(dir.path())?;
        assert!(first.was_created());
        drop(first);

        let second = MetadataIndex::ensure_schema(dir.path())?;
        assert!(!second.was_created());
        assert_eq!(second.count()?, 0);
        Ok(())
    }

    #[test]
    fn insert_then_find_by_hash() -> Result<()> {
        let dir = tempdir()?;
        let index = MetadataIndex::ensure_schema(dir.path())?;
        let digest = compute_digest(b"horsehead");
        let blob = dir.path().join("Horsehead.jpg");

        assert_eq!(index.find_by_hash(&digest)?, None);

        let id = index.insert(NewRecord {
            title: "Horsehead",
            explanation: "A dark nebula in Orion.",
            image_file: &blob,
            hash: &digest,
        })?;

        let found = index.find_by_hash(&digest)?.expect("record should exist");
        assert_eq!(found.id, id);
        assert_eq!(found.title, "Horsehead");
        assert_eq!(found.image_file, blob);
        assert_eq!(found.hash, digest.as_str());
        assert_eq!(index.find_by_hash(&compute_digest(b"other"))?, None);
        Ok(())
    }

    #[test]
    fn ids_increase_and_lookup_returns_oldest() -> Result<()> {
        let dir = tempdir()?;
        let index = MetadataIndex::ensure_schema(dir.path())?;
        let digest = compute_digest(b"same bytes");
        let blob = dir.path().join("a.jpg");
        let row = NewRecord {
            title: "A",
            explanation: "",
            image_file: &blob,
            hash: &digest,
        };

        let first = index.insert(row)?;
        let second = index.insert(NewRecord { title: "B", ..row })?;
        assert!(second > first);

        assert_eq!(index.find_by_hash(&digest)?.map(|r| r.id), Some(first));
        assert_eq!(index.count()?, 2);
        assert_eq!(
            index.records()?.iter().map(|r| r.title.as_str()).collect::<Vec<_>>(),
            vec!["A", "B"]
        );
        Ok(())
    }
}
