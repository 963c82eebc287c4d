use std::{future::Future, io::ErrorKind, path::PathBuf};

use anyhow::Result;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt, BufReader},
};
use tracing::{debug, warn};

use super::document::AppDocument;

pub const DOCUMENT_FILE_NAME: &str = "app-data.json";
const TEMP_FILE_NAME: &str = "app-data.json.tmp";

/// Interface for abstracting where the document is kept.
pub trait DocumentStore {
    /// Reads the whole document. Any failure, missing file included, yields
    /// the default document instead of an error: the app comes up regardless
    /// of what happened to the file.
    fn load(&self) -> impl Future<Output = AppDocument>;

    /// Replaces the document on disk in one atomic step.
    fn save(&self, document: &AppDocument) -> impl Future<Output = Result<()>>;
}

/// The main realization of [DocumentStore]: one pretty-printed JSON file,
/// replaced through a sibling temp file and a rename so a crash mid-write
/// leaves the previous document intact.
pub struct JsonDocumentStore {
    document_dir: PathBuf,
}

impl JsonDocumentStore {
    pub fn new(document_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&document_dir)?;

        Ok(Self { document_dir })
    }

    pub fn document_path(&self) -> PathBuf {
        self.document_dir.join(DOCUMENT_FILE_NAME)
    }

    async fn read_document(&self) -> Result<AppDocument> {
        let file = File::open(self.document_path()).await?;
        file.lock_shared()?;
        let mut reader = BufReader::new(file);
        let mut contents = String::new();
        let read = reader.read_to_string(&mut contents).await;
        reader.into_inner().unlock_async().await?;
        read?;

        Ok(serde_json::from_str(&contents)?)
    }
}

impl DocumentStore for JsonDocumentStore {
    async fn load(&self) -> AppDocument {
        match self.read_document().await {
            Ok(v) => v,
            Err(e) => {
                let not_found = e
                    .downcast_ref::<std::io::Error>()
                    .is_some_and(|v| v.kind() == ErrorKind::NotFound);
                if not_found {
                    debug!("No document at {:?} yet, starting fresh", self.document_path());
                } else {
                    warn!(
                        "Couldn't read {:?}, starting from the default document: {e}",
                        self.document_path()
                    );
                }
                AppDocument::default()
            }
        }
    }

    async fn save(&self, document: &AppDocument) -> Result<()> {
        let payload = serde_json::to_vec_pretty(document)?;

        let temp_path = self.document_dir.join(TEMP_FILE_NAME);
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .await?;

        // Semi-safe acquire-release for the temp file
        file.lock_exclusive()?;
        let written = Self::write_with_file(file, &payload).await;
        written?;

        tokio::fs::rename(&temp_path, self.document_path()).await?;
        Ok(())
    }
}

impl JsonDocumentStore {
    async fn write_with_file(mut file: File, payload: &[u8]) -> Result<()> {
        let result = async {
            file.write_all(payload).await?;
            file.flush().await?;
            // The rename must never promote a half-written file
            file.sync_all().await?;
            Ok(())
        }
        .await;
        file.unlock_async().await?;
        result
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    use crate::{
        store::document::{PlantKind, Planting, Task},
        utils::percentage::Percent,
    };

    use super::*;

    fn populated_document() -> AppDocument {
        let mut document = AppDocument::default();
        document.focus_points.credit(35);
        document.add_task(Task {
            id: 1,
            text: "walk outside".into(),
            completed: true,
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        });
        document.zen_garden.seeds.push(Planting {
            id: 2,
            kind: PlantKind::Tree,
            x: Percent::new_opt(12.5).unwrap(),
            y: Percent::new_opt(80.).unwrap(),
            size: 42.0,
            planted_at: Utc.timestamp_opt(1_700_000_100, 0).unwrap(),
        });
        document
    }

    #[tokio::test]
    async fn test_round_trip_preserves_the_document() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonDocumentStore::new(dir.path().to_owned())?;

        let document = populated_document();
        store.save(&document).await?;
        let loaded = store.load().await;

        assert_eq!(loaded, document);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_loads_the_default() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonDocumentStore::new(dir.path().to_owned())?;

        assert_eq!(store.load().await, AppDocument::default());
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_the_default() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonDocumentStore::new(dir.path().to_owned())?;
        std::fs::write(store.document_path(), b"{\"currentMode\": nonsense")?;

        assert_eq!(store.load().await, AppDocument::default());
        Ok(())
    }

    #[tokio::test]
    async fn test_save_failures_are_reported() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonDocumentStore::new(dir.path().to_owned())?;
        drop(dir);

        assert!(store.save(&populated_document()).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_save_replaces_the_previous_document() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonDocumentStore::new(dir.path().to_owned())?;

        store.save(&AppDocument::default()).await?;
        let document = populated_document();
        store.save(&document).await?;

        assert_eq!(store.load().await, document);
        Ok(())
    }
}
