//! SQLite-backed document store.

use super::{Document, DocumentStore, DocumentStoreError, decode_embedding, encode_embedding};
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Document store persisting rows in a single SQLite database.
///
/// The connection is serialized behind a mutex and every call runs on the blocking pool.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDocumentStore {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self, DocumentStoreError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|error| DocumentStoreError::Task(error.to_string()))?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, DocumentStoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, DocumentStoreError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                title TEXT NOT NULL,
                summary TEXT NOT NULL,
                file_path TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_documents_owner ON documents(owner_id);
            ",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, DocumentStoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, DocumentStoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| DocumentStoreError::Task("connection mutex poisoned".into()))?;
            f(&mut guard)
        })
        .await
        .map_err(|error| DocumentStoreError::Task(error.to_string()))?
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn create(&self, document: &Document) -> Result<(), DocumentStoreError> {
        let document = document.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO documents (id, owner_id, title, summary, file_path, embedding, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    document.id,
                    document.owner_id,
                    document.title,
                    document.summary_text,
                    document.raw_file_reference,
                    encode_embedding(&document.embedding),
                    document.created_at,
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Document>, DocumentStoreError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    "SELECT id, owner_id, title, summary, file_path, embedding, created_at
                     FROM documents WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok((
                            Document {
                                id: row.get(0)?,
                                owner_id: row.get(1)?,
                                title: row.get(2)?,
                                summary_text: row.get(3)?,
                                raw_file_reference: row.get(4)?,
                                embedding: Vec::new(),
                                created_at: row.get(6)?,
                            },
                            row.get::<_, Vec<u8>>(5)?,
                        ))
                    },
                )
                .optional()?;

            row.map(|(mut document, bytes)| {
                document.embedding = decode_embedding(&bytes)?;
                Ok(document)
            })
            .transpose()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str) -> Document {
        Document {
            id: id.into(),
            owner_id: "owner-1".into(),
            title: "Backend CV".into(),
            summary_text: "Senior backend engineer".into(),
            raw_file_reference: "2025/1_owner-1_cv.pdf".into(),
            embedding: vec![0.1, 0.2, 0.3],
            created_at: "2025-01-01T00:00:00Z".into(),
        }
    }

    #[tokio::test]
    async fn create_then_get_returns_same_document() {
        let store = SqliteDocumentStore::open_in_memory().expect("store");
        store.create(&sample("doc-1")).await.expect("create");

        let loaded = store
            .get_by_id("doc-1")
            .await
            .expect("query")
            .expect("present");
        assert_eq!(loaded, sample("doc-1"));
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let store = SqliteDocumentStore::open_in_memory().expect("store");
        assert!(store.get_by_id("nope").await.expect("query").is_none());
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected_without_partial_write() {
        let store = SqliteDocumentStore::open_in_memory().expect("store");
        store.create(&sample("doc-1")).await.expect("create");

        let mut duplicate = sample("doc-1");
        duplicate.title = "Other".into();
        let error = store.create(&duplicate).await.expect_err("duplicate");
        assert!(matches!(error, DocumentStoreError::Sqlite(_)));

        let loaded = store.get_by_id("doc-1").await.expect("query").expect("row");
        assert_eq!(loaded.title, "Backend CV");
    }
}
