//! services/api/src/adapters/file_store.rs
//!
//! Database-backed draft storage for uploaded supporting documents,
//! implementing the `FileStore` port from the `core` crate. Each upload
//! area holds the files of one pending generation request.

use async_trait::async_trait;
use module_assistant_core::domain::UploadedFile;
use module_assistant_core::ports::{FileStore, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// A draft-file adapter that implements the `FileStore` port.
#[derive(Clone)]
pub struct DraftFileStore {
    pool: PgPool,
}

impl DraftFileStore {
    /// Creates a new `DraftFileStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct DraftFileRecord {
    filename: String,
    mimetype: String,
    content: Vec<u8>,
}
impl DraftFileRecord {
    fn to_domain(self) -> UploadedFile {
        UploadedFile {
            filename: self.filename,
            mimetype: self.mimetype,
            bytes: self.content,
        }
    }
}

#[async_trait]
impl FileStore for DraftFileStore {
    /// Reads every file in the area, in upload order. An unknown area is
    /// simply empty.
    async fn read_uploaded(&self, area: Uuid) -> PortResult<Vec<UploadedFile>> {
        let records = sqlx::query_as::<_, DraftFileRecord>(
            "SELECT filename, mimetype, content FROM draft_files
             WHERE area_id = $1 ORDER BY created_at, filename",
        )
        .bind(area)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(DraftFileRecord::to_domain).collect())
    }

    async fn store(&self, area: Uuid, file: UploadedFile) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO draft_files (id, area_id, filename, mimetype, content)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(area)
        .bind(&file.filename)
        .bind(&file.mimetype)
        .bind(&file.bytes)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}
