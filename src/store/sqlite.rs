//! SQLite-backed repositories.
//!
//! Relies on the schema created by [`crate::migrate`]: `documents.source_file`
//! and `(platform_terms.taxonomy, platform_terms.slug)` are unique, so racing
//! first-syncs surface as [`StoreError::Conflict`] instead of duplicates.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::models::{ContactSubmission, PlatformTerm, StoredDocument};

use super::{ContactRepository, DocumentRepository, StoreError, TaxonomyRepository};

const DOCUMENT_COLUMNS: &str = "id, source_file, title, slug, excerpt, content, post_type, status, \
     sync_hash, sync_timestamp, filesize";

/// Document and taxonomy repositories over one SQLite pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    taxonomy: String,
}

impl SqliteStore {
    /// `taxonomy` scopes every term read and write (e.g. `"platform"`).
    pub fn new(pool: SqlitePool, taxonomy: impl Into<String>) -> Self {
        Self {
            pool,
            taxonomy: taxonomy.into(),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn map_err(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(db.message().to_string())
        }
        sqlx::Error::RowNotFound => StoreError::NotFound(err.to_string()),
        _ => StoreError::Backend(err.to_string()),
    }
}

fn row_to_document(row: &SqliteRow) -> Result<StoredDocument, StoreError> {
    Ok(StoredDocument {
        id: Some(row.try_get("id").map_err(map_err)?),
        source_file: row.try_get("source_file").map_err(map_err)?,
        title: row.try_get("title").map_err(map_err)?,
        slug: row.try_get("slug").map_err(map_err)?,
        excerpt: row.try_get("excerpt").map_err(map_err)?,
        content: row.try_get("content").map_err(map_err)?,
        post_type: row.try_get("post_type").map_err(map_err)?,
        status: row.try_get("status").map_err(map_err)?,
        sync_hash: row.try_get("sync_hash").map_err(map_err)?,
        sync_timestamp: row.try_get("sync_timestamp").map_err(map_err)?,
        filesize: row.try_get("filesize").map_err(map_err)?,
    })
}

#[async_trait]
impl DocumentRepository for SqliteStore {
    async fn find_by_external_key(
        &self,
        source_file: &str,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let sql = format!(
            "SELECT {} FROM documents WHERE source_file = ? ORDER BY id LIMIT 1",
            DOCUMENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(source_file)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;
        row.as_ref().map(row_to_document).transpose()
    }

    async fn get(&self, id: i64) -> Result<Option<StoredDocument>, StoreError> {
        let sql = format!("SELECT {} FROM documents WHERE id = ?", DOCUMENT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;
        row.as_ref().map(row_to_document).transpose()
    }

    async fn upsert(&self, doc: &StoredDocument) -> Result<i64, StoreError> {
        let now = chrono::Utc::now().timestamp();

        match doc.id {
            None => {
                let result = sqlx::query(
                    r#"
                    INSERT INTO documents (source_file, title, slug, excerpt, content, post_type, status,
                                           sync_hash, sync_timestamp, filesize, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&doc.source_file)
                .bind(&doc.title)
                .bind(&doc.slug)
                .bind(&doc.excerpt)
                .bind(&doc.content)
                .bind(&doc.post_type)
                .bind(&doc.status)
                .bind(&doc.sync_hash)
                .bind(&doc.sync_timestamp)
                .bind(doc.filesize)
                .bind(now)
                .bind(now)
                .execute(&self.pool)
                .await
                .map_err(map_err)?;
                Ok(result.last_insert_rowid())
            }
            Some(id) => {
                let result = sqlx::query(
                    r#"
                    UPDATE documents SET
                        source_file = ?, title = ?, slug = ?, excerpt = ?, content = ?,
                        post_type = ?, status = ?, sync_hash = ?, sync_timestamp = ?,
                        filesize = ?, updated_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(&doc.source_file)
                .bind(&doc.title)
                .bind(&doc.slug)
                .bind(&doc.excerpt)
                .bind(&doc.content)
                .bind(&doc.post_type)
                .bind(&doc.status)
                .bind(&doc.sync_hash)
                .bind(&doc.sync_timestamp)
                .bind(doc.filesize)
                .bind(now)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(map_err)?;

                if result.rows_affected() == 0 {
                    return Err(StoreError::NotFound(format!("document {}", id)));
                }
                Ok(id)
            }
        }
    }

    async fn set_terms(&self, id: i64, term_ids: &[i64]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;

        // Only this taxonomy's associations are replaced
        sqlx::query(
            r#"
            DELETE FROM document_terms
            WHERE document_id = ?
              AND term_id IN (SELECT id FROM platform_terms WHERE taxonomy = ?)
            "#,
        )
        .bind(id)
        .bind(&self.taxonomy)
        .execute(&mut *tx)
        .await
        .map_err(map_err)?;

        for term_id in term_ids {
            sqlx::query("INSERT OR IGNORE INTO document_terms (document_id, term_id) VALUES (?, ?)")
                .bind(id)
                .bind(term_id)
                .execute(&mut *tx)
                .await
                .map_err(map_err)?;
        }

        tx.commit().await.map_err(map_err)?;
        Ok(())
    }

    async fn terms_of(&self, id: i64) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar(
            r#"
            SELECT t.slug FROM document_terms dt
            JOIN platform_terms t ON t.id = dt.term_id
            WHERE dt.document_id = ? AND t.taxonomy = ?
            ORDER BY t.slug
            "#,
        )
        .bind(id)
        .bind(&self.taxonomy)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn clear_fingerprint(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE documents SET sync_hash = '' WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("document {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl TaxonomyRepository for SqliteStore {
    async fn find_term_by_slug(&self, slug: &str) -> Result<Option<PlatformTerm>, StoreError> {
        let row: Option<(i64, String, String)> = sqlx::query_as(
            "SELECT id, slug, name FROM platform_terms WHERE taxonomy = ? AND slug = ?",
        )
        .bind(&self.taxonomy)
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;

        Ok(row.map(|(id, slug, name)| PlatformTerm { id, slug, name }))
    }

    async fn create_term(&self, name: &str, slug: &str) -> Result<PlatformTerm, StoreError> {
        let result =
            sqlx::query("INSERT INTO platform_terms (taxonomy, slug, name) VALUES (?, ?, ?)")
                .bind(&self.taxonomy)
                .bind(slug)
                .bind(name)
                .execute(&self.pool)
                .await
                .map_err(map_err)?;

        Ok(PlatformTerm {
            id: result.last_insert_rowid(),
            slug: slug.to_string(),
            name: name.to_string(),
        })
    }
}

#[async_trait]
impl ContactRepository for SqliteStore {
    async fn save_contact(&self, submission: &ContactSubmission) -> Result<i64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO contact_submissions (name, email, message, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&submission.name)
        .bind(&submission.email)
        .bind(&submission.message)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(result.last_insert_rowid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, migrate};
    use tempfile::TempDir;

    async fn store() -> (TempDir, SqliteStore) {
        let tmp = TempDir::new().unwrap();
        let pool = db::connect_path(&tmp.path().join("gateway.sqlite"))
            .await
            .unwrap();
        migrate::apply(&pool).await.unwrap();
        (tmp, SqliteStore::new(pool, "platform"))
    }

    fn doc(source_file: &str) -> StoredDocument {
        StoredDocument {
            id: None,
            source_file: source_file.to_string(),
            title: "Guide".to_string(),
            slug: "guide".to_string(),
            excerpt: "A guide.".to_string(),
            content: "<h2 id=\"toc-setup\">Setup</h2>".to_string(),
            post_type: "documentation".to_string(),
            status: "publish".to_string(),
            sync_hash: "deadbeef".to_string(),
            sync_timestamp: "2024-01-01T00:00:00Z".to_string(),
            filesize: 120,
        }
    }

    #[tokio::test]
    async fn test_insert_find_update() {
        let (_tmp, store) = store().await;
        let id = store.upsert(&doc("guide.md")).await.unwrap();

        let mut found = store.find_by_external_key("guide.md").await.unwrap().unwrap();
        assert_eq!(found.id, Some(id));
        assert_eq!(found.sync_hash, "deadbeef");
        assert_eq!(found.filesize, 120);

        found.title = "Guide v2".to_string();
        assert_eq!(store.upsert(&found).await.unwrap(), id);
        assert_eq!(store.get(id).await.unwrap().unwrap().title, "Guide v2");
        assert!(store.find_by_external_key("other.md").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_source_file_conflicts() {
        let (_tmp, store) = store().await;
        store.upsert(&doc("guide.md")).await.unwrap();
        let err = store.upsert(&doc("guide.md")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_update_missing_id_not_found() {
        let (_tmp, store) = store().await;
        let mut d = doc("guide.md");
        d.id = Some(42);
        assert!(matches!(
            store.upsert(&d).await.unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_terms_create_conflict_and_replace() {
        let (_tmp, store) = store().await;
        let id = store.upsert(&doc("guide.md")).await.unwrap();

        let ios = store.create_term("Ios", "ios").await.unwrap();
        let android = store.create_term("Android", "android").await.unwrap();
        assert!(matches!(
            store.create_term("iOS", "ios").await.unwrap_err(),
            StoreError::Conflict(_)
        ));
        assert_eq!(
            store.find_term_by_slug("ios").await.unwrap(),
            Some(ios.clone())
        );

        store.set_terms(id, &[ios.id]).await.unwrap();
        store.set_terms(id, &[android.id]).await.unwrap();
        assert_eq!(store.terms_of(id).await.unwrap(), vec!["android".to_string()]);
    }

    #[tokio::test]
    async fn test_save_contact() {
        let (_tmp, store) = store().await;
        let submission = ContactSubmission {
            name: "Ada".to_string(),
            email: "ada@example.org".to_string(),
            message: "Hello".to_string(),
            turnstile_token: None,
        };
        let first = store.save_contact(&submission).await.unwrap();
        let second = store.save_contact(&submission).await.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_clear_fingerprint() {
        let (_tmp, store) = store().await;
        let id = store.upsert(&doc("guide.md")).await.unwrap();
        store.clear_fingerprint(id).await.unwrap();
        assert_eq!(store.get(id).await.unwrap().unwrap().sync_hash, "");
    }
}
