//! Turso Embedded / libSQL storage layer for optimization records.
//!
//! The [`Storage`] struct wraps a libSQL database holding an append-only log
//! of [`OptimizationRecord`]s. Records are inserted once and never updated or
//! deleted; reads return them newest first.

mod migrations;

use std::path::Path;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use libsql::{Connection, Database, params};
use listingforge_shared::{ListingForgeError, NewOptimization, OptimizationRecord, Result};

const RECORD_COLUMNS: &str = "id, asin, original_title, original_bullets, original_description, \
     optimized_title, optimized_bullets, optimized_description, suggested_keywords, \
     created_at, updated_at";

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ListingForgeError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| ListingForgeError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| ListingForgeError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| ListingForgeError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| ListingForgeError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        ListingForgeError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(ListingForgeError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Optimization records
    // -----------------------------------------------------------------------

    /// Append a record, assigning its id and timestamps.
    pub async fn create_optimization(&self, new: &NewOptimization) -> Result<OptimizationRecord> {
        self.check_writable()?;

        // Microsecond precision so the stored text parses back to the same instant.
        let now = Utc::now().trunc_subsecs(6);
        let stamp = now.to_rfc3339_opts(SecondsFormat::Micros, true);

        let mut rows = self
            .conn
            .query(
                "INSERT INTO optimizations (asin, original_title, original_bullets, original_description,
                     optimized_title, optimized_bullets, optimized_description, suggested_keywords,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 RETURNING id",
                params![
                    new.asin.as_str(),
                    new.original_title.as_str(),
                    to_json(&new.original_bullets)?,
                    new.original_description.as_str(),
                    new.optimized_title.as_str(),
                    to_json(&new.optimized_bullets)?,
                    new.optimized_description.as_str(),
                    to_json(&new.suggested_keywords)?,
                    stamp.as_str(),
                    stamp.as_str(),
                ],
            )
            .await
            .map_err(|e| ListingForgeError::Storage(e.to_string()))?;

        let id = match rows.next().await {
            Ok(Some(row)) => row
                .get::<i64>(0)
                .map_err(|e| ListingForgeError::Storage(e.to_string()))?,
            Ok(None) => {
                return Err(ListingForgeError::Storage(
                    "insert returned no id".into(),
                ));
            }
            Err(e) => return Err(ListingForgeError::Storage(e.to_string())),
        };

        tracing::info!(id, asin = %new.asin, "stored optimization");

        Ok(OptimizationRecord {
            id,
            asin: new.asin.to_string(),
            original_title: new.original_title.clone(),
            original_bullets: new.original_bullets.clone(),
            original_description: new.original_description.clone(),
            optimized_title: new.optimized_title.clone(),
            optimized_bullets: new.optimized_bullets.clone(),
            optimized_description: new.optimized_description.clone(),
            suggested_keywords: new.suggested_keywords.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    /// All records for `asin`, newest first.
    pub async fn get_optimizations_by_asin(&self, asin: &str) -> Result<Vec<OptimizationRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM optimizations WHERE asin = ?1
             ORDER BY created_at DESC, id DESC"
        );
        let mut rows = self
            .conn
            .query(&sql, params![asin])
            .await
            .map_err(|e| ListingForgeError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| ListingForgeError::Storage(e.to_string()))?
        {
            results.push(row_to_record(&row)?);
        }
        Ok(results)
    }

    /// Every record, newest first.
    pub async fn get_all_optimizations(&self) -> Result<Vec<OptimizationRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM optimizations ORDER BY created_at DESC, id DESC"
        );
        let mut rows = self
            .conn
            .query(&sql, params![])
            .await
            .map_err(|e| ListingForgeError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| ListingForgeError::Storage(e.to_string()))?
        {
            results.push(row_to_record(&row)?);
        }
        Ok(results)
    }
}

fn to_json(items: &[String]) -> Result<String> {
    serde_json::to_string(items).map_err(|e| ListingForgeError::Storage(e.to_string()))
}

fn string_col(row: &libsql::Row, idx: i32) -> Result<String> {
    row.get::<String>(idx)
        .map_err(|e| ListingForgeError::Storage(e.to_string()))
}

fn list_col(row: &libsql::Row, idx: i32) -> Result<Vec<String>> {
    let raw = string_col(row, idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| ListingForgeError::Storage(format!("invalid list column {idx}: {e}")))
}

fn time_col(row: &libsql::Row, idx: i32) -> Result<DateTime<Utc>> {
    let raw = string_col(row, idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ListingForgeError::Storage(format!("invalid date: {e}")))
}

/// Convert a database row (in [`RECORD_COLUMNS`] order) to a record.
fn row_to_record(row: &libsql::Row) -> Result<OptimizationRecord> {
    Ok(OptimizationRecord {
        id: row
            .get::<i64>(0)
            .map_err(|e| ListingForgeError::Storage(e.to_string()))?,
        asin: string_col(row, 1)?,
        original_title: string_col(row, 2)?,
        original_bullets: list_col(row, 3)?,
        original_description: string_col(row, 4)?,
        optimized_title: string_col(row, 5)?,
        optimized_bullets: list_col(row, 6)?,
        optimized_description: string_col(row, 7)?,
        suggested_keywords: list_col(row, 8)?,
        created_at: time_col(row, 9)?,
        updated_at: time_col(row, 10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use listingforge_shared::Asin;
    use uuid::Uuid;

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("lf_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn new_optimization(asin: &str, title: &str) -> NewOptimization {
        NewOptimization {
            asin: Asin::parse(asin).unwrap(),
            original_title: title.into(),
            original_bullets: vec!["one".into(), "two".into()],
            original_description: "original".into(),
            optimized_title: format!("{title} (optimized)"),
            optimized_bullets: vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into()],
            optimized_description: "optimized".into(),
            suggested_keywords: vec!["kw1".into(), "kw2".into(), "kw3".into()],
        }
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        let version = storage.get_schema_version().await;
        assert_eq!(version, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("lf_test_{}.db", Uuid::now_v7()));
        let _s1 = Storage::open(&tmp).await.expect("first open");
        drop(_s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn empty_store_returns_empty() {
        let storage = test_storage().await;
        assert!(storage.get_all_optimizations().await.unwrap().is_empty());
        assert!(
            storage
                .get_optimizations_by_asin("B07H65KP63")
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn create_then_fetch_roundtrips() {
        let storage = test_storage().await;
        let created = storage
            .create_optimization(&new_optimization("B07H65KP63", "Kettle"))
            .await
            .expect("create");
        assert!(created.id > 0);
        assert_eq!(created.created_at, created.updated_at);

        let fetched = storage
            .get_optimizations_by_asin("B07H65KP63")
            .await
            .expect("fetch");
        assert_eq!(fetched, vec![created]);
    }

    #[tokio::test]
    async fn ids_are_monotonic_and_newest_first() {
        let storage = test_storage().await;
        let first = storage
            .create_optimization(&new_optimization("B07H65KP63", "First"))
            .await
            .unwrap();
        let second = storage
            .create_optimization(&new_optimization("B000000001", "Second"))
            .await
            .unwrap();
        let third = storage
            .create_optimization(&new_optimization("B07H65KP63", "Third"))
            .await
            .unwrap();
        assert!(first.id < second.id && second.id < third.id);

        let all = storage.get_all_optimizations().await.unwrap();
        let titles: Vec<&str> = all.iter().map(|r| r.original_title.as_str()).collect();
        assert_eq!(titles, vec!["Third", "Second", "First"]);

        let by_asin = storage.get_optimizations_by_asin("B07H65KP63").await.unwrap();
        let titles: Vec<&str> = by_asin.iter().map(|r| r.original_title.as_str()).collect();
        assert_eq!(titles, vec!["Third", "First"]);
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = std::env::temp_dir().join(format!("lf_test_{}.db", Uuid::now_v7()));
        let rw = Storage::open(&tmp).await.unwrap();
        rw.create_optimization(&new_optimization("B07H65KP63", "Kettle"))
            .await
            .unwrap();
        drop(rw);

        let ro = Storage::open_readonly(&tmp).await.unwrap();
        assert_eq!(ro.get_all_optimizations().await.unwrap().len(), 1);

        let result = ro
            .create_optimization(&new_optimization("B07H65KP63", "Kettle"))
            .await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("read-only"));
    }
}
