//! Turso Embedded / libSQL storage layer for sweep results.
//!
//! The [`Storage`] struct wraps a libSQL database holding sweep runs and the
//! deduplicated business table. Businesses are keyed by the SHA-256 of their
//! identity key, so re-running a sweep over the same area never duplicates
//! rows. [`JsonFileSink`] offers the same guarantee for a plain JSON file.
//!
//! **Access rules:**
//! - `mapsweep search`: read-write via [`Storage::open`]
//! - `mapsweep list`: read-only via [`Storage::open_readonly`]

mod json;
mod migrations;

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use mapsweep_shared::{
    BusinessRecord, DistanceUnit, IdentityKey, LatLng, MapSweepError, PersistOutcome, Result,
    ResultSink, Review, RunId, SearchRegion,
};
use serde::Serialize;
use tracing::{debug, info};

pub use json::JsonFileSink;

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
            std::fs::create_dir_all(parent).map_err(|e| MapSweepError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| MapSweepError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| MapSweepError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` for reading only.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MapSweepError::Storage(format!(
                "database not found at {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| MapSweepError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| MapSweepError::Storage(e.to_string()))?;

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
                info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        MapSweepError::Storage(format!(
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
            return Err(MapSweepError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Run operations
    // -----------------------------------------------------------------------

    /// Record the start of a sweep over `region`.
    pub async fn insert_run(
        &self,
        run_id: &RunId,
        category: &str,
        region: &SearchRegion,
    ) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO runs (id, category, center_lat, center_lng, radius, unit, started_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    run_id.to_string(),
                    category,
                    region.center.lat,
                    region.center.lng,
                    region.radius,
                    region.unit.label(),
                    now.as_str(),
                ],
            )
            .await
            .map_err(|e| MapSweepError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Mark a run finished and attach its stats.
    pub async fn finish_run(&self, run_id: &RunId, stats_json: &str) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE runs SET finished_at = ?1, stats_json = ?2 WHERE id = ?3",
                params![now.as_str(), stats_json, run_id.to_string()],
            )
            .await
            .map_err(|e| MapSweepError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Get a run by ID.
    pub async fn get_run(&self, run_id: &RunId) -> Result<Option<StoredRun>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, category, center_lat, center_lng, radius, unit, started_at, finished_at, stats_json
                 FROM runs WHERE id = ?1",
                params![run_id.to_string()],
            )
            .await
            .map_err(|e| MapSweepError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_run(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(MapSweepError::Storage(e.to_string())),
        }
    }

    // -----------------------------------------------------------------------
    // Business operations
    // -----------------------------------------------------------------------

    /// Insert records that are not stored yet; existing keys are left untouched.
    pub async fn persist_records(
        &self,
        run_id: &RunId,
        records: &[BusinessRecord],
    ) -> Result<PersistOutcome> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let run_id = run_id.to_string();
        let mut outcome = PersistOutcome::default();

        for record in records {
            let key = record.identity_key()?;
            let services_json = serde_json::to_string(&record.services)
                .map_err(|e| MapSweepError::Storage(e.to_string()))?;
            let reviews_json = serde_json::to_string(&record.reviews)
                .map_err(|e| MapSweepError::Storage(e.to_string()))?;

            let changed = self
                .conn
                .execute(
                    "INSERT INTO businesses (key_hash, identity_key, name, address, rating, review_count,
                                             phone, website, services_json, reviews_json, run_id, first_seen_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                     ON CONFLICT(key_hash) DO NOTHING",
                    params![
                        key.digest(),
                        key.as_str(),
                        record.name.as_str(),
                        record.address.as_str(),
                        record.rating.map(f64::from),
                        record.review_count.map(i64::from),
                        record.phone.as_deref(),
                        record.website.as_deref(),
                        services_json,
                        reviews_json,
                        run_id.as_str(),
                        now.as_str(),
                    ],
                )
                .await
                .map_err(|e| MapSweepError::Storage(e.to_string()))?;

            if changed > 0 {
                outcome.inserted += 1;
            } else {
                debug!(key = %key, "business already stored");
                outcome.skipped += 1;
            }
        }

        info!(
            inserted = outcome.inserted,
            skipped = outcome.skipped,
            "records persisted"
        );
        Ok(outcome)
    }

    /// Get a business by identity key.
    pub async fn get_business(&self, key: &IdentityKey) -> Result<Option<StoredBusiness>> {
        let mut rows = self
            .conn
            .query(
                "SELECT key_hash, name, address, rating, review_count, phone, website,
                        services_json, reviews_json, run_id, first_seen_at
                 FROM businesses WHERE key_hash = ?1",
                params![key.digest()],
            )
            .await
            .map_err(|e| MapSweepError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_business(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(MapSweepError::Storage(e.to_string())),
        }
    }

    /// List stored businesses, oldest first.
    pub async fn list_businesses(&self, limit: usize) -> Result<Vec<StoredBusiness>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut rows = self
            .conn
            .query(
                "SELECT key_hash, name, address, rating, review_count, phone, website,
                        services_json, reviews_json, run_id, first_seen_at
                 FROM businesses ORDER BY first_seen_at, name LIMIT ?1",
                params![limit],
            )
            .await
            .map_err(|e| MapSweepError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_business(&row)?);
        }
        Ok(results)
    }

    /// Number of stored businesses.
    pub async fn count_businesses(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM businesses", params![])
            .await
            .map_err(|e| MapSweepError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let count = row
                    .get::<i64>(0)
                    .map_err(|e| MapSweepError::Storage(e.to_string()))?;
                Ok(count.max(0) as u64)
            }
            Ok(None) => Ok(0),
            Err(e) => Err(MapSweepError::Storage(e.to_string())),
        }
    }

    /// A [`ResultSink`] writing into this database under `run_id`.
    pub fn sink(&self, run_id: RunId) -> RunSink<'_> {
        RunSink {
            storage: self,
            run_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Sink adapter
// ---------------------------------------------------------------------------

/// Persists a sweep's records into [`Storage`], attributed to one run.
pub struct RunSink<'a> {
    storage: &'a Storage,
    run_id: RunId,
}

#[async_trait]
impl<'a> ResultSink for RunSink<'a> {
    async fn persist(&self, records: &[BusinessRecord]) -> Result<PersistOutcome> {
        self.storage.persist_records(&self.run_id, records).await
    }

    fn name(&self) -> &str {
        "libsql"
    }
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A sweep run as stored in the `runs` table.
#[derive(Debug, Clone, Serialize)]
pub struct StoredRun {
    pub id: String,
    pub category: String,
    pub center: LatLng,
    pub radius: f64,
    pub unit: DistanceUnit,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stats_json: Option<String>,
}

/// A business row together with its bookkeeping columns.
#[derive(Debug, Clone, Serialize)]
pub struct StoredBusiness {
    pub key_hash: String,
    #[serde(flatten)]
    pub record: BusinessRecord,
    pub run_id: Option<String>,
    pub first_seen_at: DateTime<Utc>,
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| MapSweepError::Storage(format!("invalid date: {e}")))
}

/// Convert a database row to a [`StoredRun`].
fn row_to_run(row: &libsql::Row) -> Result<StoredRun> {
    let unit: String = row
        .get(5)
        .map_err(|e| MapSweepError::Storage(e.to_string()))?;
    let started_at: String = row
        .get(6)
        .map_err(|e| MapSweepError::Storage(e.to_string()))?;

    Ok(StoredRun {
        id: row
            .get::<String>(0)
            .map_err(|e| MapSweepError::Storage(e.to_string()))?,
        category: row
            .get::<String>(1)
            .map_err(|e| MapSweepError::Storage(e.to_string()))?,
        center: LatLng::new(
            row.get::<f64>(2)
                .map_err(|e| MapSweepError::Storage(e.to_string()))?,
            row.get::<f64>(3)
                .map_err(|e| MapSweepError::Storage(e.to_string()))?,
        ),
        radius: row
            .get::<f64>(4)
            .map_err(|e| MapSweepError::Storage(e.to_string()))?,
        unit: unit.parse()?,
        started_at: parse_timestamp(&started_at)?,
        finished_at: match row.get::<String>(7).ok() {
            Some(s) => Some(parse_timestamp(&s)?),
            None => None,
        },
        stats_json: row.get::<String>(8).ok(),
    })
}

/// Convert a database row to a [`StoredBusiness`].
fn row_to_business(row: &libsql::Row) -> Result<StoredBusiness> {
    let services_json: String = row
        .get(7)
        .map_err(|e| MapSweepError::Storage(e.to_string()))?;
    let reviews_json: String = row
        .get(8)
        .map_err(|e| MapSweepError::Storage(e.to_string()))?;
    let first_seen_at: String = row
        .get(10)
        .map_err(|e| MapSweepError::Storage(e.to_string()))?;

    let services: Vec<String> = serde_json::from_str(&services_json)
        .map_err(|e| MapSweepError::Storage(format!("invalid services_json: {e}")))?;
    let reviews: Vec<Review> = serde_json::from_str(&reviews_json)
        .map_err(|e| MapSweepError::Storage(format!("invalid reviews_json: {e}")))?;

    let mut record = BusinessRecord::new(
        row.get::<String>(1)
            .map_err(|e| MapSweepError::Storage(e.to_string()))?,
        row.get::<String>(2)
            .map_err(|e| MapSweepError::Storage(e.to_string()))?,
    );
    record.rating = row.get::<f64>(3).ok().map(|r| r as f32);
    record.review_count = row.get::<i64>(4).ok().map(|c| c as u32);
    record.phone = row.get::<String>(5).ok();
    record.website = row.get::<String>(6).ok();
    record.services = services;
    record.reviews = reviews;

    Ok(StoredBusiness {
        key_hash: row
            .get::<String>(0)
            .map_err(|e| MapSweepError::Storage(e.to_string()))?,
        record,
        run_id: row.get::<String>(9).ok(),
        first_seen_at: parse_timestamp(&first_seen_at)?,
    })
}
