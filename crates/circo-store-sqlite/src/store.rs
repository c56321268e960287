//! [`SqliteStore`]: the SQLite implementation of [`RecordStore`] and
//! [`ArchiveStore`].

use std::path::Path;

use rusqlite::{OptionalExtension as _, TransactionBehavior};

use circo_core::{
  SchoolYear,
  config::DistrictState,
  record::{RecordBatch, RecordCategory},
  snapshot::{ArchiveSnapshot, ArchiveSummary},
  store::{ArchiveStore, RecordStore},
};

use crate::{
  Error, Result,
  encode::{ArchiveRow, decode_snapshot, decode_summary, encode_year},
  schema::{SCHEMA, SCHEMA_VERSION},
};

const UPSERT_STATE: &str = "INSERT INTO district_state (id, state_json) VALUES (1, ?1)
   ON CONFLICT (id) DO UPDATE SET state_json = excluded.state_json";

// ─── Store ───────────────────────────────────────────────────────────────────

/// Record collections and yearly archives in a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    let found: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("PRAGMA user_version", [], |r| r.get(0))?))
      .await?;
    if found > SCHEMA_VERSION {
      return Err(Error::SchemaVersion {
        found,
        supported: SCHEMA_VERSION,
      });
    }

    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!(version = SCHEMA_VERSION, "schema ready");
    Ok(())
  }

  /// Write `batch`'s rows in one transaction, optionally clearing the
  /// category first.
  async fn write_rows(&self, batch: RecordBatch, replace: bool) -> Result<usize> {
    let category = batch.category().to_string();
    let rows = batch.to_rows()?;

    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if replace {
          tx.execute("DELETE FROM records WHERE category = ?1", rusqlite::params![category])?;
        }
        {
          let mut stmt = tx.prepare(
            "INSERT INTO records (category, record_key, payload_json) VALUES (?1, ?2, ?3)
             ON CONFLICT (category, record_key) DO UPDATE SET payload_json = excluded.payload_json",
          )?;
          for (key, payload) in &rows {
            stmt.execute(rusqlite::params![category, key, payload])?;
          }
        }
        tx.commit()?;
        Ok(rows.len())
      })
      .await?;
    Ok(written)
  }

  /// Insert `snapshot` unless its year is archived, and with it the
  /// serialised district state when given. One transaction.
  async fn write_archive(&self, snapshot: &ArchiveSnapshot, state_json: Option<String>) -> Result<bool> {
    let row = ArchiveRow::encode(snapshot)?;

    let created = self
      .conn
      .call(move |conn| {
        // IMMEDIATE takes the write lock up front, so the existence check
        // and the insert cannot interleave with another writer.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let exists = tx
          .query_row(
            "SELECT 1 FROM archives WHERE school_year = ?1",
            rusqlite::params![row.school_year],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if exists {
          return Ok(false);
        }
        tx.execute(
          "INSERT INTO archives
             (school_year, snapshot_id, created_at, schema_version, digest, summary_json, snapshot_json)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            row.school_year,
            row.snapshot_id,
            row.created_at,
            row.schema_version,
            row.digest,
            row.summary_json,
            row.snapshot_json,
          ],
        )?;
        if let Some(json) = state_json {
          tx.execute(UPSERT_STATE, rusqlite::params![json])?;
        }
        tx.commit()?;
        Ok(true)
      })
      .await?;
    Ok(created)
  }
}

// ─── RecordStore ─────────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = Error;

  async fn upsert_records(&self, batch: RecordBatch) -> Result<usize> {
    self.write_rows(batch, false).await
  }

  async fn replace_category(&self, batch: RecordBatch) -> Result<usize> {
    self.write_rows(batch, true).await
  }

  async fn load_category(&self, category: RecordCategory) -> Result<RecordBatch> {
    let key = category.to_string();

    let payloads: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT payload_json FROM records WHERE category = ?1 ORDER BY record_key",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![key], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(RecordBatch::from_rows(category, &payloads)?)
  }

  async fn load_district_state(&self) -> Result<Option<DistrictState>> {
    let json: Option<String> = self
      .conn
      .call(|conn| {
        Ok(conn
          .query_row("SELECT state_json FROM district_state WHERE id = 1", [], |r| r.get(0))
          .optional()?)
      })
      .await?;

    Ok(json.map(|j| serde_json::from_str(&j)).transpose()?)
  }

  async fn save_district_state(&self, state: DistrictState) -> Result<()> {
    let json = serde_json::to_string(&state)?;
    self
      .conn
      .call(move |conn| {
        conn.execute(UPSERT_STATE, rusqlite::params![json])?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── ArchiveStore ────────────────────────────────────────────────────────────

impl ArchiveStore for SqliteStore {
  type Error = Error;

  async fn create_archive<'a>(&'a self, snapshot: &'a ArchiveSnapshot) -> Result<bool> {
    self.write_archive(snapshot, None).await
  }

  async fn create_archive_and_advance<'a>(
    &'a self,
    snapshot: &'a ArchiveSnapshot,
    next: &'a DistrictState,
  ) -> Result<bool> {
    let state_json = serde_json::to_string(next)?;
    self.write_archive(snapshot, Some(state_json)).await
  }

  async fn get_archive(&self, year: SchoolYear) -> Result<Option<ArchiveSnapshot>> {
    let year = encode_year(year);

    let json: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT snapshot_json FROM archives WHERE school_year = ?1",
            rusqlite::params![year],
            |r| r.get(0),
          )
          .optional()?)
      })
      .await?;

    json.as_deref().map(decode_snapshot).transpose()
  }

  async fn delete_archive(&self, year: SchoolYear) -> Result<bool> {
    let year = encode_year(year);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM archives WHERE school_year = ?1",
          rusqlite::params![year],
        )?)
      })
      .await?;
    Ok(deleted > 0)
  }

  async fn list_archives(&self) -> Result<Vec<ArchiveSummary>> {
    let rows: Vec<(String, String)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare("SELECT summary_json, created_at FROM archives ORDER BY school_year")?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .iter()
      .map(|(summary, created_at)| decode_summary(summary, created_at))
      .collect()
  }
}
