//! The `RecordStore` and `ArchiveStore` traits.
//!
//! Both are implemented by storage backends (e.g. `circo-store-sqlite`).
//! Higher layers (`circo-reconcile`, `circo-api`) depend on these
//! abstractions, not on any concrete backend.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use crate::{
  SchoolYear,
  config::DistrictState,
  record::{RecordBatch, RecordCategory},
  snapshot::{ArchiveSnapshot, ArchiveSummary},
};

/// Durable per-category record collections.
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Insert or overwrite records one by one, keyed by school code. Only
  /// meaningful for school-keyed categories (identity, structure); other
  /// categories are replaced wholesale.
  fn upsert_records(
    &self,
    batch: RecordBatch,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Atomically replace every record of `batch`'s category.
  fn replace_category(
    &self,
    batch: RecordBatch,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Load a whole category. An absent category yields an empty batch.
  fn load_category(
    &self,
    category: RecordCategory,
  ) -> impl Future<Output = Result<RecordBatch, Self::Error>> + Send + '_;

  /// The persisted roll-over state, if the district was ever rolled over.
  fn load_district_state(
    &self,
  ) -> impl Future<Output = Result<Option<DistrictState>, Self::Error>> + Send + '_;

  fn save_district_state(
    &self,
    state: DistrictState,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

/// Durable yearly snapshots. One snapshot per school year; a snapshot is
/// never modified, only deleted.
pub trait ArchiveStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist `snapshot` in a single atomic write. Returns `Ok(false)`
  /// without writing anything when a snapshot for the same year exists.
  fn create_archive<'a>(
    &'a self,
    snapshot: &'a ArchiveSnapshot,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Persist `snapshot` together with the district state that follows it,
  /// in one atomic write: either both are stored or neither is. Returns
  /// `Ok(false)` without writing anything when a snapshot for the same year
  /// exists.
  fn create_archive_and_advance<'a>(
    &'a self,
    snapshot: &'a ArchiveSnapshot,
    next: &'a DistrictState,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn get_archive(
    &self,
    year: SchoolYear,
  ) -> impl Future<Output = Result<Option<ArchiveSnapshot>, Self::Error>> + Send + '_;

  /// Returns `false` when there was nothing to delete.
  fn delete_archive(
    &self,
    year: SchoolYear,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Summaries of every stored snapshot, oldest year first.
  fn list_archives(
    &self,
  ) -> impl Future<Output = Result<Vec<ArchiveSummary>, Self::Error>> + Send + '_;
}
