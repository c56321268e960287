//! Yearly archive builds.
//!
//! A build reads every record category, resolves and aggregates them, and
//! hands the resulting snapshot to the archive store in one write. The
//! snapshot's computed section is reproducible from its raw section alone;
//! [`verify`] checks that.

use std::{
  collections::HashSet,
  sync::{Mutex, PoisonError},
};

use chrono::{DateTime, Utc};
use circo_core::{
  SchoolYear,
  config::DistrictConfig,
  record::{RecordCategory, RecordSet},
  snapshot::{ArchiveSnapshot, CompletenessFlags, ComputedSection, RawSection, SCHEMA_VERSION},
  store::{ArchiveStore, RecordStore},
  text::repair_legacy_encoding,
};
use sha2::{Digest, Sha256};
use strum::IntoEnumIterator;
use uuid::Uuid;

use crate::{
  aggregate::aggregate,
  error::{ArchiveError, Result},
  resolve::{resolve_schools, resolve_teachers},
};

// ─── Pure helpers ────────────────────────────────────────────────────────────

/// SHA-256 (hex) of the serialised computed section.
pub fn digest(computed: &ComputedSection) -> Result<String> {
  let bytes = serde_json::to_vec(computed)?;
  Ok(hex::encode(Sha256::digest(&bytes)))
}

/// The computed section `snapshot.raw` yields today.
pub fn recompute(snapshot: &ArchiveSnapshot) -> ComputedSection {
  aggregate(&snapshot.raw, snapshot.school_year)
}

/// Whether the stored computed section and digest still match a fresh
/// recomputation from the raw section.
pub fn verify(snapshot: &ArchiveSnapshot) -> bool {
  let fresh = recompute(snapshot);
  let (Ok(fresh_json), Ok(stored_json)) =
    (serde_json::to_string(&fresh), serde_json::to_string(&snapshot.computed))
  else {
    return false;
  };
  fresh_json == stored_json
    && digest(&fresh).is_ok_and(|d| d == snapshot.computed_digest)
}

fn completeness(records: &RecordSet) -> CompletenessFlags {
  CompletenessFlags {
    identity:   !records.identity.is_empty(),
    structure:  !records.structure.is_empty(),
    roster:     !records.teachers.is_empty(),
    assessment: !records.assessments.is_empty(),
    directory:  !records.directory.is_empty(),
    calendar:   !records.calendar.is_empty(),
  }
}

/// Turn the current collections into a raw section: repair legacy encoding
/// in identity text, merge schools, join teachers.
pub fn assemble(records: RecordSet, config: &DistrictConfig) -> RawSection {
  let identity: Vec<_> = records
    .identity
    .into_iter()
    .map(|r| r.map_text(repair_legacy_encoding))
    .collect();
  let schools = resolve_schools(
    &identity,
    &records.structure,
    &records.directory,
    &config.aggregation,
  );
  let (teachers, resolution) = resolve_teachers(records.teachers, &schools);

  RawSection {
    schools,
    teachers,
    assessments: records.assessments,
    calendar: records.calendar,
    enrollment_history: config.enrollment_history.clone(),
    settings: config.aggregation.clone(),
    resolution,
  }
}

/// Read every category. An absent category is an empty collection.
pub async fn load_records<S: RecordStore>(store: &S) -> Result<RecordSet> {
  let mut records = RecordSet::default();
  for category in RecordCategory::iter() {
    let batch = store
      .load_category(category)
      .await
      .map_err(ArchiveError::load)?;
    records.insert(batch);
  }
  Ok(records)
}

// ─── Builder ─────────────────────────────────────────────────────────────────

/// Builds snapshots, at most one per school year at a time.
#[derive(Debug, Default)]
pub struct ArchiveBuilder {
  in_flight: Mutex<HashSet<SchoolYear>>,
}

/// Releases a year's in-flight claim when dropped, whatever the build's
/// outcome.
struct InFlight<'a> {
  years: &'a Mutex<HashSet<SchoolYear>>,
  year:  SchoolYear,
}

impl Drop for InFlight<'_> {
  fn drop(&mut self) {
    self
      .years
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(&self.year);
  }
}

impl ArchiveBuilder {
  pub fn new() -> Self { Self::default() }

  fn claim(&self, year: SchoolYear) -> Result<InFlight<'_>> {
    let mut years = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
    if !years.insert(year) {
      return Err(ArchiveError::InFlight(year));
    }
    Ok(InFlight {
      years: &self.in_flight,
      year,
    })
  }

  /// Read the current records into a snapshot of `config.school_year`.
  async fn snapshot<S: RecordStore>(
    store: &S,
    config: &DistrictConfig,
    now: DateTime<Utc>,
  ) -> Result<ArchiveSnapshot> {
    let records = load_records(store).await?;
    let completeness = completeness(&records);
    let raw = assemble(records, config);
    let computed = aggregate(&raw, config.school_year);
    let computed_digest = digest(&computed)?;

    Ok(ArchiveSnapshot {
      snapshot_id: Uuid::new_v4(),
      school_year: config.school_year,
      created_at: now,
      schema_version: SCHEMA_VERSION,
      completeness,
      raw,
      computed,
      computed_digest,
    })
  }

  /// Build and persist the snapshot of `config.school_year`.
  ///
  /// Fails with [`ArchiveError::AlreadyExists`] when the year is archived
  /// already; the existing snapshot is left untouched.
  pub async fn build<S>(
    &self,
    store: &S,
    config: &DistrictConfig,
    now: DateTime<Utc>,
  ) -> Result<ArchiveSnapshot>
  where
    S: RecordStore + ArchiveStore,
  {
    let year = config.school_year;
    let _claim = self.claim(year)?;

    let snapshot = Self::snapshot(store, config, now).await?;
    let created = store
      .create_archive(&snapshot)
      .await
      .map_err(ArchiveError::persistence)?;
    if !created {
      return Err(ArchiveError::AlreadyExists(year));
    }

    tracing::info!(
      %year,
      snapshot_id = %snapshot.snapshot_id,
      schools = snapshot.computed.overview.total_schools,
      enrollment = snapshot.computed.overview.classes.total_enrollment,
      complete = snapshot.completeness.is_complete(),
      "archive created"
    );
    Ok(snapshot)
  }

  /// Archive the current year and advance the district to the next one.
  ///
  /// The snapshot and the new district state are written together, so a
  /// failed roll-over leaves neither behind and can simply be retried.
  pub async fn roll_over<S>(
    &self,
    store: &S,
    config: &DistrictConfig,
    now: DateTime<Utc>,
  ) -> Result<(ArchiveSnapshot, DistrictConfig)>
  where
    S: RecordStore + ArchiveStore,
  {
    let year = config.school_year;
    let _claim = self.claim(year)?;

    let snapshot = Self::snapshot(store, config, now).await?;
    let next = config.advance_year(snapshot.computed.overview.classes.total_enrollment)?;
    let state = next.state();
    let created = store
      .create_archive_and_advance(&snapshot, &state)
      .await
      .map_err(ArchiveError::persistence)?;
    if !created {
      return Err(ArchiveError::AlreadyExists(year));
    }

    tracing::info!(
      from = %year,
      to = %next.school_year,
      snapshot_id = %snapshot.snapshot_id,
      "school year rolled over"
    );
    Ok((snapshot, next))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn one_build_per_year_at_a_time() {
    let builder = ArchiveBuilder::new();
    let year = SchoolYear::new(2024);

    let claim = builder.claim(year).unwrap();
    assert!(matches!(builder.claim(year), Err(ArchiveError::InFlight(y)) if y == year));
    // Other years are independent.
    let _other = builder.claim(SchoolYear::new(2025)).unwrap();

    drop(claim);
    assert!(builder.claim(year).is_ok());
  }
}
