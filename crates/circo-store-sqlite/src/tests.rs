//! Integration tests for `SqliteStore` against in-memory and on-disk
//! databases.

use chrono::{NaiveDate, TimeZone, Utc};
use circo_core::{
  SchoolYear, Uai,
  calendar::CalendarEvent,
  config::{DistrictConfig, DistrictState, EnrollmentPoint},
  record::{RecordBatch, RecordCategory},
  school::DirectoryEntry,
  store::{ArchiveStore, RecordStore},
};
use circo_parse::{DocumentKind, ParseContext};
use circo_reconcile::{ArchiveBuilder, ArchiveError, archive, import_document};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn entry(code: &str, name: &str) -> DirectoryEntry {
  DirectoryEntry {
    uai:     Uai::parse(code).unwrap(),
    name:    name.into(),
    commune: "Cayenne".into(),
  }
}

fn event(title: &str, day: u32) -> CalendarEvent {
  CalendarEvent {
    title:     title.into(),
    category:  "conseil".into(),
    starts_on: NaiveDate::from_ymd_opt(2024, 11, day).unwrap(),
    ends_on:   None,
  }
}

const STRUCTURE: &str = r#"<title>Structure 9730200E - E.P.PU MORTIN</title>
<table>
<tr onclick="voirDetail(1)"><td></td><td>CP A</td><td>Mme DUPONT Marie</td><td>CP</td><td>20</td><td>Non</td></tr>
<tr onclick="voirDetail(2)"><td></td><td>CE1-CE2</td><td>M. LEROY Paul</td><td>CE1-CE2</td><td>11</td><td>Oui</td></tr>
</table>"#;

fn ctx() -> ParseContext {
  ParseContext::new(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(), Default::default())
}

fn config() -> DistrictConfig { DistrictConfig::new(SchoolYear::new(2024)) }

// ─── Records ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn absent_category_is_empty() {
  let s = store().await;
  for category in [RecordCategory::Identity, RecordCategory::Calendar] {
    let batch = s.load_category(category).await.unwrap();
    assert_eq!(batch, RecordBatch::empty(category));
  }
}

#[tokio::test]
async fn replace_discards_previous_records() {
  let s = store().await;
  s.replace_category(RecordBatch::Calendar(vec![event("A", 4), event("B", 5), event("C", 6)]))
    .await
    .unwrap();
  s.replace_category(RecordBatch::Calendar(vec![event("D", 7)]))
    .await
    .unwrap();

  let RecordBatch::Calendar(events) = s.load_category(RecordCategory::Calendar).await.unwrap()
  else {
    panic!("expected calendar batch");
  };
  assert_eq!(events.len(), 1);
  assert_eq!(events[0].title, "D");
}

#[tokio::test]
async fn replace_keeps_input_order() {
  let s = store().await;
  let entries: Vec<_> = (0..12)
    .map(|i| entry(&format!("97300{i:02}A"), &format!("Ecole {i}")))
    .collect();
  s.replace_category(RecordBatch::Directory(entries.clone()))
    .await
    .unwrap();
  assert_eq!(
    s.load_category(RecordCategory::Directory).await.unwrap(),
    RecordBatch::Directory(entries)
  );
}

#[tokio::test]
async fn upsert_overwrites_by_school_code() {
  let s = store().await;
  import_document(&s, DocumentKind::Structure, "a.html", STRUCTURE, &ctx())
    .await
    .unwrap();
  let smaller = STRUCTURE.replace("<td>20</td>", "<td>18</td>");
  import_document(&s, DocumentKind::Structure, "b.html", &smaller, &ctx())
    .await
    .unwrap();

  let RecordBatch::Structure(schools) = s.load_category(RecordCategory::Structure).await.unwrap()
  else {
    panic!("expected structure batch");
  };
  assert_eq!(schools.len(), 1);
  assert_eq!(schools[0].source_id, "b.html");
  assert_eq!(schools[0].enrollment(), 29);
}

#[tokio::test]
async fn district_state_round_trip() {
  let s = store().await;
  assert_eq!(s.load_district_state().await.unwrap(), None);

  let state = DistrictState {
    school_year:        SchoolYear::new(2025),
    enrollment_history: vec![EnrollmentPoint {
      school_year: SchoolYear::new(2024),
      enrollment:  1520,
    }],
  };
  s.save_district_state(state.clone()).await.unwrap();
  s.save_district_state(state.clone()).await.unwrap();
  assert_eq!(s.load_district_state().await.unwrap(), Some(state));
}

// ─── Archives ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn archive_round_trip_verifies() {
  let s = store().await;
  import_document(&s, DocumentKind::Structure, "s.html", STRUCTURE, &ctx())
    .await
    .unwrap();
  let now = Utc.with_ymd_and_hms(2025, 7, 4, 12, 0, 0).unwrap();
  let built = ArchiveBuilder::new().build(&s, &config(), now).await.unwrap();

  let stored = s.get_archive(SchoolYear::new(2024)).await.unwrap().unwrap();
  assert_eq!(stored, built);
  assert!(archive::verify(&stored));
  assert_eq!(stored.computed.overview.classes.total_enrollment, 31);

  let listed = s.list_archives().await.unwrap();
  assert_eq!(listed, vec![built.summary()]);
}

#[tokio::test]
async fn second_archive_for_year_is_refused() {
  let s = store().await;
  let builder = ArchiveBuilder::new();
  let first = builder.build(&s, &config(), Utc::now()).await.unwrap();

  let mut other = first.clone();
  other.snapshot_id = uuid_like(&first);
  assert!(!s.create_archive(&other).await.unwrap());

  let err = builder.build(&s, &config(), Utc::now()).await.unwrap_err();
  assert!(matches!(err, ArchiveError::AlreadyExists(_)));
  let kept = s.get_archive(SchoolYear::new(2024)).await.unwrap().unwrap();
  assert_eq!(kept.snapshot_id, first.snapshot_id);
}

#[tokio::test]
async fn roll_over_writes_archive_and_state_together() {
  let s = store().await;
  import_document(&s, DocumentKind::Structure, "s.html", STRUCTURE, &ctx())
    .await
    .unwrap();
  let (snapshot, next) = ArchiveBuilder::new()
    .roll_over(&s, &config(), Utc::now())
    .await
    .unwrap();
  assert_eq!(s.load_district_state().await.unwrap(), Some(next.state()));
  assert!(s.get_archive(SchoolYear::new(2024)).await.unwrap().is_some());

  // A refused write leaves the previous state in place.
  let later = next.advance_year(0).unwrap().state();
  assert!(!s.create_archive_and_advance(&snapshot, &later).await.unwrap());
  assert_eq!(s.load_district_state().await.unwrap(), Some(next.state()));
}

fn uuid_like(snapshot: &circo_core::snapshot::ArchiveSnapshot) -> uuid::Uuid {
  let mut bytes = *snapshot.snapshot_id.as_bytes();
  bytes[0] ^= 0xff;
  uuid::Uuid::from_bytes(bytes)
}

#[tokio::test]
async fn deleting_missing_year_reports_false() {
  let s = store().await;
  assert!(!s.delete_archive(SchoolYear::new(1999)).await.unwrap());
  assert!(s.get_archive(SchoolYear::new(1999)).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_then_recreate() {
  let s = store().await;
  let builder = ArchiveBuilder::new();
  builder.build(&s, &config(), Utc::now()).await.unwrap();
  assert!(s.delete_archive(SchoolYear::new(2024)).await.unwrap());
  assert!(s.list_archives().await.unwrap().is_empty());
  builder.build(&s, &config(), Utc::now()).await.unwrap();
  assert_eq!(s.list_archives().await.unwrap().len(), 1);
}

#[tokio::test]
async fn archives_listed_by_year() {
  let s = store().await;
  let builder = ArchiveBuilder::new();
  for year in [2023, 2021, 2022] {
    let config = DistrictConfig::new(SchoolYear::new(year));
    builder.build(&s, &config, Utc::now()).await.unwrap();
  }
  let years: Vec<_> = s
    .list_archives()
    .await
    .unwrap()
    .into_iter()
    .map(|a| a.school_year.start())
    .collect();
  assert_eq!(years, vec![2021, 2022, 2023]);
}

#[tokio::test]
async fn on_disk_store_persists_across_reopen() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("circo.db");

  {
    let s = SqliteStore::open(&path).await.unwrap();
    import_document(&s, DocumentKind::Structure, "s.html", STRUCTURE, &ctx())
      .await
      .unwrap();
    ArchiveBuilder::new().build(&s, &config(), Utc::now()).await.unwrap();
  }

  let s = SqliteStore::open(&path).await.unwrap();
  assert_eq!(s.load_category(RecordCategory::Structure).await.unwrap().len(), 1);
  let stored = s.get_archive(SchoolYear::new(2024)).await.unwrap().unwrap();
  assert!(archive::verify(&stored));
}
