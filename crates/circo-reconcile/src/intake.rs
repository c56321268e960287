//! Import intake: parse documents, then persist their records.
//!
//! School-keyed kinds (identity, structure) upsert one record per school.
//! Workbook kinds replace their whole category, so a batch of workbooks is
//! concatenated first and written once.

use std::sync::Arc;

use circo_core::{record::RecordBatch, store::RecordStore};
use circo_parse::{DocumentKind, ParseContext, ParsedDocument, parse_document};
use serde::Serialize;
use tokio::task::JoinSet;

use crate::error::{IntakeError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
  pub kind:      DocumentKind,
  pub source_id: String,
  pub imported:  usize,
  pub skipped:   usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDocument {
  pub source_id: String,
  pub reason:    String,
}

/// Outcome of a multi-document import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
  pub kind:      DocumentKind,
  pub documents: Vec<ImportReport>,
  pub failed:    Vec<FailedDocument>,
  pub imported:  usize,
  pub skipped:   usize,
}

async fn persist<S: RecordStore>(store: &S, batch: RecordBatch) -> Result<usize, IntakeError> {
  let written = if batch.category().is_keyed_by_school() {
    store.upsert_records(batch).await
  } else {
    store.replace_category(batch).await
  };
  written.map_err(IntakeError::persistence)
}

/// Parse and persist one document. A malformed document writes nothing.
pub async fn import_document<S: RecordStore>(
  store: &S,
  kind: DocumentKind,
  source_id: &str,
  input: &str,
  ctx: &ParseContext,
) -> Result<ImportReport, IntakeError> {
  let ParsedDocument { batch, skipped } =
    parse_document(kind, source_id, input, ctx).inspect_err(|e| {
      tracing::warn!(%kind, source_id, error = %e, "document rejected");
    })?;
  let imported = persist(store, batch).await?;

  tracing::info!(%kind, source_id, imported, skipped, "document imported");
  Ok(ImportReport {
    kind,
    source_id: source_id.to_string(),
    imported,
    skipped,
  })
}

/// Parse `documents` (`(source_id, content)` pairs) on the blocking pool,
/// then persist the readable ones in input order.
///
/// Malformed documents are listed in [`BatchReport::failed`] and do not stop
/// the others. When every document of a workbook kind fails, the category is
/// left as it was.
pub async fn import_batch<S: RecordStore>(
  store: &S,
  kind: DocumentKind,
  documents: Vec<(String, String)>,
  ctx: &ParseContext,
) -> Result<BatchReport, IntakeError> {
  let ctx = Arc::new(ctx.clone());
  let mut tasks = JoinSet::new();
  for (index, (source_id, input)) in documents.into_iter().enumerate() {
    let ctx = Arc::clone(&ctx);
    tasks.spawn_blocking(move || {
      let parsed = parse_document(kind, &source_id, &input, &ctx);
      (index, source_id, parsed)
    });
  }

  let mut results = Vec::with_capacity(tasks.len());
  while let Some(joined) = tasks.join_next().await {
    results.push(joined?);
  }
  results.sort_by_key(|(index, ..)| *index);

  let mut report = BatchReport {
    kind,
    documents: Vec::new(),
    failed: Vec::new(),
    imported: 0,
    skipped: 0,
  };
  let mut combined: Option<RecordBatch> = None;

  for (_, source_id, parsed) in results {
    let ParsedDocument { batch, skipped } = match parsed {
      Ok(parsed) => parsed,
      Err(e) => {
        tracing::warn!(%kind, source_id, error = %e, "document rejected");
        report.failed.push(FailedDocument {
          source_id,
          reason: e.to_string(),
        });
        continue;
      }
    };

    let imported = if kind.category().is_keyed_by_school() {
      persist(store, batch).await?
    } else {
      let count = batch.len();
      match combined.as_mut() {
        Some(all) => {
          all.extend(batch);
        }
        None => combined = Some(batch),
      }
      count
    };

    report.imported += imported;
    report.skipped += skipped;
    report.documents.push(ImportReport {
      kind,
      source_id,
      imported,
      skipped,
    });
  }

  if let Some(batch) = combined {
    persist(store, batch).await?;
  }

  tracing::info!(
    %kind,
    documents = report.documents.len(),
    failed = report.failed.len(),
    imported = report.imported,
    skipped = report.skipped,
    "batch imported"
  );
  Ok(report)
}
