//! Entity resolution, aggregation, archive builds and import intake.
//!
//! Everything here works against the [`RecordStore`] and [`ArchiveStore`]
//! traits of `circo-core`; no storage backend is assumed.
//!
//! [`RecordStore`]: circo_core::store::RecordStore
//! [`ArchiveStore`]: circo_core::store::ArchiveStore

pub mod aggregate;
pub mod archive;
pub mod error;
pub mod intake;
pub mod matching;
pub mod resolve;

pub use archive::{ArchiveBuilder, recompute, verify};
pub use error::{ArchiveError, IntakeError, Result};
pub use intake::{BatchReport, ImportReport, import_batch, import_document};
