//! JSON REST API for Circo.
//!
//! Exposes an axum [`Router`] backed by any store implementing both
//! [`RecordStore`] and [`ArchiveStore`]. TLS and transport are the caller's
//! responsibility; [`auth::require_token`] adds the bearer-token gate.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", circo_api::api_router(store.clone(), district))
//! ```

pub mod archives;
pub mod auth;
pub mod error;
pub mod imports;
pub mod records;
pub mod year;

use std::sync::Arc;

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use chrono::Utc;
use circo_core::{
  config::DistrictConfig,
  store::{ArchiveStore, RecordStore},
};
use circo_parse::ParseContext;
use circo_reconcile::ArchiveBuilder;
use tokio::sync::RwLock;

pub use error::ApiError;

/// Exports of a whole district run to a few megabytes.
const MAX_DOCUMENT_BYTES: usize = 32 * 1024 * 1024;

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub store:    Arc<S>,
  /// The school year in progress; replaced on roll-over.
  pub district: Arc<RwLock<DistrictConfig>>,
  pub builder:  Arc<ArchiveBuilder>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      district: Arc::clone(&self.district),
      builder:  Arc::clone(&self.builder),
    }
  }
}

impl<S> AppState<S> {
  pub fn new(store: Arc<S>, district: DistrictConfig) -> Self {
    Self {
      store,
      district: Arc::new(RwLock::new(district)),
      builder: Arc::new(ArchiveBuilder::new()),
    }
  }

  /// Parsing inputs for an import received now.
  pub(crate) async fn parse_context(&self) -> ParseContext {
    let rules = self.district.read().await.classification.clone();
    ParseContext::new(Utc::now().date_naive(), rules)
  }
}

/// Build a fully-materialised API router for `store`, starting from the
/// `district` configuration.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, district: DistrictConfig) -> Router<()>
where
  S: RecordStore + ArchiveStore + 'static,
{
  Router::new()
    // Intake
    .route("/imports/{kind}", post(imports::import::<S>))
    .route("/records/{category}", get(records::list::<S>).put(records::replace::<S>))
    // Archives
    .route("/archives", get(archives::list::<S>))
    .route(
      "/archives/{year}",
      get(archives::get_one::<S>)
        .post(archives::create::<S>)
        .delete(archives::delete_one::<S>),
    )
    // School year
    .route("/year", get(year::current::<S>))
    .route("/year/roll", post(year::roll::<S>))
    .layer(DefaultBodyLimit::max(MAX_DOCUMENT_BYTES))
    .with_state(AppState::new(store, district))
}
