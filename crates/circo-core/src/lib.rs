//! Core types and trait definitions for the Circo reconciliation engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod assessment;
pub mod calendar;
pub mod config;
pub mod error;
pub mod ids;
pub mod record;
pub mod school;
pub mod snapshot;
pub mod staff;
pub mod store;
pub mod text;

pub use error::{Error, Result};
pub use ids::{SchoolYear, Uai};
