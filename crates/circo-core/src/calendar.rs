//! District calendar events. Only summarised by the engine; editing them is
//! someone else's job.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
  pub title:     String,
  #[serde(default)]
  pub category:  String,
  pub starts_on: NaiveDate,
  #[serde(default)]
  pub ends_on:   Option<NaiveDate>,
}
