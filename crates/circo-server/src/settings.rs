//! Server configuration: a TOML file layered with `CIRCO_*` environment
//! variables.
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 8080
//! store_path = "~/circo/circo.db"
//! api_token_sha256 = "…"   # see `circo hash-token`
//!
//! [district]
//! school_year = "2024-2025"
//!
//! [district.aggregation]
//! district_office_uai = "9739999Z"
//! top_n = 5
//! ```
//!
//! Nested keys use a double underscore in the environment, e.g.
//! `CIRCO_DISTRICT__SCHOOL_YEAR=2025`.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::{Datelike, NaiveDate};
use circo_core::{SchoolYear, config::DistrictConfig};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  pub host:             String,
  pub port:             u16,
  pub store_path:       PathBuf,
  /// SHA-256 (hex) of the API token. Unset disables the token gate.
  #[serde(default)]
  pub api_token_sha256: Option<String>,
  pub district:         DistrictConfig,
}

/// The school year `today` falls in. Years start in September; summer
/// belongs to the year just ended.
pub fn school_year_of(today: NaiveDate) -> SchoolYear {
  if today.month() >= 9 {
    SchoolYear::new(today.year())
  } else {
    SchoolYear::new(today.year() - 1)
  }
}

/// Read `path` (optional) and the environment into a [`ServerConfig`].
pub fn load(path: &Path, today: NaiveDate) -> anyhow::Result<ServerConfig> {
  let settings = config::Config::builder()
    .set_default("host", "127.0.0.1")?
    .set_default("port", 8080)?
    .set_default("store_path", "circo.db")?
    .set_default("district.school_year", school_year_of(today).to_string())?
    .add_source(config::File::from(path.to_path_buf()).required(false))
    .add_source(
      config::Environment::with_prefix("CIRCO")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .context("failed to read config file")?;

  let mut config: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  config.store_path = expand_tilde(&config.store_path);
  Ok(config)
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  match (s.strip_prefix("~/"), std::env::var("HOME")) {
    (Some(rest), Ok(home)) => PathBuf::from(home).join(rest),
    _ => path.to_path_buf(),
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use super::*;

  fn day(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

  #[test]
  fn school_year_turns_in_september() {
    assert_eq!(school_year_of(day(2025, 8, 31)), SchoolYear::new(2024));
    assert_eq!(school_year_of(day(2025, 9, 1)), SchoolYear::new(2025));
  }

  #[test]
  fn defaults_without_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = load(&dir.path().join("absent.toml"), day(2025, 3, 1)).unwrap();
    assert_eq!(config.port, 8080);
    assert_eq!(config.store_path, PathBuf::from("circo.db"));
    assert_eq!(config.district.school_year, SchoolYear::new(2024));
    assert_eq!(config.district.aggregation.top_n, 5);
    assert!(config.api_token_sha256.is_none());
  }

  #[test]
  fn file_overrides_defaults() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
      file,
      r#"
      port = 9000
      [district]
      school_year = "2023-2024"
      [district.aggregation]
      top_n = 3
      "#
    )
    .unwrap();
    let config = load(file.path(), day(2025, 3, 1)).unwrap();
    assert_eq!(config.port, 9000);
    assert_eq!(config.district.school_year, SchoolYear::new(2023));
    assert_eq!(config.district.aggregation.top_n, 3);
  }
}
