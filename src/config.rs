//! Run configuration, loaded from a TOML document.
//!
//! Configuration is entirely file and environment driven: the `[s3]` table
//! locates the two source extracts and the report destination, the `[app]`
//! table carries the reconciliation parameters. Storage credentials come
//! from the environment, never from this file.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::record::JOIN_KEY;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub s3: StoreConfig,
    pub app: AppConfig,
}

/// Object storage layout: where the extracts live and where reports go.
#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    pub bucket: String,
    /// Root directory of the locally synced bucket mirror.
    pub mirror_root: PathBuf,
    pub bank_prefix: String,
    pub db_prefix: String,
    pub output_path: String,
}

impl StoreConfig {
    /// Directory the three report views are written under.
    pub fn output_root(&self) -> PathBuf {
        self.mirror_root.join(&self.bucket).join(&self.output_path)
    }
}

/// Reconciliation parameters.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Name of the join key after field normalization.
    pub common_id: String,
    /// Maximum absolute bank/db amount difference still considered equal.
    pub amount_tolerance: Decimal,
    /// Scratch directory for downloaded extracts. When absent a run-scoped
    /// temporary directory is used and removed on exit.
    #[serde(default)]
    pub tmp_dir: Option<PathBuf>,
    pub status_mapping: StatusMapping,
}

/// Per-side vocabularies of transaction types counted as successful.
#[derive(Debug, Deserialize)]
pub struct StatusMapping {
    pub db_success: HashSet<String>,
    pub bank_success: HashSet<String>,
}

impl Config {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {:?}", path))?;
        let config: Config =
            toml::from_str(&text).with_context(|| format!("parsing config file {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.app.amount_tolerance >= Decimal::ZERO,
            "app.amount_tolerance must be non-negative, got {}",
            self.app.amount_tolerance
        );
        // Field normalization renames both reference-identifier columns to
        // JOIN_KEY, so any other join key can never match a column.
        ensure!(
            self.app.common_id == JOIN_KEY,
            "app.common_id must be {:?} (the normalized join key), got {:?}",
            JOIN_KEY,
            self.app.common_id
        );
        Ok(())
    }
}
