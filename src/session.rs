//! Per-run engine context: the opened store and the scratch directory
//! downloads land in.
//!
//! Constructed explicitly by the caller and torn down by `Drop` on every
//! exit path; nothing in here is process-global.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::config::Config;
use crate::store::{self, ObjectStore};

pub struct Session {
    store: Box<dyn ObjectStore>,
    scratch: Scratch,
}

enum Scratch {
    /// Run-scoped directory, removed when the session drops.
    Temp(TempDir),
    /// Operator-configured directory, left in place across runs.
    Fixed(PathBuf),
}

impl Session {
    pub fn open(config: &Config) -> Result<Self> {
        let store = store::open_store(&config.s3).context("opening object store")?;
        let scratch = match &config.app.tmp_dir {
            Some(dir) => {
                fs::create_dir_all(dir)
                    .with_context(|| format!("creating scratch directory {:?}", dir))?;
                Scratch::Fixed(dir.clone())
            }
            None => Scratch::Temp(tempfile::tempdir().context("creating scratch directory")?),
        };
        Ok(Session { store, scratch })
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub fn scratch_dir(&self) -> &Path {
        match &self.scratch {
            Scratch::Temp(dir) => dir.path(),
            Scratch::Fixed(path) => path,
        }
    }
}
