//! Object storage collaborator.
//!
//! The pipeline only ever talks to the [`ObjectStore`] trait: keys are
//! `/`-separated paths under a bucket, listing is by key prefix, fetching
//! copies one object to a local file. The shipped implementation reads a
//! locally synced mirror of the bucket; a remote client is a drop-in
//! replacement behind the same trait.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::StoreConfig;

pub const ACCESS_KEY_VAR: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_KEY_VAR: &str = "AWS_SECRET_ACCESS_KEY";
pub const REGION_VAR: &str = "AWS_REGION";
const DEFAULT_REGION: &str = "ap-south-1";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage credentials missing or rejected: {0}")]
    Credentials(String),
    #[error("no object found under prefix {prefix:?} for {selector}")]
    NotFound { prefix: String, selector: String },
    #[error("object store I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage access credentials, taken from the environment.
#[derive(Debug)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self, StoreError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    fn from_vars(vars: &HashMap<String, String>) -> Result<Self, StoreError> {
        let required = |name: &str| {
            vars.get(name)
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or_else(|| missing_var(name))
        };
        Ok(Credentials {
            access_key_id: required(ACCESS_KEY_VAR)?,
            secret_access_key: required(SECRET_KEY_VAR)?,
            region: vars
                .get(REGION_VAR)
                .cloned()
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
        })
    }
}

fn missing_var(name: &str) -> StoreError {
    StoreError::Credentials(format!("environment variable {} is not set", name))
}

pub trait ObjectStore {
    /// Keys of every object under `prefix`, in ascending key order.
    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
    /// Copies the object at `key` to the local path `dest`.
    fn fetch(&self, key: &str, dest: &Path) -> Result<(), StoreError>;
}

/// Store over a locally synced bucket mirror (`mirror_root/bucket/...`).
#[derive(Debug)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn open(root: PathBuf) -> Result<Self, StoreError> {
        if !root.is_dir() {
            return Err(StoreError::Credentials(format!(
                "bucket mirror {:?} is not accessible",
                root
            )));
        }
        Ok(FsStore { root })
    }

    fn collect_keys(&self, dir: &Path, keys: &mut Vec<String>) -> Result<(), StoreError> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                self.collect_keys(&path, keys)?;
            } else if let Ok(rel) = path.strip_prefix(&self.root) {
                // Keys always use `/`, whatever the local separator is.
                let key: Vec<String> = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                keys.push(key.join("/"));
            }
        }
        Ok(())
    }
}

impl ObjectStore for FsStore {
    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        self.collect_keys(&self.root, &mut keys)?;
        keys.retain(|k| k.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }

    fn fetch(&self, key: &str, dest: &Path) -> Result<(), StoreError> {
        let src: PathBuf = self.root.join(key.split('/').collect::<PathBuf>());
        fs::copy(&src, dest)?;
        Ok(())
    }
}

/// Opens the configured store for one run. Credentials are required up
/// front so a misconfigured environment fails before any download starts.
pub fn open_store(config: &StoreConfig) -> Result<Box<dyn ObjectStore>, StoreError> {
    let creds = Credentials::from_env()?;
    log::debug!(
        "opening store for bucket {:?} in region {}",
        config.bucket,
        creds.region
    );
    let store = FsStore::open(config.mirror_root.join(&config.bucket))?;
    Ok(Box::new(store))
}
