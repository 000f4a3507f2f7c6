//! JSON persistence of the host between CLI invocations

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A single JSON document on disk
pub struct JsonStore<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> JsonStore<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> Result<T> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("read state file {}", self.path.display()))?;
        let value = serde_json::from_str(&raw).with_context(|| format!("parse state file {}", self.path.display()))?;
        debug!(path = %self.path.display(), "state loaded");
        Ok(value)
    }

    pub fn load_or_else(&self, default: impl FnOnce() -> T) -> Result<T> {
        if self.exists() {
            self.load()
        } else {
            Ok(default())
        }
    }

    /// Write to a sibling temp file, then rename over the target
    pub fn save(&self, value: &T) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(value)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path).with_context(|| format!("replace {}", self.path.display()))?;
        debug!(path = %self.path.display(), "state saved");
        Ok(())
    }
}
