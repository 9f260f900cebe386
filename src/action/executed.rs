//! Idempotency barrier: hrefs of actions that were already executed.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    /// Claimed by an execution that has not finished yet.
    InFlight,
    Done,
}

/// Thread-safe set of executed action hrefs, optionally persisted as JSON.
#[derive(Debug, Clone, Default)]
pub struct ExecutedActions {
    inner: Arc<DashMap<String, Status>>,
    persistence_path: Option<PathBuf>,
    /// Serializes writers of the persistence file.
    save_lock: Arc<Mutex<()>>,
}

impl ExecutedActions {
    pub fn new(persistence_path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            persistence_path,
            save_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Load from file if it exists; later completions are written back to it.
    pub fn load_from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let executed = Self::new(Some(path.to_path_buf()));
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let hrefs: Vec<String> = serde_json::from_reader(reader)?;
            for href in hrefs {
                executed.inner.insert(href, Status::Done);
            }
            tracing::info!(count = executed.inner.len(), "Loaded executed actions");
        }
        Ok(executed)
    }

    /// Claim `href` for execution. Returns `false` if it is already claimed or done.
    pub fn begin(&self, href: &str) -> bool {
        match self.inner.entry(href.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Status::InFlight);
                true
            }
        }
    }

    /// Drop an in-flight claim so the action may be attempted again.
    pub fn release(&self, href: &str) {
        self.inner.remove_if(href, |_, status| *status == Status::InFlight);
    }

    /// Record `href` as executed for good.
    pub fn complete(&self, href: &str) {
        self.inner.insert(href.to_string(), Status::Done);
        if let Err(e) = self.save_to_file() {
            tracing::error!(href = href, error = %e, "Failed to persist executed actions");
        }
    }

    pub fn is_executed(&self, href: &str) -> bool {
        self.inner.get(href).map(|s| *s == Status::Done).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.inner.iter().filter(|r| *r.value() == Status::Done).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Save the completed hrefs, if a file is configured.
    ///
    /// The set is written to a sibling `.tmp` file that is then renamed over
    /// the original; an interrupted save leaves the previous file in place.
    pub fn save_to_file(&self) -> std::io::Result<()> {
        if let Some(path) = &self.persistence_path {
            let _guard = self.save_lock.lock().unwrap_or_else(|e| e.into_inner());
            let hrefs: BTreeSet<String> = self
                .inner
                .iter()
                .filter(|r| *r.value() == Status::Done)
                .map(|r| r.key().clone())
                .collect();

            let tmp_path = temp_path(path);
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            serde_json::to_writer(&mut writer, &hrefs)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
            drop(writer);
            fs::rename(&tmp_path, path)?;
            tracing::debug!(count = hrefs.len(), "Saved executed actions");
        }
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
