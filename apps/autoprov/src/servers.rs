//! Imported server list.
//!
//! Each imported configuration URI is one line in a text file. A payload may
//! carry several URIs separated by newlines.

use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use autoprov_provisioning::ConfigImporter;
use tracing::{error, info};

/// File-backed server list that doubles as the import collaborator.
pub struct ServerListFile {
    path: PathBuf,
    // Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl ServerListFile {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Configured server URIs, in import order. A missing file is an empty list.
    pub fn entries(&self) -> io::Result<Vec<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(parse_entries(&content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(self.entries()?.is_empty())
    }

    /// Appends new URIs from `payload`, skipping ones already present.
    /// Returns how many were added.
    pub fn add(&self, payload: &str) -> io::Result<usize> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut entries = self.entries()?;
        let before = entries.len();
        for uri in parse_entries(payload) {
            if !entries.contains(&uri) {
                entries.push(uri);
            }
        }
        let added = entries.len() - before;
        if added == 0 {
            return Ok(0);
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut content = entries.join("\n");
        content.push('\n');
        std::fs::write(&self.path, content)?;
        Ok(added)
    }
}

impl ConfigImporter for ServerListFile {
    fn import(&self, payload: &str) {
        match self.add(payload) {
            Ok(added) => info!(added, path = %self.path.display(), "imported configuration"),
            Err(e) => error!(error = %e, path = %self.path.display(), "failed to import configuration"),
        }
    }
}

fn parse_entries(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
