//! Concurrent hostname -> socket path table.
//!
//! # Design Decisions
//! - Backed by `DashMap`; each insert is a single entry-locked check-and-set
//! - Entries are immutable once written and never removed
//! - Lookups are verbatim; no case folding of hostnames

use std::path::{Path, PathBuf};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::directory::validation::validate_hostname;
use crate::directory::{Collector, Resolver};
use crate::error::Error;

/// Keeps and resolves mappings of hostnames to Unix socket paths.
#[derive(Debug, Default)]
pub struct Directory {
    table: DashMap<String, PathBuf>,
}

impl Directory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `hostname` to `path`.
    ///
    /// Re-adding the same pair succeeds; mapping an existing hostname to a
    /// different path fails with [`Error::HostnameAlreadyExists`] and keeps
    /// the stored path.
    pub fn add_path(&self, hostname: &str, path: impl AsRef<Path>) -> Result<(), Error> {
        validate_hostname(hostname)?;

        let path = path.as_ref();

        match self.table.entry(hostname.to_string()) {
            Entry::Occupied(entry) => {
                if entry.get().as_path() != path {
                    tracing::warn!(
                        hostname = %hostname,
                        path = %path.display(),
                        existing = %entry.get().display(),
                        "Hostname already mapped to another path"
                    );
                    return Err(Error::HostnameAlreadyExists(hostname.to_string()));
                }
            }
            Entry::Vacant(entry) => {
                tracing::debug!(hostname = %hostname, path = %path.display(), "Socket path added");
                entry.insert(path.to_path_buf());
            }
        }

        Ok(())
    }

    /// Resolve the socket path for `hostname`.
    pub fn lookup_path(&self, hostname: &str) -> Result<PathBuf, Error> {
        self.table
            .get(hostname)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::PathNotFound(hostname.to_string()))
    }

    /// Number of mapped hostnames.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Collector for Directory {
    fn add_path(&self, hostname: &str, path: &Path) -> Result<(), Error> {
        Directory::add_path(self, hostname, path)
    }
}

impl Resolver for Directory {
    fn lookup_path(&self, hostname: &str) -> Result<PathBuf, Error> {
        Directory::lookup_path(self, hostname)
    }
}
