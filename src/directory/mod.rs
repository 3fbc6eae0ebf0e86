//! Name resolution subsystem.
//!
//! # Data Flow
//! ```text
//! add_path(hostname, path)
//!     → validation.rs (URL host syntax)
//!     → table.rs (atomic insert-if-absent)
//!
//! dial of http+unix://hostname/...
//!     → Resolver::lookup_path(hostname)
//!     → socket path
//! ```
//!
//! # Design Decisions
//! - Transports depend on the `Resolver` trait, not on `Directory`
//! - A hostname maps to exactly one path for the life of the directory

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Error;

pub mod table;
pub mod validation;

pub use table::Directory;
pub use validation::validate_hostname;

/// Collects mappings of hostnames to Unix socket paths.
pub trait Collector: Send + Sync {
    fn add_path(&self, hostname: &str, path: &Path) -> Result<(), Error>;
}

/// Resolves a Unix socket path by hostname.
pub trait Resolver: Send + Sync {
    fn lookup_path(&self, hostname: &str) -> Result<PathBuf, Error>;
}

/// Both collects and resolves mappings.
pub trait Keeper: Collector + Resolver {}

impl<T: Collector + Resolver> Keeper for T {}

impl<T: Resolver + ?Sized> Resolver for Arc<T> {
    fn lookup_path(&self, hostname: &str) -> Result<PathBuf, Error> {
        (**self).lookup_path(hostname)
    }
}

impl<T: Collector + ?Sized> Collector for Arc<T> {
    fn add_path(&self, hostname: &str, path: &Path) -> Result<(), Error> {
        (**self).add_path(hostname, path)
    }
}
