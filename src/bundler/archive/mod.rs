//! Resource archive sealing.
//!
//! The pipeline only needs `(source dir, output path) -> completion`; the
//! [`ResourceArchiver`] trait is that seam. [`AsarArchiver`] is the default
//! implementation and writes Electron's asar format.

mod asar;

pub use asar::{AsarArchiver, read_header};

use crate::bundler::error::Result;
use std::future::Future;
use std::path::Path;

/// Seals a directory into a single resource archive.
pub trait ResourceArchiver {
    /// Writes an archive of `source` to `output`. Resolves once the archive
    /// is complete; any failure is returned.
    fn seal(&self, source: &Path, output: &Path) -> impl Future<Output = Result<()>> + Send;
}
