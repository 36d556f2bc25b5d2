//! # Linux Release Packager
//!
//! Packages a built Electron application as Debian (`.deb`) and Red Hat
//! (`.rpm`) installers.
//!
//! The pipeline stages the application under `tmp/<name>-<version>-<arch>/`,
//! seals `build/` into an asar resource archive, renders the desktop entry,
//! control file and spec file from `{{key}}` templates, renames the runtime
//! executable and finally hands the tree to `dpkg-deb` and `rpmbuild`.
//!
//! ## Usage
//!
//! ```bash
//! linux_release_packager                 # package the current project
//! linux_release_packager --keep-temp     # keep tmp/ for inspection
//! linux_release_packager scaffold        # write default templates
//! linux_release_packager inspect         # show resolved paths
//! ```
//!
//! ## Library
//!
//! ```no_run
//! use linux_release_packager::bundler::SettingsBuilder;
//!
//! # async fn example() -> linux_release_packager::bundler::Result<()> {
//! let settings = SettingsBuilder::new().project_root(".").build()?;
//! let outcome = linux_release_packager::run(settings).await;
//! assert!(outcome.is_completed());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod bundler;
pub mod cli;
pub mod error;
pub mod metadata;

// Re-export main types for public API
pub use bundler::{BundledArtifact, Bundler, PackageType, PipelineOutcome, Settings};
pub use cli::Args;
pub use error::{CliError, ReleaseError, Result};
pub use metadata::Manifest;

/// Runs the whole packaging pipeline with the native asar archiver.
pub async fn run(settings: Settings) -> PipelineOutcome {
    Bundler::new(settings).run().await
}
