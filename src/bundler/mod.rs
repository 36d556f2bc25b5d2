//! Linux release packaging for Electron applications.
//!
//! Turns a built application tree plus a prebuilt Electron runtime into a
//! `.deb` and an `.rpm` in the project's releases directory.
//!
//! # Pipeline
//!
//! | Stage | Fatal | Notes |
//! |-------|-------|-------|
//! | workspace initializer | yes | empties `tmp/`, reads `app/package.json` |
//! | runtime stager | yes | copies the runtime into `tmp/<pack>/opt/<name>` |
//! | resource archiver | yes | seals `build/` into `resources/app.asar` |
//! | metadata finalizer | yes | desktop entry, icon, dictionaries |
//! | tree renamer | yes | `electron` becomes `<name>` |
//! | deb packager | no | `fakeroot dpkg-deb -Zxz --build` |
//! | rpm packager | no | `fakeroot rpmbuild -bb` |
//! | workspace cleaner | yes | governed by [`CleanupPolicy`] |
//!
//! # Configuration
//!
//! Defaults match the conventional Electron project layout. Anything can be
//! overridden by a `linux-release.toml` in the project root:
//!
//! ```toml
//! arch = "arm64"
//! cleanup = "always"
//!
//! [paths]
//! runtime = "node_modules/electron/dist"
//!
//! [tools]
//! fakeroot = false
//! timeout-secs = 600
//! ```
//!
//! # Example
//!
//! ```no_run
//! use linux_release_packager::bundler::{Bundler, SettingsBuilder};
//!
//! # async fn example() -> linux_release_packager::bundler::Result<()> {
//! let settings = SettingsBuilder::new().project_root("/work/my-app").build()?;
//! let outcome = Bundler::new(settings).run().await;
//!
//! for package in outcome.report().packages() {
//!     for artifact in &package.artifacts {
//!         println!("{}: {} bytes, sha256 {}", artifact.package_type, artifact.size, artifact.checksum);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod archive;
mod builder;
mod error;
pub(crate) mod platform;
mod resources;
mod settings;
mod stage;
mod template;
pub(crate) mod utils;
mod workspace;

// Public re-exports
pub use archive::{AsarArchiver, ResourceArchiver};
pub use builder::{Bundler, PipelineOutcome, PipelineReport};
pub use error::{Context, Error, ErrorExt, Result};
pub use platform::{PackageOutcome, PackageType};
pub use resources::{ScaffoldAction, scaffold_templates};
pub use settings::{
    // Architecture detection
    Arch,
    CONFIG_FILE_NAME,
    CleanupPolicy,
    // File layer
    ConfigFile,
    ExtraResource,
    PathsSection,
    ProjectLayout,
    // Main configuration types
    Settings,
    SettingsBuilder,
    ToolSettings,
    ToolsSection,
};
pub use stage::Stage;
pub use template::render as render_template;
pub use utils::process::{ToolOutcome, ToolStatus};
pub use workspace::Workspace;

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

/// A package placed in the releases directory.
///
/// # Fields
///
/// - `package_type`: the format of the created package
/// - `paths`: files created for this package, main package first
/// - `size`: size of the main package in bytes
/// - `checksum`: SHA-256 of the main package, lowercase hex
#[derive(Debug, Clone)]
pub struct BundledArtifact {
    /// The package type that was created.
    pub package_type: PackageType,

    /// Paths to all files created as part of this package.
    pub paths: Vec<PathBuf>,

    /// Size of the main artifact in bytes.
    pub size: u64,

    /// SHA-256 checksum of the main artifact.
    pub checksum: String,
}

impl BundledArtifact {
    /// Describes an existing package file.
    pub async fn from_path(package_type: PackageType, path: PathBuf) -> Result<Self> {
        let size = tokio::fs::metadata(&path)
            .await
            .fs_context("reading package metadata", &path)?
            .len();
        let checksum = calculate_sha256(&path).await?;
        Ok(Self {
            package_type,
            paths: vec![path],
            size,
            checksum,
        })
    }

    /// The main package file.
    pub fn path(&self) -> Option<&Path> {
        self.paths.first().map(PathBuf::as_path)
    }
}

/// Streams a file through SHA-256.
async fn calculate_sha256(path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .fs_context("opening package for checksum", path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = file
            .read(&mut buffer)
            .await
            .fs_context("reading package for checksum", path)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_artifact_checksum_and_size() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sample_1.0.0_amd64.deb");
        std::fs::write(&path, b"abc").unwrap();

        let artifact = BundledArtifact::from_path(PackageType::Deb, path.clone())
            .await
            .unwrap();

        assert_eq!(artifact.size, 3);
        assert_eq!(
            artifact.checksum,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(artifact.path(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn test_artifact_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let err = BundledArtifact::from_path(PackageType::Rpm, tmp.path().join("nope.rpm"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
