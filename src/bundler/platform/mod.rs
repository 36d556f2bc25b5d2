//! Package format implementations.
//!
//! | Format | Tool | Module |
//! |--------|------|--------|
//! | .deb | `dpkg-deb` | [`linux::debian`] |
//! | .rpm | `rpmbuild` | [`linux::rpm`] |
//!
//! Both packagers are best-effort: a failing tool is recorded in the
//! returned [`PackageOutcome`] and the pipeline carries on.

pub mod linux;

use crate::bundler::BundledArtifact;
use crate::bundler::utils::process::ToolOutcome;
use std::fmt;
use std::path::PathBuf;

/// Supported package types.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PackageType {
    /// Debian package (.deb) for Debian, Ubuntu and derivatives.
    Deb,
    /// RPM package (.rpm) for Fedora, RHEL and derivatives.
    Rpm,
}

impl PackageType {
    /// Lowercase identifier used in CLI output.
    pub fn short_name(&self) -> &'static str {
        match self {
            PackageType::Deb => "deb",
            PackageType::Rpm => "rpm",
        }
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

/// Result of one best-effort packaging stage.
#[derive(Debug, Clone)]
pub struct PackageOutcome {
    /// Which format was attempted.
    pub package_type: PackageType,
    /// Captured tool run.
    pub tool: ToolOutcome,
    /// Packages placed in the releases directory.
    pub artifacts: Vec<BundledArtifact>,
}

impl PackageOutcome {
    /// The tool succeeded and at least one package was produced.
    pub fn succeeded(&self) -> bool {
        self.tool.succeeded() && !self.artifacts.is_empty()
    }

    /// Paths of every produced package.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.artifacts
            .iter()
            .flat_map(|a| a.paths.iter().cloned())
            .collect()
    }
}

/// Describes produced files, logging and skipping any that cannot be read.
pub(crate) async fn collect_artifacts(
    package_type: PackageType,
    paths: impl IntoIterator<Item = PathBuf>,
) -> Vec<BundledArtifact> {
    let mut artifacts = Vec::new();
    for path in paths {
        match BundledArtifact::from_path(package_type, path.clone()).await {
            Ok(artifact) => artifacts.push(artifact),
            Err(e) => log::error!("{} package {} is unusable: {}", package_type, path.display(), e),
        }
    }
    artifacts
}
