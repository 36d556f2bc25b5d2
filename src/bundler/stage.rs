//! Pipeline stages and the small stages that need no module of their own.

use crate::bundler::archive::ResourceArchiver;
use crate::bundler::error::{Context, ErrorExt, Result};
use crate::bundler::settings::Settings;
use crate::bundler::utils::fs;
use crate::bundler::workspace::Workspace;
use std::fmt;

/// One step of the packaging pipeline, in execution order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Stage {
    /// Load the manifest, compute paths, empty the staging root.
    InitializeWorkspace,
    /// Copy the runtime distribution into the application directory.
    StageRuntime,
    /// Seal `build/` into `resources/app.asar`.
    ArchiveResources,
    /// Desktop entry, icon and auxiliary resources.
    FinalizeMetadata,
    /// Rename the runtime executable to the application name.
    RenameExecutable,
    /// Build the `.deb` (best-effort).
    PackageDeb,
    /// Build the `.rpm` (best-effort).
    PackageRpm,
    /// Remove the staging root.
    CleanWorkspace,
}

impl Stage {
    /// Every stage in execution order.
    pub const PIPELINE: [Stage; 8] = [
        Stage::InitializeWorkspace,
        Stage::StageRuntime,
        Stage::ArchiveResources,
        Stage::FinalizeMetadata,
        Stage::RenameExecutable,
        Stage::PackageDeb,
        Stage::PackageRpm,
        Stage::CleanWorkspace,
    ];

    /// Short name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Stage::InitializeWorkspace => "workspace initializer",
            Stage::StageRuntime => "runtime stager",
            Stage::ArchiveResources => "resource archiver",
            Stage::FinalizeMetadata => "metadata finalizer",
            Stage::RenameExecutable => "tree renamer",
            Stage::PackageDeb => "deb packager",
            Stage::PackageRpm => "rpm packager",
            Stage::CleanWorkspace => "workspace cleaner",
        }
    }

    /// Best-effort stages log tool failures instead of aborting.
    pub fn is_best_effort(self) -> bool {
        matches!(self, Stage::PackageDeb | Stage::PackageRpm)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Copies the runtime distribution into `readyAppDir`, overwriting.
pub async fn stage_runtime(settings: &Settings, workspace: &Workspace) -> Result<()> {
    let runtime_dir = settings.runtime_dir();
    log::info!("Copying runtime from {}", runtime_dir.display());
    fs::copy_dir(&runtime_dir, &workspace.ready_app_dir)
        .await
        .with_context(|| format!("failed to stage runtime from {}", runtime_dir.display()))
}

/// Seals the build directory into the application resource archive.
pub async fn archive_resources<A: ResourceArchiver>(
    settings: &Settings,
    workspace: &Workspace,
    archiver: &A,
) -> Result<()> {
    let build_dir = settings.build_dir();
    let archive = workspace.archive_path();
    log::info!("Sealing {} into {}", build_dir.display(), archive.display());
    archiver
        .seal(&build_dir, &archive)
        .await
        .context("failed to package built application")
}

/// Renames the runtime executable entry to the manifest name.
pub async fn rename_executable(settings: &Settings, workspace: &Workspace) -> Result<()> {
    let from = workspace.ready_app_dir.join(settings.runtime_executable_dir());
    let to = workspace.ready_app_dir.join(&workspace.manifest.name);
    if from == to {
        return Ok(());
    }
    log::debug!("Renaming {} -> {}", from.display(), to.display());
    tokio::fs::rename(&from, &to)
        .await
        .fs_context("renaming runtime executable", &from)
}
