//! Pipeline orchestration.
//!
//! The [`Bundler`] runs [`Stage::PIPELINE`] in order against one
//! [`Workspace`]. The first fatal error stops the run; it is logged once
//! here and returned inside [`PipelineOutcome::Failed`]. Whether the staging
//! tree survives a failure is decided by the
//! [`CleanupPolicy`](crate::bundler::CleanupPolicy).
//!
//! # Example
//!
//! ```no_run
//! use linux_release_packager::bundler::{Bundler, PipelineOutcome, SettingsBuilder};
//!
//! # async fn example() -> linux_release_packager::bundler::Result<()> {
//! let settings = SettingsBuilder::new().project_root("/work/my-app").build()?;
//!
//! match Bundler::new(settings).run().await {
//!     PipelineOutcome::Completed(report) => println!("built {}", report.pack_name),
//!     PipelineOutcome::Failed { stage, error, .. } => eprintln!("{stage}: {error}"),
//! }
//! # Ok(())
//! # }
//! ```

use crate::bundler::{
    archive::{AsarArchiver, ResourceArchiver},
    error::Error,
    platform::{PackageOutcome, linux},
    settings::Settings,
    stage::{self, Stage},
    workspace::Workspace,
};

/// What a pipeline run produced.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    /// Release package base name, empty if the workspace never initialised.
    pub pack_name: String,
    /// Stages that completed, in order.
    pub completed: Vec<Stage>,
    /// Debian packaging result, if the stage ran.
    pub deb: Option<PackageOutcome>,
    /// RPM packaging result, if the stage ran.
    pub rpm: Option<PackageOutcome>,
    /// Whether the staging tree was removed.
    pub cleaned: bool,
}

impl PipelineReport {
    /// Outcomes of the packaging stages that ran.
    pub fn packages(&self) -> impl Iterator<Item = &PackageOutcome> {
        self.deb.iter().chain(self.rpm.iter())
    }
}

/// How a pipeline run ended.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// Every stage ran. Packaging tool failures are inside the report.
    Completed(PipelineReport),
    /// A fatal stage failed; later stages were skipped.
    Failed {
        /// Stage that failed.
        stage: Stage,
        /// The error it raised.
        error: Error,
        /// Progress up to the failure.
        report: PipelineReport,
    },
}

impl PipelineOutcome {
    /// The report, whichever way the run ended.
    pub fn report(&self) -> &PipelineReport {
        match self {
            PipelineOutcome::Completed(report) => report,
            PipelineOutcome::Failed { report, .. } => report,
        }
    }

    /// True for [`PipelineOutcome::Completed`].
    pub fn is_completed(&self) -> bool {
        matches!(self, PipelineOutcome::Completed(_))
    }
}

/// Pipeline driver.
#[derive(Debug)]
pub struct Bundler<A = AsarArchiver> {
    settings: Settings,
    archiver: A,
}

impl Bundler {
    /// Creates a driver that seals resources with the native asar writer.
    pub fn new(settings: Settings) -> Self {
        Self::with_archiver(settings, AsarArchiver)
    }
}

impl<A: ResourceArchiver> Bundler<A> {
    /// Creates a driver with a custom resource archiver.
    pub fn with_archiver(settings: Settings, archiver: A) -> Self {
        Self { settings, archiver }
    }

    /// Returns a reference to the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Runs every stage. Never returns an error: failures are logged and
    /// reported through [`PipelineOutcome::Failed`].
    pub async fn run(&self) -> PipelineOutcome {
        let mut report = PipelineReport::default();

        // Nothing is removed when initialisation fails: the staging root may
        // not have passed its safety checks.
        let workspace = match Workspace::initialize(&self.settings).await {
            Ok(workspace) => workspace,
            Err(error) => return self.fail(Stage::InitializeWorkspace, error, report),
        };
        report.pack_name = workspace.pack_name.clone();
        report.completed.push(Stage::InitializeWorkspace);

        for stage in Stage::PIPELINE {
            if matches!(stage, Stage::InitializeWorkspace | Stage::CleanWorkspace) {
                continue;
            }
            log::debug!("Entering {}", stage);
            if let Err(error) = self.run_stage(stage, &workspace, &mut report).await {
                let policy = self.settings.cleanup();
                if policy.should_clean(false) {
                    report.cleaned = clean(&workspace).await;
                } else {
                    log::info!(
                        "Leaving staging tree {} for inspection",
                        workspace.tmp_dir.display()
                    );
                }
                return self.fail(stage, error, report);
            }
            report.completed.push(stage);
        }

        if self.settings.cleanup().should_clean(true) {
            if let Err(error) = workspace.clean().await {
                return self.fail(Stage::CleanWorkspace, error, report);
            }
            report.cleaned = true;
            report.completed.push(Stage::CleanWorkspace);
        } else {
            log::info!("Keeping staging tree {}", workspace.tmp_dir.display());
        }

        PipelineOutcome::Completed(report)
    }

    async fn run_stage(
        &self,
        stage: Stage,
        workspace: &Workspace,
        report: &mut PipelineReport,
    ) -> crate::bundler::Result<()> {
        let settings = &self.settings;
        match stage {
            Stage::StageRuntime => stage::stage_runtime(settings, workspace).await,
            Stage::ArchiveResources => {
                stage::archive_resources(settings, workspace, &self.archiver).await
            }
            Stage::FinalizeMetadata => {
                linux::freedesktop::finalize_metadata(settings, workspace).await
            }
            Stage::RenameExecutable => stage::rename_executable(settings, workspace).await,
            Stage::PackageDeb => {
                report.deb = Some(linux::debian::bundle_project(settings, workspace).await?);
                Ok(())
            }
            Stage::PackageRpm => {
                report.rpm = Some(linux::rpm::bundle_project(settings, workspace).await?);
                Ok(())
            }
            Stage::InitializeWorkspace | Stage::CleanWorkspace => Ok(()),
        }
    }

    fn fail(&self, stage: Stage, error: Error, report: PipelineReport) -> PipelineOutcome {
        log::error!("{} failed: {}", stage, error);
        PipelineOutcome::Failed {
            stage,
            error,
            report,
        }
    }
}

/// Best-effort removal after a failure; the original error is what gets reported.
async fn clean(workspace: &Workspace) -> bool {
    match workspace.clean().await {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Could not remove {}: {}", workspace.tmp_dir.display(), e);
            false
        }
    }
}
