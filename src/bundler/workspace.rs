//! Workspace context shared by every pipeline stage.
//!
//! Computed once from [`Settings`] and the manifest, then passed by reference
//! to each stage. Nothing else carries state between stages.

use crate::bundler::error::{Context, ErrorExt, Result};
use crate::bundler::settings::Settings;
use crate::bundler::utils::fs;
use crate::metadata::Manifest;
use std::path::{Path, PathBuf};

/// Paths and metadata for one pipeline run.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Application manifest.
    pub manifest: Manifest,
    /// Release package base name, e.g. `sample-1.2.3-amd64`.
    pub pack_name: String,
    /// Ephemeral staging root.
    pub tmp_dir: PathBuf,
    /// Root of the install image: `tmp_dir/pack_name`.
    pub pack_dir: PathBuf,
    /// Application payload: `pack_dir/opt/<name>`.
    pub ready_app_dir: PathBuf,
    /// Output directory for finished packages.
    pub releases_dir: PathBuf,
    rpm_arch: &'static str,
}

impl Workspace {
    /// Loads the manifest and computes every path without writing to disk.
    pub async fn plan(settings: &Settings) -> Result<Self> {
        let manifest_path = settings.manifest_path();
        let manifest = Manifest::load(&manifest_path)
            .await
            .context("failed to load manifest")?;

        let tmp_dir = settings.tmp_dir();
        let releases_dir = settings.releases_dir();
        check_staging_root(settings, &tmp_dir).await?;

        let pack_name = manifest.release_package_name(settings.arch());
        let pack_dir = tmp_dir.join(&pack_name);
        let ready_app_dir = pack_dir.join("opt").join(&manifest.name);

        Ok(Self {
            manifest,
            pack_name,
            tmp_dir,
            pack_dir,
            ready_app_dir,
            releases_dir,
            rpm_arch: settings.arch().rpm_name(),
        })
    }

    /// Plans the workspace, empties the staging root and creates the releases directory.
    pub async fn initialize(settings: &Settings) -> Result<Self> {
        let workspace = Self::plan(settings).await?;

        fs::empty_dir(&workspace.tmp_dir).await?;
        tokio::fs::create_dir_all(&workspace.releases_dir)
            .await
            .fs_context("creating releases directory", &workspace.releases_dir)?;

        log::info!(
            "Staging {} {} as {} in {}",
            workspace.manifest.product_name,
            workspace.manifest.version,
            workspace.pack_name,
            workspace.tmp_dir.display()
        );
        Ok(workspace)
    }

    /// Removes the whole staging root.
    pub async fn clean(&self) -> Result<()> {
        fs::remove_dir_all(&self.tmp_dir).await?;
        log::debug!("Removed {}", self.tmp_dir.display());
        Ok(())
    }

    /// `readyAppDir/resources`.
    pub fn resources_dir(&self) -> PathBuf {
        self.ready_app_dir.join("resources")
    }

    /// The sealed application resource archive.
    pub fn archive_path(&self) -> PathBuf {
        self.resources_dir().join("app.asar")
    }

    /// Desktop entry inside the install image.
    pub fn desktop_entry_path(&self) -> PathBuf {
        self.pack_dir
            .join("usr/share/applications")
            .join(format!("{}.desktop", self.manifest.name))
    }

    /// Installed icon.
    pub fn icon_path(&self) -> PathBuf {
        self.ready_app_dir.join("icon.png")
    }

    /// Debian control file.
    pub fn control_path(&self) -> PathBuf {
        self.pack_dir.join("DEBIAN").join("control")
    }

    /// Final `.deb` location.
    pub fn deb_output_path(&self) -> PathBuf {
        self.releases_dir.join(format!("{}.deb", self.pack_name))
    }

    /// RPM spec file handed to rpmbuild.
    pub fn rpm_spec_path(&self) -> PathBuf {
        self.tmp_dir.join("SPECS").join("app.spec")
    }

    /// Directory rpmbuild writes binary packages to.
    pub fn rpm_output_dir(&self) -> PathBuf {
        self.tmp_dir.join("RPMS").join(self.rpm_arch)
    }
}

/// The staging root is emptied and later deleted, so it must not be or
/// contain any directory the run reads from or writes to.
///
/// Both sides are compared after resolving symlinks, so `../proj` or a link
/// back into the project is caught.
async fn check_staging_root(settings: &Settings, tmp_dir: &Path) -> Result<()> {
    let staging = fs::real_path(tmp_dir).await?;
    let guarded = [
        ("project root", settings.project_root().to_path_buf()),
        ("build directory", settings.build_dir()),
        ("runtime directory", settings.runtime_dir()),
        ("releases directory", settings.releases_dir()),
    ];
    for (label, dir) in guarded {
        if fs::real_path(&dir).await?.starts_with(&staging) {
            crate::bail!(
                "staging directory {} would delete the {label} {}",
                tmp_dir.display(),
                dir.display()
            );
        }
    }
    Ok(())
}
