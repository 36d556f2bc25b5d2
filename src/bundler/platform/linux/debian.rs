//! Debian package (.deb) bundler.
//!
//! Renders `DEBIAN/control` into the staged install image and hands the
//! image to `dpkg-deb`:
//!
//! ```text
//! fakeroot dpkg-deb -Zxz --build <packDir> <releasesDir>/<packName>.deb
//! ```

use crate::bundler::{
    error::{Context, Result},
    platform::{PackageOutcome, PackageType, collect_artifacts},
    settings::Settings,
    template,
    utils::{fs, process::ToolInvocation},
    workspace::Workspace,
};
use std::path::Path;

/// Bundle the staged image as a Debian package.
///
/// Template and I/O failures before `dpkg-deb` runs are returned as errors.
/// A failing `dpkg-deb` is not: it is logged and reported in the outcome.
pub async fn bundle_project(settings: &Settings, workspace: &Workspace) -> Result<PackageOutcome> {
    let deb_path = workspace.deb_output_path();
    log::info!("Creating DEB package... ({})", file_name(&deb_path));

    generate_control_file(settings, workspace)
        .await
        .context("failed to generate control file")?;

    let outcome = ToolInvocation::new(&settings.tools().dpkg_deb)
        .arg("-Zxz")
        .arg("--build")
        .arg(&workspace.pack_dir)
        .arg(&deb_path)
        .wrapped(super::fakeroot(settings))
        .run(settings.tools().timeout)
        .await;

    let artifacts = match outcome.failure_reason() {
        None => {
            log::info!("DEB package ready! {}", deb_path.display());
            collect_artifacts(PackageType::Deb, [deb_path]).await
        }
        Some(reason) => {
            log::error!("ERROR while building DEB package: {}", reason);
            log::debug!("dpkg-deb command: {}", outcome.command_line);
            Vec::new()
        }
    };

    Ok(PackageOutcome {
        package_type: PackageType::Deb,
        tool: outcome,
        artifacts,
    })
}

/// Render the control template with the manifest fields and the installed size.
async fn generate_control_file(settings: &Settings, workspace: &Workspace) -> Result<()> {
    let size_kib = installed_size_kib(&workspace.ready_app_dir).await?;
    log::debug!("Installed size: {} KiB", size_kib);

    let mut fields = workspace.manifest.package_fields();
    fields.insert("size", size_kib.to_string());

    template::render_file(&settings.control_template(), &workspace.control_path(), &fields).await
}

/// Installed size of the application directory in KiB, rounded to nearest.
pub async fn installed_size_kib(app_dir: &Path) -> Result<u64> {
    Ok(fs::bytes_to_kib(fs::dir_size(app_dir).await?))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
