//! RPM package (.rpm) bundler for Red Hat-based distributions.
//!
//! Renders the spec file into `tmp/SPECS/app.spec` and runs `rpmbuild`
//! against the staged image:
//!
//! ```text
//! fakeroot rpmbuild --quiet --target <arch> -D "_topdir <tmpDir>" -D "_builddir <packDir>" -bb <spec>
//! ```
//!
//! `--target` pins the output to `tmp/RPMS/<arch>/` for the configured
//! architecture rather than the host's. rpmbuild names the package from the
//! spec metadata, so every `*.rpm` in that directory is copied to the
//! releases directory.

use crate::bundler::{
    error::{Context, Result},
    platform::{PackageOutcome, PackageType, collect_artifacts},
    settings::Settings,
    template,
    utils::{fs, process::ToolInvocation},
    workspace::Workspace,
};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Bundle the staged image as an RPM package.
pub async fn bundle_project(settings: &Settings, workspace: &Workspace) -> Result<PackageOutcome> {
    log::info!("Creating RPM package... ({}.rpm)", workspace.pack_name);

    let spec_path = workspace.rpm_spec_path();
    template::render_file(
        &settings.rpm_spec_template(),
        &spec_path,
        &workspace.manifest.package_fields(),
    )
    .await
    .context("failed to generate RPM spec file")?;

    let outcome = ToolInvocation::new(&settings.tools().rpmbuild)
        .arg("--quiet")
        .arg("--target")
        .arg(settings.arch().rpm_name())
        .arg("-D")
        .arg(define("_topdir", &workspace.tmp_dir))
        .arg("-D")
        .arg(define("_builddir", &workspace.pack_dir))
        .arg("-bb")
        .arg(&spec_path)
        .wrapped(super::fakeroot(settings))
        .run(settings.tools().timeout)
        .await;

    let artifacts = match outcome.failure_reason() {
        None => match publish_rpms(&workspace.rpm_output_dir(), &workspace.releases_dir).await {
            Ok(paths) if paths.is_empty() => {
                log::error!(
                    "ERROR while building RPM package: no *.rpm in {}",
                    workspace.rpm_output_dir().display()
                );
                Vec::new()
            }
            Ok(paths) => {
                for path in &paths {
                    log::info!("RPM package ready! {}", path.display());
                }
                collect_artifacts(PackageType::Rpm, paths).await
            }
            Err(e) => {
                log::error!("ERROR while copying RPM package: {}", e);
                Vec::new()
            }
        },
        Some(reason) => {
            log::error!("ERROR while building RPM package: {}", reason);
            log::debug!("rpmbuild command: {}", outcome.command_line);
            Vec::new()
        }
    };

    Ok(PackageOutcome {
        package_type: PackageType::Rpm,
        tool: outcome,
        artifacts,
    })
}

/// `-D` macro definition argument, e.g. `_topdir /path/to/tmp`.
fn define(name: &str, value: &Path) -> OsString {
    let mut def = OsString::from(name);
    def.push(" ");
    def.push(value);
    def
}

/// Copies every `*.rpm` from the rpmbuild output directory into `releases_dir`.
async fn publish_rpms(output_dir: &Path, releases_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut published = Vec::new();
    for rpm in fs::matching_files(output_dir, "*.rpm")? {
        let Some(name) = rpm.file_name() else {
            continue;
        };
        let dest = releases_dir.join(name);
        fs::copy_file(&rpm, &dest).await?;
        published.push(dest);
    }
    Ok(published)
}
