//! Desktop integration metadata for the staged install image.
//!
//! Writes the freedesktop.org `.desktop` entry, installs the icon and copies
//! auxiliary resources such as spell-check dictionaries.

use crate::bundler::error::{Error, Result};
use crate::bundler::settings::{ExtraResource, Settings};
use crate::bundler::template;
use crate::bundler::utils::fs;
use crate::bundler::workspace::Workspace;
use std::path::{Component, Path};

/// Writes the desktop entry, icon and extra resources.
///
/// Each artifact is attempted even if an earlier one failed; all failures
/// are then reported together.
pub async fn finalize_metadata(settings: &Settings, workspace: &Workspace) -> Result<()> {
    let mut failures = Vec::new();

    if let Err(e) = template::render_file(
        &settings.desktop_template(),
        &workspace.desktop_entry_path(),
        &workspace.manifest.desktop_fields(),
    )
    .await
    {
        failures.push(format!("desktop entry: {e}"));
    }

    if let Err(e) = fs::copy_file(&settings.icon(), &workspace.icon_path()).await {
        failures.push(format!("icon: {e}"));
    }

    for resource in settings.extra_resources() {
        if let Err(e) = install_resource(settings, workspace, resource).await {
            failures.push(format!("{}: {e}", resource.destination.display()));
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        for failure in &failures {
            log::error!("{}", failure);
        }
        Err(Error::Stage {
            stage: "metadata finalizer",
            failures,
        })
    }
}

async fn install_resource(
    settings: &Settings,
    workspace: &Workspace,
    resource: &ExtraResource,
) -> Result<()> {
    check_destination(&resource.destination)?;
    let source = settings.resolve(&resource.source);
    let dest = workspace.ready_app_dir.join(&resource.destination);
    log::debug!("Copying {} -> {}", source.display(), dest.display());
    fs::copy_path(&source, &dest).await
}

/// Destinations stay inside the application directory and never replace the
/// resource archive.
fn check_destination(dest: &Path) -> Result<()> {
    let escapes = dest
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes || dest.as_os_str().is_empty() {
        return Err(Error::GenericError(format!(
            "resource destination {} must be a relative path inside the application directory",
            dest.display()
        )));
    }

    let normal: Vec<_> = dest
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect();
    let in_resources = normal.first().is_some_and(|c| c.as_os_str() == "resources");
    let targets_archive = match normal.len() {
        1 => in_resources,
        2 => {
            in_resources
                && normal[1]
                    .as_os_str()
                    .to_str()
                    .is_some_and(|n| n.starts_with("app."))
        }
        _ => false,
    };
    if targets_archive {
        crate::bail!(
            "resource destination {} would overwrite the application archive",
            dest.display()
        );
    }
    Ok(())
}
