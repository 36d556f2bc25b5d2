//! Default packaging templates written by `scaffold`.

use crate::bundler::error::{ErrorExt, Result};
use crate::bundler::settings::Settings;
use crate::bundler::template;
use std::collections::BTreeMap;
use std::path::PathBuf;

const DESKTOP_TEMPLATE: &str = include_str!("linux/app.desktop");
const CONTROL_TEMPLATE: &str = include_str!("linux/DEBIAN/control");
const RPM_SPEC_TEMPLATE: &str = include_str!("linux/RHEL/app.spec");

/// What `scaffold` did with one template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScaffoldAction {
    /// Template written.
    Written(PathBuf),
    /// Template already present and left alone.
    Skipped(PathBuf),
}

/// Writes the default desktop, control and spec templates to the paths the
/// settings expect. Existing files are kept unless `force` is set.
///
/// The control template's `{{arch}}` marker is filled in with the configured
/// architecture; every other marker is left for the pipeline.
pub async fn scaffold_templates(settings: &Settings, force: bool) -> Result<Vec<ScaffoldAction>> {
    let arch = BTreeMap::from([("arch", settings.arch().debian_name().to_string())]);
    let templates = [
        (settings.desktop_template(), DESKTOP_TEMPLATE.to_string()),
        (settings.control_template(), template::render(CONTROL_TEMPLATE, &arch)?),
        (settings.rpm_spec_template(), RPM_SPEC_TEMPLATE.to_string()),
    ];

    let mut actions = Vec::with_capacity(templates.len());
    for (path, contents) in templates {
        if path.exists() && !force {
            log::debug!("Keeping existing template {}", path.display());
            actions.push(ScaffoldAction::Skipped(path));
            continue;
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .fs_context("creating template directory", parent)?;
        }
        tokio::fs::write(&path, contents)
            .await
            .fs_context("writing template", &path)?;
        log::info!("Wrote {}", path.display());
        actions.push(ScaffoldAction::Written(path));
    }
    Ok(actions)
}
