//! `{{key}}` placeholder substitution for packaging templates.
//!
//! Keys are looked up literally in a flat map. A marker whose key is not in
//! the map is kept verbatim, so templates may carry markers meant for a later
//! tool.

use crate::bundler::error::{ErrorExt, Result};
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::path::Path;

const PLACEHOLDER: &str = r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}";

/// Substitutes every known `{{key}}` marker in `template`.
pub fn render(template: &str, fields: &BTreeMap<&'static str, String>) -> Result<String> {
    let re = Regex::new(PLACEHOLDER)?;
    let rendered = re.replace_all(template, |caps: &Captures<'_>| match fields.get(&caps[1]) {
        Some(value) => value.clone(),
        None => caps[0].to_string(),
    });
    Ok(rendered.into_owned())
}

/// Reads `template_path`, renders it, and writes the result to `dest`,
/// creating parent directories.
pub async fn render_file(
    template_path: &Path,
    dest: &Path,
    fields: &BTreeMap<&'static str, String>,
) -> Result<()> {
    let template = tokio::fs::read_to_string(template_path)
        .await
        .fs_context("reading template", template_path)?;
    let rendered = render(&template, fields)?;

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .fs_context("creating directory", parent)?;
    }
    tokio::fs::write(dest, rendered)
        .await
        .fs_context("writing rendered template", dest)?;
    log::debug!("Rendered {} -> {}", template_path.display(), dest.display());
    Ok(())
}
