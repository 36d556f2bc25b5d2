//! `scaffold`: write the default packaging templates.

use crate::bundler::{ScaffoldAction, scaffold_templates};
use crate::cli::{Args, RuntimeConfig};
use crate::error::Result;

pub(super) async fn execute_scaffold(
    args: &Args,
    config: &RuntimeConfig,
    force: bool,
) -> Result<i32> {
    let settings = args.project.settings().await?;

    for action in scaffold_templates(&settings, force).await? {
        match action {
            ScaffoldAction::Written(path) => {
                config.success_println(&format!("Wrote {}", path.display()))
            }
            ScaffoldAction::Skipped(path) => config.println(&format!(
                "Kept existing {} (use --force to overwrite)",
                path.display()
            )),
        }
    }
    Ok(0)
}
