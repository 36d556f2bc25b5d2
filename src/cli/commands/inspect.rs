//! `inspect`: print the resolved workspace without writing to disk.

use crate::bundler::Workspace;
use crate::cli::{Args, RuntimeConfig};
use crate::error::Result;

pub(super) async fn execute_inspect(args: &Args, config: &RuntimeConfig) -> Result<i32> {
    let settings = args.project.settings().await?;
    let workspace = Workspace::plan(&settings).await?;
    let tools = settings.tools();

    config.println(&format!("pack name:     {}", workspace.pack_name));
    config.println(&format!(
        "application:   {} {}",
        workspace.manifest.product_name, workspace.manifest.version
    ));
    config.println(&format!(
        "arch:          {} (rpm {})",
        settings.arch().debian_name(),
        settings.arch().rpm_name()
    ));
    config.println(&format!("project root:  {}", settings.project_root().display()));
    config.println(&format!("runtime:       {}", settings.runtime_dir().display()));
    config.println(&format!("build:         {}", settings.build_dir().display()));
    config.println(&format!("staging:       {}", workspace.tmp_dir.display()));
    config.println(&format!("app dir:       {}", workspace.ready_app_dir.display()));
    config.println(&format!("deb output:    {}", workspace.deb_output_path().display()));
    config.println(&format!("rpm output:    {}", workspace.rpm_output_dir().display()));
    config.println(&format!("releases:      {}", workspace.releases_dir.display()));
    config.println(&format!("cleanup:       {:?}", settings.cleanup()));
    config.println(&format!(
        "tools:         {}{} / {}",
        if tools.use_fakeroot { "fakeroot + " } else { "" },
        tools.dpkg_deb.display(),
        tools.rpmbuild.display()
    ));
    Ok(0)
}
