//! Command line argument parsing and validation.
//!
//! Every project option is global so `package` can be omitted:
//! `linux_release_packager --keep-temp` runs the pipeline.

use crate::bundler::{self, CleanupPolicy, ConfigFile, ErrorExt, Settings, SettingsBuilder};
use crate::error::CliError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Package an Electron application as .deb and .rpm
#[derive(Parser, Debug)]
#[command(
    name = "linux_release_packager",
    version,
    about = "Package an Electron application as .deb and .rpm",
    long_about = "Stage a built Electron application with its runtime and hand it to
dpkg-deb and rpmbuild. Finished packages land in releases/.

Usage:
  linux_release_packager                      # package the current directory
  linux_release_packager --project ~/src/app  # package another project
  linux_release_packager scaffold             # write default templates
  linux_release_packager inspect              # show resolved paths"
)]
pub struct Args {
    /// Command to run (defaults to `package`)
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Project options
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Show debug-level status lines
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Build the .deb and .rpm packages
    Package,
    /// Write default desktop entry, control and spec templates
    Scaffold {
        /// Overwrite templates that already exist
        #[arg(long)]
        force: bool,
    },
    /// Print the resolved package name and paths without touching the disk
    Inspect,
}

impl Command {
    /// Command name for status messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::Package => "package",
            Command::Scaffold { .. } => "scaffold",
            Command::Inspect => "inspect",
        }
    }
}

/// Options that resolve the project [`Settings`].
///
/// Relative paths other than `--project` and `--config` are taken relative
/// to the project root.
#[derive(clap::Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Project root
    #[arg(long, value_name = "DIR", default_value = ".", global = true)]
    pub project: PathBuf,

    /// Configuration file (defaults to <project>/linux-release.toml if present)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Prebuilt Electron runtime directory
    #[arg(long, value_name = "DIR", global = true)]
    pub runtime_dir: Option<PathBuf>,

    /// Staging directory, emptied before every run
    #[arg(long, value_name = "DIR", global = true)]
    pub tmp_dir: Option<PathBuf>,

    /// Output directory for finished packages
    #[arg(long, value_name = "DIR", global = true)]
    pub releases_dir: Option<PathBuf>,

    /// Target architecture (amd64, i386, arm64, armhf, armel, riscv64)
    #[arg(long, value_name = "ARCH", global = true)]
    pub arch: Option<String>,

    /// Never remove the staging directory
    #[arg(long, global = true)]
    pub keep_temp: bool,

    /// Remove the staging directory even after a failed run
    #[arg(long, global = true)]
    pub always_clean: bool,

    /// Run dpkg-deb and rpmbuild without fakeroot
    #[arg(long, global = true)]
    pub no_fakeroot: bool,

    /// Kill a packaging tool after this many seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub tool_timeout: Option<u64>,
}

impl ProjectArgs {
    /// Resolves settings: defaults, then the configuration file, then flags.
    pub async fn settings(&self) -> bundler::Result<Settings> {
        let root = tokio::fs::canonicalize(&self.project)
            .await
            .fs_context("resolving project directory", &self.project)?;

        let config = match &self.config {
            Some(path) => Some(ConfigFile::load(path).await?),
            None => ConfigFile::discover(&root).await?,
        };
        let file_cleanup = config
            .as_ref()
            .and_then(|c| c.cleanup)
            .unwrap_or_default();

        let mut builder = SettingsBuilder::new().project_root(root);
        if let Some(config) = config {
            builder = builder.config_file(config)?;
        }
        if let Some(dir) = &self.runtime_dir {
            builder = builder.runtime_dir(dir);
        }
        if let Some(dir) = &self.tmp_dir {
            builder = builder.tmp_dir(dir);
        }
        if let Some(dir) = &self.releases_dir {
            builder = builder.releases_dir(dir);
        }
        if let Some(arch) = &self.arch {
            builder = builder.arch(arch.parse()?);
        }
        if self.no_fakeroot {
            builder = builder.use_fakeroot(false);
        }
        if let Some(secs) = self.tool_timeout {
            builder = builder.tool_timeout(Duration::from_secs(secs));
        }
        builder
            .cleanup(CleanupPolicy::from_flags(
                self.keep_temp,
                self.always_clean,
                file_cleanup,
            ))
            .build()
    }
}

impl Args {
    /// The command to run, `package` when none was given
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Package)
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), CliError> {
        if self.project.keep_temp && self.project.always_clean {
            return Err(CliError::ConflictingArguments {
                arguments: vec!["--keep-temp".to_string(), "--always-clean".to_string()],
            });
        }
        if self.verbose && self.quiet {
            return Err(CliError::ConflictingArguments {
                arguments: vec!["--verbose".to_string(), "--quiet".to_string()],
            });
        }
        if self.project.tool_timeout == Some(0) {
            return Err(CliError::InvalidArguments {
                reason: "--tool-timeout must be at least 1 second".to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Output manager for colored terminal output
    output: super::OutputManager,
}

impl RuntimeConfig {
    /// Create runtime configuration
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            output: super::OutputManager::new(verbose, quiet),
        }
    }

    /// Print message
    pub fn println(&self, message: &str) {
        let _ = self.output.println(message);
    }

    /// Print verbose message
    pub fn verbose_println(&self, message: &str) {
        let _ = self.output.verbose(message);
    }

    /// Print error message (always shown)
    pub fn error_println(&self, message: &str) {
        self.output.error(message);
    }

    /// Print warning message
    pub fn warning_println(&self, message: &str) {
        let _ = self.output.warn(message);
    }

    /// Print success message
    pub fn success_println(&self, message: &str) {
        let _ = self.output.success(message);
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        let _ = self.output.section(title);
    }

    /// Print indented text
    pub fn indent(&self, message: &str) {
        let _ = self.output.indent(message);
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.output.is_quiet()
    }
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self::new(args.verbose, args.quiet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_is_default_command() {
        let args = Args::try_parse_from(["linux_release_packager", "--keep-temp"]).unwrap();
        assert_eq!(args.command(), Command::Package);
        assert!(args.project.keep_temp);
        assert_eq!(args.project.project, PathBuf::from("."));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "linux_release_packager",
            "scaffold",
            "--force",
            "--arch",
            "arm64",
        ])
        .unwrap();
        assert_eq!(args.command(), Command::Scaffold { force: true });
        assert_eq!(args.project.arch.as_deref(), Some("arm64"));
    }

    #[test]
    fn test_conflicting_cleanup_flags() {
        let args = Args::try_parse_from([
            "linux_release_packager",
            "--keep-temp",
            "--always-clean",
        ])
        .unwrap();
        assert!(matches!(
            args.validate(),
            Err(CliError::ConflictingArguments { .. })
        ));
    }

    #[tokio::test]
    async fn test_flags_override_config_file() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(
            root.path().join(bundler::CONFIG_FILE_NAME),
            "arch = \"amd64\"\ncleanup = \"never\"\n[tools]\nfakeroot = true\n",
        )
        .unwrap();
        let project = root.path().to_string_lossy().into_owned();
        let args = Args::try_parse_from([
            "linux_release_packager",
            "--project",
            project.as_str(),
            "--arch",
            "arm64",
            "--no-fakeroot",
        ])
        .unwrap();

        let settings = args.project.settings().await.unwrap();

        assert_eq!(settings.arch(), bundler::Arch::AArch64);
        assert_eq!(settings.cleanup(), CleanupPolicy::Never);
        assert!(!settings.tools().use_fakeroot);
    }
}
