//! Configuration structures for the packaging pipeline.
//!
//! [`Settings`] is assembled with [`SettingsBuilder`] from three layers, later
//! layers winning: built-in defaults, an optional `linux-release.toml` file
//! ([`ConfigFile`]), and explicit builder calls (the CLI flags).

use crate::bundler::error::{Error, ErrorExt, Result};
use crate::bundler::utils::fs;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Name of the optional configuration file looked up in the project root.
pub const CONFIG_FILE_NAME: &str = "linux-release.toml";

/// CPU architecture of the packaged runtime.
///
/// Detected from the host by default. Only affects package naming and the
/// RPM output directory; the runtime itself is copied as-is.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Arch {
    /// x86_64 / AMD64 (64-bit)
    X86_64,
    /// x86 / i686 (32-bit)
    X86,
    /// AArch64 / ARM64 (64-bit)
    AArch64,
    /// ARM with hard-float (32-bit)
    Armhf,
    /// ARM with soft-float (32-bit)
    Armel,
    /// RISC-V (64-bit)
    Riscv64,
}

impl Arch {
    /// Architecture of the machine running the pipeline.
    pub fn host() -> Result<Self> {
        std::env::consts::ARCH.parse()
    }

    /// Debian architecture name (`dpkg --print-architecture` style).
    pub fn debian_name(self) -> &'static str {
        match self {
            Arch::X86_64 => "amd64",
            Arch::X86 => "i386",
            Arch::AArch64 => "arm64",
            Arch::Armhf => "armhf",
            Arch::Armel => "armel",
            Arch::Riscv64 => "riscv64",
        }
    }

    /// RPM architecture name, also the `RPMS/<arch>` output directory.
    pub fn rpm_name(self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::X86 => "i686",
            Arch::AArch64 => "aarch64",
            Arch::Armhf => "armv7hl",
            Arch::Armel => "armv5tel",
            Arch::Riscv64 => "riscv64",
        }
    }
}

impl FromStr for Arch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "x86_64" | "amd64" => Ok(Arch::X86_64),
            "x86" | "i386" | "i686" => Ok(Arch::X86),
            "aarch64" | "arm64" => Ok(Arch::AArch64),
            "arm" | "armhf" | "armv7hl" => Ok(Arch::Armhf),
            "armel" | "armv5tel" => Ok(Arch::Armel),
            "riscv64" => Ok(Arch::Riscv64),
            other => Err(Error::ArchError(other.to_string())),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.debian_name())
    }
}

/// What happens to the temp staging tree when a fatal stage fails.
///
/// A successful run always removes it.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CleanupPolicy {
    /// Remove only after a completed run; failed runs leave the tree for inspection.
    #[default]
    OnSuccess,
    /// Remove after every run.
    Always,
    /// Never remove, not even after success.
    Never,
}

impl CleanupPolicy {
    /// Whether the staging tree should be removed given how the run ended.
    pub fn should_clean(self, succeeded: bool) -> bool {
        match self {
            CleanupPolicy::OnSuccess => succeeded,
            CleanupPolicy::Always => true,
            CleanupPolicy::Never => false,
        }
    }

    /// Policy selected by the `--keep-temp` / `--always-clean` flags, falling back to `current`.
    pub fn from_flags(keep_temp: bool, always_clean: bool, current: CleanupPolicy) -> Self {
        match (keep_temp, always_clean) {
            (true, _) => CleanupPolicy::Never,
            (false, true) => CleanupPolicy::Always,
            (false, false) => current,
        }
    }
}

/// Input and output locations, relative to the project root unless absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    /// Application manifest (`package.json`).
    pub manifest: PathBuf,
    /// Compiled application tree sealed into the resource archive.
    pub build_dir: PathBuf,
    /// Prebuilt runtime distribution copied into the install tree.
    pub runtime_dir: PathBuf,
    /// Desktop entry template.
    pub desktop_template: PathBuf,
    /// Debian control file template.
    pub control_template: PathBuf,
    /// RPM spec file template.
    pub rpm_spec_template: PathBuf,
    /// Application icon.
    pub icon: PathBuf,
    /// Ephemeral staging root.
    pub tmp_dir: PathBuf,
    /// Persistent output directory for finished packages.
    pub releases_dir: PathBuf,
}

impl Default for ProjectLayout {
    fn default() -> Self {
        Self {
            manifest: PathBuf::from("app/package.json"),
            build_dir: PathBuf::from("build"),
            runtime_dir: PathBuf::from("node_modules/electron-prebuilt/dist"),
            desktop_template: PathBuf::from("resources/linux/app.desktop"),
            control_template: PathBuf::from("resources/linux/DEBIAN/control"),
            rpm_spec_template: PathBuf::from("resources/linux/RHEL/app.spec"),
            icon: PathBuf::from("app/images/linux/icon.png"),
            tmp_dir: PathBuf::from("tmp"),
            releases_dir: PathBuf::from("releases"),
        }
    }
}

/// Auxiliary resource copied into the staged application directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExtraResource {
    /// Source file or directory, relative to the project root.
    pub source: PathBuf,
    /// Destination relative to the staged application directory.
    pub destination: PathBuf,
}

impl ExtraResource {
    /// Dictionaries shipped next to the resource archive.
    pub fn dictionaries() -> Self {
        Self {
            source: PathBuf::from("dictionaries"),
            destination: PathBuf::from("resources/dictionaries"),
        }
    }
}

/// Native packaging tool configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSettings {
    /// Wrap both builders in `fakeroot` so files are owned by root.
    pub use_fakeroot: bool,
    /// `fakeroot` program name or path.
    pub fakeroot: PathBuf,
    /// `dpkg-deb` program name or path.
    pub dpkg_deb: PathBuf,
    /// `rpmbuild` program name or path.
    pub rpmbuild: PathBuf,
    /// Kill a packaging tool that runs longer than this.
    pub timeout: Option<Duration>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            use_fakeroot: true,
            fakeroot: PathBuf::from("fakeroot"),
            dpkg_deb: PathBuf::from("dpkg-deb"),
            rpmbuild: PathBuf::from("rpmbuild"),
            timeout: None,
        }
    }
}

/// Resolved pipeline configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    project_root: PathBuf,
    layout: ProjectLayout,
    arch: Arch,
    runtime_executable_dir: String,
    cleanup: CleanupPolicy,
    tools: ToolSettings,
    extra_resources: Vec<ExtraResource>,
}

impl Settings {
    /// Project root every relative layout path is resolved against.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Raw layout as configured.
    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    /// Resolve a project-relative path, folding `.` and `..` components.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        fs::normalize(&self.project_root.join(path))
    }

    /// Absolute manifest path.
    pub fn manifest_path(&self) -> PathBuf {
        self.resolve(&self.layout.manifest)
    }

    /// Absolute build directory.
    pub fn build_dir(&self) -> PathBuf {
        self.resolve(&self.layout.build_dir)
    }

    /// Absolute runtime distribution directory.
    pub fn runtime_dir(&self) -> PathBuf {
        self.resolve(&self.layout.runtime_dir)
    }

    /// Absolute desktop entry template path.
    pub fn desktop_template(&self) -> PathBuf {
        self.resolve(&self.layout.desktop_template)
    }

    /// Absolute Debian control template path.
    pub fn control_template(&self) -> PathBuf {
        self.resolve(&self.layout.control_template)
    }

    /// Absolute RPM spec template path.
    pub fn rpm_spec_template(&self) -> PathBuf {
        self.resolve(&self.layout.rpm_spec_template)
    }

    /// Absolute icon path.
    pub fn icon(&self) -> PathBuf {
        self.resolve(&self.layout.icon)
    }

    /// Absolute staging root.
    pub fn tmp_dir(&self) -> PathBuf {
        self.resolve(&self.layout.tmp_dir)
    }

    /// Absolute releases directory.
    pub fn releases_dir(&self) -> PathBuf {
        self.resolve(&self.layout.releases_dir)
    }

    /// Target architecture.
    pub fn arch(&self) -> Arch {
        self.arch
    }

    /// Directory name of the runtime executable inside the runtime distribution.
    pub fn runtime_executable_dir(&self) -> &str {
        &self.runtime_executable_dir
    }

    /// Cleanup policy for the staging tree.
    pub fn cleanup(&self) -> CleanupPolicy {
        self.cleanup
    }

    /// Packaging tool configuration.
    pub fn tools(&self) -> &ToolSettings {
        &self.tools
    }

    /// Auxiliary resources copied by the metadata finalizer.
    pub fn extra_resources(&self) -> &[ExtraResource] {
        &self.extra_resources
    }
}

/// On-disk `linux-release.toml`.
///
/// ```toml
/// arch = "amd64"
/// cleanup = "always"
/// runtime-executable = "electron"
///
/// [paths]
/// runtime = "vendor/electron/dist"
///
/// [tools]
/// fakeroot = false
/// timeout-secs = 600
///
/// [[resources]]
/// source = "dictionaries"
/// destination = "resources/dictionaries"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigFile {
    /// Architecture override.
    pub arch: Option<String>,
    /// Cleanup policy.
    pub cleanup: Option<CleanupPolicy>,
    /// Runtime executable directory name.
    pub runtime_executable: Option<String>,
    /// Layout overrides.
    #[serde(default)]
    pub paths: PathsSection,
    /// Tool overrides.
    #[serde(default)]
    pub tools: ToolsSection,
    /// Replaces the default auxiliary resource list when present.
    pub resources: Option<Vec<ExtraResource>>,
}

/// `[paths]` table of [`ConfigFile`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[allow(missing_docs)] // mirrors ProjectLayout
pub struct PathsSection {
    pub manifest: Option<PathBuf>,
    pub build: Option<PathBuf>,
    pub runtime: Option<PathBuf>,
    pub desktop_template: Option<PathBuf>,
    pub control_template: Option<PathBuf>,
    pub rpm_spec_template: Option<PathBuf>,
    pub icon: Option<PathBuf>,
    pub tmp: Option<PathBuf>,
    pub releases: Option<PathBuf>,
}

/// `[tools]` table of [`ConfigFile`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ToolsSection {
    /// Wrap the builders in `fakeroot`.
    pub fakeroot: Option<bool>,
    /// `fakeroot` program.
    pub fakeroot_path: Option<PathBuf>,
    /// `dpkg-deb` program.
    pub dpkg_deb: Option<PathBuf>,
    /// `rpmbuild` program.
    pub rpmbuild: Option<PathBuf>,
    /// Tool timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl ConfigFile {
    /// Parse configuration text.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a configuration file from disk.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .fs_context("reading configuration", path)?;
        Self::parse(&text)
    }

    /// Load `linux-release.toml` from the project root if it exists.
    pub async fn discover(project_root: &Path) -> Result<Option<Self>> {
        let path = project_root.join(CONFIG_FILE_NAME);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {
                log::debug!("Using configuration {}", path.display());
                Self::load(&path).await.map(Some)
            }
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).fs_context("reading configuration", path),
        }
    }
}

/// Builder for [`Settings`].
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    project_root: Option<PathBuf>,
    layout: ProjectLayout,
    arch: Option<Arch>,
    runtime_executable_dir: Option<String>,
    cleanup: Option<CleanupPolicy>,
    tools: ToolSettings,
    extra_resources: Option<Vec<ExtraResource>>,
}

impl SettingsBuilder {
    /// Creates a builder populated with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the project root.
    pub fn project_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.project_root = Some(path.into());
        self
    }

    /// Applies a configuration file on top of the current values.
    pub fn config_file(mut self, config: ConfigFile) -> Result<Self> {
        if let Some(arch) = config.arch {
            self.arch = Some(arch.parse()?);
        }
        if let Some(cleanup) = config.cleanup {
            self.cleanup = Some(cleanup);
        }
        if let Some(name) = config.runtime_executable {
            self.runtime_executable_dir = Some(name);
        }

        let paths = config.paths;
        let layout = &mut self.layout;
        let overrides = [
            (paths.manifest, &mut layout.manifest),
            (paths.build, &mut layout.build_dir),
            (paths.runtime, &mut layout.runtime_dir),
            (paths.desktop_template, &mut layout.desktop_template),
            (paths.control_template, &mut layout.control_template),
            (paths.rpm_spec_template, &mut layout.rpm_spec_template),
            (paths.icon, &mut layout.icon),
            (paths.tmp, &mut layout.tmp_dir),
            (paths.releases, &mut layout.releases_dir),
        ];
        for (value, slot) in overrides {
            if let Some(value) = value {
                *slot = value;
            }
        }

        let tools = config.tools;
        if let Some(fakeroot) = tools.fakeroot {
            self.tools.use_fakeroot = fakeroot;
        }
        if let Some(path) = tools.fakeroot_path {
            self.tools.fakeroot = path;
        }
        if let Some(path) = tools.dpkg_deb {
            self.tools.dpkg_deb = path;
        }
        if let Some(path) = tools.rpmbuild {
            self.tools.rpmbuild = path;
        }
        if let Some(secs) = tools.timeout_secs {
            self.tools.timeout = Some(Duration::from_secs(secs));
        }

        if let Some(resources) = config.resources {
            self.extra_resources = Some(resources);
        }
        Ok(self)
    }

    /// Replaces the whole layout.
    pub fn layout(mut self, layout: ProjectLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Overrides the runtime distribution directory.
    pub fn runtime_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.layout.runtime_dir = path.into();
        self
    }

    /// Overrides the staging root.
    pub fn tmp_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.layout.tmp_dir = path.into();
        self
    }

    /// Overrides the releases directory.
    pub fn releases_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.layout.releases_dir = path.into();
        self
    }

    /// Sets the target architecture.
    pub fn arch(mut self, arch: Arch) -> Self {
        self.arch = Some(arch);
        self
    }

    /// Sets the runtime executable directory name.
    pub fn runtime_executable_dir(mut self, name: impl Into<String>) -> Self {
        self.runtime_executable_dir = Some(name.into());
        self
    }

    /// Sets the cleanup policy.
    pub fn cleanup(mut self, policy: CleanupPolicy) -> Self {
        self.cleanup = Some(policy);
        self
    }

    /// Replaces the tool configuration.
    pub fn tools(mut self, tools: ToolSettings) -> Self {
        self.tools = tools;
        self
    }

    /// Enables or disables the `fakeroot` wrapper.
    pub fn use_fakeroot(mut self, enabled: bool) -> Self {
        self.tools.use_fakeroot = enabled;
        self
    }

    /// Sets the packaging tool timeout.
    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.tools.timeout = Some(timeout);
        self
    }

    /// Replaces the auxiliary resource list.
    pub fn extra_resources(mut self, resources: Vec<ExtraResource>) -> Self {
        self.extra_resources = Some(resources);
        self
    }

    /// Builds the settings, detecting the host architecture when none was set.
    pub fn build(self) -> Result<Settings> {
        let project_root = match self.project_root {
            Some(root) => root,
            None => std::env::current_dir().fs_context("reading current directory", ".")?,
        };
        let arch = match self.arch {
            Some(arch) => arch,
            None => Arch::host()?,
        };
        let runtime_executable_dir = self
            .runtime_executable_dir
            .unwrap_or_else(|| "electron".to_string());
        if runtime_executable_dir.is_empty() || runtime_executable_dir.contains('/') {
            return Err(Error::GenericError(format!(
                "runtime executable directory must be a single path component, got {runtime_executable_dir:?}"
            )));
        }

        Ok(Settings {
            project_root,
            layout: self.layout,
            arch,
            runtime_executable_dir,
            cleanup: self.cleanup.unwrap_or_default(),
            tools: self.tools,
            extra_resources: self
                .extra_resources
                .unwrap_or_else(|| vec![ExtraResource::dictionaries()]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arch_names() {
        assert_eq!(Arch::X86_64.debian_name(), "amd64");
        assert_eq!(Arch::X86_64.rpm_name(), "x86_64");
        assert_eq!(Arch::AArch64.debian_name(), "arm64");
        assert_eq!("i686".parse::<Arch>().unwrap(), Arch::X86);
        assert!("sparc".parse::<Arch>().is_err());
    }

    #[test]
    fn test_cleanup_policy() {
        assert!(CleanupPolicy::OnSuccess.should_clean(true));
        assert!(!CleanupPolicy::OnSuccess.should_clean(false));
        assert!(CleanupPolicy::Always.should_clean(false));
        assert!(!CleanupPolicy::Never.should_clean(true));
    }

    #[test]
    fn test_defaults_resolve_against_root() {
        let settings = SettingsBuilder::new()
            .project_root("/work/app")
            .arch(Arch::X86_64)
            .build()
            .unwrap();
        assert_eq!(settings.manifest_path(), PathBuf::from("/work/app/app/package.json"));
        assert_eq!(settings.tmp_dir(), PathBuf::from("/work/app/tmp"));
        assert_eq!(settings.runtime_executable_dir(), "electron");
        assert_eq!(settings.cleanup(), CleanupPolicy::OnSuccess);
        assert_eq!(settings.extra_resources(), &[ExtraResource::dictionaries()]);
    }

    #[test]
    fn test_resolve_folds_parent_components() {
        let settings = SettingsBuilder::new()
            .project_root("/work/app")
            .tmp_dir("../app")
            .releases_dir("./out/../releases")
            .arch(Arch::X86_64)
            .build()
            .unwrap();
        assert_eq!(settings.tmp_dir(), PathBuf::from("/work/app"));
        assert_eq!(settings.releases_dir(), PathBuf::from("/work/app/releases"));
    }

    #[test]
    fn test_config_file_overrides() {
        let config = ConfigFile::parse(
            r#"
            arch = "arm64"
            cleanup = "always"

            [paths]
            runtime = "/opt/electron/dist"

            [tools]
            fakeroot = false
            timeout-secs = 30

            [[resources]]
            source = "locales"
            destination = "locales"
            "#,
        )
        .unwrap();

        let settings = SettingsBuilder::new()
            .project_root("/work/app")
            .config_file(config)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(settings.arch(), Arch::AArch64);
        assert_eq!(settings.cleanup(), CleanupPolicy::Always);
        assert_eq!(settings.runtime_dir(), PathBuf::from("/opt/electron/dist"));
        assert!(!settings.tools().use_fakeroot);
        assert_eq!(settings.tools().timeout, Some(Duration::from_secs(30)));
        assert_eq!(settings.extra_resources().len(), 1);
        assert_eq!(settings.extra_resources()[0].source, PathBuf::from("locales"));
    }

    #[test]
    fn test_config_file_rejects_unknown_keys() {
        assert!(ConfigFile::parse("colour = \"blue\"").is_err());
    }

    #[test]
    fn test_builder_rejects_nested_executable_dir() {
        let result = SettingsBuilder::new()
            .project_root("/work")
            .arch(Arch::X86_64)
            .runtime_executable_dir("a/b")
            .build();
        assert!(result.is_err());
    }
}
