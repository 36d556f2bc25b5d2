//! Top-level error types for the packager binary.
//!
//! Pipeline stages report [`crate::bundler::Error`]; this module wraps it
//! together with CLI failures and adds recovery suggestions for the user.

use crate::bundler::Stage;
use thiserror::Error;

/// Result type alias for CLI-level operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type returned by the CLI
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Pipeline or configuration errors
    #[error("Bundler error: {0}")]
    Bundler(#[from] crate::bundler::Error),

    /// A fatal pipeline stage failed
    #[error("{stage} failed: {source}")]
    StageFailed {
        /// Stage that failed
        stage: Stage,
        /// Error it raised
        #[source]
        source: crate::bundler::Error,
    },

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// A flag value is out of range
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Conflicting arguments
    #[error("Conflicting arguments: {arguments:?}")]
    ConflictingArguments {
        /// Arguments that conflict
        arguments: Vec<String>,
    },

}

impl ReleaseError {
    /// Hints printed under the error message
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ReleaseError::StageFailed { stage, source } => stage_suggestions(*stage, source),
            ReleaseError::Bundler(crate::bundler::Error::Manifest { path, .. }) => vec![
                format!("Check that {} exists and is valid JSON", path.display()),
                "The manifest needs non-empty \"name\" and \"version\" fields".to_string(),
            ],
            ReleaseError::Bundler(crate::bundler::Error::TomlError(_)) => vec![format!(
                "Fix the syntax in {}",
                crate::bundler::CONFIG_FILE_NAME
            )],
            ReleaseError::Bundler(crate::bundler::Error::ArchError(_)) => vec![
                "Pass one of: amd64, i386, arm64, armhf, armel, riscv64".to_string(),
            ],
            ReleaseError::Cli(CliError::ConflictingArguments { .. }) => {
                vec!["Run with --help to see how the flags combine".to_string()]
            }
            _ => vec!["Re-run with --verbose to see each packaging command".to_string()],
        }
    }
}

fn stage_suggestions(stage: Stage, source: &crate::bundler::Error) -> Vec<String> {
    let mut suggestions = match stage {
        Stage::InitializeWorkspace => vec![
            "Check app/package.json for a valid name and version".to_string(),
            "The tmp directory must not be or contain the project, build, runtime or releases directory".to_string(),
        ],
        Stage::StageRuntime => vec![
            "Install the Electron runtime: npm install".to_string(),
            "Point --runtime-dir at the prebuilt Electron dist directory".to_string(),
        ],
        Stage::ArchiveResources => {
            vec!["Build the application first so the build directory exists".to_string()]
        }
        Stage::FinalizeMetadata => vec![
            "Run `linux_release_packager scaffold` to create missing templates".to_string(),
            "Check that the icon file exists".to_string(),
        ],
        Stage::RenameExecutable => {
            vec!["Check the runtime executable directory name in the configuration".to_string()]
        }
        Stage::PackageDeb | Stage::PackageRpm | Stage::CleanWorkspace => Vec::new(),
    };
    if source.is_not_found() {
        suggestions.push("A required file or directory is missing".to_string());
    }
    suggestions.push("Re-run with --keep-temp to inspect the staging tree".to_string());
    suggestions
}
