//! External packaging tool invocation.
//!
//! Tools are run with a direct argv (no shell) and always produce a
//! [`ToolOutcome`]; whether a failed outcome is fatal is the caller's call.

use crate::bundler::error::Error;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

/// How a tool run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolStatus {
    /// Process exited with this code.
    Exited(i32),
    /// Process was terminated by a signal.
    Signaled,
    /// Program not found on `PATH`.
    NotFound(String),
    /// Program found but could not be started or awaited, with the
    /// rendered [`Error::CommandFailed`].
    SpawnFailed(String),
    /// Killed after exceeding the configured timeout.
    TimedOut(Duration),
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolStatus::Exited(code) => write!(f, "exit code {code}"),
            ToolStatus::Signaled => f.write_str("terminated by signal"),
            ToolStatus::NotFound(program) => write!(f, "{program} not found"),
            ToolStatus::SpawnFailed(reason) => f.write_str(reason),
            ToolStatus::TimedOut(after) => write!(f, "timed out after {}s", after.as_secs()),
        }
    }
}

/// Captured result of one tool run.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    /// Shell-pasteable rendering of the command.
    pub command_line: String,
    /// Termination status.
    pub status: ToolStatus,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl ToolOutcome {
    /// Success means exit code 0 and nothing written to stderr.
    pub fn succeeded(&self) -> bool {
        self.status == ToolStatus::Exited(0) && self.stderr.trim().is_empty()
    }

    /// Human-readable failure description, `None` on success.
    pub fn failure_reason(&self) -> Option<String> {
        if self.succeeded() {
            return None;
        }
        let stderr = self.stderr.trim();
        Some(if stderr.is_empty() {
            self.status.to_string()
        } else {
            format!("{}: {}", self.status, stderr)
        })
    }
}

/// A program plus arguments.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ToolInvocation {
    /// Starts an invocation of `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Runs this invocation under `wrapper` (e.g. `fakeroot`) when given.
    pub fn wrapped(self, wrapper: Option<&Path>) -> Self {
        match wrapper {
            Some(wrapper) => {
                let mut args = Vec::with_capacity(self.args.len() + 1);
                args.push(self.program.into_os_string());
                args.extend(self.args);
                Self {
                    program: wrapper.to_path_buf(),
                    args,
                }
            }
            None => self,
        }
    }

    /// Command line with whitespace backslash-escaped.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|part| escape_whitespace(&part.to_string_lossy()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Runs the tool to completion, capturing its output.
    pub async fn run(&self, timeout: Option<Duration>) -> ToolOutcome {
        let command_line = self.command_line();
        let outcome = |status, stdout: &[u8], stderr: &[u8]| ToolOutcome {
            command_line: command_line.clone(),
            status,
            stdout: String::from_utf8_lossy(stdout).into_owned(),
            stderr: String::from_utf8_lossy(stderr).into_owned(),
        };

        let program = match which::which(&self.program) {
            Ok(path) => path,
            Err(e) => {
                log::debug!("{} lookup failed: {}", self.program.display(), e);
                return outcome(
                    ToolStatus::NotFound(self.program.display().to_string()),
                    b"",
                    b"",
                );
            }
        };

        log::debug!("Running {}", command_line);
        let child = tokio::process::Command::new(&program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();
        let child = match child {
            Ok(child) => child,
            Err(e) => return outcome(self.spawn_failed(e), b"", b""),
        };

        let waited = match timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result,
                Err(_) => return outcome(ToolStatus::TimedOut(limit), b"", b""),
            },
            None => child.wait_with_output().await,
        };

        match waited {
            Ok(output) => {
                let status = match output.status.code() {
                    Some(code) => ToolStatus::Exited(code),
                    None => ToolStatus::Signaled,
                };
                outcome(status, &output.stdout, &output.stderr)
            }
            Err(e) => outcome(self.spawn_failed(e), b"", b""),
        }
    }

    fn spawn_failed(&self, error: std::io::Error) -> ToolStatus {
        let error = Error::CommandFailed {
            command: self.program.display().to_string(),
            error,
        };
        ToolStatus::SpawnFailed(error.to_string())
    }
}

/// Backslash-escapes every whitespace character.
pub fn escape_whitespace(part: &str) -> String {
    let mut escaped = String::with_capacity(part.len());
    for c in part.chars() {
        if c.is_whitespace() {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_whitespace() {
        assert_eq!(escape_whitespace("/home/me/My App/tmp"), "/home/me/My\\ App/tmp");
        assert_eq!(escape_whitespace("plain"), "plain");
    }

    #[test]
    fn test_wrapped_prepends_wrapper() {
        let inv = ToolInvocation::new("dpkg-deb")
            .arg("-Zxz")
            .wrapped(Some(Path::new("fakeroot")));
        assert_eq!(inv.command_line(), "fakeroot dpkg-deb -Zxz");
    }

    #[test]
    fn test_command_line_escapes_each_argument() {
        let inv = ToolInvocation::new("rpmbuild")
            .arg("-D")
            .arg("_topdir /a b/tmp");
        assert_eq!(inv.command_line(), "rpmbuild -D _topdir\\ /a\\ b/tmp");
    }

    #[test]
    fn test_stderr_marks_failure() {
        let outcome = ToolOutcome {
            command_line: String::new(),
            status: ToolStatus::Exited(0),
            stdout: String::new(),
            stderr: "warning: something\n".into(),
        };
        assert!(!outcome.succeeded());
        assert_eq!(
            outcome.failure_reason().unwrap(),
            "exit code 0: warning: something"
        );
    }

    #[tokio::test]
    async fn test_missing_program_is_reported() {
        let outcome = ToolInvocation::new("definitely-not-a-real-packaging-tool")
            .run(None)
            .await;
        assert!(matches!(outcome.status, ToolStatus::NotFound(_)));
        assert!(!outcome.succeeded());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_code_and_output_are_captured() {
        let outcome = ToolInvocation::new("sh")
            .arg("-c")
            .arg("echo out; echo err >&2; exit 3")
            .run(None)
            .await;
        assert_eq!(outcome.status, ToolStatus::Exited(3));
        assert_eq!(outcome.stdout.trim(), "out");
        assert_eq!(outcome.stderr.trim(), "err");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unstartable_program_is_reported() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("rpmbuild");
        std::fs::write(&tool, "#!/no/such/interpreter\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let outcome = ToolInvocation::new(&tool).run(None).await;

        let ToolStatus::SpawnFailed(reason) = &outcome.status else {
            panic!("unexpected status {:?}", outcome.status);
        };
        assert!(reason.starts_with("could not start "), "{reason}");
        assert!(reason.contains("rpmbuild"));
        assert!(!outcome.succeeded());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_tool() {
        let outcome = ToolInvocation::new("sleep")
            .arg("5")
            .run(Some(Duration::from_millis(100)))
            .await;
        assert!(matches!(outcome.status, ToolStatus::TimedOut(_)));
    }
}
