use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::FetchError;

const RSYNC_FLAGS: [&str; 4] = ["--copy-links", "--recursive", "--times", "--verbose"];

/// Result of one mirror invocation. Failures are data, not errors: one bad
/// assembly must not stop the rest of the run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MirrorOutcome {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl MirrorOutcome {
    pub fn failed(message: String) -> Self {
        Self {
            success: false,
            exit_code: None,
            stdout: String::new(),
            stderr: message,
        }
    }
}

pub trait Mirror {
    /// Checked once before the first assembly so a missing tool fails fast.
    fn ensure_ready(&self) -> Result<(), FetchError> {
        Ok(())
    }

    fn mirror(&self, source: &str, destination: &Path) -> MirrorOutcome;
}

#[derive(Debug, Clone)]
pub struct RsyncMirror {
    rsync: Option<PathBuf>,
}

impl RsyncMirror {
    pub fn new() -> Self {
        Self {
            rsync: find_in_path("rsync"),
        }
    }

    pub fn with_program(program: PathBuf) -> Self {
        Self {
            rsync: Some(program),
        }
    }

    pub fn require(&self) -> Result<&PathBuf, FetchError> {
        self.rsync
            .as_ref()
            .ok_or_else(|| FetchError::MissingTool("rsync".to_string()))
    }
}

impl Default for RsyncMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl Mirror for RsyncMirror {
    fn ensure_ready(&self) -> Result<(), FetchError> {
        self.require().map(|_| ())
    }

    fn mirror(&self, source: &str, destination: &Path) -> MirrorOutcome {
        let program = match self.require() {
            Ok(program) => program,
            Err(err) => return MirrorOutcome::failed(err.to_string()),
        };
        debug!(source, destination = %destination.display(), "running rsync");
        let output = Command::new(program)
            .args(RSYNC_FLAGS)
            .arg(source)
            .arg(destination)
            .output();
        let output = match output {
            Ok(output) => output,
            Err(err) => {
                warn!(source, error = %err, "failed to start rsync");
                return MirrorOutcome::failed(err.to_string());
            }
        };
        let outcome = MirrorOutcome {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if !outcome.success {
            warn!(source, exit_code = ?outcome.exit_code, "rsync exited with failure");
        }
        outcome
    }
}

/// Rewrites an assembly `ftp_path` to the rsync endpoint on the same host.
/// Newer reports publish `https://` paths, older ones `ftp://`.
pub fn rsync_url(ftp_path: &str) -> String {
    for scheme in ["ftp://", "https://", "http://"] {
        if let Some(rest) = ftp_path.strip_prefix(scheme) {
            return format!("rsync://{rest}");
        }
    }
    ftp_path.to_string()
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    find_in_dirs(name, std::env::split_paths(&path_var))
}

fn find_in_dirs(name: &str, dirs: impl IntoIterator<Item = PathBuf>) -> Option<PathBuf> {
    for dir in dirs {
        if cfg!(windows) {
            let exe = dir.join(format!("{name}.exe"));
            if exe.is_file() {
                return Some(exe);
            }
        }
        let plain = dir.join(name);
        if plain.is_file() {
            return Some(plain);
        }
    }
    None
}
