use crate::utils::error::{Result, TourError};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// 要執行的外部指令描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Applied in order, so a repeated key keeps its last value.
    pub env: Vec<(String, String)>,
    pub env_clear: bool,
    pub current_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub combined: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            env_clear: false,
            current_dir: None,
            timeout: None,
            combined: false,
        }
    }

    /// `sh -c <script>` 的捷徑
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("sh").arg("-c").arg(script)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn env_clear(mut self) -> Self {
        self.env_clear = true;
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn combined(mut self, combined: bool) -> Self {
        self.combined = combined;
        self
    }

    /// 給日誌用的可讀字串
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// 建立三個 pipe 都接好的 tokio Command
    pub(crate) fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if self.env_clear {
            cmd.env_clear();
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

/// 在 `PATH` 中尋找可執行檔
pub fn look_path(program: &str) -> Result<PathBuf> {
    if program.contains('/') {
        let candidate = PathBuf::from(program);
        return if is_executable(&candidate) {
            Ok(candidate)
        } else {
            Err(TourError::ProgramNotFound {
                program: program.to_string(),
            })
        };
    }

    let path_var = std::env::var_os("PATH").unwrap_or_default();
    for dir in std::env::split_paths(&path_var) {
        // 空的 PATH 項目代表目前目錄
        let dir = if dir.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            dir
        };
        let candidate = dir.join(program);
        if is_executable(&candidate) {
            tracing::debug!("Resolved {} to {}", program, candidate.display());
            return Ok(candidate);
        }
    }

    Err(TourError::ProgramNotFound {
        program: program.to_string(),
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_args_and_env() {
        let spec = CommandSpec::new("tr")
            .args(["a-z", "A-Z"])
            .env("FOO", "duplicate_value")
            .env("FOO", "actual_value")
            .timeout(Duration::from_secs(2));

        assert_eq!(spec.display(), "tr a-z A-Z");
        assert_eq!(spec.env.len(), 2);
        assert_eq!(spec.env.last().unwrap().1, "actual_value");
        assert_eq!(spec.timeout, Some(Duration::from_secs(2)));
        assert!(!spec.combined);
    }

    #[test]
    fn test_shell_shortcut() {
        let spec = CommandSpec::shell("echo hi");
        assert_eq!(spec.program, "sh");
        assert_eq!(spec.args, vec!["-c", "echo hi"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_look_path_finds_sh() {
        let path = look_path("sh").unwrap();
        assert!(path.ends_with("sh"));
    }

    #[test]
    fn test_look_path_missing_program() {
        let err = look_path("definitely-not-a-real-program-xyz").unwrap_err();
        assert!(matches!(err, TourError::ProgramNotFound { .. }));
    }

    #[test]
    fn test_look_path_with_slash_checks_directly() {
        let err = look_path("./no/such/binary").unwrap_err();
        assert!(matches!(err, TourError::ProgramNotFound { .. }));
    }
}
