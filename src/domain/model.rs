use crate::utils::error::{Result, TourError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::process::ExitStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamSource {
    Stdout,
    Stderr,
}

impl StreamSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamSource::Stdout => "stdout",
            StreamSource::Stderr => "stderr",
        }
    }
}

impl fmt::Display for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 子行程輸出的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub source: StreamSource,
    /// Lossy UTF-8 text without the line terminator.
    pub line: String,
    /// The bytes exactly as read, terminator included.
    pub raw: Vec<u8>,
}

/// Pipe 協調器的生命週期
///
/// `NotStarted -> Started -> StreamsDraining -> Exited -> Reaped`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeState {
    NotStarted,
    Started,
    StreamsDraining,
    Exited,
    Reaped,
}

impl PipeState {
    /// 只允許往下一個狀態前進，不能跳過
    pub fn can_advance_to(self, next: PipeState) -> bool {
        matches!(
            (self, next),
            (PipeState::NotStarted, PipeState::Started)
                | (PipeState::Started, PipeState::StreamsDraining)
                | (PipeState::StreamsDraining, PipeState::Exited)
                | (PipeState::Exited, PipeState::Reaped)
        )
    }
}

impl fmt::Display for PipeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipeState::NotStarted => "NotStarted",
            PipeState::Started => "Started",
            PipeState::StreamsDraining => "StreamsDraining",
            PipeState::Exited => "Exited",
            PipeState::Reaped => "Reaped",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Both streams in arrival order, only filled when combined capture is on.
    pub combined: Option<Vec<u8>>,
    pub status: ExitStatus,
}

impl CapturedOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.status.code()
    }

    /// 被 signal 終止時的 signal 編號（僅 unix）
    pub fn signal(&self) -> Option<i32> {
        exit_signal(&self.status)
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// 非零退出碼轉成 `TourError::ExitStatus`，成功則原樣回傳
    pub fn check(self) -> Result<Self> {
        if self.status.success() {
            return Ok(self);
        }
        Err(TourError::ExitStatus {
            code: self.status.code(),
            signal: exit_signal(&self.status),
            stderr: self.stderr_lossy(),
        })
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Directory,
    Symlink,
    NamedPipe,
    Other,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileKind::Regular => "regular file",
            FileKind::Directory => "directory",
            FileKind::Symlink => "symbolic link",
            FileKind::NamedPipe => "named pipe",
            FileKind::Other => "other",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipe_state_only_advances_one_step() {
        assert!(PipeState::NotStarted.can_advance_to(PipeState::Started));
        assert!(PipeState::Started.can_advance_to(PipeState::StreamsDraining));
        assert!(PipeState::StreamsDraining.can_advance_to(PipeState::Exited));
        assert!(PipeState::Exited.can_advance_to(PipeState::Reaped));

        assert!(!PipeState::Started.can_advance_to(PipeState::Exited));
        assert!(!PipeState::Started.can_advance_to(PipeState::Reaped));
        assert!(!PipeState::Reaped.can_advance_to(PipeState::NotStarted));
        assert!(!PipeState::Exited.can_advance_to(PipeState::StreamsDraining));
    }

    #[test]
    fn test_stream_source_serializes_lowercase() {
        let json = serde_json::to_string(&StreamSource::Stderr).unwrap();
        assert_eq!(json, "\"stderr\"");
    }
}
