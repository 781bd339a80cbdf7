use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TourError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    HttpClientError(#[from] reqwest::Error),

    #[error("HTTP server error: {0}")]
    HttpServerError(#[from] hyper::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to launch '{program}': {source}")]
    LaunchError {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{}", describe_exit(.code, .signal))]
    ExitStatus {
        code: Option<i32>,
        signal: Option<i32>,
        stderr: String,
    },

    #[error("'{program}' did not finish within {after:?}")]
    Timeout { program: String, after: Duration },

    #[error("{stream} stream failed: {source}")]
    StreamError {
        stream: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("executable '{program}' not found in $PATH")]
    ProgramNotFound { program: String },

    #[error("{url} responded with status {status}")]
    HttpStatus { status: u16, url: String },

    #[error("invalid pipe state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },
}

fn describe_exit(code: &Option<i32>, signal: &Option<i32>) -> String {
    match (*code, *signal) {
        (Some(code), _) => format!("exit status {}", code),
        (None, Some(signal)) => format!("signal: {}", signal),
        (None, None) => "process terminated abnormally".to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl TourError {
    /// 依錯誤類型判斷嚴重程度，CLI 用來決定退出碼
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TourError::ExitStatus { .. } => ErrorSeverity::Low,
            TourError::Timeout { .. } | TourError::HttpStatus { .. } => ErrorSeverity::Medium,
            TourError::HttpClientError(_)
            | TourError::SerializationError(_)
            | TourError::StreamError { .. }
            | TourError::ProgramNotFound { .. }
            | TourError::LaunchError { .. } => ErrorSeverity::High,
            TourError::ConfigError { .. }
            | TourError::ConfigValidationError { .. }
            | TourError::InvalidConfigValueError { .. } => ErrorSeverity::High,
            TourError::IoError(_)
            | TourError::HttpServerError(_)
            | TourError::InvalidStateTransition { .. } => ErrorSeverity::Critical,
        }
    }

    /// 給終端使用者看的簡短訊息
    pub fn user_friendly_message(&self) -> String {
        match self {
            TourError::LaunchError { program, .. } => {
                format!("Could not start '{}'. Is it installed?", program)
            }
            TourError::ProgramNotFound { program } => {
                format!("'{}' is not on your PATH", program)
            }
            TourError::ExitStatus { stderr, .. } if !stderr.trim().is_empty() => {
                format!("{}: {}", self, stderr.trim())
            }
            TourError::Timeout { program, after } => {
                format!("'{}' was killed after {}s", program, after.as_secs_f64())
            }
            other => other.to_string(),
        }
    }

    /// 子行程的退出碼（只有 ExitStatus 才有）
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            TourError::ExitStatus { code, .. } => *code,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TourError>;
