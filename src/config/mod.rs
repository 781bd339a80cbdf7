#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::core::ConfigProvider;
use std::time::Duration;
use toml_config::TourConfig;

#[cfg(feature = "cli")]
pub use cli::{CliConfig, Commands};

/// 合併後的設定：命令列參數優先，其次是 TOML 檔，最後是預設值
#[derive(Debug, Clone)]
pub struct Settings {
    pub server_addr: String,
    pub files_root: Option<String>,
    pub process_timeout: Option<Duration>,
    pub verbose: bool,
    pub json_logs: bool,
    pub child_env: Vec<(String, String)>,
}

impl Settings {
    pub fn from_file(file: &TourConfig) -> Self {
        Self {
            server_addr: file.server_addr().to_string(),
            files_root: file.files_root().map(str::to_string),
            process_timeout: file.process_timeout(),
            verbose: file.verbose(),
            json_logs: file.json_logs(),
            child_env: file
                .process
                .environment
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    pub fn with_server_addr(mut self, addr: Option<String>) -> Self {
        if let Some(addr) = addr {
            self.server_addr = addr;
        }
        self
    }

    pub fn with_files_root(mut self, root: Option<String>) -> Self {
        if root.is_some() {
            self.files_root = root;
        }
        self
    }

    pub fn with_process_timeout(mut self, timeout: Option<Duration>) -> Self {
        if timeout.is_some() {
            self.process_timeout = timeout;
        }
        self
    }

    /// 旗標只能開啟，不能把檔案裡的 true 關掉
    pub fn with_flags(mut self, verbose: bool, json_logs: bool) -> Self {
        self.verbose |= verbose;
        self.json_logs |= json_logs;
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_file(&TourConfig::default())
    }
}

impl ConfigProvider for Settings {
    fn server_addr(&self) -> &str {
        &self.server_addr
    }

    fn files_root(&self) -> Option<&str> {
        self.files_root.as_deref()
    }

    fn process_timeout(&self) -> Option<Duration> {
        self.process_timeout
    }

    fn verbose(&self) -> bool {
        self.verbose
    }
}
