use crate::core::ConfigProvider;
use crate::utils::error::{Result, TourError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TourConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub process: ProcessConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    pub files_root: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            files_root: None,
        }
    }
}

fn default_addr() -> String {
    DEFAULT_SERVER_ADDR.to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessConfig {
    pub timeout_seconds: Option<u64>,
    /// 額外傳給子行程的環境變數
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub verbose: bool,
    /// "compact" 或 "json"
    pub format: Option<String>,
}

impl TourConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(TourError::IoError)?;
        tracing::debug!("Loaded config from {}", path.as_ref().display());
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| TourError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換 `${VAR}`，找不到的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| TourError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_socket_addr("server.addr", &self.server.addr)?;

        if let Some(root) = &self.server.files_root {
            validation::validate_path("server.files_root", root)?;
        }

        if let Some(seconds) = self.process.timeout_seconds {
            validation::validate_range("process.timeout_seconds", seconds, 1, 86_400)?;
        }

        if let Some(format) = &self.logging.format {
            let valid_formats = ["compact", "json"];
            if !valid_formats.contains(&format.as_str()) {
                return Err(TourError::InvalidConfigValueError {
                    field: "logging.format".to_string(),
                    value: format.clone(),
                    reason: format!(
                        "Unsupported format. Valid formats: {}",
                        valid_formats.join(", ")
                    ),
                });
            }
        }

        for key in self.process.environment.keys() {
            validation::validate_non_empty_string("process.environment", key)?;
            if key.contains('=') {
                return Err(TourError::InvalidConfigValueError {
                    field: "process.environment".to_string(),
                    value: key.clone(),
                    reason: "Variable names cannot contain '='".to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn json_logs(&self) -> bool {
        self.logging.format.as_deref() == Some("json")
    }
}

impl ConfigProvider for TourConfig {
    fn server_addr(&self) -> &str {
        &self.server.addr
    }

    fn files_root(&self) -> Option<&str> {
        self.server.files_root.as_deref()
    }

    fn process_timeout(&self) -> Option<Duration> {
        self.process.timeout_seconds.map(Duration::from_secs)
    }

    fn verbose(&self) -> bool {
        self.logging.verbose
    }
}

impl Validate for TourConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[server]
addr = "0.0.0.0:9000"
files_root = "./public"

[process]
timeout_seconds = 30

[process.environment]
FOO = "bar"

[logging]
verbose = true
format = "json"
"#;

        let config = TourConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.server_addr(), "0.0.0.0:9000");
        assert_eq!(config.files_root(), Some("./public"));
        assert_eq!(config.process_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.process.environment.get("FOO").map(String::as_str), Some("bar"));
        assert!(config.verbose());
        assert!(config.json_logs());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = TourConfig::from_toml_str("").unwrap();

        assert_eq!(config.server_addr(), DEFAULT_SERVER_ADDR);
        assert_eq!(config.files_root(), None);
        assert_eq!(config.process_timeout(), None);
        assert!(!config.verbose());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("STDLIB_TOUR_TEST_FILES_ROOT", "/srv/static");

        let toml_content = r#"
[server]
files_root = "${STDLIB_TOUR_TEST_FILES_ROOT}"
addr = "${STDLIB_TOUR_TEST_UNDEFINED_ADDR}"
"#;

        let config = TourConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.files_root(), Some("/srv/static"));
        // 未設定的變數保持原樣，接著會被驗證擋下
        assert_eq!(config.server_addr(), "${STDLIB_TOUR_TEST_UNDEFINED_ADDR}");
        assert!(config.validate().is_err());

        std::env::remove_var("STDLIB_TOUR_TEST_FILES_ROOT");
    }

    #[test]
    fn test_config_validation() {
        let bad_timeout = TourConfig::from_toml_str("[process]\ntimeout_seconds = 0\n").unwrap();
        assert!(bad_timeout.validate().is_err());

        let bad_format = TourConfig::from_toml_str("[logging]\nformat = \"xml\"\n").unwrap();
        let err = bad_format.validate().unwrap_err();
        assert!(matches!(err, TourError::InvalidConfigValueError { .. }));
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let err = TourConfig::from_toml_str("[server\naddr = 1").unwrap_err();
        assert!(matches!(err, TourError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[server]
addr = "127.0.0.1:3000"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = TourConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.server_addr(), "127.0.0.1:3000");
    }
}
