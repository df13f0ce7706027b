use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 指向配置文件的环境变量。
pub const CONFIG_ENV: &str = "CELLLOC_CONFIG";

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub convert: ConvertConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 自动发现配置文件：优先读取环境变量 `CELLLOC_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// 显式路径优先，其余情况走 [`AppConfig::discover`]。
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => Self::discover(),
        }
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 版本转换的默认行为。
#[derive(Debug, Clone, Deserialize)]
pub struct ConvertConfig {
    /// 输出 JSON 是否缩进；命令行 `--no-indent` 可覆盖。
    #[serde(default = "ConvertConfig::default_indent")]
    pub indent: bool,
    /// 未指定 `-t` 时使用的目标版本，空串表示最新版本。
    #[serde(default)]
    pub default_target: String,
}

impl ConvertConfig {
    fn default_indent() -> bool {
        true
    }
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            indent: Self::default_indent(),
            default_target: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelmapEncoding {
    Raw,
    #[default]
    #[serde(alias = "gz")]
    Gzip,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "ExportConfig::default_points_per_segment")]
    pub points_per_segment: usize,
    #[serde(default)]
    pub labelmap_encoding: LabelmapEncoding,
}

impl ExportConfig {
    fn default_points_per_segment() -> usize {
        32
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            points_per_segment: Self::default_points_per_segment(),
            labelmap_encoding: LabelmapEncoding::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_cover_every_section() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.convert.indent);
        assert!(cfg.convert.default_target.is_empty());
        assert_eq!(cfg.export.points_per_segment, 32);
        assert_eq!(cfg.export.labelmap_encoding, LabelmapEncoding::Gzip);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let cfg = AppConfig::from_toml_str("[convert]\nindent = false\n").unwrap();
        assert!(!cfg.convert.indent);
        assert!(cfg.convert.default_target.is_empty());
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.export.points_per_segment, 32);
    }

    #[test]
    fn load_from_temp_file() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(
            file,
            r#"
            [logging]
            level = "debug"

            [convert]
            indent = false
            default_target = "0.1.1"

            [export]
            points_per_segment = 8
            labelmap_encoding = "raw"
            "#
        )
        .unwrap();

        let cfg = AppConfig::load(Some(file.path())).expect("load config");
        assert_eq!(cfg.logging.level, "debug");
        assert!(!cfg.convert.indent);
        assert_eq!(cfg.convert.default_target, "0.1.1");
        assert_eq!(cfg.export.points_per_segment, 8);
        assert_eq!(cfg.export.labelmap_encoding, LabelmapEncoding::Raw);
    }

    #[test]
    fn unknown_encoding_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(file, "[export]\nlabelmap_encoding = \"bzip2\"").unwrap();
        let err = AppConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_explicit_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let err = AppConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
