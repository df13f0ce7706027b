//! 版本注册表：按新旧顺序列出已知格式版本，并负责版本匹配与推断。

use std::collections::HashSet;

use cellloc_core::document::Document;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::versions::{self, ConvertError, Converter};

static VERSION_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^v\d+\.\d+\.\d+\+\d{4}\.\d{2}\.\d{2}$").expect("version id pattern is valid")
});

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("malformed version id {0:?} (expected v<semver>+<YYYY.MM.DD>)")]
    MalformedVersion(String),
    #[error("version {0:?} is registered twice")]
    DuplicateVersion(String),
    #[error("no converters registered")]
    Empty,
    #[error("no version matches {target:?}")]
    NoMatch { target: String },
    #[error("no converter can normalize the data")]
    NoConverter,
    #[error("conversion with {version} failed: {source}")]
    Convert {
        version: &'static str,
        #[source]
        source: ConvertError,
    },
}

/// 已知版本及其转换器，最新版本在前。
pub struct VersionRegistry {
    converters: Vec<Box<dyn Converter>>,
}

impl VersionRegistry {
    /// 注册全部内建版本。版本号不合法属于致命错误，不做静默跳过。
    pub fn new() -> Result<Self, RegistryError> {
        Self::from_converters(versions::builtin_converters())
    }

    /// 以给定顺序（最新在前）构造注册表。
    pub fn from_converters(converters: Vec<Box<dyn Converter>>) -> Result<Self, RegistryError> {
        if converters.is_empty() {
            return Err(RegistryError::Empty);
        }
        let mut seen = HashSet::new();
        for converter in &converters {
            let version = converter.version();
            if !VERSION_ID.is_match(version) {
                return Err(RegistryError::MalformedVersion(version.to_string()));
            }
            if !seen.insert(version) {
                return Err(RegistryError::DuplicateVersion(version.to_string()));
            }
        }
        Ok(Self { converters })
    }

    /// 全部版本号，最新在前。
    pub fn version_order(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.converters.iter().map(|converter| converter.version())
    }

    pub fn latest_version(&self) -> &'static str {
        // from_converters 保证非空
        self.converters[0].version()
    }

    /// 按完整版本号精确查找。
    pub fn converter(&self, version: &str) -> Option<&dyn Converter> {
        self.converters
            .iter()
            .find(|converter| converter.version() == version)
            .map(|converter| converter.as_ref())
    }

    /// 匹配 `target` 的版本，最新在前。
    ///
    /// 以 `d` 开头按日期匹配（`+<日期>`），否则按版本号匹配（`v<版本>`）；
    /// 空串匹配全部版本。匹配方式为子串包含。
    pub fn matches<'a>(&'a self, target: &str) -> impl Iterator<Item = &'static str> + use<'a> {
        self.matching_converters(target)
            .map(|converter| converter.version())
    }

    /// 最新的匹配版本及其转换器。
    pub fn find_latest(&self, target: &str) -> Result<(&'static str, &dyn Converter), RegistryError> {
        self.matching_converters(target)
            .next()
            .map(|converter| (converter.version(), converter))
            .ok_or_else(|| RegistryError::NoMatch {
                target: target.to_string(),
            })
    }

    /// 依次尝试各版本（最新在前），返回第一个能解析数据的版本。
    ///
    /// 只有格式不匹配会继续尝试下一个版本，其余错误立即返回。
    pub fn infer_normalize(&self, data: &Value) -> Result<(&'static str, Document), RegistryError> {
        for converter in self.matching_converters("") {
            let version = converter.version();
            match converter.normalize(data) {
                Ok(document) => {
                    debug!(version, "版本推断成功");
                    return Ok((version, document));
                }
                Err(err) if err.is_schema_mismatch() => {
                    debug!(version, error = %err, "格式不匹配，尝试下一个版本");
                }
                Err(source) => return Err(RegistryError::Convert { version, source }),
            }
        }
        Err(RegistryError::NoConverter)
    }

    /// 以匹配 `target` 的最新版本解析数据。
    pub fn normalize_as(&self, target: &str, data: &Value) -> Result<(&'static str, Document), RegistryError> {
        let (version, converter) = self.find_latest(target)?;
        let document = converter
            .normalize(data)
            .map_err(|source| RegistryError::Convert { version, source })?;
        Ok((version, document))
    }

    /// 以匹配 `target` 的最新版本输出文档。
    pub fn specialize_as(&self, target: &str, document: &Document) -> Result<(&'static str, Value), RegistryError> {
        let (version, converter) = self.find_latest(target)?;
        let value = converter
            .specialize(document)
            .map_err(|source| RegistryError::Convert { version, source })?;
        Ok((version, value))
    }

    fn matching_converters<'a>(&'a self, target: &str) -> impl Iterator<Item = &'a dyn Converter> + use<'a> {
        let key = match_key(target);
        self.converters
            .iter()
            .map(|converter| converter.as_ref())
            .filter(move |converter| converter.version().contains(key.as_str()))
    }
}

fn match_key(target: &str) -> String {
    let key = target.trim_start_matches(['v', 'd']);
    if target.starts_with('d') {
        format!("+{key}")
    } else {
        format!("v{key}")
    }
}
