use std::fs;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use cellloc_core::document::Document;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

pub mod image;
pub mod mesh;
pub mod registry;
pub mod versions;

pub use registry::{RegistryError, VersionRegistry};
pub use versions::{ConvertError, Converter, version_stamp};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed JSON in {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid image {path:?}: {message}")]
    InvalidImage { path: PathBuf, message: String },
    #[error(transparent)]
    Conversion(#[from] RegistryError),
}

impl IoError {
    pub(crate) fn invalid_image(path: &Path, message: impl Into<String>) -> Self {
        Self::InvalidImage {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

/// 读取并解析 JSON 文件。
pub fn read_json(path: &Path) -> Result<Value, IoError> {
    let file = fs::File::open(path).map_err(|source| IoError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    parse_json(BufReader::new(file), &path.display().to_string())
}

/// 从任意输入流解析 JSON；`origin` 仅用于错误信息（例如 `<stdin>`）。
pub fn parse_json(reader: impl Read, origin: &str) -> Result<Value, IoError> {
    serde_json::from_reader(reader).map_err(|source| IoError::Json {
        origin: origin.to_string(),
        source,
    })
}

/// 序列化为字符串。`indent` 为真时使用两空格缩进。
pub fn to_json_string(value: &Value, indent: bool) -> Result<String, IoError> {
    let rendered = if indent {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    rendered.map_err(|source| IoError::Json {
        origin: "<output>".to_string(),
        source,
    })
}

/// 写出 JSON 文件，必要时创建父目录。
pub fn write_json(path: &Path, value: &Value, indent: bool) -> Result<(), IoError> {
    let text = to_json_string(value, indent)?;
    let write_err = |source| IoError::WriteError {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, text).map_err(write_err)
}

/// 读取标注文件，同时返回实际使用的版本号。
pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<(&'static str, Document), IoError>;
}

pub trait DocumentSaver {
    fn save(&self, document: &Document, path: &Path) -> Result<(), IoError>;
}

/// 标注文件的读写入口：按来源版本解析，按目标版本输出。
///
/// 来源版本为 `None` 时自动推断。
pub struct AnnotationFacade<'r> {
    registry: &'r VersionRegistry,
    source: Option<String>,
    target: String,
    indent: bool,
}

impl<'r> AnnotationFacade<'r> {
    /// 默认：推断来源版本，输出最新版本，带缩进。
    pub fn new(registry: &'r VersionRegistry) -> Self {
        Self {
            registry,
            source: None,
            target: String::new(),
            indent: true,
        }
    }

    pub fn with_source(mut self, source: Option<String>) -> Self {
        self.source = source;
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_indent(mut self, indent: bool) -> Self {
        self.indent = indent;
        self
    }

    /// 解析已读入的 JSON，返回实际使用的版本号与文档。
    pub fn normalize(&self, data: &Value) -> Result<(&'static str, Document), IoError> {
        let (version, document) = match self.source.as_deref() {
            Some(source) => self.registry.normalize_as(source, data)?,
            None => {
                let (version, document) = self.registry.infer_normalize(data)?;
                info!(version, "推断出来源版本");
                (version, document)
            }
        };
        debug!(
            version,
            annotations = document.annotations.len(),
            "标注文档已解析"
        );
        Ok((version, document))
    }

    /// 生成目标版本的 JSON，返回实际使用的版本号。
    pub fn specialize(&self, document: &Document) -> Result<(&'static str, Value), IoError> {
        let (version, value) = self.registry.specialize_as(&self.target, document)?;
        debug!(version, "标注文档已按目标版本生成");
        Ok((version, value))
    }

    pub fn read_from(&self, reader: impl Read, origin: &str) -> Result<(&'static str, Document), IoError> {
        let data = parse_json(reader, origin)?;
        self.normalize(&data)
    }

    pub fn write_to(&self, document: &Document, mut writer: impl Write) -> Result<(), IoError> {
        let (_, value) = self.specialize(document)?;
        let mut text = to_json_string(&value, self.indent)?;
        text.push('\n');
        writer
            .write_all(text.as_bytes())
            .and_then(|_| writer.flush())
            .map_err(|source| IoError::WriteError {
                path: PathBuf::from("<stdout>"),
                source,
            })
    }
}

impl DocumentLoader for AnnotationFacade<'_> {
    fn load(&self, path: &Path) -> Result<(&'static str, Document), IoError> {
        let data = read_json(path)?;
        self.normalize(&data)
    }
}

impl DocumentSaver for AnnotationFacade<'_> {
    fn save(&self, document: &Document, path: &Path) -> Result<(), IoError> {
        let (_, value) = self.specialize(document)?;
        write_json(path, &value, self.indent)
    }
}
