use std::io::{Read, Write};
use std::path::PathBuf;

use cellloc_core::document::Document;
use cellloc_core::geometry::ImageGeometry;
use cellloc_io::image::read_image_geometry;
use cellloc_io::{AnnotationFacade, DocumentLoader, DocumentSaver, IoError};
use tracing::info;

use crate::errors::FrontendError;

/// 命令行中代表标准输入输出的路径。
pub const STDIO_MARKER: &str = "-";

/// 文档来源，便于日志与错误信息指明出处。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    File(PathBuf),
    Stdin,
}

impl DocumentSource {
    pub fn from_arg(arg: &str) -> Self {
        if arg == STDIO_MARKER {
            Self::Stdin
        } else {
            Self::File(PathBuf::from(arg))
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Stdin => "<stdin>".to_string(),
        }
    }
}

/// 文档去向。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSink {
    File(PathBuf),
    Stdout,
}

impl DocumentSink {
    pub fn from_arg(arg: &str) -> Self {
        if arg == STDIO_MARKER {
            Self::Stdout
        } else {
            Self::File(PathBuf::from(arg))
        }
    }
}

/// 统一封装加载后的文档与元信息。
#[derive(Debug)]
pub struct LoadedDocument {
    pub document: Document,
    /// 解析时实际使用的版本。
    pub version: &'static str,
    pub source: DocumentSource,
}

/// 读取标注文档；`stdin` 只在来源为 `-` 时被读取。
pub fn load_document(
    facade: &AnnotationFacade<'_>,
    source: DocumentSource,
    stdin: impl Read,
) -> Result<LoadedDocument, FrontendError> {
    let (version, document) = match &source {
        DocumentSource::File(path) => facade.load(path)?,
        DocumentSource::Stdin => facade.read_from(stdin, &source.describe())?,
    };
    info!(
        source = %source.describe(),
        version,
        annotations = document.annotations.len(),
        "标注文档加载成功"
    );
    Ok(LoadedDocument {
        document,
        version,
        source,
    })
}

/// 按目标版本写出文档。
pub fn store_document(
    facade: &AnnotationFacade<'_>,
    document: &Document,
    sink: &DocumentSink,
    stdout: impl Write,
) -> Result<(), FrontendError> {
    match sink {
        DocumentSink::File(path) => facade.save(document, path)?,
        DocumentSink::Stdout => facade.write_to(document, stdout)?,
    }
    Ok(())
}

/// 读取参考图像的几何信息（只读头部）。
pub fn load_atlas(path: &std::path::Path) -> Result<ImageGeometry, FrontendError> {
    let geometry = read_image_geometry(path)?;
    info!(
        path = %path.display(),
        size = ?geometry.size,
        spacing = ?geometry.spacing.to_array(),
        "参考图像几何信息已读取"
    );
    Ok(geometry)
}

/// 向标准输出写一行。
pub(crate) fn print_line(mut out: impl Write, line: &str) -> Result<(), FrontendError> {
    writeln!(out, "{line}").map_err(|source| IoError::WriteError {
        path: PathBuf::from("<stdout>"),
        source,
    })?;
    Ok(())
}
