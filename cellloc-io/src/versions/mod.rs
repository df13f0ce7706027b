//! 各版本标注文件格式与规范化文档之间的双向转换。
//!
//! 每个版本一个转换器，版本号以常量形式写在转换器内部；注册顺序见
//! [`builtin_converters`]（最新版本在前）。

mod fields;
mod markups;
mod splines;

use cellloc_core::document::{Annotation, CoordinateSystem, Document, ModelError, Point};
use cellloc_core::geometry::Point3;
use serde_json::Value;
use thiserror::Error;

pub use markups::{
    MarkupsV20200826, MarkupsV20200918, MarkupsV20210611, MarkupsV20210812, MarkupsV20220304,
};
pub use splines::{SplinesV20190126, SplinesV20200416};

#[derive(Debug, Error)]
pub enum ConvertError {
    /// 必需字段缺失或类型不符。版本推断依赖这一信号跳到下一个版本。
    #[error("schema mismatch: field `{field}` is missing or malformed")]
    SchemaMismatch { field: String },
    #[error("unrecognized {kind} value {value:?}")]
    InvalidValue { kind: &'static str, value: String },
    #[error("format {version} cannot represent {what}")]
    Unsupported { version: &'static str, what: String },
    #[error("invalid document: {0}")]
    Model(#[from] ModelError),
}

impl ConvertError {
    pub(crate) fn mismatch(field: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            field: field.into(),
        }
    }

    #[inline]
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, ConvertError::SchemaMismatch { .. })
    }
}

/// 单一版本的转换器：`normalize` 解析该版本 JSON，`specialize` 生成该版本 JSON。
pub trait Converter: Send + Sync {
    /// 完整版本号，例如 `v0.2.1+2022.03.04`。
    fn version(&self) -> &'static str;

    fn normalize(&self, data: &Value) -> Result<Document, ConvertError>;

    fn specialize(&self, document: &Document) -> Result<Value, ConvertError>;
}

/// 全部内建转换器，最新版本在前。
pub fn builtin_converters() -> Vec<Box<dyn Converter>> {
    vec![
        Box::new(MarkupsV20220304),
        Box::new(MarkupsV20210812),
        Box::new(MarkupsV20210611),
        Box::new(MarkupsV20200918),
        Box::new(MarkupsV20200826),
        Box::new(SplinesV20200416),
        Box::new(SplinesV20190126),
    ]
}

/// 写入文件 `version` 字段的值：去掉前导 `v`。
pub fn version_stamp(version: &str) -> &str {
    version.strip_prefix('v').unwrap_or(version)
}

/// 以 LPS 表示的点坐标。
pub(crate) fn lps_position(annotation: &Annotation, point: &Point) -> Point3 {
    match annotation.coordinate_system {
        CoordinateSystem::Lps => point.position(),
        CoordinateSystem::Ras => point.position().flip_xy(),
    }
}
