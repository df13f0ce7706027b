use std::io::{Read, Write};
use std::path::PathBuf;

use cellloc_config::{AppConfig, LabelmapEncoding};
use cellloc_engine::errors::EngineError;
use cellloc_engine::export::{ExportOptions, build_solids, merge_solids, rasterize_solids};
use cellloc_io::image::{NrrdEncoding, write_nrrd_labelmap};
use cellloc_io::mesh::write_mesh;
use cellloc_io::{AnnotationFacade, VersionRegistry};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use crate::errors::FrontendError;
use crate::loader::{
    DocumentSink, DocumentSource, load_atlas, load_document, print_line, store_document,
};

/// Cell Locator 标注文件的版本转换与几何导出。
#[derive(Debug, Parser)]
#[command(name = "cellloc", version)]
pub struct Cli {
    /// 配置文件路径；缺省时依次查找 `CELLLOC_CONFIG` 与 `./config/default.toml`。
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// 日志过滤表达式，覆盖配置中的 `logging.level`。
    #[arg(long, global = true, value_name = "FILTER")]
    pub log_level: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// 在两个格式版本之间转换标注文件。
    Convert(ConvertArgs),
    /// 列出匹配的格式版本，最新在前。
    Versions(VersionsArgs),
    /// 推断标注文件的格式版本。
    Infer(InferArgs),
    /// 把闭合曲线导出为网格模型或标签体。
    Export(ExportArgs),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Convert(_) => "convert",
            Self::Versions(_) => "versions",
            Self::Infer(_) => "infer",
            Self::Export(_) => "export",
        }
    }
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// 输入文件，`-` 表示标准输入。
    pub src: String,
    /// 输出文件，`-` 表示标准输出。
    pub dst: String,
    /// 来源版本；`?` 或 `infer` 表示自动推断。
    #[arg(short = 'v', long = "source-version", value_name = "VERSION")]
    pub source_version: String,
    /// 目标版本，缺省为配置中的 `convert.default_target`（空串即最新版本）。
    #[arg(short = 't', long = "target", value_name = "VERSION")]
    pub target: Option<String>,
    #[arg(long)]
    pub no_indent: bool,
}

#[derive(Debug, Args)]
pub struct VersionsArgs {
    #[arg(default_value = "")]
    pub target: String,
}

#[derive(Debug, Args)]
pub struct InferArgs {
    pub src: String,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// 标注文件（任意已知版本）。
    pub annotation: String,
    /// 网格输出路径（`.vtk` 或 `.obj`）。
    #[arg(short = 'm', long = "model", value_name = "MODEL_PATH")]
    pub model: Option<PathBuf>,
    /// 标签体输出路径（NRRD），需要同时给出 `--atlas`。
    #[arg(short = 'l', long = "labelmap", value_name = "LABELMAP_PATH", requires = "atlas")]
    pub labelmap: Option<PathBuf>,
    /// 参考图像（NRRD 或 NIfTI），提供标签体的尺寸、间距与方向。
    #[arg(short = 'a', long = "atlas", value_name = "ATLAS_PATH")]
    pub atlas: Option<PathBuf>,
    /// 按旧版 CCF 标注处理：输出前施加 RAS → PIR 变换。
    #[arg(long)]
    pub pir: bool,
}

/// `?` 与 `infer`（不区分大小写）表示推断来源版本。
pub fn source_version(arg: &str) -> Option<String> {
    if arg == "?" || arg.eq_ignore_ascii_case("infer") {
        None
    } else {
        Some(arg.to_string())
    }
}

/// 执行一条子命令。标准输入只在路径为 `-` 时被读取。
pub fn run<R: Read, W: Write>(
    command: &Command,
    config: &AppConfig,
    stdin: R,
    stdout: W,
) -> Result<(), FrontendError> {
    let registry = VersionRegistry::new()?;
    match command {
        Command::Convert(args) => run_convert(&registry, args, config, stdin, stdout),
        Command::Versions(args) => run_versions(&registry, args, stdout),
        Command::Infer(args) => run_infer(&registry, args, stdin, stdout),
        Command::Export(args) => run_export(&registry, args, config, stdin),
    }
}

fn run_convert(
    registry: &VersionRegistry,
    args: &ConvertArgs,
    config: &AppConfig,
    stdin: impl Read,
    stdout: impl Write,
) -> Result<(), FrontendError> {
    let target = args
        .target
        .clone()
        .unwrap_or_else(|| config.convert.default_target.clone());
    // 目标版本不存在时尽早失败，不读取输入。
    let (target_version, _) = registry.find_latest(&target)?;
    let facade = AnnotationFacade::new(registry)
        .with_source(source_version(&args.source_version))
        .with_target(target)
        .with_indent(config.convert.indent && !args.no_indent);

    let loaded = load_document(&facade, DocumentSource::from_arg(&args.src), stdin)?;
    let sink = DocumentSink::from_arg(&args.dst);
    store_document(&facade, &loaded.document, &sink, stdout)?;
    info!(
        from = loaded.version,
        to = target_version,
        source = %loaded.source.describe(),
        "转换完成"
    );
    Ok(())
}

fn run_versions(
    registry: &VersionRegistry,
    args: &VersionsArgs,
    mut stdout: impl Write,
) -> Result<(), FrontendError> {
    let mut listed = 0usize;
    for version in registry.matches(&args.target) {
        print_line(&mut stdout, version)?;
        listed += 1;
    }
    if listed == 0 {
        warn!(target = %args.target, "没有匹配的版本");
    }
    Ok(())
}

fn run_infer(
    registry: &VersionRegistry,
    args: &InferArgs,
    stdin: impl Read,
    stdout: impl Write,
) -> Result<(), FrontendError> {
    let facade = AnnotationFacade::new(registry);
    let loaded = load_document(&facade, DocumentSource::from_arg(&args.src), stdin)?;
    print_line(stdout, loaded.version)
}

fn run_export(
    registry: &VersionRegistry,
    args: &ExportArgs,
    config: &AppConfig,
    stdin: impl Read,
) -> Result<(), FrontendError> {
    if args.labelmap.is_some() && args.atlas.is_none() {
        return Err(EngineError::MissingAtlas.into());
    }
    if args.model.is_none() && args.labelmap.is_none() {
        warn!("未指定 --model 或 --labelmap，不会生成任何输出");
    }
    let atlas = match (&args.labelmap, &args.atlas) {
        (Some(_), Some(path)) => Some(load_atlas(path)?),
        _ => None,
    };

    let facade = AnnotationFacade::new(registry);
    let loaded = load_document(&facade, DocumentSource::from_arg(&args.annotation), stdin)?;
    let options = ExportOptions {
        points_per_segment: config.export.points_per_segment,
        pir: args.pir,
    };
    let solids = build_solids(&loaded.document, &options)?;

    if let Some(path) = &args.model {
        let merged = merge_solids(&solids);
        write_mesh(path, &merged)?;
        info!(
            path = %path.display(),
            triangles = merged.triangle_count(),
            "网格模型已写出"
        );
    }
    if let (Some(path), Some(geometry)) = (&args.labelmap, atlas) {
        let volume = rasterize_solids(&solids, &geometry)?;
        write_nrrd_labelmap(path, &volume, nrrd_encoding(config.export.labelmap_encoding))?;
        info!(
            path = %path.display(),
            labels = volume.distinct_labels().len().saturating_sub(1),
            "标签体已写出"
        );
    }
    Ok(())
}

fn nrrd_encoding(encoding: LabelmapEncoding) -> NrrdEncoding {
    match encoding {
        LabelmapEncoding::Raw => NrrdEncoding::Raw,
        LabelmapEncoding::Gzip => NrrdEncoding::Gzip,
    }
}
