//! 参考图谱几何的读取（NRRD / NIfTI 头）与标签体的 NRRD 输出。
//!
//! 只读取文件头：体素数据对标签体导出没有用处。所有几何统一换算到 LPS。

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use cellloc_core::geometry::{ImageGeometry, LabelVolume};
use flate2::Compression;
use flate2::write::GzEncoder;
use glam::{DMat3, DVec3};
use tracing::debug;

use crate::IoError;

/// 标签体 NRRD 的数据编码。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NrrdEncoding {
    Raw,
    #[default]
    Gzip,
}

impl NrrdEncoding {
    pub fn as_str(self) -> &'static str {
        match self {
            NrrdEncoding::Raw => "raw",
            NrrdEncoding::Gzip => "gzip",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "raw" => Some(NrrdEncoding::Raw),
            "gzip" | "gz" => Some(NrrdEncoding::Gzip),
            _ => None,
        }
    }
}

/// 按扩展名读取参考图像的几何信息。
pub fn read_image_geometry(path: &Path) -> Result<ImageGeometry, IoError> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let geometry = if name.ends_with(".nrrd") || name.ends_with(".nhdr") {
        read_nrrd_geometry(path)?
    } else if name.ends_with(".nii") || name.ends_with(".nii.gz") {
        read_nifti_geometry(path)?
    } else {
        return Err(IoError::UnsupportedFeature(format!(
            "无法识别的图像格式：{}",
            path.display()
        )));
    };
    debug!(
        path = %path.display(),
        size = ?geometry.size,
        spacing = ?geometry.spacing,
        "参考图像几何已读取"
    );
    Ok(geometry)
}

/// NRRD 的物理空间相对 LPS 需要取反的轴。
fn space_flips(space: &str, path: &Path) -> Result<DVec3, IoError> {
    match space {
        "left-posterior-superior" | "LPS" => Ok(DVec3::ONE),
        "right-anterior-superior" | "RAS" => Ok(DVec3::new(-1.0, -1.0, 1.0)),
        "left-anterior-superior" | "LAS" => Ok(DVec3::new(1.0, -1.0, 1.0)),
        other => Err(IoError::invalid_image(
            path,
            format!("不支持的 space：{other}"),
        )),
    }
}

pub fn read_nrrd_geometry(path: &Path) -> Result<ImageGeometry, IoError> {
    let file = fs::File::open(path).map_err(|source| IoError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);
    let mut fields = Vec::new();
    let mut line = Vec::new();
    let mut first = true;
    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .map_err(|source| IoError::ReadError {
                path: path.to_path_buf(),
                source,
            })?;
        if read == 0 {
            break;
        }
        let text = String::from_utf8_lossy(&line);
        let text = text.trim_end_matches(['\r', '\n']);
        if first {
            if !text.starts_with("NRRD") {
                return Err(IoError::invalid_image(path, "缺少 NRRD 魔数"));
            }
            first = false;
            continue;
        }
        // 头部以空行结束，之后是数据。
        if text.is_empty() {
            break;
        }
        if text.starts_with('#') || text.contains(":=") {
            continue;
        }
        if let Some((key, value)) = text.split_once(": ") {
            fields.push((key.trim().to_string(), value.trim().to_string()));
        }
    }
    if first {
        return Err(IoError::invalid_image(path, "文件为空"));
    }
    parse_nrrd_fields(&fields, path)
}

fn parse_nrrd_fields(fields: &[(String, String)], path: &Path) -> Result<ImageGeometry, IoError> {
    let lookup = |key: &str| lookup_field(fields, key);

    let dimension = lookup("dimension").ok_or_else(|| IoError::invalid_image(path, "缺少 dimension"))?;
    if dimension != "3" {
        return Err(IoError::invalid_image(
            path,
            format!("只支持三维图像，dimension 为 {dimension}"),
        ));
    }

    let sizes = lookup("sizes").ok_or_else(|| IoError::invalid_image(path, "缺少 sizes"))?;
    let sizes = sizes
        .split_whitespace()
        .map(|token| token.parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| IoError::invalid_image(path, format!("无法解析 sizes：{sizes}")))?;
    let size: [usize; 3] = sizes
        .try_into()
        .map_err(|_| IoError::invalid_image(path, "sizes 需要三个值"))?;

    let flips = match lookup("space") {
        Some(space) => space_flips(space, path)?,
        None => DVec3::ONE,
    };

    let (spacing, direction) = match lookup("space directions") {
        Some(directions) => {
            let vectors = parse_vectors(directions)
                .ok_or_else(|| IoError::invalid_image(path, format!("无法解析 space directions：{directions}")))?;
            let axes: [DVec3; 3] = vectors
                .try_into()
                .map_err(|_| IoError::invalid_image(path, "space directions 需要三个向量"))?;
            split_axes(axes.map(|axis| axis * flips), path)?
        }
        None => {
            let spacing = match lookup("spacings") {
                Some(spacings) => {
                    let values = spacings
                        .split_whitespace()
                        .map(|token| token.parse::<f64>())
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(|_| IoError::invalid_image(path, format!("无法解析 spacings：{spacings}")))?;
                    let values: [f64; 3] = values
                        .try_into()
                        .map_err(|_| IoError::invalid_image(path, "spacings 需要三个值"))?;
                    if values.iter().any(|value| !value.is_finite() || *value <= 0.0) {
                        return Err(IoError::invalid_image(
                            path,
                            format!("spacings 必须为正的有限值：{spacings}"),
                        ));
                    }
                    DVec3::from_array(values)
                }
                None => DVec3::ONE,
            };
            (spacing, DMat3::from_diagonal(flips))
        }
    };

    let origin = match lookup("space origin") {
        Some(origin) => {
            let vectors = parse_vectors(origin)
                .filter(|vectors| vectors.len() == 1)
                .ok_or_else(|| IoError::invalid_image(path, format!("无法解析 space origin：{origin}")))?;
            vectors[0] * flips
        }
        None => DVec3::ZERO,
    };

    validated(ImageGeometry::new(size, spacing, origin, direction), path)
}

/// 拒绝空轴、体素数溢出以及非有限或非正的间距。
fn validated(geometry: ImageGeometry, path: &Path) -> Result<ImageGeometry, IoError> {
    let voxels = geometry
        .validate()
        .map_err(|err| IoError::invalid_image(path, err.to_string()))?;
    debug!(path = %path.display(), voxels, "参考图像几何有效");
    Ok(geometry)
}

fn lookup_field<'a>(fields: &'a [(String, String)], key: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}

/// 解析 `(a,b,c) (d,e,f)` 形式的向量列表。
fn parse_vectors(text: &str) -> Option<Vec<DVec3>> {
    let mut vectors = Vec::new();
    for group in text.split(')') {
        let group = group.trim();
        if group.is_empty() {
            continue;
        }
        let inner = group.strip_prefix('(')?;
        let values = inner
            .split(',')
            .map(|token| token.trim().parse::<f64>().ok())
            .collect::<Option<Vec<_>>>()?;
        let [x, y, z] = values.as_slice() else {
            return None;
        };
        vectors.push(DVec3::new(*x, *y, *z));
    }
    Some(vectors)
}

/// 把带间距的轴向量拆成间距与单位方向。
fn split_axes(axes: [DVec3; 3], path: &Path) -> Result<(DVec3, DMat3), IoError> {
    let spacing = DVec3::new(axes[0].length(), axes[1].length(), axes[2].length());
    if !spacing.is_finite() || spacing.min_element() <= f64::EPSILON {
        return Err(IoError::invalid_image(path, format!("体素间距无效：{spacing}")));
    }
    let direction = DMat3::from_cols(
        axes[0] / spacing.x,
        axes[1] / spacing.y,
        axes[2] / spacing.z,
    );
    Ok((spacing, direction))
}

pub fn read_nifti_geometry(path: &Path) -> Result<ImageGeometry, IoError> {
    let header = nifti::NiftiHeader::from_file(path)
        .map_err(|err| IoError::invalid_image(path, format!("无法读取 NIfTI 头：{err}")))?;

    if header.dim[0] < 3 {
        return Err(IoError::invalid_image(
            path,
            format!("只支持三维图像，dim[0] 为 {}", header.dim[0]),
        ));
    }
    let size = [
        usize::from(header.dim[1]),
        usize::from(header.dim[2]),
        usize::from(header.dim[3]),
    ];

    let pixdim = header.pixdim.map(f64::from);
    // 行主序仿射（RAS）。
    let affine: [[f64; 4]; 3] = if header.sform_code > 0 {
        [
            header.srow_x.map(f64::from),
            header.srow_y.map(f64::from),
            header.srow_z.map(f64::from),
        ]
    } else if header.qform_code > 0 {
        let b = f64::from(header.quatern_b);
        let c = f64::from(header.quatern_c);
        let d = f64::from(header.quatern_d);
        let a = (1.0 - (b * b + c * c + d * d).min(1.0)).sqrt();
        let qfac = if pixdim[0] < 0.0 { -1.0 } else { 1.0 };
        let (dx, dy, dz) = (pixdim[1], pixdim[2], pixdim[3] * qfac);
        [
            [
                (a * a + b * b - c * c - d * d) * dx,
                (2.0 * b * c - 2.0 * a * d) * dy,
                (2.0 * b * d + 2.0 * a * c) * dz,
                f64::from(header.quatern_x),
            ],
            [
                (2.0 * b * c + 2.0 * a * d) * dx,
                (a * a + c * c - b * b - d * d) * dy,
                (2.0 * c * d - 2.0 * a * b) * dz,
                f64::from(header.quatern_y),
            ],
            [
                (2.0 * b * d - 2.0 * a * c) * dx,
                (2.0 * c * d + 2.0 * a * b) * dy,
                (a * a + d * d - c * c - b * b) * dz,
                f64::from(header.quatern_z),
            ],
        ]
    } else {
        [
            [pixdim[1], 0.0, 0.0, 0.0],
            [0.0, pixdim[2], 0.0, 0.0],
            [0.0, 0.0, pixdim[3], 0.0],
        ]
    };

    // NIfTI 为 RAS，前两行取反得到 LPS。
    let ras_to_lps = DVec3::new(-1.0, -1.0, 1.0);
    let column = |index: usize| {
        DVec3::new(affine[0][index], affine[1][index], affine[2][index]) * ras_to_lps
    };
    let (spacing, direction) = split_axes([column(0), column(1), column(2)], path)?;
    validated(ImageGeometry::new(size, spacing, column(3), direction), path)
}

fn format_vector(vector: DVec3) -> String {
    format!("({},{},{})", vector.x, vector.y, vector.z)
}

/// 写出 `unsigned char` 标签体 NRRD，空间为 LPS，必要时创建父目录。
pub fn write_nrrd_labelmap(path: &Path, volume: &LabelVolume, encoding: NrrdEncoding) -> Result<(), IoError> {
    let geometry = volume.geometry();
    let [nx, ny, nz] = geometry.size;
    let axes = [
        geometry.direction.x_axis * geometry.spacing.x,
        geometry.direction.y_axis * geometry.spacing.y,
        geometry.direction.z_axis * geometry.spacing.z,
    ];

    let mut header = String::new();
    header.push_str("NRRD0004\n");
    header.push_str("# Complete NRRD file format specification at:\n");
    header.push_str("# http://teem.sourceforge.net/nrrd/format.html\n");
    header.push_str("type: unsigned char\n");
    header.push_str("dimension: 3\n");
    header.push_str("space: left-posterior-superior\n");
    header.push_str(&format!("sizes: {nx} {ny} {nz}\n"));
    header.push_str(&format!(
        "space directions: {} {} {}\n",
        format_vector(axes[0]),
        format_vector(axes[1]),
        format_vector(axes[2])
    ));
    header.push_str("kinds: domain domain domain\n");
    header.push_str("endian: little\n");
    header.push_str(&format!("encoding: {}\n", encoding.as_str()));
    header.push_str(&format!("space origin: {}\n\n", format_vector(geometry.origin)));

    let write_err = |source| IoError::WriteError {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let mut file = std::io::BufWriter::new(fs::File::create(path).map_err(write_err)?);
    file.write_all(header.as_bytes()).map_err(write_err)?;
    match encoding {
        NrrdEncoding::Raw => file.write_all(volume.voxels()).map_err(write_err)?,
        NrrdEncoding::Gzip => {
            let mut encoder = GzEncoder::new(&mut file, Compression::default());
            encoder.write_all(volume.voxels()).map_err(write_err)?;
            encoder.finish().map_err(write_err)?;
        }
    }
    file.flush().map_err(write_err)?;
    debug!(path = %path.display(), encoding = encoding.as_str(), "标签体已写出");
    Ok(())
}
