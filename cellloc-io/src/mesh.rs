//! 三角网格输出：VTK legacy ASCII POLYDATA（`.vtk`）与 Wavefront OBJ（`.obj`）。

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use cellloc_core::geometry::TriangleMesh;
use tracing::debug;

use crate::IoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    VtkLegacy,
    Obj,
}

impl MeshFormat {
    /// 由扩展名判断格式，未知扩展名返回 `None`。
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_string_lossy().to_ascii_lowercase();
        match extension.as_str() {
            "vtk" => Some(MeshFormat::VtkLegacy),
            "obj" => Some(MeshFormat::Obj),
            _ => None,
        }
    }
}

/// 按扩展名写出网格，必要时创建父目录。
pub fn write_mesh(path: &Path, mesh: &TriangleMesh) -> Result<(), IoError> {
    let format = MeshFormat::from_path(path).ok_or_else(|| {
        IoError::UnsupportedFeature(format!(
            "无法识别的模型格式：{}（支持 .vtk 与 .obj）",
            path.display()
        ))
    })?;

    let write_err = |source| IoError::WriteError {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let file = fs::File::create(path).map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    let written = match format {
        MeshFormat::VtkLegacy => write_vtk(&mut writer, mesh),
        MeshFormat::Obj => write_obj(&mut writer, mesh),
    };
    written.and_then(|_| writer.flush()).map_err(write_err)?;

    debug!(
        path = %path.display(),
        ?format,
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        "网格已写出"
    );
    Ok(())
}

pub fn write_vtk(writer: &mut impl Write, mesh: &TriangleMesh) -> std::io::Result<()> {
    writeln!(writer, "# vtk DataFile Version 4.2")?;
    writeln!(writer, "cellloc annotation model")?;
    writeln!(writer, "ASCII")?;
    writeln!(writer, "DATASET POLYDATA")?;
    writeln!(writer, "POINTS {} double", mesh.vertex_count())?;
    for vertex in mesh.vertices() {
        writeln!(writer, "{} {} {}", vertex.x(), vertex.y(), vertex.z())?;
    }
    let triangles = mesh.triangles();
    writeln!(writer, "POLYGONS {} {}", triangles.len(), triangles.len() * 4)?;
    for [a, b, c] in triangles {
        writeln!(writer, "3 {a} {b} {c}")?;
    }
    Ok(())
}

pub fn write_obj(writer: &mut impl Write, mesh: &TriangleMesh) -> std::io::Result<()> {
    for vertex in mesh.vertices() {
        writeln!(writer, "v {} {} {}", vertex.x(), vertex.y(), vertex.z())?;
    }
    // OBJ 索引从 1 开始。
    for [a, b, c] in mesh.triangles() {
        writeln!(writer, "f {} {} {}", a + 1, b + 1, c + 1)?;
    }
    Ok(())
}
