pub mod curve;
pub mod extrude;
pub mod stencil;
pub mod triangulate;

pub mod errors {
    use cellloc_core::geometry::GeometryError;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("{count} closed curves exceed the 255 labels an 8-bit labelmap can hold")]
        LabelOverflow { count: usize },
        #[error("labelmap export requires a reference atlas")]
        MissingAtlas,
        #[error("reference image frame is singular")]
        SingularFrame,
        #[error("reference image geometry is invalid: {0}")]
        Geometry(#[from] GeometryError),
    }
}

pub mod export {
    use cellloc_core::document::{Annotation, Document};
    use cellloc_core::geometry::{ImageGeometry, LabelVolume, Matrix4, Point3, TriangleMesh};
    use glam::DVec3;
    use tracing::{debug, info, warn};

    use crate::curve::sample_closed_curve;
    use crate::errors::EngineError;
    use crate::extrude::extrude_centered;
    use crate::stencil::paint_mesh;
    use crate::triangulate::triangulate_polygon;

    pub const DEFAULT_POINTS_PER_SEGMENT: usize = 32;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ExportOptions {
        /// 样条每段的采样数。
        pub points_per_segment: usize,
        /// 输出前施加 RAS → PIR 变换（旧版 CCF 标注）。
        pub pir: bool,
    }

    impl Default for ExportOptions {
        fn default() -> Self {
            Self {
                points_per_segment: DEFAULT_POINTS_PER_SEGMENT,
                pir: false,
            }
        }
    }

    /// 一条闭合曲线挤出的实体。退化曲线的网格为空，但仍占用标签号。
    #[derive(Debug, Clone, PartialEq)]
    pub struct AnnotationSolid {
        pub label: u8,
        pub name: String,
        pub mesh: TriangleMesh,
    }

    /// 把单条闭合曲线挤出为封闭网格；无法成形时返回空网格。
    pub fn build_solid(annotation: &Annotation, options: &ExportOptions) -> TriangleMesh {
        if annotation.points.len() < 3 {
            warn!(
                name = %annotation.name,
                points = annotation.points.len(),
                "控制点少于三个，跳过该标注"
            );
            return TriangleMesh::new();
        }
        let Some(direction) = annotation.plane_normal().normalize() else {
            warn!(name = %annotation.name, "姿态矩阵的法向长度为 0，跳过该标注");
            return TriangleMesh::new();
        };

        let points: Vec<DVec3> = annotation.positions().map(Point3::as_vec3).collect();
        let ring = sample_closed_curve(
            &points,
            annotation.representation_type,
            options.points_per_segment,
        );
        let triangles = triangulate_polygon(&ring);
        if triangles.is_empty() {
            warn!(name = %annotation.name, "轮廓退化，无法三角化");
            return TriangleMesh::new();
        }

        let offset = direction.scale(annotation.thickness).as_vec3();
        let mut mesh = extrude_centered(&ring, &triangles, offset);
        if options.pir {
            mesh.transform(Matrix4::ras_to_pir());
        }
        debug!(
            name = %annotation.name,
            vertices = mesh.vertex_count(),
            triangles = mesh.triangle_count(),
            "标注实体已生成"
        );
        mesh
    }

    /// 按文档顺序为每条闭合曲线生成实体，标签从 1 开始；点标注不参与。
    pub fn build_solids(document: &Document, options: &ExportOptions) -> Result<Vec<AnnotationSolid>, EngineError> {
        let count = document.closed_curves().count();
        if count > usize::from(u8::MAX) {
            return Err(EngineError::LabelOverflow { count });
        }
        let solids: Vec<AnnotationSolid> = document
            .closed_curves()
            .zip(1..=u8::MAX)
            .map(|(annotation, label)| AnnotationSolid {
                label,
                name: annotation.name.clone(),
                mesh: build_solid(annotation, options),
            })
            .collect();
        info!(
            curves = solids.len(),
            empty = solids.iter().filter(|solid| solid.mesh.is_empty()).count(),
            "标注实体构建完成"
        );
        Ok(solids)
    }

    /// 把全部实体合并为一个网格。
    pub fn merge_solids(solids: &[AnnotationSolid]) -> TriangleMesh {
        let mut merged = TriangleMesh::new();
        for solid in solids {
            merged.append(&solid.mesh);
        }
        merged
    }

    /// 在参考图像网格上体素化全部实体，后绘制的标签覆盖先前的。
    pub fn rasterize_solids(solids: &[AnnotationSolid], geometry: &ImageGeometry) -> Result<LabelVolume, EngineError> {
        let mut volume = LabelVolume::zeros(*geometry)?;
        for solid in solids {
            let painted = paint_mesh(&mut volume, &solid.mesh, solid.label)?;
            debug!(label = solid.label, name = %solid.name, painted, "标签已写入");
        }
        Ok(volume)
    }
}
