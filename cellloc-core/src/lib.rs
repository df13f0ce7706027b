pub mod geometry {
    use glam::{DMat3, DMat4, DVec3};
    use thiserror::Error;

    /// 三维点，内部以 `glam::DVec3` 表示，坐标一律使用双精度。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Point3(pub DVec3);

    impl Point3 {
        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn z(self) -> f64 {
            self.0.z
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }

        #[inline]
        pub fn to_array(self) -> [f64; 3] {
            self.0.to_array()
        }

        /// RAS 与 LPS 互换：前两个轴取反，第三个轴不变。
        #[inline]
        pub fn flip_xy(self) -> Self {
            Self::new(-self.0.x, -self.0.y, self.0.z)
        }
    }

    impl From<DVec3> for Point3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }

    impl From<[f64; 3]> for Point3 {
        fn from(value: [f64; 3]) -> Self {
            Self(DVec3::from_array(value))
        }
    }

    /// 三维向量，主要用于平面法向与挤出方向。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Vector3(pub DVec3);

    impl Vector3 {
        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        #[inline]
        pub fn normalize(self) -> Option<Self> {
            let len = self.0.length();
            if len <= f64::EPSILON {
                None
            } else {
                Some(Self(self.0 / len))
            }
        }

        #[inline]
        pub fn scale(self, factor: f64) -> Self {
            Self(self.0 * factor)
        }
    }

    impl From<DVec3> for Vector3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }

    /// 4×4 仿射矩阵。对外以行主序读写，内部交给 `glam::DMat4`（列主序）。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Matrix4(DMat4);

    impl Matrix4 {
        pub const IDENTITY: Self = Self(DMat4::IDENTITY);

        /// 由 16 个行主序元素构造。
        #[inline]
        pub fn from_row_major(values: &[f64; 16]) -> Self {
            Self(DMat4::from_cols_array(values).transpose())
        }

        #[inline]
        pub fn to_row_major(self) -> [f64; 16] {
            self.0.transpose().to_cols_array()
        }

        /// 由线性部分与平移部分组合：`p' = linear * p + translation`。
        pub fn from_linear_and_translation(linear: DMat3, translation: DVec3) -> Self {
            Self(DMat4::from_cols(
                linear.x_axis.extend(0.0),
                linear.y_axis.extend(0.0),
                linear.z_axis.extend(0.0),
                translation.extend(1.0),
            ))
        }

        /// 旧版 CCF 标注使用的 RAS → PIR 固定变换。
        pub fn ras_to_pir() -> Self {
            Self::from_row_major(&[
                0.0, 1.0, 0.0, 0.0, //
                0.0, 0.0, -1.0, 0.0, //
                -1.0, 0.0, 0.0, -1.0, //
                0.0, 0.0, 0.0, 1.0,
            ])
        }

        #[inline]
        pub fn transform_point(self, point: Point3) -> Point3 {
            Point3(self.0.transform_point3(point.0))
        }

        /// 返回第 `index` 列的前三个分量，即 `M * [e_index, 0]`。
        #[inline]
        pub fn column(self, index: usize) -> Vector3 {
            Vector3(self.0.col(index).truncate())
        }

        /// 行列式接近 0 时返回 `None`。
        pub fn inverse(self) -> Option<Self> {
            let det = self.0.determinant();
            if det.abs() <= f64::EPSILON {
                None
            } else {
                Some(Self(self.0.inverse()))
            }
        }
    }

    impl Default for Matrix4 {
        fn default() -> Self {
            Self::IDENTITY
        }
    }

    /// 轴对齐包围盒。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Bounds3D {
        min: Point3,
        max: Point3,
    }

    impl Bounds3D {
        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
                max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn include_point(&mut self, point: Point3) {
            self.min = Point3(self.min.0.min(point.0));
            self.max = Point3(self.max.0.max(point.0));
        }

        #[inline]
        pub fn min(&self) -> Point3 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point3 {
            self.max
        }
    }

    /// 三角网格。顶点按插入顺序编号，面片只引用本网格内的顶点。
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct TriangleMesh {
        vertices: Vec<Point3>,
        triangles: Vec<[u32; 3]>,
    }

    impl TriangleMesh {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn from_parts(vertices: Vec<Point3>, triangles: Vec<[u32; 3]>) -> Self {
            Self {
                vertices,
                triangles,
            }
        }

        #[inline]
        pub fn vertices(&self) -> &[Point3] {
            &self.vertices
        }

        #[inline]
        pub fn triangles(&self) -> &[[u32; 3]] {
            &self.triangles
        }

        #[inline]
        pub fn vertex_count(&self) -> usize {
            self.vertices.len()
        }

        #[inline]
        pub fn triangle_count(&self) -> usize {
            self.triangles.len()
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.triangles.is_empty()
        }

        pub fn push_vertex(&mut self, point: Point3) -> u32 {
            self.vertices.push(point);
            (self.vertices.len() - 1) as u32
        }

        pub fn push_triangle(&mut self, triangle: [u32; 3]) {
            self.triangles.push(triangle);
        }

        /// 追加另一网格，面片索引按当前顶点数偏移。
        pub fn append(&mut self, other: &TriangleMesh) {
            let offset = self.vertices.len() as u32;
            self.vertices.extend_from_slice(&other.vertices);
            self.triangles.extend(
                other
                    .triangles
                    .iter()
                    .map(|[a, b, c]| [a + offset, b + offset, c + offset]),
            );
        }

        /// 对所有顶点施加仿射变换。
        pub fn transform(&mut self, matrix: Matrix4) {
            for vertex in &mut self.vertices {
                *vertex = matrix.transform_point(*vertex);
            }
        }

        pub fn transformed(&self, matrix: Matrix4) -> Self {
            let mut mesh = self.clone();
            mesh.transform(matrix);
            mesh
        }

        pub fn bounds(&self) -> Option<Bounds3D> {
            if self.vertices.is_empty() {
                return None;
            }
            let mut bounds = Bounds3D::empty();
            for vertex in &self.vertices {
                bounds.include_point(*vertex);
            }
            Some(bounds)
        }
    }

    /// 参考图像的网格几何（LPS 物理空间）：尺寸、体素间距、原点与方向余弦。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct ImageGeometry {
        pub size: [usize; 3],
        pub spacing: DVec3,
        pub origin: DVec3,
        /// 列向量为各索引轴在物理空间中的单位方向。
        pub direction: DMat3,
    }

    impl ImageGeometry {
        pub fn new(size: [usize; 3], spacing: DVec3, origin: DVec3, direction: DMat3) -> Self {
            Self {
                size,
                spacing,
                origin,
                direction,
            }
        }

        /// 体素总数；乘积溢出 `usize` 时为 `None`。
        #[inline]
        pub fn voxel_count(&self) -> Option<usize> {
            self.size.iter().try_fold(1usize, |count, &axis| count.checked_mul(axis))
        }

        /// 校验尺寸与间距，返回体素总数。
        pub fn validate(&self) -> Result<usize, GeometryError> {
            if self.size.contains(&0) {
                return Err(GeometryError::EmptyAxis { size: self.size });
            }
            let count = self
                .voxel_count()
                .ok_or(GeometryError::VoxelCountOverflow { size: self.size })?;
            let spacing = self.spacing.to_array();
            if spacing.iter().any(|value| !value.is_finite() || *value <= 0.0) {
                return Err(GeometryError::InvalidSpacing { spacing });
            }
            if !self.origin.is_finite() || !self.direction.is_finite() {
                return Err(GeometryError::NonFiniteFrame);
            }
            Ok(count)
        }

        /// 体素中心的物理坐标。
        pub fn index_to_physical(&self, index: [usize; 3]) -> Point3 {
            let scaled = DVec3::new(index[0] as f64, index[1] as f64, index[2] as f64) * self.spacing;
            Point3(self.origin + self.direction * scaled)
        }

        /// 图像的"局部"坐标系（方向 + 原点，不含间距）。
        pub fn local_frame(&self) -> Matrix4 {
            Matrix4::from_linear_and_translation(self.direction, self.origin)
        }
    }

    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum GeometryError {
        #[error("image size {size:?} has an empty axis")]
        EmptyAxis { size: [usize; 3] },
        #[error("image size {size:?} overflows the addressable voxel count")]
        VoxelCountOverflow { size: [usize; 3] },
        #[error("voxel spacing {spacing:?} must be finite and positive")]
        InvalidSpacing { spacing: [f64; 3] },
        #[error("image origin or direction is not finite")]
        NonFiniteFrame,
    }

    /// 单通道 8 位标签体，x 变化最快。
    #[derive(Debug, Clone, PartialEq)]
    pub struct LabelVolume {
        geometry: ImageGeometry,
        voxels: Vec<u8>,
    }

    impl LabelVolume {
        /// 创建全 0 的标签体；几何无效时报错。
        pub fn zeros(geometry: ImageGeometry) -> Result<Self, GeometryError> {
            let count = geometry.validate()?;
            Ok(Self {
                voxels: vec![0; count],
                geometry,
            })
        }

        #[inline]
        pub fn geometry(&self) -> &ImageGeometry {
            &self.geometry
        }

        #[inline]
        pub fn voxels(&self) -> &[u8] {
            &self.voxels
        }

        #[inline]
        pub fn linear_index(&self, i: usize, j: usize, k: usize) -> usize {
            let [nx, ny, _] = self.geometry.size;
            i + nx * (j + ny * k)
        }

        #[inline]
        pub fn get(&self, i: usize, j: usize, k: usize) -> u8 {
            self.voxels[self.linear_index(i, j, k)]
        }

        #[inline]
        pub fn set(&mut self, i: usize, j: usize, k: usize, value: u8) {
            let index = self.linear_index(i, j, k);
            self.voxels[index] = value;
        }

        /// 体中出现的所有标签值（升序）。
        pub fn distinct_labels(&self) -> Vec<u8> {
            let mut seen = [false; 256];
            for value in &self.voxels {
                seen[*value as usize] = true;
            }
            (0..=255u8).filter(|value| seen[*value as usize]).collect()
        }

        pub fn count_label(&self, label: u8) -> usize {
            self.voxels.iter().filter(|value| **value == label).count()
        }
    }
}

pub mod document {
    use thiserror::Error;

    use crate::geometry::{Matrix4, Point3, Vector3};

    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum ModelError {
        #[error("current id {current_id} is out of range for {len} annotation(s)")]
        CurrentIdOutOfRange { current_id: usize, len: usize },
    }

    /// 图谱结构引用（点击处的解剖区域）。
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Structure {
        pub id: i64,
        pub acronym: String,
    }

    /// 控制点：LPS 坐标加可选的结构引用。构造后不可修改。
    #[derive(Debug, Clone, PartialEq)]
    pub struct Point {
        position: Point3,
        structure: Option<Structure>,
    }

    impl Point {
        pub fn new(position: Point3) -> Self {
            Self {
                position,
                structure: None,
            }
        }

        pub fn with_structure(position: Point3, structure: Option<Structure>) -> Self {
            Self {
                position,
                structure,
            }
        }

        #[inline]
        pub fn position(&self) -> Point3 {
            self.position
        }

        #[inline]
        pub fn structure(&self) -> Option<&Structure> {
            self.structure.as_ref()
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum MarkupType {
        #[default]
        ClosedCurve,
        Fiducial,
    }

    impl MarkupType {
        pub fn as_str(self) -> &'static str {
            match self {
                MarkupType::ClosedCurve => "ClosedCurve",
                MarkupType::Fiducial => "Fiducial",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            match value {
                "ClosedCurve" => Some(MarkupType::ClosedCurve),
                "Fiducial" => Some(MarkupType::Fiducial),
                _ => None,
            }
        }
    }

    /// 闭合曲线的插值方式。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum RepresentationType {
        #[default]
        Spline,
        Polyline,
    }

    impl RepresentationType {
        pub fn as_str(self) -> &'static str {
            match self {
                RepresentationType::Spline => "spline",
                RepresentationType::Polyline => "polyline",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            match value {
                "spline" => Some(RepresentationType::Spline),
                "polyline" => Some(RepresentationType::Polyline),
                _ => None,
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum CoordinateSystem {
        #[default]
        Lps,
        Ras,
    }

    impl CoordinateSystem {
        pub fn as_str(self) -> &'static str {
            match self {
                CoordinateSystem::Lps => "LPS",
                CoordinateSystem::Ras => "RAS",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            match value {
                "LPS" => Some(CoordinateSystem::Lps),
                "RAS" => Some(CoordinateSystem::Ras),
                _ => None,
            }
        }
    }

    /// 坐标单位：CCF 图谱使用微米，MNI 图谱使用毫米。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum CoordinateUnits {
        #[default]
        Micrometer,
        Millimeter,
    }

    impl CoordinateUnits {
        pub fn as_str(self) -> &'static str {
            match self {
                CoordinateUnits::Micrometer => "um",
                CoordinateUnits::Millimeter => "mm",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            match value {
                "um" => Some(CoordinateUnits::Micrometer),
                "mm" => Some(CoordinateUnits::Millimeter),
                _ => None,
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum ReferenceView {
        Axial,
        #[default]
        Coronal,
        Sagittal,
    }

    impl ReferenceView {
        pub fn as_str(self) -> &'static str {
            match self {
                ReferenceView::Axial => "Axial",
                ReferenceView::Coronal => "Coronal",
                ReferenceView::Sagittal => "Sagittal",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            match value {
                "Axial" => Some(ReferenceView::Axial),
                "Coronal" => Some(ReferenceView::Coronal),
                "Sagittal" => Some(ReferenceView::Sagittal),
                _ => None,
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum Ontology {
        #[default]
        Structure,
        Layer,
        None,
    }

    impl Ontology {
        pub fn as_str(self) -> &'static str {
            match self {
                Ontology::Structure => "Structure",
                Ontology::Layer => "Layer",
                Ontology::None => "None",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            match value {
                "Structure" => Some(Ontology::Structure),
                "Layer" => Some(Ontology::Layer),
                "None" => Some(Ontology::None),
                _ => None,
            }
        }
    }

    pub const DEFAULT_THICKNESS: f64 = 50.0;

    pub const DEFAULT_ORIENTATION: [f64; 16] = [
        1.0, 0.0, 0.0, 0.25, //
        0.0, 0.0, 1.0, -17.5, //
        0.0, 1.0, 0.0, 22.25, //
        0.0, 0.0, 0.0, 1.0,
    ];

    /// 单条标注（闭合曲线或点集）。
    #[derive(Debug, Clone, PartialEq)]
    pub struct Annotation {
        pub name: String,
        pub markup_type: MarkupType,
        pub representation_type: RepresentationType,
        pub thickness: f64,
        pub coordinate_system: CoordinateSystem,
        pub coordinate_units: CoordinateUnits,
        /// 绘制时切片平面的 4×4 姿态矩阵，行主序。
        pub orientation: [f64; 16],
        pub points: Vec<Point>,
    }

    impl Default for Annotation {
        fn default() -> Self {
            Self {
                name: String::new(),
                markup_type: MarkupType::default(),
                representation_type: RepresentationType::default(),
                thickness: DEFAULT_THICKNESS,
                coordinate_system: CoordinateSystem::default(),
                coordinate_units: CoordinateUnits::default(),
                orientation: DEFAULT_ORIENTATION,
                points: Vec::new(),
            }
        }
    }

    impl Annotation {
        #[inline]
        pub fn is_closed_curve(&self) -> bool {
            self.markup_type == MarkupType::ClosedCurve
        }

        #[inline]
        pub fn orientation_matrix(&self) -> Matrix4 {
            Matrix4::from_row_major(&self.orientation)
        }

        /// 平面法向：姿态矩阵第三列（未归一化）。
        #[inline]
        pub fn plane_normal(&self) -> Vector3 {
            self.orientation_matrix().column(2)
        }

        pub fn positions(&self) -> impl Iterator<Item = Point3> + '_ {
            self.points.iter().map(Point::position)
        }
    }

    pub const DEFAULT_STEP_SIZE: f64 = 0.5;
    pub const DEFAULT_CAMERA_POSITION: [f64; 3] = [51.6226, -631.3969, -605.9925];
    pub const DEFAULT_CAMERA_VIEW_UP: [f64; 3] = [-0.5686, -0.6042, 0.5582];

    /// 与版本无关的标注文档。
    #[derive(Debug, Clone, PartialEq)]
    pub struct Document {
        pub annotations: Vec<Annotation>,
        pub current_id: usize,
        pub reference_view: ReferenceView,
        pub ontology: Ontology,
        pub step_size: f64,
        pub camera_position: [f64; 3],
        pub camera_view_up: [f64; 3],
    }

    impl Default for Document {
        fn default() -> Self {
            Self {
                annotations: Vec::new(),
                current_id: 0,
                reference_view: ReferenceView::default(),
                ontology: Ontology::default(),
                step_size: DEFAULT_STEP_SIZE,
                camera_position: DEFAULT_CAMERA_POSITION,
                camera_view_up: DEFAULT_CAMERA_VIEW_UP,
            }
        }
    }

    impl Document {
        pub fn new() -> Self {
            Self::default()
        }

        /// 非空文档要求 `current_id` 落在标注范围内。
        pub fn validate(&self) -> Result<(), ModelError> {
            let len = self.annotations.len();
            if len > 0 && self.current_id >= len {
                return Err(ModelError::CurrentIdOutOfRange {
                    current_id: self.current_id,
                    len,
                });
            }
            Ok(())
        }

        pub fn current_annotation(&self) -> Option<&Annotation> {
            self.annotations.get(self.current_id)
        }

        pub fn closed_curves(&self) -> impl Iterator<Item = &Annotation> + '_ {
            self.annotations.iter().filter(|ann| ann.is_closed_curve())
        }
    }

}

#[cfg(test)]
mod tests {
    use super::geometry::*;
    use glam::{DMat3, DVec3};

    #[test]
    fn row_major_matrix_round_trips() {
        let values = [
            1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 0.0, 0.0, 0.0, 1.0,
        ];
        let matrix = Matrix4::from_row_major(&values);
        assert_eq!(matrix.to_row_major(), values);
        let col = matrix.column(2).as_vec3();
        assert_eq!(col, DVec3::new(3.0, 7.0, 11.0));
    }

    #[test]
    fn ras_to_pir_maps_axes() {
        let pir = Matrix4::ras_to_pir();
        let mapped = pir.transform_point(Point3::new(1.0, 2.0, 3.0));
        assert!((mapped.x() - 2.0).abs() < 1e-12);
        assert!((mapped.y() + 3.0).abs() < 1e-12);
        assert!((mapped.z() + 2.0).abs() < 1e-12);
    }

    #[test]
    fn inverse_of_singular_matrix_is_none() {
        let singular = Matrix4::from_row_major(&[0.0; 16]);
        assert!(singular.inverse().is_none());
        let frame = Matrix4::from_linear_and_translation(DMat3::IDENTITY, DVec3::new(1.0, 2.0, 3.0));
        let inverse = frame.inverse().expect("平移矩阵可逆");
        let back = inverse.transform_point(Point3::new(1.0, 2.0, 3.0));
        assert!(back.as_vec3().length() < 1e-12);
    }

    #[test]
    fn mesh_append_offsets_indices() {
        let mut a = TriangleMesh::from_parts(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        let b = a.clone();
        a.append(&b);
        assert_eq!(a.vertex_count(), 6);
        assert_eq!(a.triangles()[1], [3, 4, 5]);
        let bounds = a.bounds().expect("非空网格有包围盒");
        assert_eq!(bounds.max(), Point3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn flip_xy_negates_first_two_axes() {
        assert_eq!(Point3::new(1.0, 2.0, 3.0).flip_xy(), Point3::new(-1.0, -2.0, 3.0));
    }

    #[test]
    fn label_volume_indexing_is_x_fastest() {
        let geometry = ImageGeometry::new(
            [2, 3, 4],
            DVec3::ONE,
            DVec3::ZERO,
            DMat3::IDENTITY,
        );
        let mut volume = LabelVolume::zeros(geometry).unwrap();
        volume.set(1, 2, 3, 7);
        assert_eq!(volume.linear_index(1, 2, 3), 1 + 2 * (2 + 3 * 3));
        assert_eq!(volume.get(1, 2, 3), 7);
        assert_eq!(volume.distinct_labels(), vec![0, 7]);
        assert_eq!(volume.count_label(7), 1);
    }

    #[test]
    fn label_volume_rejects_unaddressable_geometry() {
        let huge = ImageGeometry::new([1 << 32; 3], DVec3::ONE, DVec3::ZERO, DMat3::IDENTITY);
        assert_eq!(huge.voxel_count(), None);
        assert_eq!(
            LabelVolume::zeros(huge),
            Err(GeometryError::VoxelCountOverflow { size: [1 << 32; 3] })
        );

        let flat = ImageGeometry::new([2, 2, 2], DVec3::new(1.0, 0.0, 1.0), DVec3::ZERO, DMat3::IDENTITY);
        assert!(matches!(
            LabelVolume::zeros(flat),
            Err(GeometryError::InvalidSpacing { .. })
        ));
        let empty = ImageGeometry::new([2, 0, 2], DVec3::ONE, DVec3::ZERO, DMat3::IDENTITY);
        assert!(matches!(
            LabelVolume::zeros(empty),
            Err(GeometryError::EmptyAxis { .. })
        ));
    }

    #[test]
    fn index_to_physical_applies_direction_and_spacing() {
        let direction = DMat3::from_cols(DVec3::NEG_X, DVec3::NEG_Y, DVec3::Z);
        let geometry = ImageGeometry::new(
            [4, 4, 4],
            DVec3::new(0.5, 0.25, 2.0),
            DVec3::new(10.0, 20.0, 30.0),
            direction,
        );
        let p = geometry.index_to_physical([2, 4, 1]);
        assert_eq!(p, Point3::new(9.0, 19.0, 32.0));
    }
}
