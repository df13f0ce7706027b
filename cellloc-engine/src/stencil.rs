//! 封闭网格的体素化：沿 x 方向的扫描线按奇偶规则判断体素中心是否在内部。

use cellloc_core::geometry::{ImageGeometry, LabelVolume, Point3, TriangleMesh};
use glam::DVec2;

use crate::errors::EngineError;

/// 把网格中心落在内部的体素写为 `label`，返回写入的体素数。
///
/// 网格先用图像局部坐标系（方向与原点）的逆变换变到图像空间，体素中心位于
/// `index * spacing`。
pub fn paint_mesh(volume: &mut LabelVolume, mesh: &TriangleMesh, label: u8) -> Result<usize, EngineError> {
    if mesh.is_empty() {
        return Ok(0);
    }
    let geometry = *volume.geometry();
    let to_local = geometry
        .local_frame()
        .inverse()
        .ok_or(EngineError::SingularFrame)?;
    let local = mesh.transformed(to_local);
    let mut painted = 0;
    for (j, k, i_range) in covered_runs(&local, &geometry) {
        for i in i_range {
            volume.set(i, j, k, label);
            painted += 1;
        }
    }
    Ok(painted)
}

/// 网格在图像空间中覆盖的体素行：`(j, k, i 范围)`。
fn covered_runs(mesh: &TriangleMesh, geometry: &ImageGeometry) -> Vec<(usize, usize, std::ops::Range<usize>)> {
    let [nx, ny, nz] = geometry.size;
    let spacing = geometry.spacing;
    let Some(bounds) = mesh.bounds() else {
        return Vec::new();
    };
    let Some((j_first, j_last)) = index_range(bounds.min().y(), bounds.max().y(), spacing.y, ny) else {
        return Vec::new();
    };
    let Some((k_first, k_last)) = index_range(bounds.min().z(), bounds.max().z(), spacing.z, nz) else {
        return Vec::new();
    };

    let rows_y = j_last - j_first + 1;
    let mut intercepts: Vec<Vec<f64>> = vec![Vec::new(); rows_y * (k_last - k_first + 1)];
    let vertices = mesh.vertices();

    for [a, b, c] in mesh.triangles() {
        let (a, b, c) = (
            vertices[*a as usize],
            vertices[*b as usize],
            vertices[*c as usize],
        );
        let Some(projected) = ProjectedTriangle::new(a, b, c) else {
            continue;
        };
        let (lo, hi) = projected.bounds();
        let Some((tj_first, tj_last)) = index_range(lo.x, hi.x, spacing.y, ny) else {
            continue;
        };
        let Some((tk_first, tk_last)) = index_range(lo.y, hi.y, spacing.z, nz) else {
            continue;
        };
        for k in tk_first..=tk_last {
            for j in tj_first..=tj_last {
                let sample = DVec2::new(j as f64 * spacing.y, k as f64 * spacing.z);
                if let Some(x) = projected.intercept(sample) {
                    let row = (j - j_first) + rows_y * (k - k_first);
                    intercepts[row].push(x);
                }
            }
        }
    }

    let mut runs = Vec::new();
    for (row, xs) in intercepts.iter_mut().enumerate() {
        if xs.len() < 2 {
            continue;
        }
        xs.sort_by(f64::total_cmp);
        let j = j_first + row % rows_y;
        let k = k_first + row / rows_y;
        for pair in xs.chunks_exact(2) {
            // 体素中心满足 x0 <= i * sx < x1 时在内部。
            let start = (pair[0] / spacing.x).ceil().max(0.0);
            let end = (pair[1] / spacing.x).ceil().min(nx as f64);
            if start < end {
                runs.push((j, k, start as usize..end as usize));
            }
        }
    }
    runs
}

/// `[lo, hi]` 内体素中心的首末下标（闭区间，按图像尺寸截断）。
fn index_range(lo: f64, hi: f64, step: f64, count: usize) -> Option<(usize, usize)> {
    if count == 0 {
        return None;
    }
    let first = (lo / step).ceil().max(0.0);
    let last = (hi / step).floor().min((count - 1) as f64);
    if first > last {
        return None;
    }
    Some((first as usize, last as usize))
}

/// 投影到 y-z 平面的三角形，统一为逆时针。
struct ProjectedTriangle {
    vertices: [DVec2; 3],
    depths: [f64; 3],
    area: f64,
}

impl ProjectedTriangle {
    fn new(a: Point3, b: Point3, c: Point3) -> Option<Self> {
        let project = |point: Point3| DVec2::new(point.y(), point.z());
        let (mut pb, mut pc) = (project(b), project(c));
        let pa = project(a);
        let (mut xb, mut xc) = (b.x(), c.x());
        let mut area = (pb - pa).perp_dot(pc - pa);
        if area == 0.0 {
            return None;
        }
        if area < 0.0 {
            std::mem::swap(&mut pb, &mut pc);
            std::mem::swap(&mut xb, &mut xc);
            area = -area;
        }
        Some(Self {
            vertices: [pa, pb, pc],
            depths: [a.x(), xb, xc],
            area,
        })
    }

    fn bounds(&self) -> (DVec2, DVec2) {
        let [a, b, c] = self.vertices;
        (a.min(b).min(c), a.max(b).max(c))
    }

    /// 采样点落在三角形内（含其拥有的边）时返回交点的 x 坐标。
    fn intercept(&self, sample: DVec2) -> Option<f64> {
        let [a, b, c] = self.vertices;
        let w_a = edge_weight(b, c, sample)?;
        let w_b = edge_weight(c, a, sample)?;
        let w_c = edge_weight(a, b, sample)?;
        let [xa, xb, xc] = self.depths;
        Some((w_a * xa + w_b * xb + w_c * xc) / self.area)
    }
}

/// 边函数；点恰在边上时只有"拥有"该边的一侧算作内部，使相邻三角形不重复计数。
fn edge_weight(from: DVec2, to: DVec2, sample: DVec2) -> Option<f64> {
    let value = (to - from).perp_dot(sample - from);
    if value > 0.0 || (value == 0.0 && owns_edge(from, to)) {
        Some(value)
    } else {
        None
    }
}

#[inline]
fn owns_edge(from: DVec2, to: DVec2) -> bool {
    to.y > from.y || (to.y == from.y && to.x < from.x)
}
