//! 平面轮廓沿法向挤出为封闭实体。

use cellloc_core::geometry::{Point3, TriangleMesh};
use glam::DVec3;

use crate::triangulate::newell_normal;

/// 以轮廓平面为中心，沿 `offset` 双向各挤出一半，生成带上下底面的封闭网格。
///
/// `triangles` 为轮廓的三角化结果（绕向与轮廓一致）。所有面片朝外。
pub fn extrude_centered(ring: &[DVec3], triangles: &[[usize; 3]], offset: DVec3) -> TriangleMesh {
    let n = ring.len();
    if n < 3 || triangles.is_empty() {
        return TriangleMesh::new();
    }

    let half = offset * 0.5;
    let mut mesh = TriangleMesh::new();
    for point in ring {
        mesh.push_vertex(Point3::from(*point - half));
    }
    for point in ring {
        mesh.push_vertex(Point3::from(*point + half));
    }

    let bottom = |index: usize| index as u32;
    let top = |index: usize| (index + n) as u32;
    // 轮廓绕向与挤出方向同侧时，原绕向的面朝 +offset。
    let aligned = newell_normal(ring).dot(offset) >= 0.0;

    for [a, b, c] in triangles {
        if aligned {
            mesh.push_triangle([top(*a), top(*b), top(*c)]);
            mesh.push_triangle([bottom(*a), bottom(*c), bottom(*b)]);
        } else {
            mesh.push_triangle([top(*a), top(*c), top(*b)]);
            mesh.push_triangle([bottom(*a), bottom(*b), bottom(*c)]);
        }
    }

    for i in 0..n {
        let j = (i + 1) % n;
        if aligned {
            mesh.push_triangle([bottom(i), bottom(j), top(j)]);
            mesh.push_triangle([bottom(i), top(j), top(i)]);
        } else {
            mesh.push_triangle([bottom(i), top(j), bottom(j)]);
            mesh.push_triangle([bottom(i), top(i), top(j)]);
        }
    }
    mesh
}
