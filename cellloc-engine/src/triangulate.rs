//! 平面（近似平面）简单多边形的耳切三角化。

use glam::{DVec2, DVec3};

/// Newell 法向，长度为多边形面积的两倍。
pub fn newell_normal(points: &[DVec3]) -> DVec3 {
    let n = points.len();
    let mut normal = DVec3::ZERO;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        normal.x += (a.y - b.y) * (a.z + b.z);
        normal.y += (a.z - b.z) * (a.x + b.x);
        normal.z += (a.x - b.x) * (a.y + b.y);
    }
    normal
}

/// 三角化闭合多边形，返回顶点下标三元组。
///
/// 三角形绕向与多边形 Newell 法向一致。面积为 0 的多边形与少于三个点的输入
/// 返回空列表；共线顶点直接剔除，不生成退化三角形。
pub fn triangulate_polygon(points: &[DVec3]) -> Vec<[usize; 3]> {
    if points.len() < 3 {
        return Vec::new();
    }
    let normal = newell_normal(points);
    let scale = bounding_extent(points);
    if normal.length() <= scale * scale * 1e-12 {
        return Vec::new();
    }
    let projected = project(points, normal);
    ear_clip(&projected, scale * scale * 1e-12)
}

fn bounding_extent(points: &[DVec3]) -> f64 {
    let (min, max) = points.iter().fold(
        (DVec3::splat(f64::INFINITY), DVec3::splat(f64::NEG_INFINITY)),
        |(min, max), point| (min.min(*point), max.max(*point)),
    );
    (max - min).length()
}

/// 丢弃法向最大分量所在轴投影到二维，并保证投影后为逆时针。
fn project(points: &[DVec3], normal: DVec3) -> Vec<DVec2> {
    let abs = normal.abs();
    let (axis_u, axis_v, positive) = if abs.z >= abs.x && abs.z >= abs.y {
        (0, 1, normal.z > 0.0)
    } else if abs.x >= abs.y {
        (1, 2, normal.x > 0.0)
    } else {
        (2, 0, normal.y > 0.0)
    };
    points
        .iter()
        .map(|point| {
            let (u, v) = (point[axis_u], point[axis_v]);
            if positive { DVec2::new(u, v) } else { DVec2::new(v, u) }
        })
        .collect()
}

#[inline]
fn orient(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    (b - a).perp_dot(c - a)
}

fn contains(a: DVec2, b: DVec2, c: DVec2, point: DVec2) -> bool {
    orient(a, b, point) >= 0.0 && orient(b, c, point) >= 0.0 && orient(c, a, point) >= 0.0
}

fn ear_clip(points: &[DVec2], epsilon: f64) -> Vec<[usize; 3]> {
    let mut ring: Vec<usize> = (0..points.len()).collect();
    let mut triangles = Vec::with_capacity(points.len().saturating_sub(2));
    let mut cursor = 0;
    let mut misses = 0;

    while ring.len() > 3 {
        let len = ring.len();
        cursor %= len;
        let prev = ring[(cursor + len - 1) % len];
        let current = ring[cursor];
        let next = ring[(cursor + 1) % len];
        let turn = orient(points[prev], points[current], points[next]);

        if turn.abs() <= epsilon {
            // 共线或回折顶点，去掉不影响面积。
            ring.remove(cursor);
            misses = 0;
            continue;
        }
        if turn > 0.0 && is_ear(points, &ring, cursor) {
            triangles.push([prev, current, next]);
            ring.remove(cursor);
            misses = 0;
            continue;
        }

        cursor += 1;
        misses += 1;
        if misses >= len {
            // 数值误差导致找不到耳朵时，退而切掉任一凸顶点。
            let Some(convex) = (0..len).find(|&index| {
                let p = ring[(index + len - 1) % len];
                let n = ring[(index + 1) % len];
                orient(points[p], points[ring[index]], points[n]) > 0.0
            }) else {
                break;
            };
            let p = ring[(convex + len - 1) % len];
            let n = ring[(convex + 1) % len];
            triangles.push([p, ring[convex], n]);
            ring.remove(convex);
            cursor = convex;
            misses = 0;
        }
    }

    if let [a, b, c] = ring[..] {
        if orient(points[a], points[b], points[c]) > epsilon {
            triangles.push([a, b, c]);
        }
    }
    triangles
}

/// 只有凹顶点可能落在候选耳朵内部。
fn is_ear(points: &[DVec2], ring: &[usize], cursor: usize) -> bool {
    let len = ring.len();
    let prev = ring[(cursor + len - 1) % len];
    let current = ring[cursor];
    let next = ring[(cursor + 1) % len];
    let (a, b, c) = (points[prev], points[current], points[next]);

    for offset in 2..len - 1 {
        let index = (cursor + offset) % len;
        let vertex = ring[index];
        let candidate = points[vertex];
        if candidate == a || candidate == b || candidate == c {
            continue;
        }
        let before = points[ring[(index + len - 1) % len]];
        let after = points[ring[(index + 1) % len]];
        let reflex = orient(before, candidate, after) <= 0.0;
        if reflex && contains(a, b, c, candidate) {
            return false;
        }
    }
    true
}
