//! 闭合曲线采样：周期三次样条（弦长参数化）或直线段。

use std::ops::{Div, Mul, Sub};

use cellloc_core::document::RepresentationType;
use glam::DVec3;

/// 相邻点距离不超过该值视为重复点。
const DUPLICATE_TOLERANCE: f64 = 1e-9;

/// 去掉相邻重复点（包括首尾相接处）。
pub fn dedup_closed(points: &[DVec3]) -> Vec<DVec3> {
    let mut out: Vec<DVec3> = Vec::with_capacity(points.len());
    for point in points {
        if out
            .last()
            .is_none_or(|last| last.distance(*point) > DUPLICATE_TOLERANCE)
        {
            out.push(*point);
        }
    }
    while out.len() > 1 {
        let (first, last) = (out[0], out[out.len() - 1]);
        if first.distance(last) > DUPLICATE_TOLERANCE {
            break;
        }
        out.pop();
    }
    out
}

/// 生成闭合曲线的采样点（不重复首点）。
///
/// `spline` 在每段控制点之间插入 `points_per_segment` 个采样；`polyline` 直接返回控制点。
pub fn sample_closed_curve(
    points: &[DVec3],
    representation: RepresentationType,
    points_per_segment: usize,
) -> Vec<DVec3> {
    let points = dedup_closed(points);
    match representation {
        RepresentationType::Polyline => points,
        RepresentationType::Spline if points.len() < 3 => points,
        RepresentationType::Spline => {
            ClosedSpline::new(&points).sample(points_per_segment.max(1))
        }
    }
}

/// 周期自然三次样条。各坐标分量共用同一组弦长节点。
#[derive(Debug, Clone)]
pub struct ClosedSpline {
    points: Vec<DVec3>,
    /// 第 i 段（点 i 到点 i+1）的弦长。
    intervals: Vec<f64>,
    /// 各控制点处的二阶导数。
    second_derivatives: Vec<DVec3>,
}

impl ClosedSpline {
    /// `points` 至少三个且相邻点互不重合。
    pub fn new(points: &[DVec3]) -> Self {
        let n = points.len();
        let intervals: Vec<f64> = (0..n)
            .map(|i| points[i].distance(points[(i + 1) % n]))
            .collect();

        // h[i-1] M[i-1] + 2 (h[i-1] + h[i]) M[i] + h[i] M[i+1] = 6 (斜率差)
        let mut sub = Vec::with_capacity(n);
        let mut diag = Vec::with_capacity(n);
        let mut sup = Vec::with_capacity(n);
        let mut rhs = Vec::with_capacity(n);
        for i in 0..n {
            let prev = (i + n - 1) % n;
            let next = (i + 1) % n;
            let h_prev = intervals[prev];
            let h = intervals[i];
            sub.push(h_prev);
            diag.push(2.0 * (h_prev + h));
            sup.push(h);
            let slope_next = (points[next] - points[i]) / h;
            let slope_prev = (points[i] - points[prev]) / h_prev;
            rhs.push((slope_next - slope_prev) * 6.0);
        }

        Self {
            points: points.to_vec(),
            second_derivatives: solve_cyclic(&sub, &diag, &sup, &rhs),
            intervals,
        }
    }

    /// 第 `segment` 段在参数 `t ∈ [0, h]` 处的位置。
    pub fn evaluate(&self, segment: usize, t: f64) -> DVec3 {
        let n = self.points.len();
        let next = (segment + 1) % n;
        let h = self.intervals[segment];
        let (m0, m1) = (self.second_derivatives[segment], self.second_derivatives[next]);
        let (p0, p1) = (self.points[segment], self.points[next]);
        let s = h - t;
        m0 * (s * s * s / (6.0 * h))
            + m1 * (t * t * t / (6.0 * h))
            + (p0 / h - m0 * (h / 6.0)) * s
            + (p1 / h - m1 * (h / 6.0)) * t
    }

    pub fn sample(&self, points_per_segment: usize) -> Vec<DVec3> {
        let mut out = Vec::with_capacity(self.points.len() * points_per_segment);
        for (segment, h) in self.intervals.iter().enumerate() {
            for step in 0..points_per_segment {
                let t = h * step as f64 / points_per_segment as f64;
                out.push(self.evaluate(segment, t));
            }
        }
        out
    }
}

/// 追赶法求解三对角方程组。`sub[0]` 与 `sup[n-1]` 不参与计算。
fn solve_tridiagonal<T>(sub: &[f64], diag: &[f64], sup: &[f64], rhs: &[T]) -> Vec<T>
where
    T: Copy + Sub<Output = T> + Mul<f64, Output = T> + Div<f64, Output = T>,
{
    let n = diag.len();
    let mut c_prime = vec![0.0; n];
    let mut d_prime = rhs.to_vec();
    let mut denom = diag[0];
    c_prime[0] = sup[0] / denom;
    d_prime[0] = rhs[0] / denom;
    for i in 1..n {
        denom = diag[i] - sub[i] * c_prime[i - 1];
        c_prime[i] = sup[i] / denom;
        d_prime[i] = (rhs[i] - d_prime[i - 1] * sub[i]) / denom;
    }
    for i in (0..n - 1).rev() {
        d_prime[i] = d_prime[i] - d_prime[i + 1] * c_prime[i];
    }
    d_prime
}

/// 循环三对角方程组（Sherman–Morrison）。要求 `n >= 3`。
///
/// `sub[0]` 是第 0 行对 `x[n-1]` 的系数，`sup[n-1]` 是最后一行对 `x[0]` 的系数。
fn solve_cyclic(sub: &[f64], diag: &[f64], sup: &[f64], rhs: &[DVec3]) -> Vec<DVec3> {
    let n = diag.len();
    let corner_top = sub[0];
    let corner_bottom = sup[n - 1];
    let gamma = -diag[0];

    let mut modified = diag.to_vec();
    modified[0] = diag[0] - gamma;
    modified[n - 1] = diag[n - 1] - corner_bottom * corner_top / gamma;

    let x = solve_tridiagonal(sub, &modified, sup, rhs);

    let mut u = vec![0.0; n];
    u[0] = gamma;
    u[n - 1] = corner_bottom;
    let z = solve_tridiagonal(sub, &modified, sup, &u);

    let factor = (x[0] + x[n - 1] * (corner_top / gamma))
        / (1.0 + z[0] + corner_top * z[n - 1] / gamma);
    x.iter()
        .zip(&z)
        .map(|(xi, zi)| *xi - factor * *zi)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<DVec3> {
        vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(100.0, 0.0, 0.0),
            DVec3::new(100.0, 100.0, 0.0),
            DVec3::new(0.0, 100.0, 0.0),
        ]
    }

    #[test]
    fn spline_interpolates_control_points() {
        let points = square();
        let samples = sample_closed_curve(&points, RepresentationType::Spline, 32);
        assert_eq!(samples.len(), 4 * 32);
        for (index, point) in points.iter().enumerate() {
            assert!(samples[index * 32].distance(*point) < 1e-9);
        }
    }

    #[test]
    fn spline_is_continuous_across_segments() {
        let spline = ClosedSpline::new(&square());
        for segment in 0..4 {
            let h = spline.intervals[segment];
            let end = spline.evaluate(segment, h);
            let start = spline.evaluate((segment + 1) % 4, 0.0);
            assert!(end.distance(start) < 1e-9);
        }
    }

    #[test]
    fn symmetric_square_bulges_outward() {
        let spline = ClosedSpline::new(&square());
        let middle = spline.evaluate(0, 50.0);
        // 底边中点应略低于 y = 0。
        assert!((middle.x - 50.0).abs() < 1e-9);
        assert!(middle.y < 0.0);
        assert!(middle.z.abs() < 1e-12);
    }

    #[test]
    fn cyclic_solver_matches_dense_system() {
        let sub = [1.0, 2.0, 3.0, 1.5];
        let diag = [6.0, 9.0, 10.0, 7.0];
        let sup = [2.0, 3.0, 1.5, 1.0];
        let expected = [
            DVec3::new(1.0, -1.0, 0.5),
            DVec3::new(2.0, 0.0, -0.5),
            DVec3::new(-1.0, 3.0, 1.0),
            DVec3::new(0.5, 0.5, 2.0),
        ];
        let n = 4;
        let rhs: Vec<DVec3> = (0..n)
            .map(|i| {
                expected[(i + n - 1) % n] * sub[i]
                    + expected[i] * diag[i]
                    + expected[(i + 1) % n] * sup[i]
            })
            .collect();
        let solved = solve_cyclic(&sub, &diag, &sup, &rhs);
        for (got, want) in solved.iter().zip(expected) {
            assert!(got.distance(want) < 1e-9, "{got:?} != {want:?}");
        }
    }

    #[test]
    fn duplicates_are_removed_before_fitting() {
        let mut points = square();
        points.insert(1, points[0]);
        points.push(points[0]);
        assert_eq!(dedup_closed(&points), square());
        let samples = sample_closed_curve(&points, RepresentationType::Spline, 8);
        assert!(samples.iter().all(|point| point.is_finite()));
        assert_eq!(samples.len(), 4 * 8);
    }

    #[test]
    fn polyline_keeps_control_points() {
        let samples = sample_closed_curve(&square(), RepresentationType::Polyline, 32);
        assert_eq!(samples, square());
    }

    #[test]
    fn too_few_points_are_returned_unchanged() {
        let two = [DVec3::ZERO, DVec3::X];
        assert_eq!(sample_closed_curve(&two, RepresentationType::Spline, 32).len(), 2);
    }
}
