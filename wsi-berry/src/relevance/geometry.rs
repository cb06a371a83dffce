//! 平面多边形的面积与裁剪.

use super::PatchSquare;
use crate::Vertex;
use geo::{Area, BoundingRect, Coord, LineString, Polygon};

/// 转换为 `geo` 多边形. 自动闭合.
///
/// 顶点少于 3 个、含有非有限值或面积为 0 时返回 `None`.
pub(crate) fn to_geo_polygon(vertices: &[Vertex]) -> Option<Polygon<f64>> {
    if vertices.len() < 3 || vertices.iter().any(|&(x, y)| !x.is_finite() || !y.is_finite()) {
        return None;
    }
    let polygon = to_polygon_unchecked(vertices);
    (polygon.unsigned_area() > 0.0).then_some(polygon)
}

impl PatchSquare {
    /// 图像块对应的正方形多边形.
    pub fn to_polygon(&self) -> Polygon<f64> {
        let (x0, y0) = (self.x, self.y);
        let (x1, y1) = (self.x + self.size, self.y + self.size);
        to_polygon_unchecked(&[(x0, y0), (x1, y0), (x1, y1), (x0, y1)])
    }
}

#[inline]
fn to_polygon_unchecked(vertices: &[Vertex]) -> Polygon<f64> {
    let ring: LineString<f64> = vertices.iter().map(|&(x, y)| Coord { x, y }).collect();
    Polygon::new(ring, vec![])
}

/// 两个外接矩形是否不重叠? 只有边界接触时重叠面积为 0, 同样视为不重叠.
fn bbox_disjoint(a: &Polygon<f64>, b: &Polygon<f64>) -> bool {
    match (a.bounding_rect(), b.bounding_rect()) {
        (Some(a), Some(b)) => {
            a.max().x <= b.min().x
                || b.max().x <= a.min().x
                || a.max().y <= b.min().y
                || b.max().y <= a.min().y
        }
        _ => true,
    }
}

/// 用凸的图像块正方形裁剪 `polygon` (Sutherland–Hodgman), 返回交集多边形的顶点.
///
/// 对凹多边形, 结果中可能出现沿正方形边界来回的退化边, 但面积仍然正确.
fn clip_to_square(square: &PatchSquare, polygon: &[Vertex]) -> Vec<Vertex> {
    let (x0, y0) = (square.x, square.y);
    let (x1, y1) = (square.x + square.size, square.y + square.size);

    // 每条裁剪边: 判断点是否在内侧, 以及线段与该边的交点.
    let x_cut = |p: Vertex, q: Vertex, x: f64| (x, p.1 + (q.1 - p.1) * (x - p.0) / (q.0 - p.0));
    let y_cut = |p: Vertex, q: Vertex, y: f64| (p.0 + (q.0 - p.0) * (y - p.1) / (q.1 - p.1), y);

    let mut out: Vec<Vertex> = polygon.to_vec();
    for edge in 0..4 {
        if out.is_empty() {
            break;
        }
        let inside = |p: Vertex| match edge {
            0 => p.0 >= x0,
            1 => p.0 <= x1,
            2 => p.1 >= y0,
            _ => p.1 <= y1,
        };
        let cut = |p: Vertex, q: Vertex| match edge {
            0 => x_cut(p, q, x0),
            1 => x_cut(p, q, x1),
            2 => y_cut(p, q, y0),
            _ => y_cut(p, q, y1),
        };
        let input = std::mem::take(&mut out);
        for (i, &cur) in input.iter().enumerate() {
            let prev = input[(i + input.len() - 1) % input.len()];
            match (inside(prev), inside(cur)) {
                (true, true) => out.push(cur),
                (true, false) => out.push(cut(prev, cur)),
                (false, true) => {
                    out.push(cut(prev, cur));
                    out.push(cur);
                }
                (false, false) => {}
            }
        }
    }
    out
}

/// 计算图像块正方形与 `polygon` 的交并比, 取值范围 `[0, 1]`.
///
/// 交集由裁剪得到, 并集面积为 `area(patch) + area(polygon) - area(intersection)`.
/// 退化的多边形 (见 [`to_geo_polygon`]) 以及边长为 0 的图像块返回 0.
pub fn calculate_iou(square: &PatchSquare, polygon: &[Vertex]) -> f64 {
    if !square.size.is_finite() || square.size <= 0.0 {
        return 0.0;
    }
    let Some(annotation) = to_geo_polygon(polygon) else {
        return 0.0;
    };
    let patch = square.to_polygon();
    if bbox_disjoint(&patch, &annotation) {
        return 0.0;
    }
    let clipped = clip_to_square(square, polygon);
    if clipped.len() < 3 {
        return 0.0;
    }
    let inter = to_polygon_unchecked(&clipped).unsigned_area();
    let union = patch.unsigned_area() + annotation.unsigned_area() - inter;
    if inter <= 0.0 || union <= 0.0 {
        return 0.0;
    }
    (inter / union).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, side: f64) -> Vec<Vertex> {
        vec![(x0, y0), (x0 + side, y0), (x0 + side, y0 + side), (x0, y0 + side)]
    }

    #[test]
    fn test_degenerate_polygons() {
        assert!(to_geo_polygon(&[]).is_none());
        assert!(to_geo_polygon(&[(0.0, 0.0), (1.0, 1.0)]).is_none());
        // 共线
        assert!(to_geo_polygon(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]).is_none());
        assert!(to_geo_polygon(&[(0.0, 0.0), (f64::NAN, 1.0), (2.0, 0.0)]).is_none());
        assert!(to_geo_polygon(&square(0.0, 0.0, 1.0)).is_some());
    }

    #[test]
    fn test_iou_identical() {
        let sq = PatchSquare::from_origin(0.0, 0.0, 256.0);
        let iou = calculate_iou(&sq, &square(0.0, 0.0, 256.0));
        assert!((iou - 1.0).abs() < 1e-9, "{iou}");
    }

    #[test]
    fn test_iou_disjoint() {
        let sq = PatchSquare::from_origin(0.0, 0.0, 256.0);
        assert_eq!(calculate_iou(&sq, &square(1000.0, 1000.0, 256.0)), 0.0);
        // 只有一条公共边, 面积为 0
        assert_eq!(calculate_iou(&sq, &square(256.0, 0.0, 256.0)), 0.0);
    }

    #[test]
    fn test_iou_half_overlap() {
        let sq = PatchSquare::from_origin(0.0, 0.0, 256.0);
        // 交集 128 * 256, 并集 3 * 128 * 256
        let iou = calculate_iou(&sq, &square(128.0, 0.0, 256.0));
        assert!((iou - 1.0 / 3.0).abs() < 1e-9, "{iou}");
    }

    #[test]
    fn test_iou_open_polygon_and_orientation() {
        let sq = PatchSquare::from_origin(0.0, 0.0, 100.0);
        // 顺时针且不闭合
        let poly = [(0.0, 0.0), (0.0, 50.0), (100.0, 50.0), (100.0, 0.0)];
        let iou = calculate_iou(&sq, &poly);
        assert!((iou - 0.5).abs() < 1e-9, "{iou}");
    }

    #[test]
    fn test_iou_concave() {
        let sq = PatchSquare::from_origin(0.0, 0.0, 10.0);
        // U 形, 面积 150, 缺口 [5,15]x[5,10]
        let u = [
            (0.0, 0.0),
            (20.0, 0.0),
            (20.0, 10.0),
            (15.0, 10.0),
            (15.0, 5.0),
            (5.0, 5.0),
            (5.0, 10.0),
            (0.0, 10.0),
        ];
        let iou = calculate_iou(&sq, &u);
        // 交集: [0,10]x[0,5] 加 [0,5]x[5,10]
        let inter = 50.0 + 25.0;
        let union = 100.0 + 150.0 - inter;
        assert!((iou - inter / union).abs() < 1e-9, "{iou}");
    }

    #[test]
    fn test_iou_degenerate_is_zero() {
        let sq = PatchSquare::from_origin(0.0, 0.0, 256.0);
        assert_eq!(calculate_iou(&sq, &[(1.0, 1.0), (2.0, 2.0)]), 0.0);
        assert_eq!(calculate_iou(&sq, &[]), 0.0);
        let empty = PatchSquare::from_origin(0.0, 0.0, 0.0);
        assert_eq!(calculate_iou(&empty, &square(0.0, 0.0, 10.0)), 0.0);
    }
}
