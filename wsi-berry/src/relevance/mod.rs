//! 图像块与标注区域的空间相关性.
//!
//! 图像块是闭正方形 `[x, x + size] × [y, y + size]`. 支持两种判定:
//!
//! 1. 包含: 标注多边形的全部顶点都落在正方形内 (边界上也算);
//! 2. IoU: 正方形与标注多边形的交并比严格大于阈值.
//!
//! 对同一病人的多个标注, 任一标注满足条件即接受.

use crate::consts::DEFAULT_IOU_THRESHOLD;
use crate::error::ParseChoiceError;
use crate::{Annotation, PatchCoord, Vertex};
use serde::Deserialize;
use std::str::FromStr;

mod geometry;

pub use geometry::calculate_iou;

/// 以第 0 层像素为单位的图像块正方形.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PatchSquare {
    /// 左上角水平坐标.
    pub x: f64,
    /// 左上角垂直坐标.
    pub y: f64,
    /// 边长.
    pub size: f64,
}

impl PatchSquare {
    /// 由候选坐标和图像块边长创建.
    #[inline]
    pub fn new(coord: PatchCoord, size: u32) -> Self {
        Self::from_origin(coord.x as f64, coord.y as f64, size as f64)
    }

    /// 由左上角和边长创建.
    #[inline]
    pub const fn from_origin(x: f64, y: f64, size: f64) -> Self {
        Self { x, y, size }
    }

    /// 点 `(vx, vy)` 是否在闭正方形内?
    #[inline]
    pub fn contains(&self, (vx, vy): Vertex) -> bool {
        self.x <= vx && vx <= self.x + self.size && self.y <= vy && vy <= self.y + self.size
    }
}

/// 标注多边形 `polygon` 是否完全位于图像块内?
///
/// 只检查顶点: 所有顶点都在闭正方形内时返回 `true`. 空多边形返回 `false`.
pub fn is_within_patch(square: &PatchSquare, polygon: &[Vertex]) -> bool {
    !polygon.is_empty() && polygon.iter().all(|&v| square.contains(v))
}

/// 相关性策略.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RelevancePolicy {
    /// 不筛选, 接受所有图像块. 此时不需要读取标注文件.
    AcceptAll,

    /// 标注完全位于图像块内.
    Containment,

    /// 交并比严格大于 `threshold`.
    Iou {
        /// 阈值, 位于 `[0, 1)`.
        threshold: f64,
    },
}

impl Default for RelevancePolicy {
    fn default() -> Self {
        Self::Iou {
            threshold: DEFAULT_IOU_THRESHOLD,
        }
    }
}

impl RelevancePolicy {
    /// 由策略种类和阈值创建. 阈值只对 [`PolicyKind::Iou`] 有意义.
    pub fn from_kind(kind: PolicyKind, threshold: f64) -> Self {
        match kind {
            PolicyKind::AcceptAll => Self::AcceptAll,
            PolicyKind::Containment => Self::Containment,
            PolicyKind::Iou => Self::Iou { threshold },
        }
    }

    /// 该策略是否需要标注?
    #[inline]
    pub fn is_filtering(&self) -> bool {
        !matches!(self, Self::AcceptAll)
    }

    /// 单个标注是否满足条件?
    pub fn matches(&self, square: &PatchSquare, annotation: &Annotation) -> bool {
        match *self {
            Self::AcceptAll => true,
            Self::Containment => is_within_patch(square, &annotation.polygon),
            Self::Iou { threshold } => calculate_iou(square, &annotation.polygon) > threshold,
        }
    }

    /// 是否接受该图像块? 任一标注满足条件即可, 找到后立即返回.
    ///
    /// [`RelevancePolicy::AcceptAll`] 总是接受; 其余策略在没有标注时拒绝.
    pub fn accepts(&self, square: &PatchSquare, annotations: &[Annotation]) -> bool {
        match self {
            Self::AcceptAll => true,
            _ => annotations.iter().any(|a| self.matches(square, a)),
        }
    }
}

/// 配置文件和命令行中的策略名称.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    /// `none`.
    #[serde(rename = "none")]
    AcceptAll,

    /// `containment`.
    Containment,

    /// `iou`.
    #[default]
    Iou,
}

impl FromStr for PolicyKind {
    type Err = ParseChoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::AcceptAll),
            "containment" => Ok(Self::Containment),
            "iou" => Ok(Self::Iou),
            other => Err(ParseChoiceError::new(
                "relevance policy",
                other,
                "none, containment, iou",
            )),
        }
    }
}
