#![warn(missing_docs)]

//! 核心库. 从全切片病理图像 (WSI) 中按候选坐标提取固定大小的图像块 (patch),
//! 根据病理医生标注的多边形区域进行筛选, 并按照分期 (stage) 保存为训练数据集.
//!
//! # 数据来源
//!
//! 对于清单 (manifest) 中的每个病人:
//!
//! 1. 坐标文件: `{h5_dir}/{patient}.{npz,h5}`, 其中 `coords` 数组保存
//!   `N x 2` 个候选图像块左上角坐标;
//! 2. 切片文件: `{wsi_dir}/{patient}.tif`;
//! 3. 标注文件: `{xml_dir}/{patient}.xml` (ASAP 格式), 只有非阴性分期需要.
//!
//! 输出保存在 `{save_dir}/{stage}/patch_{patient}_{x}_{y}.png`.
//!
//! # 核心算法
//!
//! ### 阴性切片的随机采样 ✅
//!
//! 在 `N` 个候选坐标中不放回地选出 `NC / NWN` 个 (向下取整). 选取比例较低时使用拒绝采样,
//! 比例较高时切换到部分 Fisher–Yates 洗牌, 从而保证 `count == total` 时也能结束.
//!
//! 实现位于 `wsi-berry/src/select.rs`.
//!
//! ### 图像块与标注的空间相关性判断 ✅
//!
//! 1. 包含模式: 标注多边形的所有顶点都落在 (闭) 图像块内;
//! 2. IoU 模式: 图像块正方形与标注多边形的交并比严格大于阈值 (默认 0.1).
//!
//! 任一标注满足条件即接受该图像块.
//!
//! 实现位于 `wsi-berry/src/relevance`.
//!
//! # 注意
//!
//! 1. 该 crate 不处理金字塔/瓦片逻辑, 只在第 0 层读取区域.
//! 2. 默认顺序执行. 打开 `rayon` feature 后可以按病人并行处理, 不同病人的输出文件互不相交.
//! 3. 读取 `.h5` 坐标文件需要打开 `hdf5` feature.

/// 标注多边形的一个顶点 `(x, y)`, 以第 0 层像素为单位.
pub type Vertex = (f64, f64);

pub mod consts;

mod error;

pub use error::{Error, FileKind, ParseChoiceError, Result};

pub mod config;

pub use config::{MissingFilePolicy, PipelineConfig, RawConfig};

/// 输入数据: 清单, 坐标, 标注和切片.
pub mod data;

pub use data::annotation::Annotation;
pub use data::coords::{CoordList, PatchCoord};
pub use data::manifest::{ManifestFilter, ManifestRow, Stage, StageFilter};
pub use data::slide::{ImageSlide, ImageSlideOpener, Slide, SlideOpener};

pub mod select;

pub mod relevance;

pub use relevance::{PatchSquare, PolicyKind, RelevancePolicy};

pub mod patch;

pub use patch::{NamedPatch, NamingScheme, Patch};

pub mod pipeline;

pub use pipeline::{Pipeline, RowOutcome, RowStatus, RunReport};

pub mod validate;

pub mod prelude;
