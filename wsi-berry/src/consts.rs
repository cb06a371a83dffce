//! 通用常量.

/// 清单中出现的分期标签.
pub mod stage {
    /// 阴性. 该分期的切片没有标注, 图像块直接随机采样.
    pub const NEGATIVE: &str = "negative";

    /// 孤立肿瘤细胞 (isolated tumor cells).
    pub const ITC: &str = "itc";

    /// 微转移.
    pub const MICRO: &str = "micro";

    /// 宏转移.
    pub const MACRO: &str = "macro";
}

/// 图像块默认边长 (像素).
pub const DEFAULT_PATCH_SIZE: u32 = 256;

/// 批量写盘时每批的默认图像块个数.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// IoU 模式下的默认阈值. 交并比必须 **严格大于** 该值.
pub const DEFAULT_IOU_THRESHOLD: f64 = 0.1;

/// 阴性切片分组个数 (NWN) 的默认值.
pub const DEFAULT_NWN: u32 = 2;

/// 阴性图像块总预算 (NC) 的默认值.
pub const DEFAULT_NC: u32 = 100;

/// 清单过滤时要求的切片扩展名 (大小写不敏感).
pub const DEFAULT_SLIDE_EXTENSION: &str = ".tif";

/// 坐标文件的默认扩展名.
pub const DEFAULT_COORD_EXTENSION: &str = "h5";

/// 坐标文件中保存候选坐标的数据集名称.
pub const COORDS_DATASET: &str = "coords";

/// 读取图像块时使用的金字塔层级.
pub const PATCH_LEVEL: u32 = 0;
