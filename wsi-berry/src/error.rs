//! 运行时错误.

use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 输入文件的种类. 用于描述缺失的文件.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FileKind {
    /// 全切片图像.
    Slide,

    /// 候选坐标文件.
    Coordinates,

    /// XML 标注文件.
    Annotation,

    /// 清单 CSV 文件.
    Manifest,
}

impl Display for FileKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Slide => "slide",
            Self::Coordinates => "coordinate file",
            Self::Annotation => "annotation file",
            Self::Manifest => "manifest",
        })
    }
}

/// 处理流程中可能出现的错误.
///
/// 退化的几何图形 (顶点少于 3 个或面积为 0) 不是错误: 判定结果为 `false`, IoU 为 0.
#[derive(Debug, Error)]
pub enum Error {
    /// 输入文件不存在.
    #[error("{kind} not found: {}", path.display())]
    MissingFile {
        /// 文件种类.
        kind: FileKind,
        /// 期望的路径.
        path: PathBuf,
    },

    /// 清单本身不可用 (如缺少必要的列).
    #[error("invalid manifest {}: {reason}", path.display())]
    Manifest {
        /// 清单路径.
        path: PathBuf,
        /// 原因.
        reason: String,
    },

    /// 清单中的某一行无法解析. 加载清单时该行会被跳过.
    #[error("malformed manifest row at line {line}: {reason}")]
    MalformedManifestRow {
        /// 行号 (从 1 开始, 含表头).
        line: u64,
        /// 原因.
        reason: String,
    },

    /// 不放回采样的个数超过了总数.
    #[error("cannot sample {count} distinct indices out of {total}")]
    SampleTooLarge {
        /// 候选总数.
        total: usize,
        /// 需要的个数.
        count: usize,
    },

    /// 配置缺失或取值非法.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// 切片读取器不支持该层级.
    #[error("slide level {0} is not supported, only level 0 can be read")]
    UnsupportedLevel(u32),

    /// 无法识别的坐标文件格式.
    #[error("unsupported coordinate file {}: {hint}", path.display())]
    UnsupportedCoordFormat {
        /// 坐标文件路径.
        path: PathBuf,
        /// 提示信息.
        hint: &'static str,
    },

    /// 坐标文件中没有 `coords` 数据集, 或其形状不是 `N x 2`.
    #[error("bad coordinate dataset in {}: {reason}", path.display())]
    CoordDataset {
        /// 坐标文件路径.
        path: PathBuf,
        /// 原因.
        reason: String,
    },

    /// 底层 I/O 错误.
    #[error("io error at {}: {source}", path.display())]
    Io {
        /// 出错的路径.
        path: PathBuf,
        /// 底层错误.
        #[source]
        source: io::Error,
    },

    /// 清单 CSV 读取错误.
    #[error("csv error in {}: {source}", path.display())]
    Csv {
        /// 清单路径.
        path: PathBuf,
        /// 底层错误.
        #[source]
        source: csv::Error,
    },

    /// 标注 XML 解析错误.
    #[error("xml error in {}: {source}", path.display())]
    Xml {
        /// 标注路径.
        path: PathBuf,
        /// 底层错误.
        #[source]
        source: quick_xml::DeError,
    },

    /// npz 坐标文件读取错误.
    #[error("npz error in {}: {source}", path.display())]
    Npz {
        /// 坐标文件路径.
        path: PathBuf,
        /// 底层错误.
        #[source]
        source: ndarray_npy::ReadNpzError,
    },

    /// HDF5 坐标文件读取错误.
    #[cfg(feature = "hdf5")]
    #[error("hdf5 error in {}: {source}", path.display())]
    Hdf5 {
        /// 坐标文件路径.
        path: PathBuf,
        /// 底层错误.
        #[source]
        source: hdf5::Error,
    },

    /// 图像解码或编码错误.
    #[error("image error at {}: {source}", path.display())]
    Image {
        /// 图像路径.
        path: PathBuf,
        /// 底层错误.
        #[source]
        source: image::ImageError,
    },

    /// TOML 配置文件解析错误.
    #[error("config error in {}: {source}", path.display())]
    Toml {
        /// 配置文件路径.
        path: PathBuf,
        /// 底层错误.
        #[source]
        source: toml::de::Error,
    },
}

impl Error {
    /// 是否是输入文件缺失错误?
    #[inline]
    pub fn is_missing_file(&self) -> bool {
        matches!(self, Self::MissingFile { .. })
    }

    /// 构造 [`Error::MissingFile`].
    #[inline]
    pub(crate) fn missing(kind: FileKind, path: &Path) -> Self {
        Self::MissingFile {
            kind,
            path: path.to_owned(),
        }
    }

    /// 为 `path` 上发生的 I/O 错误构造映射函数.
    #[inline]
    pub(crate) fn io(path: &Path) -> impl FnOnce(io::Error) -> Self {
        let path = path.to_owned();
        move |source| Self::Io { path, source }
    }
}

/// 流程运行时错误.
pub type Result<T> = std::result::Result<T, Error>;

/// 从字符串解析枚举选项失败.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} `{value}`, expected one of: {expected}")]
pub struct ParseChoiceError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

impl ParseChoiceError {
    pub(crate) fn new(kind: &'static str, value: &str, expected: &'static str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
            expected,
        }
    }
}
