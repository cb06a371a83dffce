//! 候选图像块坐标.
//!
//! 坐标文件是一个带索引的容器, 其中名为 `coords` 的数据集保存 `N x 2` 的整数数组,
//! 每行为一个图像块的左上角 `(x, y)`.

use crate::consts::COORDS_DATASET;
use crate::{Error, FileKind, Result};
use ndarray::{ArrayView2, Ix2, OwnedRepr};
use ndarray_npy::NpzReader;
use std::fs::File;
use std::ops::Index;
use std::path::{Path, PathBuf};

/// 图像块左上角坐标, 以第 0 层像素为单位.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct PatchCoord {
    /// 水平方向.
    pub x: i64,
    /// 垂直方向.
    pub y: i64,
}

impl PatchCoord {
    /// 创建坐标.
    #[inline]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl From<(i64, i64)> for PatchCoord {
    #[inline]
    fn from((x, y): (i64, i64)) -> Self {
        Self { x, y }
    }
}

/// 一张切片的全部候选坐标, 保持文件中的顺序.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoordList {
    coords: Vec<PatchCoord>,
}

impl CoordList {
    /// 从 `N x 2` 数组构造. 列数不为 2 时返回 `None`.
    pub fn from_array(arr: ArrayView2<i64>) -> Option<Self> {
        if arr.ncols() != 2 {
            return None;
        }
        let coords = arr
            .outer_iter()
            .map(|row| PatchCoord::new(row[0], row[1]))
            .collect();
        Some(Self { coords })
    }

    /// 坐标个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    /// 是否没有任何坐标?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// 获取第 `index` 个坐标.
    #[inline]
    pub fn get(&self, index: usize) -> Option<PatchCoord> {
        self.coords.get(index).copied()
    }

    /// 按文件顺序迭代.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = PatchCoord> + '_ {
        self.coords.iter().copied()
    }

    /// 底层切片.
    #[inline]
    pub fn as_slice(&self) -> &[PatchCoord] {
        &self.coords
    }
}

impl Index<usize> for CoordList {
    type Output = PatchCoord;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.coords[index]
    }
}

impl FromIterator<PatchCoord> for CoordList {
    fn from_iter<I: IntoIterator<Item = PatchCoord>>(iter: I) -> Self {
        Self {
            coords: iter.into_iter().collect(),
        }
    }
}

/// 可以一次性读出全部候选坐标的存储.
pub trait CoordStore {
    /// 读取 `coords` 数据集.
    fn read_coords(&mut self) -> Result<CoordList>;
}

/// `.npz` 格式的坐标文件.
///
/// 依次查找名为 `coords` 和 `coords.npy` 的数组 (后者是 `numpy.savez` 的命名方式),
/// 元素类型可以是 `i64` 或 `i32`.
pub struct NpzCoordStore {
    path: PathBuf,
    reader: NpzReader<File>,
}

impl NpzCoordStore {
    /// 打开 npz 文件.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_owned();
        let file = File::open(&path).map_err(Error::io(&path))?;
        let reader = NpzReader::new(file).map_err(|source| Error::Npz {
            path: path.clone(),
            source,
        })?;
        Ok(Self { path, reader })
    }

    fn npz_err(&self) -> impl FnOnce(ndarray_npy::ReadNpzError) -> Error {
        let path = self.path.clone();
        move |source| Error::Npz { path, source }
    }
}

impl CoordStore for NpzCoordStore {
    fn read_coords(&mut self) -> Result<CoordList> {
        let names = self.reader.names().map_err(self.npz_err())?;
        let dotted = format!("{COORDS_DATASET}.npy");
        let name = [COORDS_DATASET, dotted.as_str()]
            .into_iter()
            .find(|n| names.iter().any(|have| have == n))
            .ok_or_else(|| Error::CoordDataset {
                path: self.path.clone(),
                reason: format!("no `{COORDS_DATASET}` array among {names:?}"),
            })?;

        let arr = match self.reader.by_name::<OwnedRepr<i64>, Ix2>(name) {
            Ok(arr) => arr,
            Err(e) => match self.reader.by_name::<OwnedRepr<i32>, Ix2>(name) {
                Ok(arr) => arr.mapv(i64::from),
                Err(_) => return Err(self.npz_err()(e)),
            },
        };
        CoordList::from_array(arr.view()).ok_or_else(|| Error::CoordDataset {
            path: self.path.clone(),
            reason: format!("expected shape (N, 2), found {:?}", arr.shape()),
        })
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "hdf5")] {
        mod h5;

        pub use h5::H5CoordStore;

        fn read_h5(path: &Path) -> Result<CoordList> {
            H5CoordStore::open(path)?.read_coords()
        }
    } else {
        fn read_h5(path: &Path) -> Result<CoordList> {
            Err(Error::UnsupportedCoordFormat {
                path: path.to_owned(),
                hint: "reading HDF5 requires the `hdf5` feature",
            })
        }
    }
}

/// 根据扩展名选择坐标存储并读取全部坐标.
///
/// - `.npz`: [`NpzCoordStore`];
/// - `.h5` / `.hdf5`: `H5CoordStore` (需要 `hdf5` feature).
///
/// 文件不存在时返回 [`Error::MissingFile`].
pub fn open_coord_list<P: AsRef<Path>>(path: P) -> Result<CoordList> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::missing(FileKind::Coordinates, path));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("npz") => NpzCoordStore::open(path)?.read_coords(),
        Some("h5" | "hdf5") => read_h5(path),
        _ => Err(Error::UnsupportedCoordFormat {
            path: path.to_owned(),
            hint: "expected a .npz, .h5 or .hdf5 file",
        }),
    }
}
