use super::{CoordList, CoordStore};
use crate::consts::COORDS_DATASET;
use crate::{Error, Result};
use ndarray::Array2;
use std::path::{Path, PathBuf};

/// `.h5` 格式的坐标文件, 读取其中的 `coords` 数据集.
///
/// 整数宽度由 HDF5 库自动转换为 `i64`.
pub struct H5CoordStore {
    path: PathBuf,
    file: hdf5::File,
}

impl H5CoordStore {
    /// 以只读方式打开 HDF5 文件.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_owned();
        let file = hdf5::File::open(&path).map_err(|source| Error::Hdf5 {
            path: path.clone(),
            source,
        })?;
        Ok(Self { path, file })
    }
}

impl CoordStore for H5CoordStore {
    fn read_coords(&mut self) -> Result<CoordList> {
        let h5_err = |source| Error::Hdf5 {
            path: self.path.clone(),
            source,
        };
        let dataset = self
            .file
            .dataset(COORDS_DATASET)
            .map_err(|e| Error::CoordDataset {
                path: self.path.clone(),
                reason: format!("no `{COORDS_DATASET}` dataset: {e}"),
            })?;
        let arr: Array2<i64> = dataset.read_2d::<i64>().map_err(h5_err)?;
        CoordList::from_array(arr.view()).ok_or_else(|| Error::CoordDataset {
            path: self.path.clone(),
            reason: format!("expected shape (N, 2), found {:?}", arr.shape()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::open_coord_list;
    use super::*;
    use crate::PatchCoord;
    use ndarray::array;

    fn write_h5<T: hdf5::H5Type>(path: &Path, name: &str, arr: &Array2<T>) {
        let file = hdf5::File::create(path).unwrap();
        file.new_dataset_builder()
            .with_data(arr)
            .create(name)
            .unwrap();
    }

    #[test]
    fn test_read_i64_coords() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.h5");
        write_h5(&path, "coords", &array![[0i64, 256], [512, 768], [1024, 0]]);

        let coords = open_coord_list(&path).unwrap();
        assert_eq!(coords.len(), 3);
        assert_eq!(coords[2], PatchCoord::new(1024, 0));
    }

    #[test]
    fn test_read_i32_coords() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.hdf5");
        write_h5(&path, "coords", &array![[7i32, 9], [11, 13]]);

        let coords = open_coord_list(&path).unwrap();
        let v: Vec<PatchCoord> = coords.iter().collect();
        assert_eq!(v, [PatchCoord::new(7, 9), PatchCoord::new(11, 13)]);
    }

    #[test]
    fn test_bad_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wrong_name.h5");
        write_h5(&path, "points", &array![[0i64, 0]]);
        assert!(matches!(
            open_coord_list(&path).unwrap_err(),
            Error::CoordDataset { .. }
        ));

        let path = dir.path().join("wrong_shape.h5");
        write_h5(&path, "coords", &array![[0i64, 0, 0], [1, 1, 1]]);
        assert!(matches!(
            open_coord_list(&path).unwrap_err(),
            Error::CoordDataset { .. }
        ));
    }
}
