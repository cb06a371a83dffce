//! 每个病人的输入数据, 以及数据集目录的定位.
//!
//! 坐标文件, 切片和标注在处理一行清单时打开、完全读取并释放, 不跨行持有.

use std::path::{Path, PathBuf};

pub mod annotation;
pub mod coords;
pub mod manifest;
pub mod slide;

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}
