//! 图像块及其文件命名.

use crate::consts::PATCH_LEVEL;
use crate::error::ParseChoiceError;
use crate::{PatchCoord, Result, Slide};
use image::RgbImage;
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;

mod save;

pub use save::save_in_batches;

/// 从切片第 0 层裁剪得到的 RGB 图像块.
#[derive(Clone, Debug)]
pub struct Patch {
    /// 在切片中的左上角坐标.
    pub coord: PatchCoord,

    /// 像素.
    pub pixels: RgbImage,
}

impl Patch {
    /// 从 `slide` 中裁剪以 `coord` 为左上角、边长为 `size` 的图像块.
    pub fn crop<S: Slide + ?Sized>(slide: &S, coord: PatchCoord, size: u32) -> Result<Self> {
        let pixels = slide.read_region((coord.x, coord.y), PATCH_LEVEL, (size, size))?;
        Ok(Self { coord, pixels })
    }

    /// 边长.
    #[inline]
    pub fn size(&self) -> u32 {
        self.pixels.width()
    }
}

/// 带有目标路径的图像块.
#[derive(Clone, Debug)]
pub struct NamedPatch {
    /// 保存位置.
    pub path: PathBuf,

    /// 图像块.
    pub patch: Patch,
}

/// 图像块文件的命名方式.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamingScheme {
    /// `patch_{patient}_{x}_{y}.png`.
    #[default]
    Patient,

    /// `patch_{index + 1}_{x}_{y}.png`, 其中 `index` 是图像块在该病人中被接受的次序.
    ///
    /// 不同病人的文件名可能冲突, 只适合每个输出目录一个病人的场景. 同一分期有多个病人时
    /// [`Pipeline`](crate::Pipeline) 会记录警告.
    Indexed,
}

impl NamingScheme {
    /// 生成文件名.
    pub fn file_name(&self, patient_id: &str, index: usize, coord: PatchCoord) -> String {
        match self {
            Self::Patient => patch_file_name(patient_id, coord),
            Self::Indexed => patch_file_name(&(index + 1).to_string(), coord),
        }
    }
}

impl FromStr for NamingScheme {
    type Err = ParseChoiceError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "patient" => Ok(Self::Patient),
            "indexed" => Ok(Self::Indexed),
            other => Err(ParseChoiceError::new("naming scheme", other, "patient, indexed")),
        }
    }
}

/// `patch_{id}_{x}_{y}.png`.
#[inline]
pub fn patch_file_name(id: &str, coord: PatchCoord) -> String {
    format!("patch_{id}_{}_{}.png", coord.x, coord.y)
}

/// 从文件名中解析出 id 和坐标, 与 [`patch_file_name`] 互逆.
///
/// id 本身可以含有 `_`, 因此取最后两个以 `_` 分隔的字段作为坐标.
pub fn parse_patch_file_name(name: &str) -> Option<(String, PatchCoord)> {
    let stem = name.strip_prefix("patch_")?.strip_suffix(".png")?;
    let (rest, y) = stem.rsplit_once('_')?;
    let (id, x) = rest.rsplit_once('_')?;
    if id.is_empty() {
        return None;
    }
    Some((id.to_owned(), PatchCoord::new(x.parse().ok()?, y.parse().ok()?)))
}
