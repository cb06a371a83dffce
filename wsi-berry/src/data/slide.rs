//! 全切片图像的像素读取.
//!
//! 真正的 WSI 后端 (如 openslide) 被视为外部组件: 流程只依赖 [`Slide`] 和
//! [`SlideOpener`] 两个 trait. 这里提供的 [`ImageSlide`] 可以读取 `image`
//! crate 能解码的任何栅格图像 (TIFF, PNG, ...), 并整体载入内存.

use crate::{Error, FileKind, Result};
use image::{imageops, RgbImage};
use std::path::Path;

/// 一张已打开的切片.
pub trait Slide {
    /// 第 0 层的宽和高.
    fn dimensions(&self) -> (u64, u64);

    /// 读取以 `origin` 为左上角、大小为 `size` 的区域, 转换为 RGB.
    ///
    /// `origin` 总是以第 0 层像素为单位. 超出切片范围的像素为黑色.
    fn read_region(&self, origin: (i64, i64), level: u32, size: (u32, u32)) -> Result<RgbImage>;
}

/// 按路径打开切片.
pub trait SlideOpener {
    /// 打开后得到的切片类型.
    type Slide: Slide;

    /// 打开 `path` 处的切片.
    fn open(&self, path: &Path) -> Result<Self::Slide>;
}

/// 整体载入内存的单层切片.
#[derive(Clone, Debug)]
pub struct ImageSlide {
    image: RgbImage,
}

impl ImageSlide {
    /// 从文件打开. 文件不存在时返回 [`Error::MissingFile`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::missing(FileKind::Slide, path));
        }
        let image = image::open(path)
            .map_err(|source| Error::Image {
                path: path.to_owned(),
                source,
            })?
            .into_rgb8();
        Ok(Self { image })
    }

    /// 包装已经在内存中的图像.
    #[inline]
    pub fn from_image(image: RgbImage) -> Self {
        Self { image }
    }
}

impl Slide for ImageSlide {
    #[inline]
    fn dimensions(&self) -> (u64, u64) {
        (self.image.width() as u64, self.image.height() as u64)
    }

    fn read_region(
        &self,
        (x, y): (i64, i64),
        level: u32,
        (width, height): (u32, u32),
    ) -> Result<RgbImage> {
        if level != 0 {
            return Err(Error::UnsupportedLevel(level));
        }
        let mut region = RgbImage::new(width, height);
        // 只复制与切片重叠的部分, 其余保持黑色.
        imageops::replace(&mut region, &self.image, -x, -y);
        Ok(region)
    }
}

/// 打开 [`ImageSlide`].
#[derive(Copy, Clone, Debug, Default)]
pub struct ImageSlideOpener;

impl SlideOpener for ImageSlideOpener {
    type Slide = ImageSlide;

    #[inline]
    fn open(&self, path: &Path) -> Result<ImageSlide> {
        ImageSlide::open(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// 像素值编码了坐标, 便于检查读取位置.
    fn gradient(w: u32, h: u32) -> ImageSlide {
        ImageSlide::from_image(RgbImage::from_fn(w, h, |x, y| {
            Rgb([x as u8, y as u8, 200])
        }))
    }

    #[test]
    fn test_read_inside() {
        let slide = gradient(64, 48);
        assert_eq!(slide.dimensions(), (64, 48));

        let region = slide.read_region((10, 20), 0, (8, 8)).unwrap();
        assert_eq!(region.dimensions(), (8, 8));
        assert_eq!(*region.get_pixel(0, 0), Rgb([10, 20, 200]));
        assert_eq!(*region.get_pixel(7, 7), Rgb([17, 27, 200]));
    }

    #[test]
    fn test_read_partially_outside() {
        let slide = gradient(16, 16);
        let region = slide.read_region((12, -2), 0, (8, 8)).unwrap();
        // 右侧和上方越界
        assert_eq!(*region.get_pixel(0, 0), Rgb([0, 0, 0]));
        assert_eq!(*region.get_pixel(0, 2), Rgb([12, 0, 200]));
        assert_eq!(*region.get_pixel(3, 5), Rgb([15, 3, 200]));
        assert_eq!(*region.get_pixel(4, 5), Rgb([0, 0, 0]));

        let region = slide.read_region((100, 100), 0, (4, 4)).unwrap();
        assert!(region.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn test_only_level_zero() {
        let slide = gradient(4, 4);
        assert!(matches!(
            slide.read_region((0, 0), 1, (2, 2)).unwrap_err(),
            Error::UnsupportedLevel(1)
        ));
    }

    #[test]
    fn test_open_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slide.png");
        assert!(ImageSlideOpener.open(&path).unwrap_err().is_missing_file());

        RgbImage::from_pixel(5, 3, Rgb([1, 2, 3])).save(&path).unwrap();
        let slide = ImageSlideOpener.open(&path).unwrap();
        assert_eq!(slide.dimensions(), (5, 3));
    }
}
