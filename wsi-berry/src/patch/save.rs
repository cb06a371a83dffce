//! 图像块的批量持久化存储.

use super::NamedPatch;
use crate::{Error, Result};
use log::debug;

/// 按每批 `batch_size` 个将图像块写入各自的路径, 返回写入的个数.
///
/// 分批只影响写盘节奏, 不影响结果. 父目录必须已经存在. `batch_size == 0` 时返回 [`Error::Config`].
pub fn save_in_batches(patches: &[NamedPatch], batch_size: usize) -> Result<usize> {
    if batch_size == 0 {
        return Err(Error::Config("`batch_size` must be positive".to_string()));
    }
    let mut saved = 0;
    for (i, batch) in patches.chunks(batch_size).enumerate() {
        for NamedPatch { path, patch } in batch {
            patch.pixels.save(path).map_err(|source| Error::Image {
                path: path.clone(),
                source,
            })?;
        }
        saved += batch.len();
        debug!("batch #{i}: {} patches written", batch.len());
    }
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Patch, PatchCoord};
    use image::{Rgb, RgbImage};

    fn patches(dir: &std::path::Path, n: usize) -> Vec<NamedPatch> {
        (0..n)
            .map(|i| NamedPatch {
                path: dir.join(format!("patch_p_{i}_0.png")),
                patch: Patch {
                    coord: PatchCoord::new(i as i64, 0),
                    pixels: RgbImage::from_pixel(4, 4, Rgb([i as u8, 0, 0])),
                },
            })
            .collect()
    }

    #[test]
    fn test_save_in_batches() {
        let dir = tempfile::tempdir().unwrap();
        let ps = patches(dir.path(), 7);
        assert_eq!(save_in_batches(&ps, 3).unwrap(), 7);
        for p in ps.iter() {
            let img = image::open(&p.path).unwrap().into_rgb8();
            assert_eq!(img, p.patch.pixels);
        }
        assert_eq!(save_in_batches(&[], 3).unwrap(), 0);
    }

    #[test]
    fn test_zero_batch_size() {
        let dir = tempfile::tempdir().unwrap();
        let ps = patches(dir.path(), 1);
        assert!(matches!(save_in_batches(&ps, 0), Err(Error::Config(_))));
        assert!(!ps[0].path.exists());
    }
}
