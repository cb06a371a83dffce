//! 已生成图像块的核验.
//!
//! 对每个 (图像块, 标注) 组合, 若标注完全落在图像块内, 则输出一条带 IoU 的记录.
//! 图像块坐标可以来自坐标文件, 也可以从已写出的图像块文件名中还原.

use crate::data::coords::open_coord_list;
use crate::patch::parse_patch_file_name;
use crate::relevance::{calculate_iou, is_within_patch, PatchSquare};
use crate::{Annotation, Error, PatchCoord, Result};
use ordered_float::OrderedFloat;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;

/// 一条核验记录.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValidationRecord {
    /// 图像块标识. 来自文件时为不含扩展名的文件名, 来自坐标文件时为下标.
    pub patch_id: String,

    /// 标注名称.
    pub annotation_name: String,

    /// 图像块与标注的交并比.
    pub iou: f64,
}

/// 核验 `patches` 中的每个图像块.
///
/// 记录顺序: 先按图像块, 再按标注在文件中的顺序.
pub fn validate_patches<I>(
    annotations: &[Annotation],
    patches: I,
    patch_size: u32,
) -> Vec<ValidationRecord>
where
    I: IntoIterator<Item = (String, PatchCoord)>,
{
    let mut ans = Vec::new();
    for (patch_id, coord) in patches {
        let square = PatchSquare::new(coord, patch_size);
        for annotation in annotations {
            if is_within_patch(&square, &annotation.polygon) {
                ans.push(ValidationRecord {
                    patch_id: patch_id.clone(),
                    annotation_name: annotation.name.clone(),
                    iou: calculate_iou(&square, &annotation.polygon),
                });
            }
        }
    }
    ans
}

/// 从目录中的图像块文件名还原坐标, 按文件名排序. 无法解析的文件被忽略.
pub fn patches_from_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<(String, PatchCoord)>> {
    let dir = dir.as_ref();
    let mut ans = Vec::new();
    for entry in fs::read_dir(dir).map_err(Error::io(dir))? {
        let entry = entry.map_err(Error::io(dir))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some((_, coord)) = parse_patch_file_name(name) {
            let id = name.strip_suffix(".png").unwrap_or(name);
            ans.push((id.to_owned(), coord));
        }
    }
    ans.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(ans)
}

/// 读取坐标文件中的全部坐标, 以下标作为图像块标识.
pub fn patches_from_coords<P: AsRef<Path>>(path: P) -> Result<Vec<(String, PatchCoord)>> {
    let coords = open_coord_list(path)?;
    Ok(coords
        .iter()
        .enumerate()
        .map(|(i, c)| (i.to_string(), c))
        .collect())
}

/// `path` 是目录时调用 [`patches_from_dir`], 否则调用 [`patches_from_coords`].
pub fn load_patches<P: AsRef<Path>>(path: P) -> Result<Vec<(String, PatchCoord)>> {
    let path = path.as_ref();
    if path.is_dir() {
        patches_from_dir(path)
    } else {
        patches_from_coords(path)
    }
}

/// 以 CSV 格式 (`patch_id,annotation_name,iou`) 写出记录.
pub fn write_report<W: Write>(records: &[ValidationRecord], writer: W) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for r in records {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

/// IoU 最大的记录.
pub fn best_record(records: &[ValidationRecord]) -> Option<&ValidationRecord> {
    records.iter().max_by_key(|r| OrderedFloat(r.iou))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::patch_file_name;

    fn annotations() -> Vec<Annotation> {
        vec![
            Annotation {
                name: "small".into(),
                group: "g".into(),
                polygon: vec![(10.0, 10.0), (20.0, 10.0), (20.0, 20.0), (10.0, 20.0)],
            },
            Annotation {
                name: "full".into(),
                group: "g".into(),
                polygon: vec![(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)],
            },
            Annotation {
                name: "far".into(),
                group: "g".into(),
                polygon: vec![(500.0, 500.0), (510.0, 500.0), (505.0, 510.0)],
            },
        ]
    }

    #[test]
    fn test_validate_patches() {
        let patches = vec![
            ("a".to_string(), PatchCoord::new(0, 0)),
            ("b".to_string(), PatchCoord::new(5, 5)),
        ];
        let records = validate_patches(&annotations(), patches, 100);

        let summary: Vec<(&str, &str)> = records
            .iter()
            .map(|r| (r.patch_id.as_str(), r.annotation_name.as_str()))
            .collect();
        assert_eq!(summary, [("a", "small"), ("a", "full"), ("b", "small")]);
        assert!((records[0].iou - 0.01).abs() < 1e-9);
        assert!((records[1].iou - 1.0).abs() < 1e-9);
        assert_eq!(best_record(&records).unwrap().annotation_name, "full");
    }

    #[test]
    fn test_patches_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        for (x, y) in [(256, 0), (0, 512)] {
            fs::write(dir.path().join(patch_file_name("p_1", PatchCoord::new(x, y))), b"").unwrap();
        }
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let patches = load_patches(dir.path()).unwrap();
        assert_eq!(
            patches,
            [
                ("patch_p_1_0_512".to_string(), PatchCoord::new(0, 512)),
                ("patch_p_1_256_0".to_string(), PatchCoord::new(256, 0)),
            ]
        );
    }

    #[test]
    fn test_write_report() {
        let records = vec![ValidationRecord {
            patch_id: "patch_p_0_0".into(),
            annotation_name: "Annotation 0".into(),
            iou: 0.25,
        }];
        let mut buf = Vec::new();
        write_report(&records, &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "patch_id,annotation_name,iou\npatch_p_0_0,Annotation 0,0.25\n"
        );
    }
}
