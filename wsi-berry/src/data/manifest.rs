//! 病人/分期清单.
//!
//! 清单是带表头的 CSV 文件, 至少包含 `patient` 和 `stage` 两列, 其余列忽略.

use crate::consts::stage::{ITC, MACRO, MICRO, NEGATIVE};
use crate::error::ParseChoiceError;
use crate::{Error, FileKind, Result};
use log::{debug, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// 病人的分期标签.
///
/// 解析大小写敏感. 未知标签保存在 [`Stage::Other`] 中, 并原样用作输出子目录名.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Stage {
    /// 阴性.
    Negative,

    /// 孤立肿瘤细胞.
    Itc,

    /// 微转移.
    Micro,

    /// 宏转移.
    Macro,

    /// 其它标签.
    Other(String),
}

impl Stage {
    /// 从清单中的字符串解析分期.
    pub fn parse(s: &str) -> Self {
        match s {
            NEGATIVE => Self::Negative,
            ITC => Self::Itc,
            MICRO => Self::Micro,
            MACRO => Self::Macro,
            other => Self::Other(other.to_owned()),
        }
    }

    /// 原始标签字符串.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Negative => NEGATIVE,
            Self::Itc => ITC,
            Self::Micro => MICRO,
            Self::Macro => MACRO,
            Self::Other(s) => s.as_str(),
        }
    }

    /// 是否为阴性?
    #[inline]
    pub fn is_negative(&self) -> bool {
        matches!(self, Self::Negative)
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 清单中的一行.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ManifestRow {
    /// 清单中的切片文件名, 含扩展名.
    pub patient: String,

    /// 分期.
    pub stage: Stage,
}

impl ManifestRow {
    /// 创建一行.
    pub fn new(patient: impl Into<String>, stage: Stage) -> Self {
        Self {
            patient: patient.into(),
            stage,
        }
    }

    /// 病人 ID: 文件名中第一个 `.` 之前的部分.
    pub fn patient_id(&self) -> &str {
        self.patient
            .split_once('.')
            .map_or(self.patient.as_str(), |(id, _)| id)
    }
}

/// 从路径 `path` 加载清单.
///
/// 文件不存在时返回 [`Error::MissingFile`]. 无法解析的行会记录警告并跳过.
pub fn load_manifest<P: AsRef<Path>>(path: P) -> Result<Vec<ManifestRow>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::missing(FileKind::Manifest, path));
    }
    let file = File::open(path).map_err(Error::io(path))?;
    read_manifest(file, path)
}

/// 从任意 reader 读取清单. `origin` 仅用于错误信息.
pub fn read_manifest<R: Read>(reader: R, origin: &Path) -> Result<Vec<ManifestRow>> {
    let csv_err = |source| Error::Csv {
        path: origin.to_owned(),
        source,
    };
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().map_err(csv_err)?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::Manifest {
                path: origin.to_owned(),
                reason: format!("missing column `{name}`"),
            })
    };
    let patient_col = column("patient")?;
    let stage_col = column("stage")?;

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(csv_err)?;
        let line = record.position().map_or(0, |p| p.line());
        match parse_row(&record, patient_col, stage_col, line) {
            Ok(row) => rows.push(row),
            Err(e) => warn!("{e}, row skipped"),
        }
    }
    debug!("{} rows loaded from {}", rows.len(), origin.display());
    Ok(rows)
}

fn parse_row(
    record: &csv::StringRecord,
    patient_col: usize,
    stage_col: usize,
    line: u64,
) -> Result<ManifestRow> {
    let field = |col: usize, name: &str| match record.get(col) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::MalformedManifestRow {
            line,
            reason: format!("empty `{name}`"),
        }),
    };
    let patient = field(patient_col, "patient")?;
    let stage = field(stage_col, "stage")?;
    // 分期标签会成为输出子目录名
    if matches!(stage, "." | "..") || stage.contains(['/', '\\']) {
        return Err(Error::MalformedManifestRow {
            line,
            reason: format!("stage `{stage}` is not a plain directory name"),
        });
    }
    Ok(ManifestRow::new(patient, Stage::parse(stage)))
}

/// 按分期筛选清单行.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageFilter {
    /// 保留全部分期.
    #[default]
    All,

    /// 只保留阴性.
    NegativeOnly,

    /// 去掉阴性.
    ExcludeNegative,
}

impl StageFilter {
    /// 分期 `stage` 是否被保留?
    #[inline]
    pub fn keeps(&self, stage: &Stage) -> bool {
        match self {
            Self::All => true,
            Self::NegativeOnly => stage.is_negative(),
            Self::ExcludeNegative => !stage.is_negative(),
        }
    }
}

impl FromStr for StageFilter {
    type Err = ParseChoiceError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "negative-only" => Ok(Self::NegativeOnly),
            "exclude-negative" => Ok(Self::ExcludeNegative),
            other => Err(ParseChoiceError::new(
                "stage filter",
                other,
                "all, negative-only, exclude-negative",
            )),
        }
    }
}

/// 清单过滤规则.
#[derive(Clone, Debug, PartialEq)]
pub struct ManifestFilter {
    /// 文件名必须包含该扩展名 (大小写不敏感).
    pub slide_extension: String,

    /// 分期筛选.
    pub stages: StageFilter,

    /// 每个分期最多保留的行数 (按清单顺序). 用于小规模试跑.
    pub per_stage_cap: Option<usize>,
}

impl ManifestFilter {
    /// 应用过滤规则. 保留行的相对顺序不变.
    pub fn apply(&self, rows: Vec<ManifestRow>) -> Vec<ManifestRow> {
        let ext = self.slide_extension.to_lowercase();
        let mut taken: HashMap<Stage, usize> = HashMap::new();
        rows.into_iter()
            .filter(|row| row.patient.to_lowercase().contains(&ext))
            .filter(|row| self.stages.keeps(&row.stage))
            .filter(|row| match self.per_stage_cap {
                Some(cap) => {
                    let n = taken.entry(row.stage.clone()).or_insert(0);
                    *n += 1;
                    *n <= cap
                }
                None => true,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const CSV: &str = "\
patient,stage,center
patient_000_node_0.tif,negative,0
patient_000_node_1.TIF,macro,0
patient_001_node_2.tif,micro,1
patient_001_node_3.tif,itc,1
patient_002_node_0.tif,macro,2
patient_003.zip,macro,3
patient_004_node_1.tif,macro,4
,macro,5
patient_005_node_4.tif,,5
patient_006_node_0.tif,negative,6
";

    fn rows() -> Vec<ManifestRow> {
        read_manifest(CSV.as_bytes(), Path::new("<memory>")).unwrap()
    }

    fn filter(stages: StageFilter, cap: Option<usize>) -> ManifestFilter {
        ManifestFilter {
            slide_extension: ".tif".into(),
            stages,
            per_stage_cap: cap,
        }
    }

    #[test]
    fn test_stage_round_trip() {
        for s in ["negative", "itc", "micro", "macro", "pN1"] {
            assert_eq!(Stage::parse(s).as_str(), s);
        }
        assert_eq!(Stage::parse("Negative"), Stage::Other("Negative".into()));
        assert!(Stage::parse("negative").is_negative());
    }

    #[test]
    fn test_patient_id() {
        let row = ManifestRow::new("patient_000_node_0.tif", Stage::Macro);
        assert_eq!(row.patient_id(), "patient_000_node_0");
        let row = ManifestRow::new("slide.ome.tif", Stage::Macro);
        assert_eq!(row.patient_id(), "slide");
        let row = ManifestRow::new("bare", Stage::Macro);
        assert_eq!(row.patient_id(), "bare");
    }

    /// 空字段的行被跳过, 其余行保持顺序.
    #[test]
    fn test_read_manifest_skips_malformed() {
        let rows = rows();
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[0], ManifestRow::new("patient_000_node_0.tif", Stage::Negative));
        assert_eq!(rows[7].patient, "patient_006_node_0.tif");
    }

    #[test]
    fn test_stage_cannot_leave_save_dir() {
        let text = "patient,stage\n\
                    a.tif,../x\n\
                    b.tif,/abs\n\
                    c.tif,..\n\
                    d.tif,sub\\dir\n\
                    e.tif,macro\n";
        let rows = read_manifest(text.as_bytes(), Path::new("m.csv")).unwrap();
        assert_eq!(rows, [ManifestRow::new("e.tif", Stage::Macro)]);

        let record = csv::StringRecord::from(vec!["a.tif", "../x"]);
        assert!(matches!(
            parse_row(&record, 0, 1, 2),
            Err(Error::MalformedManifestRow { line: 2, .. })
        ));
    }

    #[test]
    fn test_missing_column() {
        let err = read_manifest("patient,label\na.tif,macro\n".as_bytes(), Path::new("m.csv"))
            .unwrap_err();
        assert!(matches!(err, Error::Manifest { .. }));
    }

    #[test]
    fn test_missing_manifest_file() {
        let err = load_manifest("/definitely/not/here.csv").unwrap_err();
        assert!(err.is_missing_file());
    }

    #[test]
    fn test_filter_extension_and_stage() {
        let all = filter(StageFilter::All, None).apply(rows());
        assert_eq!(all.len(), 7);
        assert!(all.iter().all(|r| r.patient != "patient_003.zip"));

        let positive = filter(StageFilter::ExcludeNegative, None).apply(rows());
        assert_eq!(positive.len(), 5);
        assert!(positive.iter().all(|r| !r.stage.is_negative()));

        let negative = filter(StageFilter::NegativeOnly, None).apply(rows());
        assert_eq!(negative.len(), 2);
    }

    #[test]
    fn test_filter_per_stage_cap() {
        let capped = filter(StageFilter::All, Some(1)).apply(rows());
        let names: Vec<&str> = capped.iter().map(|r| r.patient.as_str()).collect();
        assert_eq!(
            names,
            [
                "patient_000_node_0.tif",
                "patient_000_node_1.TIF",
                "patient_001_node_2.tif",
                "patient_001_node_3.tif",
            ]
        );
    }

    #[test]
    fn test_stage_filter_from_str() {
        assert_eq!("negative-only".parse(), Ok(StageFilter::NegativeOnly));
        assert!("positive".parse::<StageFilter>().is_err());
    }
}
