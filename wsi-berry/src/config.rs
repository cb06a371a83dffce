//! 流程配置.
//!
//! 配置来自 TOML 文件和命令行两层. 两者都先解析为字段全部可选的 [`RawConfig`],
//! 合并后通过 [`RawConfig::build`] 得到校验过的 [`PipelineConfig`].
//!
//! ```toml
//! stage_csv = "/data/camelyon17/stage_labels.csv"
//! wsi_dir = "/data/camelyon17/images"
//! h5_dir = "/data/camelyon17/patches"
//! xml_dir = "/data/camelyon17/annotations"
//! save_dir = "/data/camelyon17/dataset"
//! NWN = 2
//! NC = 100
//! policy = "iou"
//! iou_threshold = 0.1
//! ```

use crate::consts::{
    DEFAULT_BATCH_SIZE, DEFAULT_COORD_EXTENSION, DEFAULT_IOU_THRESHOLD, DEFAULT_NC, DEFAULT_NWN,
    DEFAULT_PATCH_SIZE, DEFAULT_SLIDE_EXTENSION,
};
use crate::error::ParseChoiceError;
use crate::select::NegativeBudget;
use crate::{
    Error, ManifestFilter, NamingScheme, PolicyKind, RelevancePolicy, Result, Stage, StageFilter,
};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// 输入文件 (切片或坐标文件) 缺失时的处理方式.
///
/// 标注文件缺失不受此控制: 该病人总是被跳过.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingFilePolicy {
    /// 记录警告, 跳过该行.
    #[default]
    Skip,

    /// 返回错误, 终止运行.
    Fail,
}

impl FromStr for MissingFilePolicy {
    type Err = ParseChoiceError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "skip" => Ok(Self::Skip),
            "fail" => Ok(Self::Fail),
            other => Err(ParseChoiceError::new("missing-file policy", other, "skip, fail")),
        }
    }
}

/// 未校验的配置. 所有字段都可以缺省.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    /// 清单 CSV.
    pub stage_csv: Option<PathBuf>,
    /// 切片目录.
    pub wsi_dir: Option<PathBuf>,
    /// 坐标文件目录.
    pub h5_dir: Option<PathBuf>,
    /// 标注目录.
    pub xml_dir: Option<PathBuf>,
    /// 输出目录.
    pub save_dir: Option<PathBuf>,
    /// 阴性切片分组个数.
    #[serde(alias = "NWN")]
    pub nwn: Option<u32>,
    /// 阴性图像块总预算.
    #[serde(alias = "NC")]
    pub nc: Option<u32>,
    /// 图像块边长.
    pub patch_size: Option<u32>,
    /// 每批写盘个数.
    pub batch_size: Option<usize>,
    /// 切片扩展名 (含 `.`).
    pub slide_extension: Option<String>,
    /// 坐标文件扩展名 (不含 `.`).
    pub coord_extension: Option<String>,
    /// 相关性策略.
    pub policy: Option<PolicyKind>,
    /// IoU 阈值.
    pub iou_threshold: Option<f64>,
    /// 分期筛选.
    pub stages: Option<StageFilter>,
    /// 每个分期最多处理的行数.
    pub per_stage_cap: Option<usize>,
    /// 命名方式.
    pub naming: Option<NamingScheme>,
    /// 文件缺失时的处理方式.
    pub on_missing: Option<MissingFilePolicy>,
    /// 随机种子.
    pub seed: Option<u64>,
}

macro_rules! merge_fields {
    ($lhs: ident, $rhs: ident; $($field: ident),+ $(,)?) => {
        Self {
            $($field: $rhs.$field.or($lhs.$field),)+
        }
    };
}

impl RawConfig {
    /// 从 TOML 文本解析. `origin` 仅用于错误信息.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self> {
        toml::from_str(text).map_err(|source| Error::Toml {
            path: origin.to_owned(),
            source,
        })
    }

    /// 读取并解析 TOML 文件.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(Error::io(path))?;
        Self::from_toml_str(&text, path)
    }

    /// 合并两层配置, `other` 中给出的字段优先.
    pub fn merge(self, other: Self) -> Self {
        merge_fields!(self, other;
            stage_csv, wsi_dir, h5_dir, xml_dir, save_dir, nwn, nc, patch_size, batch_size,
            slide_extension, coord_extension, policy, iou_threshold, stages, per_stage_cap,
            naming, on_missing, seed,
        )
    }

    /// 填充默认值并校验 (见 [`PipelineConfig::validate`]).
    pub fn build(self) -> Result<PipelineConfig> {
        fn required(v: Option<PathBuf>, name: &str) -> Result<PathBuf> {
            v.ok_or_else(|| Error::Config(format!("`{name}` is required")))
        }
        let threshold = self.iou_threshold.unwrap_or(DEFAULT_IOU_THRESHOLD);
        let config = PipelineConfig {
            stage_csv: required(self.stage_csv, "stage_csv")?,
            wsi_dir: required(self.wsi_dir, "wsi_dir")?,
            h5_dir: required(self.h5_dir, "h5_dir")?,
            xml_dir: required(self.xml_dir, "xml_dir")?,
            save_dir: required(self.save_dir, "save_dir")?,
            nwn: self.nwn.unwrap_or(DEFAULT_NWN),
            nc: self.nc.unwrap_or(DEFAULT_NC),
            patch_size: self.patch_size.unwrap_or(DEFAULT_PATCH_SIZE),
            batch_size: self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            slide_extension: self
                .slide_extension
                .unwrap_or_else(|| DEFAULT_SLIDE_EXTENSION.to_string()),
            coord_extension: self
                .coord_extension
                .unwrap_or_else(|| DEFAULT_COORD_EXTENSION.to_string()),
            policy: RelevancePolicy::from_kind(self.policy.unwrap_or_default(), threshold),
            stages: self.stages.unwrap_or_default(),
            per_stage_cap: self.per_stage_cap,
            naming: self.naming.unwrap_or_default(),
            on_missing: self.on_missing.unwrap_or_default(),
            seed: self.seed,
        };
        config.validate()?;
        Ok(config)
    }
}

/// 校验过的流程配置. 在整个运行期间只读.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    /// 清单 CSV.
    pub stage_csv: PathBuf,
    /// 切片目录.
    pub wsi_dir: PathBuf,
    /// 坐标文件目录.
    pub h5_dir: PathBuf,
    /// 标注目录.
    pub xml_dir: PathBuf,
    /// 输出目录.
    pub save_dir: PathBuf,
    /// 阴性切片分组个数, 大于 0.
    pub nwn: u32,
    /// 阴性图像块总预算.
    pub nc: u32,
    /// 图像块边长, 大于 0.
    pub patch_size: u32,
    /// 每批写盘个数, 大于 0.
    pub batch_size: usize,
    /// 切片扩展名 (含 `.`), 同时用于过滤清单.
    pub slide_extension: String,
    /// 坐标文件扩展名 (不含 `.`).
    pub coord_extension: String,
    /// 相关性策略.
    pub policy: RelevancePolicy,
    /// 分期筛选.
    pub stages: StageFilter,
    /// 每个分期最多处理的行数.
    pub per_stage_cap: Option<usize>,
    /// 命名方式.
    pub naming: NamingScheme,
    /// 文件缺失时的处理方式.
    pub on_missing: MissingFilePolicy,
    /// 随机种子. 为 `None` 时从系统熵源获取.
    pub seed: Option<u64>,
}

impl PipelineConfig {
    /// 使用给定路径和其余字段的默认值创建配置. 不做校验.
    pub fn new(
        stage_csv: impl Into<PathBuf>,
        wsi_dir: impl Into<PathBuf>,
        h5_dir: impl Into<PathBuf>,
        xml_dir: impl Into<PathBuf>,
        save_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            stage_csv: stage_csv.into(),
            wsi_dir: wsi_dir.into(),
            h5_dir: h5_dir.into(),
            xml_dir: xml_dir.into(),
            save_dir: save_dir.into(),
            nwn: DEFAULT_NWN,
            nc: DEFAULT_NC,
            patch_size: DEFAULT_PATCH_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            slide_extension: DEFAULT_SLIDE_EXTENSION.to_string(),
            coord_extension: DEFAULT_COORD_EXTENSION.to_string(),
            policy: RelevancePolicy::default(),
            stages: StageFilter::default(),
            per_stage_cap: None,
            naming: NamingScheme::default(),
            on_missing: MissingFilePolicy::default(),
            seed: None,
        }
    }

    /// 检查取值范围和输入路径. 输出目录不存在时会被创建.
    ///
    /// - `nwn`, `patch_size`, `batch_size` 必须大于 0;
    /// - IoU 阈值位于 `[0, 1)`;
    /// - 未启用 `hdf5` feature 时, `coord_extension` 不能是 `h5` / `hdf5`;
    /// - `stage_csv` 是文件, `wsi_dir`, `h5_dir`, `xml_dir` 是目录.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(Error::Config(msg));
        if self.nwn == 0 {
            return fail("`nwn` must be positive".to_string());
        }
        if self.patch_size == 0 {
            return fail("`patch_size` must be positive".to_string());
        }
        if self.batch_size == 0 {
            return fail("`batch_size` must be positive".to_string());
        }
        if let RelevancePolicy::Iou { threshold } = self.policy {
            if !(0.0..1.0).contains(&threshold) {
                return fail(format!("`iou_threshold` must be in [0, 1), got {threshold}"));
            }
        }
        if self.coord_extension.is_empty() || self.coord_extension.starts_with('.') {
            return fail(format!(
                "`coord_extension` must be a bare extension such as `h5`, got `{}`",
                self.coord_extension
            ));
        }
        if cfg!(not(feature = "hdf5"))
            && matches!(self.coord_extension.to_ascii_lowercase().as_str(), "h5" | "hdf5")
        {
            return fail(format!(
                "`coord_extension` is `{}`, but reading HDF5 requires the `hdf5` feature; \
                 rebuild with `--features hdf5` or convert the coordinates to `.npz`",
                self.coord_extension
            ));
        }
        if !self.stage_csv.is_file() {
            return fail(format!("`stage_csv` {} is not a file", self.stage_csv.display()));
        }
        for (name, dir) in [
            ("wsi_dir", &self.wsi_dir),
            ("h5_dir", &self.h5_dir),
            ("xml_dir", &self.xml_dir),
        ] {
            if !dir.is_dir() {
                return fail(format!("`{name}` {} is not a directory", dir.display()));
            }
        }
        fs::create_dir_all(&self.save_dir).map_err(Error::io(&self.save_dir))?;
        Ok(())
    }

    /// 相关性策略.
    #[inline]
    pub fn relevance_policy(&self) -> RelevancePolicy {
        self.policy
    }

    /// 阴性预算.
    pub fn negative_budget(&self) -> Result<NegativeBudget> {
        NegativeBudget::new(self.nwn, self.nc)
    }

    /// 清单过滤规则.
    pub fn manifest_filter(&self) -> ManifestFilter {
        ManifestFilter {
            slide_extension: self.slide_extension.clone(),
            stages: self.stages,
            per_stage_cap: self.per_stage_cap,
        }
    }

    /// `{wsi_dir}/{patient_id}{slide_extension}`.
    pub fn slide_path(&self, patient_id: &str) -> PathBuf {
        self.wsi_dir
            .join(format!("{patient_id}{}", self.slide_extension))
    }

    /// `{h5_dir}/{patient_id}.{coord_extension}`.
    pub fn coord_path(&self, patient_id: &str) -> PathBuf {
        self.h5_dir
            .join(format!("{patient_id}.{}", self.coord_extension))
    }

    /// `{xml_dir}/{patient_id}.xml`.
    pub fn xml_path(&self, patient_id: &str) -> PathBuf {
        self.xml_dir.join(format!("{patient_id}.xml"))
    }

    /// `{save_dir}/{stage}`.
    pub fn stage_dir(&self, stage: &Stage) -> PathBuf {
        self.save_dir.join(stage.as_str())
    }
}
