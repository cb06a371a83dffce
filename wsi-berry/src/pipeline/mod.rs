//! 从清单到图像块数据集的完整流程.
//!
//! 对每一行清单:
//!
//! 1. 读取候选坐标;
//! 2. 非阴性且需要筛选时读取标注, 标注缺失则跳过该病人;
//! 3. 打开切片, 选取下标 (见 [`crate::select`]);
//! 4. 对每个被选中的坐标, 先判断相关性 (阴性不判断), 再裁剪;
//! 5. 分批写入 `{save_dir}/{stage}`.
//!
//! 切片、坐标和标注只在处理该行期间持有.

use crate::data::annotation::parse_xml;
use crate::data::coords::open_coord_list;
use crate::data::manifest::load_manifest;
use crate::patch::save_in_batches;
use crate::relevance::PatchSquare;
use crate::select::{select_for_stage, NegativeBudget};
use crate::{
    Error, ImageSlideOpener, ManifestRow, MissingFilePolicy, NamedPatch, NamingScheme, Patch,
    PipelineConfig, Result, SlideOpener, Stage,
};
use itertools::Itertools;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;

mod report;

pub use report::{RowOutcome, RowStatus, RunReport};

/// 处理流程. `O` 决定如何打开切片.
#[derive(Clone, Debug)]
pub struct Pipeline<O = ImageSlideOpener> {
    config: PipelineConfig,
    opener: O,
}

impl Pipeline<ImageSlideOpener> {
    /// 使用 [`ImageSlideOpener`] 创建流程.
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_opener(config, ImageSlideOpener)
    }
}

impl<O: SlideOpener> Pipeline<O> {
    /// 使用自定义的切片后端创建流程.
    pub fn with_opener(config: PipelineConfig, opener: O) -> Self {
        Self { config, opener }
    }

    /// 配置.
    #[inline]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 加载并过滤清单.
    pub fn load_rows(&self) -> Result<Vec<ManifestRow>> {
        let rows = load_manifest(&self.config.stage_csv)?;
        let total = rows.len();
        let rows = self.config.manifest_filter().apply(rows);
        info!("{} of {total} manifest rows selected", rows.len());
        Ok(rows)
    }

    /// 加载清单并顺序处理全部行.
    pub fn run(&self) -> Result<RunReport> {
        let rows = self.load_rows()?;
        self.run_rows(&rows, |_| {})
    }

    /// 顺序处理 `rows`. 每处理完一行调用一次 `on_row`.
    ///
    /// 只有在 [`MissingFilePolicy::Fail`] 下输入缺失, 或者出现其它错误时才返回 `Err`.
    pub fn run_rows<F: FnMut(&RowOutcome)>(
        &self,
        rows: &[ManifestRow],
        mut on_row: F,
    ) -> Result<RunReport> {
        let budget = self.config.negative_budget()?;
        let seed = self.base_seed();
        self.warn_name_collisions(rows);
        let mut report = RunReport::default();
        for (index, row) in rows.iter().enumerate() {
            let outcome = self.process_row(row, &budget, row_rng(seed, index))?;
            on_row(&outcome);
            report.push(outcome);
        }
        Ok(report)
    }

    fn warn_name_collisions(&self, rows: &[ManifestRow]) {
        for stage in colliding_stages(self.config.naming, rows) {
            warn!(
                "indexed naming: several patients share stage `{stage}`, \
                 their patches will overwrite each other in {}",
                self.config.stage_dir(stage).display()
            );
        }
    }

    fn base_seed(&self) -> u64 {
        match self.config.seed {
            Some(seed) => seed,
            None => {
                let seed = rand::random();
                info!("no seed given, using {seed}");
                seed
            }
        }
    }

    /// 输入文件缺失时按策略决定跳过还是报错. 跳过时返回原因.
    fn tolerate<T>(&self, res: Result<T>) -> Result<std::result::Result<T, String>> {
        match res {
            Ok(v) => Ok(Ok(v)),
            Err(e) if e.is_missing_file() && self.config.on_missing == MissingFilePolicy::Skip => {
                Ok(Err(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// 处理一行清单.
    pub fn process_row(
        &self,
        row: &ManifestRow,
        budget: &NegativeBudget,
        mut rng: StdRng,
    ) -> Result<RowOutcome> {
        let config = &self.config;
        let id = row.patient_id();
        let mut outcome = RowOutcome::new(row);

        let coords = match self.tolerate(open_coord_list(config.coord_path(id)))? {
            Ok(coords) => coords,
            Err(reason) => {
                warn!("{id}: {reason}, skipped");
                return Ok(outcome.skipped(reason));
            }
        };
        outcome.candidates = coords.len();

        let policy = config.relevance_policy();
        let filtering = policy.is_filtering() && !row.stage.is_negative();
        let annotations = if filtering {
            match parse_xml(config.xml_path(id)) {
                Ok(a) => a,
                Err(e) if e.is_missing_file() => {
                    warn!("{id}: {e}, skipped");
                    return Ok(outcome.skipped(e.to_string()));
                }
                Err(e) => return Err(e),
            }
        } else {
            Vec::new()
        };

        let slide = match self.tolerate(self.opener.open(&config.slide_path(id)))? {
            Ok(slide) => slide,
            Err(reason) => {
                warn!("{id}: {reason}, skipped");
                return Ok(outcome.skipped(reason));
            }
        };

        let indices = select_for_stage(&row.stage, coords.len(), budget, &mut rng)?;
        outcome.selected = indices.len();
        info!(
            "{id} ({}): {} candidates, {} selected",
            row.stage,
            coords.len(),
            indices.len()
        );

        let stage_dir = config.stage_dir(&row.stage);
        let mut patches = Vec::new();
        for i in indices {
            let coord = coords[i];
            if filtering {
                let square = PatchSquare::new(coord, config.patch_size);
                if !policy.accepts(&square, &annotations) {
                    debug!("{id}: patch at ({}, {}) rejected", coord.x, coord.y);
                    continue;
                }
            }
            let patch = Patch::crop(&slide, coord, config.patch_size)?;
            let name = config.naming.file_name(id, patches.len(), coord);
            patches.push(NamedPatch {
                path: stage_dir.join(name),
                patch,
            });
        }
        drop(slide);

        fs::create_dir_all(&stage_dir).map_err(Error::io(&stage_dir))?;
        outcome.saved = save_in_batches(&patches, config.batch_size)?;
        info!("{id}: {} patches saved to {}", outcome.saved, stage_dir.display());
        Ok(outcome)
    }
}

/// 按序号命名时, 有多个病人写入同一目录的分期.
fn colliding_stages(naming: NamingScheme, rows: &[ManifestRow]) -> Vec<&Stage> {
    if naming != NamingScheme::Indexed {
        return Vec::new();
    }
    rows.iter()
        .map(|r| &r.stage)
        .counts()
        .into_iter()
        .filter(|&(_, n)| n > 1)
        .map(|(stage, _)| stage)
        .sorted_by(|a, b| a.as_str().cmp(b.as_str()))
        .collect()
}

#[inline]
fn row_rng(seed: u64, index: usize) -> StdRng {
    StdRng::seed_from_u64(seed.wrapping_add(index as u64))
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::prelude::*;

        impl<O: SlideOpener + Sync> Pipeline<O> {
            /// 加载清单并在 rayon 线程池上并行处理.
            pub fn run_parallel(&self) -> Result<RunReport> {
                let rows = self.load_rows()?;
                self.run_rows_parallel(&rows, |_| {})
            }

            /// 并行处理 `rows`. 结果与顺序执行相同, 仍按清单顺序排列.
            ///
            /// 每行的随机数生成器只由种子和行号决定, 与调度无关.
            pub fn run_rows_parallel<F: Fn(&RowOutcome) + Sync>(
                &self,
                rows: &[ManifestRow],
                on_row: F,
            ) -> Result<RunReport> {
                let budget = self.config.negative_budget()?;
                let seed = self.base_seed();
                self.warn_name_collisions(rows);
                rows.par_iter()
                    .enumerate()
                    .map(|(index, row)| {
                        let outcome = self.process_row(row, &budget, row_rng(seed, index))?;
                        on_row(&outcome);
                        Ok(outcome)
                    })
                    .collect::<Result<Vec<_>>>()
                    .map(RunReport::from_iter)
            }
        }
    }
}
