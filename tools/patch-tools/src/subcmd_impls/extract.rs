use crate::result;
use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use utils::loader;
use wsi_berry::prelude::*;

#[derive(Args, Debug, Default)]
pub struct Extract {
    /// TOML 配置文件. 命令行参数优先于其中的字段.
    /// 缺省时尝试 `$WSI_BERRY_CONFIG` 或 `$HOME/dataset/wsi-berry.toml`.
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
    /// 病人/分期清单 CSV.
    #[arg(long = "stage_csv", visible_alias = "stage-csv")]
    stage_csv: Option<PathBuf>,
    /// 切片目录.
    #[arg(long = "wsi_dir", visible_alias = "wsi-dir")]
    wsi_dir: Option<PathBuf>,
    /// 坐标文件目录.
    #[arg(long = "h5_dir", visible_alias = "h5-dir")]
    h5_dir: Option<PathBuf>,
    /// 标注目录.
    #[arg(long = "xml_dir", visible_alias = "xml-dir")]
    xml_dir: Option<PathBuf>,
    /// 输出目录.
    #[arg(long = "save_dir", visible_alias = "save-dir")]
    save_dir: Option<PathBuf>,
    /// 阴性切片分组个数 (默认 2).
    #[arg(long = "NWN", visible_alias = "nwn")]
    nwn: Option<u32>,
    /// 阴性图像块总预算 (默认 100).
    #[arg(long = "NC", visible_alias = "nc")]
    nc: Option<u32>,
    /// 图像块边长 (默认 256).
    #[arg(long)]
    patch_size: Option<u32>,
    /// 每批写盘个数 (默认 100).
    #[arg(long)]
    batch_size: Option<usize>,
    /// 切片扩展名 (默认 `.tif`).
    #[arg(long)]
    slide_extension: Option<String>,
    /// 坐标文件扩展名 (默认 `h5`).
    #[arg(long)]
    coord_extension: Option<String>,
    /// 相关性策略: none, containment, iou (默认).
    #[arg(long)]
    policy: Option<PolicyKind>,
    /// IoU 阈值 (默认 0.1).
    #[arg(long)]
    iou_threshold: Option<f64>,
    /// 分期筛选: all (默认), negative-only, exclude-negative.
    #[arg(long)]
    stages: Option<StageFilter>,
    /// 每个分期最多处理的行数.
    #[arg(long)]
    per_stage_cap: Option<usize>,
    /// 命名方式: patient (默认), indexed.
    #[arg(long)]
    naming: Option<NamingScheme>,
    /// 切片或坐标文件缺失时: skip (默认), fail.
    #[arg(long)]
    on_missing: Option<MissingFilePolicy>,
    /// 随机种子.
    #[arg(long)]
    seed: Option<u64>,
    /// 多病人并行处理.
    #[cfg(feature = "rayon")]
    #[arg(long, short = 'j')]
    parallel: bool,
    /// 不显示进度条.
    #[arg(long)]
    no_progress: bool,
}

impl Extract {
    pub fn run(&mut self) -> Result<()> {
        let base = match self.config.take() {
            Some(path) => RawConfig::from_toml_file(&path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => loader::default_raw_config()
                .context("failed to load the default config")?
                .unwrap_or_default(),
        };
        let config = base
            .merge(self.take_raw())
            .build()
            .context("invalid configuration")?;

        #[cfg(feature = "rayon")]
        let parallel = self.parallel;
        #[cfg(not(feature = "rayon"))]
        let parallel = false;

        Program::new(config, parallel, !self.no_progress).run()
    }

    /// 命令行中给出的配置字段.
    fn take_raw(&mut self) -> RawConfig {
        RawConfig {
            stage_csv: self.stage_csv.take(),
            wsi_dir: self.wsi_dir.take(),
            h5_dir: self.h5_dir.take(),
            xml_dir: self.xml_dir.take(),
            save_dir: self.save_dir.take(),
            nwn: self.nwn,
            nc: self.nc,
            patch_size: self.patch_size,
            batch_size: self.batch_size,
            slide_extension: self.slide_extension.take(),
            coord_extension: self.coord_extension.take(),
            policy: self.policy,
            iou_threshold: self.iou_threshold,
            stages: self.stages,
            per_stage_cap: self.per_stage_cap,
            naming: self.naming,
            on_missing: self.on_missing,
            seed: self.seed,
        }
    }
}

struct Program {
    pipeline: Pipeline,
    parallel: bool,
    progress: bool,
}

impl Program {
    #[inline]
    pub fn new(config: PipelineConfig, parallel: bool, progress: bool) -> Self {
        Self {
            pipeline: Pipeline::new(config),
            parallel,
            progress,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let rows = self.pipeline.load_rows().context("failed to load manifest")?;

        let pb = if self.progress {
            ProgressBar::new(rows.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .context("bad progress template")?
                .progress_chars("#>-"),
        );
        let on_row = |o: &RowOutcome| {
            pb.set_message(o.patient.clone());
            pb.inc(1);
        };

        let report = if self.parallel {
            self.run_parallel(&rows, on_row)?
        } else {
            self.pipeline.run_rows(&rows, on_row)?
        };
        pb.finish_and_clear();

        result::summarize(self.pipeline.config(), &report)?;
        Ok(())
    }

    #[cfg(feature = "rayon")]
    fn run_parallel<F: Fn(&RowOutcome) + Sync>(
        &self,
        rows: &[ManifestRow],
        on_row: F,
    ) -> wsi_berry::Result<RunReport> {
        self.pipeline.run_rows_parallel(rows, on_row)
    }

    #[cfg(not(feature = "rayon"))]
    fn run_parallel<F: Fn(&RowOutcome) + Sync>(
        &self,
        rows: &[ManifestRow],
        on_row: F,
    ) -> wsi_berry::Result<RunReport> {
        self.pipeline.run_rows(rows, on_row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_fields_become_raw_config() {
        let mut cmd = Extract {
            stage_csv: Some("s.csv".into()),
            nwn: Some(4),
            policy: Some(PolicyKind::Containment),
            ..Default::default()
        };
        let raw = cmd.take_raw();
        assert_eq!(raw.stage_csv, Some(PathBuf::from("s.csv")));
        assert_eq!(raw.nwn, Some(4));
        assert_eq!(raw.policy, Some(PolicyKind::Containment));
        assert_eq!(raw.nc, None);
        assert!(cmd.stage_csv.is_none());
    }

    #[test]
    fn test_default_is_empty() {
        let mut cmd = Extract::default();
        assert_eq!(cmd.take_raw(), RawConfig::default());
    }
}
