//! 运行结果汇总.

use crate::{ManifestRow, Stage};
use itertools::Itertools;
use std::collections::BTreeMap;

/// 一行清单的处理状态.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RowStatus {
    /// 已处理 (可能一个图像块都没有保存).
    Done,

    /// 因输入缺失而跳过, 附带原因.
    Skipped(String),
}

/// 一行清单的处理结果.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RowOutcome {
    /// 病人 ID.
    pub patient: String,
    /// 分期.
    pub stage: Stage,
    /// 候选坐标个数.
    pub candidates: usize,
    /// 被选取的坐标个数 (筛选之前).
    pub selected: usize,
    /// 实际保存的图像块个数.
    pub saved: usize,
    /// 状态.
    pub status: RowStatus,
}

impl RowOutcome {
    pub(crate) fn new(row: &ManifestRow) -> Self {
        Self {
            patient: row.patient_id().to_owned(),
            stage: row.stage.clone(),
            candidates: 0,
            selected: 0,
            saved: 0,
            status: RowStatus::Done,
        }
    }

    pub(crate) fn skipped(mut self, reason: String) -> Self {
        self.status = RowStatus::Skipped(reason);
        self
    }

    /// 是否被跳过?
    #[inline]
    pub fn is_skipped(&self) -> bool {
        matches!(self.status, RowStatus::Skipped(_))
    }
}

/// 一次运行的全部结果, 按清单顺序排列.
#[derive(Clone, Debug, Default)]
pub struct RunReport {
    rows: Vec<RowOutcome>,
}

impl RunReport {
    /// 追加一行结果.
    #[inline]
    pub fn push(&mut self, outcome: RowOutcome) {
        self.rows.push(outcome);
    }

    /// 全部结果.
    #[inline]
    pub fn rows(&self) -> &[RowOutcome] {
        &self.rows
    }

    /// 处理完成的行数.
    pub fn processed(&self) -> usize {
        self.rows.iter().filter(|r| !r.is_skipped()).count()
    }

    /// 被跳过的行数.
    pub fn skipped(&self) -> usize {
        self.rows.iter().filter(|r| r.is_skipped()).count()
    }

    /// 保存的图像块总数.
    pub fn total_saved(&self) -> usize {
        self.rows.iter().map(|r| r.saved).sum()
    }

    /// 每个分期保存的图像块个数, 按分期名排序. 包括被跳过的行所在的分期.
    pub fn saved_by_stage(&self) -> BTreeMap<String, usize> {
        self.rows
            .iter()
            .map(|r| (r.stage.to_string(), r.saved))
            .into_grouping_map()
            .sum()
            .into_iter()
            .collect()
    }
}

impl FromIterator<RowOutcome> for RunReport {
    fn from_iter<I: IntoIterator<Item = RowOutcome>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(patient: &str, stage: Stage, saved: usize) -> RowOutcome {
        let mut o = RowOutcome::new(&ManifestRow::new(format!("{patient}.tif"), stage));
        o.saved = saved;
        o
    }

    #[test]
    fn test_totals() {
        let report: RunReport = [
            outcome("a", Stage::Macro, 3),
            outcome("b", Stage::Negative, 50),
            outcome("c", Stage::Macro, 2),
            outcome("d", Stage::Itc, 0).skipped("annotation not found".into()),
        ]
        .into_iter()
        .collect();

        assert_eq!(report.rows()[0].patient, "a");
        assert_eq!(report.processed(), 3);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.total_saved(), 55);

        let by_stage: Vec<(String, usize)> = report.saved_by_stage().into_iter().collect();
        assert_eq!(
            by_stage,
            [
                ("itc".to_string(), 0),
                ("macro".to_string(), 5),
                ("negative".to_string(), 50),
            ]
        );
    }
}
