//! 运行结果.

use itertools::Itertools;
use std::io::{self, Write};
use wsi_berry::{PipelineConfig, RowStatus, RunReport};

/// 将 `report` 的汇总写进 `w` 中.
fn describe_into<W: Write>(config: &PipelineConfig, report: &RunReport, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    writeln!(w, "Output: {}", config.save_dir.display())?;
    writeln!(w, "{S4}Rows processed: {}", report.processed())?;
    writeln!(w, "{S4}Rows skipped: {}", report.skipped())?;
    writeln!(w, "{S4}Patches saved: {}", report.total_saved())?;
    for (stage, n) in report.saved_by_stage() {
        writeln!(w, "{S4}{S4}{stage}: {n}")?;
    }

    let skipped = report
        .rows()
        .iter()
        .filter_map(|r| match &r.status {
            RowStatus::Skipped(reason) => Some(format!("{S4}{S4}{}: {reason}", r.patient)),
            RowStatus::Done => None,
        })
        .join("\n");
    if !skipped.is_empty() {
        writeln!(w, "{S4}Skipped rows:")?;
        writeln!(w, "{skipped}")?;
    }
    Ok(())
}

/// 在标准输出打印运行汇总.
pub fn summarize(config: &PipelineConfig, report: &RunReport) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    utils::sep_to(&mut out)?;
    describe_into(config, report, &mut out)?;
    utils::sep_to(&mut out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wsi_berry::{RowOutcome, Stage};

    #[test]
    fn test_describe_into() {
        let config = PipelineConfig::new("s.csv", "w", "h", "x", "/tmp/out");
        let report: RunReport = [
            RowOutcome {
                patient: "patient_000_node_0".into(),
                stage: Stage::Negative,
                candidates: 80,
                selected: 50,
                saved: 50,
                status: RowStatus::Done,
            },
            RowOutcome {
                patient: "patient_001_node_1".into(),
                stage: Stage::Macro,
                candidates: 0,
                selected: 0,
                saved: 0,
                status: RowStatus::Skipped("annotation file not found".into()),
            },
        ]
        .into_iter()
        .collect();

        let mut buf = Vec::new();
        describe_into(&config, &report, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Rows processed: 1"));
        assert!(text.contains("Rows skipped: 1"));
        assert!(text.contains("negative: 50"));
        assert!(text.contains("patient_001_node_1: annotation file not found"));
    }
}
