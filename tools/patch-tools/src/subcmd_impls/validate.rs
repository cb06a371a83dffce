use anyhow::{Context, Result};
use clap::Args;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use wsi_berry::consts::DEFAULT_PATCH_SIZE;
use wsi_berry::data::annotation::parse_xml;
use wsi_berry::validate::{self, ValidationRecord};

#[derive(Args, Debug)]
pub struct Validate {
    /// 标注 XML 文件.
    #[arg(long = "xml_path", visible_alias = "xml-path")]
    xml_path: PathBuf,
    /// 已写出的图像块目录, 或者坐标文件.
    #[arg(long = "patches_path", visible_alias = "patches-path")]
    patches_path: PathBuf,
    /// 图像块边长.
    #[arg(long = "patch_size", visible_alias = "patch-size", default_value_t = DEFAULT_PATCH_SIZE)]
    patch_size: u32,
    /// 将记录以 CSV 格式写入该文件.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

impl Validate {
    pub fn run(&mut self) -> Result<()> {
        let annotations = parse_xml(&self.xml_path)
            .with_context(|| format!("failed to read {}", self.xml_path.display()))?;
        let patches = validate::load_patches(&self.patches_path)
            .with_context(|| format!("failed to read {}", self.patches_path.display()))?;
        log::info!(
            "{} patches, {} annotations",
            patches.len(),
            annotations.len()
        );

        let records = validate::validate_patches(&annotations, patches, self.patch_size);
        for r in records.iter() {
            print_record(r);
        }
        if let Some(best) = validate::best_record(&records) {
            utils::sep();
            println!("Best match:");
            print_record(best);
        }

        if let Some(ref path) = self.output {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            validate::write_report(&records, BufWriter::new(file))
                .with_context(|| format!("failed to write {}", path.display()))?;
            log::info!("{} records written to {}", records.len(), path.display());
        }
        Ok(())
    }
}

#[inline]
fn print_record(r: &ValidationRecord) {
    println!(
        "Patch ID: {}, Annotation: {}, IoU: {:.2}",
        r.patch_id, r.annotation_name, r.iou
    );
}
