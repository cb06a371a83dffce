//! WSI 图像块数据集的命令行工具.

mod result;
mod subcmd_impls;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use subcmd_impls::{Extract, Validate};

#[derive(Parser, Debug)]
#[command(name = "patch-tools")]
#[command(version, about = "从全切片病理图像中提取、筛选并核验图像块", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 输出更多日志 (`-v` 为 debug, `-vv` 为 trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// 只输出警告和错误.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 按清单提取图像块并保存到各分期目录.
    Extract(Extract),

    /// 核验图像块与标注的包含关系, 输出 IoU.
    Validate(Validate),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    utils::init_logger(utils::level_from_flags(cli.verbose, cli.quiet))?;

    match cli.command {
        Commands::Extract(mut cmd) => cmd.run(),
        Commands::Validate(mut cmd) => cmd.run(),
    }
}
