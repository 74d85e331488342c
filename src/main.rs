use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use teaching_vocab_linker::{logger, App, Config, WorkMode};

/// 将教学词条关联到 KRDict 词典义项，必要时按义项拆分
#[derive(Parser, Debug)]
#[command(name = "vocab-linker", version, about)]
struct Args {
    /// TOML 配置文件路径
    #[arg(long, env = "KRDICT_RESOLVE_CONFIG")]
    config: Option<PathBuf>,

    /// 只记录决策，不写数据库
    #[arg(long)]
    dry_run: bool,

    /// 选择模式: unlinked | needs_work
    #[arg(long)]
    mode: Option<WorkMode>,

    /// 最多处理的词条数
    #[arg(long)]
    max_rows: Option<usize>,

    /// 每批词条数量
    #[arg(long)]
    batch_size: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // 初始化日志
    logger::init();

    let args = Args::parse();

    // 加载配置：默认值 → 配置文件 → 环境变量 → 命令行
    let base = match &args.config {
        Some(path) => Config::from_toml_file(path)?,
        None => Config::default(),
    };
    let mut config = base.overlay(|name| std::env::var(name).ok())?;

    if args.dry_run {
        config.dry_run = true;
    }
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if let Some(max_rows) = args.max_rows {
        config.max_rows = max_rows;
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }

    // 初始化并运行应用
    let _stats = App::initialize(config).await?.run().await?;

    Ok(())
}
