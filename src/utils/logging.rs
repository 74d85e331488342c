//! 日志工具模块
//!
//! 提供日志格式化和输出的辅助函数

use tracing::info;

use crate::config::Config;
use crate::models::WorkMode;
use crate::orchestrator::RunStats;
use crate::workflow::{BatchCtx, BatchOutcome};

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 词典义项关联模式");
    info!("🤖 模型: {}", config.openai_model);
    info!("📚 词条表: {}", config.teaching_table);
    info!("📖 词典表: {}", config.krdict_table);
    info!("🧭 选择模式: {}", config.mode);
    if config.dry_run {
        info!("📝 演练模式: 只记录决策，不写数据库");
    }
    info!("{}", "=".repeat(60));
}

/// 记录词条选择结果
///
/// # 参数
/// - `total`: 选中的词条数
/// - `batch_size`: 每批词条数
/// - `mode`: 选择模式
pub fn log_rows_selected(total: usize, batch_size: usize, mode: WorkMode) {
    info!("✓ 找到 {} 个待处理的词条 (模式: {})", total, mode);
    info!("📋 将以每批 {} 个的方式处理", batch_size);
    info!("💡 每批提交后再开始下一批\n");
}

/// 记录批次开始信息
pub fn log_batch_start(ctx: &BatchCtx) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批", ctx.batch_num, ctx.total_batches);
    info!(
        "📄 本批词条: {}-{} / 共 {} 个",
        ctx.first_row, ctx.last_row, ctx.total_rows
    );
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
///
/// # 参数
/// - `ctx`: 批次上下文
/// - `outcome`: 本批结果
/// - `processed`: 累计处理数
pub fn log_batch_complete(ctx: &BatchCtx, outcome: &BatchOutcome, processed: usize) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ 第 {} 批完成: 单义 {}，拆分 {} (新增 {} 行)",
        ctx.batch_num, outcome.singles, outcome.splits, outcome.inserted
    );
    info!("📈 累计处理: {}/{}", processed, ctx.total_rows);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(stats: &RunStats, config: &Config) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 已处理: {}/{}", stats.processed, stats.selected);
    info!("🔗 单义关联: {}", stats.singles);
    info!("✂️ 拆分: {} (新增 {} 行)", stats.splits, stats.inserted);
    info!("❓ 剩余未关联: {}", stats.remaining_unlinked);
    info!("{}", "=".repeat(60));
    if config.dry_run {
        info!("📝 演练模式，数据库未改动");
    }
    info!("\n审计日志已保存至: {}", config.audit_log_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
