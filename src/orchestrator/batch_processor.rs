//! 批量词条处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责选择待处理词条并逐批驱动流程。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：校验配置、连接数据库、创建判定服务
//! 2. **选择词条**：按 `unlinked` / `needs_work` 策略选出待处理词条
//! 3. **分批处理**：按固定大小切批，逐批顺序执行，批间固定间隔
//! 4. **全局统计**：汇总所有批次结果，报告剩余未关联词条数
//!
//! ## 断点续跑
//!
//! 每批独立提交。中途失败后重跑，选择条件会自然排除已处理的词条，
//! 不需要额外的检查点文件。

use std::sync::Arc;

use tracing::warn;

use crate::config::Config;
use crate::error::Result;
use crate::infrastructure::{self, Database};
use crate::services::{DisambiguationOracle, LlmService, SelectionPolicy, VocabRepository};
use crate::utils::logging::{
    log_batch_complete, log_batch_start, log_rows_selected, log_startup, print_final_stats,
};
use crate::workflow::{BatchCtx, BatchFlow};

/// 应用主结构
pub struct App {
    config: Config,
    db: Database,
    oracle: Arc<dyn DisambiguationOracle>,
}

/// 运行统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub selected: usize,
    pub batches: usize,
    pub processed: usize,
    pub singles: usize,
    pub splits: usize,
    pub inserted: usize,
    /// 运行结束时仍未关联的词条数
    pub remaining_unlinked: i64,
}

impl App {
    /// 初始化应用
    ///
    /// 配置不完整时在选择任何数据之前失败。
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate()?;
        log_startup(&config);

        let db = infrastructure::connect(&config.database_url).await?;
        let oracle: Arc<dyn DisambiguationOracle> = Arc::new(LlmService::new(&config)?);

        Ok(Self {
            config,
            db,
            oracle,
        })
    }

    /// 使用现成的数据库句柄和判定服务创建
    pub fn with_parts(config: Config, db: Database, oracle: Arc<dyn DisambiguationOracle>) -> Self {
        Self {
            config,
            db,
            oracle,
        }
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<RunStats> {
        let repo = VocabRepository::new(self.db.clone(), self.config.tables());

        // 选择待处理词条
        let rows = repo.select_pending(&self.selection_policy()).await?;

        let mut stats = RunStats {
            selected: rows.len(),
            ..Default::default()
        };

        if rows.is_empty() {
            warn!("⚠️ 没有需要处理的词条 (模式: {})，程序结束", self.config.mode);
            stats.remaining_unlinked = repo.count_unlinked().await?;
            return Ok(stats);
        }

        log_rows_selected(rows.len(), self.config.batch_size, self.config.mode);

        let flow = BatchFlow::new(&self.config, self.db.clone(), self.oracle.clone());
        let batch_size = self.config.batch_size;

        // 分批处理
        for (index, batch) in rows.chunks(batch_size).enumerate() {
            let ctx = BatchCtx::new(index * batch_size, batch.len(), batch_size, rows.len());
            log_batch_start(&ctx);

            let outcome = flow.run(batch, &ctx).await?;

            stats.batches += 1;
            stats.processed += outcome.rows;
            stats.singles += outcome.singles;
            stats.splits += outcome.splits;
            stats.inserted += outcome.inserted;

            log_batch_complete(&ctx, &outcome, stats.processed);

            // 批间固定间隔
            if !ctx.is_last() && !self.config.pacing().is_zero() {
                tokio::time::sleep(self.config.pacing()).await;
            }
        }

        stats.remaining_unlinked = repo.count_unlinked().await?;
        print_final_stats(&stats, &self.config);

        Ok(stats)
    }

    fn selection_policy(&self) -> SelectionPolicy {
        SelectionPolicy {
            mode: self.config.mode,
            rework_markers: self.config.rework_markers.clone(),
            max_rows: self.config.max_rows,
        }
    }
}
