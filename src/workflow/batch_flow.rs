//! 批次处理流程 - 流程层
//!
//! 核心职责：定义"一个批次"的完整处理流程
//!
//! 流程顺序：
//! 1. 候选检索 → 完整性检查
//! 2. 判定服务 → 结果校验
//! 3. 生成写入计划 → 事务内写入 → 审计日志 → 提交
//!
//! 任一步失败：写异常记录，回滚本批事务，错误向上传递终止运行。
//! 之前已提交的批次不受影响。

use std::collections::BTreeSet;
use std::sync::Arc;

use sqlx::{Any, Transaction};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{LinkerError, Result, ValidationError};
use crate::infrastructure::Database;
use crate::models::{ActionRecord, AnomalyRecord, BatchRecord, OracleRequest, VocabularyEntry};
use crate::services::{
    ensure_candidates, plan, validate, ApplyPlan, AuditLog, CandidateRetriever,
    DisambiguationOracle, SplitWriter,
};
use crate::workflow::batch_ctx::BatchCtx;

/// 批次处理结果
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub rows: usize,
    pub singles: usize,
    pub splits: usize,
    /// 拆分新增的词条数
    pub inserted: usize,
    pub actions: Vec<ActionRecord>,
}

/// 批次处理流程
///
/// - 编排一个批次从检索到提交的完整流程
/// - 持有本批事务，决定提交还是回滚
/// - 只依赖业务能力（services）
pub struct BatchFlow {
    db: Database,
    retriever: CandidateRetriever,
    oracle: Arc<dyn DisambiguationOracle>,
    writer: SplitWriter,
    audit: AuditLog,
    dry_run: bool,
    mode: String,
    level_hint: String,
}

impl BatchFlow {
    /// 创建新的批次处理流程
    pub fn new(config: &Config, db: Database, oracle: Arc<dyn DisambiguationOracle>) -> Self {
        let tables = config.tables();
        Self {
            retriever: CandidateRetriever::new(db.clone(), tables.krdict.clone()),
            writer: SplitWriter::new(tables, db.dialect),
            audit: AuditLog::with_path(&config.audit_log_path),
            db,
            oracle,
            dry_run: config.dry_run,
            mode: config.mode.to_string(),
            level_hint: config.level_hint.clone(),
        }
    }

    pub async fn run(&self, batch: &[VocabularyEntry], ctx: &BatchCtx) -> Result<BatchOutcome> {
        match self.run_inner(batch, ctx).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!("{} ❌ 批次失败: {}", ctx, e);
                self.record_anomaly(batch, ctx, &e);
                Err(e)
            }
        }
    }

    async fn run_inner(&self, batch: &[VocabularyEntry], ctx: &BatchCtx) -> Result<BatchOutcome> {
        // ========== 1. 候选检索 ==========
        let keys: Vec<String> = batch
            .iter()
            .map(|r| r.lemma_key.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let candidates = self.retriever.fetch_candidates(&keys).await?;
        ensure_candidates(batch, &candidates)?;

        let candidate_total: usize = candidates.values().map(Vec::len).sum();
        info!(
            "{} 🔍 {} 个词形，共 {} 个候选",
            ctx,
            keys.len(),
            candidate_total
        );

        // ========== 2. 判定 + 校验 ==========
        let request = OracleRequest::from_batch(&self.level_hint, batch, &candidates);
        let response = self.oracle.disambiguate(&request).await?;
        let validated = validate(&response, batch, &candidates)?;

        // ========== 3. 写入计划（按判定服务返回的顺序） ==========
        let mut plans: Vec<(&VocabularyEntry, ApplyPlan)> = Vec::with_capacity(validated.len());
        for (vocab_id, senses) in &validated.entries {
            let row = batch
                .iter()
                .find(|r| &r.vocab_id == vocab_id)
                .ok_or_else(|| ValidationError::UnknownRow {
                    vocab_id: vocab_id.clone(),
                })?;
            let row_plan = plan(row, senses).ok_or_else(|| ValidationError::EmptySenses {
                vocab_id: vocab_id.clone(),
            })?;
            plans.push((row, row_plan));
        }

        let outcome = summarize(&plans);
        let record = BatchRecord {
            ts: chrono::Utc::now().to_rfc3339(),
            dry_run: self.dry_run,
            model: self.oracle.model_name().to_string(),
            mode: self.mode.clone(),
            batch_num: ctx.batch_num,
            batch_size: batch.len(),
            actions: outcome.actions.clone(),
        };

        if self.dry_run {
            self.audit.append(&record)?;
            info!("{} 📝 演练模式，仅记录决策", ctx);
            return Ok(outcome);
        }

        // ========== 4. 事务写入 ==========
        let mut tx = self.db.pool.begin().await?;
        if let Err(e) = self.apply_all(&mut tx, &plans, &record).await {
            if let Err(rollback_err) = tx.rollback().await {
                warn!("{} 回滚失败: {}", ctx, rollback_err);
            }
            return Err(e);
        }
        tx.commit().await?;

        Ok(outcome)
    }

    /// 在事务内执行全部写入计划，并在提交前写审计日志
    async fn apply_all(
        &self,
        tx: &mut Transaction<'_, Any>,
        plans: &[(&VocabularyEntry, ApplyPlan)],
        record: &BatchRecord,
    ) -> Result<()> {
        for (row, row_plan) in plans {
            self.writer.apply(tx, row, row_plan).await?;
        }
        self.audit.append(record)
    }

    /// 写异常记录
    ///
    /// 审计日志本身写不进去时只能打日志，原始错误仍然向上传递。
    fn record_anomaly(&self, batch: &[VocabularyEntry], ctx: &BatchCtx, err: &LinkerError) {
        if matches!(err, LinkerError::AuditLog { .. }) {
            return;
        }

        let lemmas = match err {
            LinkerError::MissingCandidates { lemmas } => lemmas.iter().take(200).cloned().collect(),
            _ => Vec::new(),
        };

        let record = AnomalyRecord {
            ts: chrono::Utc::now().to_rfc3339(),
            dry_run: self.dry_run,
            model: self.oracle.model_name().to_string(),
            mode: self.mode.clone(),
            batch_num: ctx.batch_num,
            error: err.code().to_string(),
            detail: err.to_string(),
            lemmas,
            vocab_ids: batch.iter().map(|r| r.vocab_id.clone()).collect(),
        };

        if let Err(log_err) = self.audit.append(&record) {
            error!("{} 异常记录写入失败: {}", ctx, log_err);
        }
    }
}

fn summarize(plans: &[(&VocabularyEntry, ApplyPlan)]) -> BatchOutcome {
    let mut outcome = BatchOutcome {
        rows: plans.len(),
        ..Default::default()
    };
    for (row, row_plan) in plans {
        if row_plan.is_split() {
            outcome.splits += 1;
            outcome.inserted += row_plan.inserts.len();
        } else {
            outcome.singles += 1;
        }
        outcome.actions.push(row_plan.action_record(row));
    }
    outcome
}
