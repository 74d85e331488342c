//! # Teaching Vocab Linker
//!
//! 将教学词表中的词条关联到 KRDict 词典义项的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有数据库连接池，负责建表
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不关心批次流程
//! - `VocabRepository` - 按模式选择待处理词条
//! - `CandidateRetriever` - 按规范化词形检索词典候选
//! - `LlmService` - 义项判定能力（实现 `DisambiguationOracle`）
//! - `validate` - 校验判定结果
//! - `SplitWriter` - 在事务内更新 / 拆分词条
//! - `AuditLog` - 追加 JSONL 审计记录
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个批次"的完整处理流程
//! - `BatchCtx` - 上下文封装（批次编号 + 行范围）
//! - `BatchFlow` - 流程编排（检索 → 判定 → 校验 → 写入 → 审计 → 提交）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 选择词条、切批、顺序执行、汇总统计
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, TableNames};
pub use error::{ConfigError, LinkerError, OracleError, Result, ValidationError};
pub use models::{VocabularyEntry, WorkMode};
pub use orchestrator::{App, RunStats};
pub use services::DisambiguationOracle;
pub use workflow::{BatchCtx, BatchFlow, BatchOutcome};
