//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责选择待处理词条并按批次顺序驱动流程，是整个系统的"指挥中心"。
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<VocabularyEntry>，切分批次)
//!     ↓
//! workflow::BatchFlow (处理单个批次)
//!     ↓
//! services (能力层：检索 / 判定 / 校验 / 写入 / 审计)
//!     ↓
//! infrastructure (基础设施：数据库连接池)
//! ```
//!
//! ## 设计原则
//!
//! 1. **顺序执行**：不并发，批次按选择顺序逐个处理
//! 2. **资源隔离**：只有编排层创建连接池和判定服务
//! 3. **失败即停**：任一批次失败立即终止，已提交的批次保持不变

pub mod batch_processor;

pub use batch_processor::{App, RunStats};
