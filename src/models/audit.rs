//! 审计日志记录结构
//!
//! 每行一条 JSON，只追加，不修改。

use serde::Serialize;

use super::sense::Sense;

/// 一个批次的决策记录
#[derive(Debug, Clone, Serialize)]
pub struct BatchRecord {
    pub ts: String,
    pub dry_run: bool,
    pub model: String,
    pub mode: String,
    pub batch_num: usize,
    pub batch_size: usize,
    pub actions: Vec<ActionRecord>,
}

/// 单个词条上执行（或将要执行）的动作
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionRecord {
    Single {
        vocab_id: String,
        lemma_raw: String,
        lemma_key: String,
        set_canonical_ref: String,
        set_gloss_en: String,
    },
    Split {
        vocab_id: String,
        lemma_raw: String,
        lemma_key: String,
        primary: SenseRecord,
        inserts: Vec<InsertRecord>,
    },
}

impl ActionRecord {
    pub fn action(&self) -> &'static str {
        match self {
            ActionRecord::Single { .. } => "single",
            ActionRecord::Split { .. } => "split",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SenseRecord {
    pub sense_label: String,
    pub gloss_en: String,
    pub krdict_id: String,
}

impl From<&Sense> for SenseRecord {
    fn from(s: &Sense) -> Self {
        Self {
            sense_label: s.sense_label.clone(),
            gloss_en: s.gloss_en.clone(),
            krdict_id: s.krdict_id.clone(),
        }
    }
}

/// 拆分时新增的词条
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsertRecord {
    pub new_vocab_id: String,
    pub krdict_id: String,
    pub gloss_en: String,
    pub sense_label: String,
}

/// 致命异常记录
#[derive(Debug, Clone, Serialize)]
pub struct AnomalyRecord {
    pub ts: String,
    pub dry_run: bool,
    pub model: String,
    pub mode: String,
    pub batch_num: usize,
    pub error: String,
    pub detail: String,
    /// 仅 NO_KRDICT_CANDIDATES 时填写
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lemmas: Vec<String>,
    /// 出错批次中的词条
    pub vocab_ids: Vec<String>,
}
