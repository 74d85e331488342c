use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::services::normalization::lemma_key;

/// 教学词表中的一个词条
///
/// `lemma_key` 始终由 `lemma_raw` 计算得出，不从数据库读取。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyEntry {
    pub vocab_id: String,
    /// 数据库中原样存储的词形
    pub lemma_raw: String,
    /// 去首尾空白并做 NFC 规范化后的匹配键
    pub lemma_key: String,
    pub part_of_speech: Option<String>,
    pub level: Option<String>,
    /// 原样透传的标签字段
    pub tags: Option<String>,
    pub status: Option<String>,
    pub canonical_ref: Option<String>,
    pub pos_code: Option<String>,
    pub pos_label: Option<String>,
    /// 当前的主英文释义
    pub gloss_en: Option<String>,
}

impl VocabularyEntry {
    /// 创建只带词形的词条，其余属性为空
    pub fn new(vocab_id: impl Into<String>, lemma_raw: impl Into<String>) -> Self {
        let lemma_raw = lemma_raw.into();
        Self {
            vocab_id: vocab_id.into(),
            lemma_key: lemma_key(&lemma_raw),
            lemma_raw,
            part_of_speech: None,
            level: None,
            tags: None,
            status: None,
            canonical_ref: None,
            pos_code: None,
            pos_label: None,
            gloss_en: None,
        }
    }

    /// 设置主释义
    pub fn with_gloss(mut self, gloss: impl Into<String>) -> Self {
        self.gloss_en = Some(gloss.into());
        self
    }
}

/// 待处理词条的选择策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkMode {
    /// 只选 `canonical_ref IS NULL`
    Unlinked,
    /// 未关联，或主释义中含有多义标记字符
    #[serde(alias = "needs_rework")]
    NeedsWork,
}

impl WorkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkMode::Unlinked => "unlinked",
            WorkMode::NeedsWork => "needs_work",
        }
    }
}

impl fmt::Display for WorkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "unlinked" => Ok(WorkMode::Unlinked),
            "needs_work" | "needs_rework" => Ok(WorkMode::NeedsWork),
            other => Err(format!("未知的处理模式: {}", other)),
        }
    }
}
