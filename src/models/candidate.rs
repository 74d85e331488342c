use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 词典中的候选词条（只读）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryCandidate {
    /// 字符串形式的词典 ID，通常是数字
    pub krdict_id: String,
    pub pos: Option<String>,
    pub en_lemma: Option<String>,
    /// 数据库中原样存储的词头
    #[serde(skip)]
    pub headword_raw: String,
}

impl DictionaryCandidate {
    /// 排序规则：纯数字 ID 按数值排在前面，其余按字典序排在后面
    pub fn id_order(&self, other: &Self) -> Ordering {
        let is_numeric = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
        match (is_numeric(&self.krdict_id), is_numeric(&other.krdict_id)) {
            (true, true) => {
                // 先比长度再比字面，避免超长数字溢出
                let a = self.krdict_id.trim_start_matches('0');
                let b = other.krdict_id.trim_start_matches('0');
                a.len()
                    .cmp(&b.len())
                    .then_with(|| a.cmp(b))
                    .then_with(|| self.krdict_id.cmp(&other.krdict_id))
            }
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.krdict_id.cmp(&other.krdict_id),
        }
    }
}

/// 匹配键 → 候选列表
pub type CandidateMap = HashMap<String, Vec<DictionaryCandidate>>;
