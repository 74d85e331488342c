//! 判定结果校验
//!
//! 在任何写入之前执行。任一规则不满足即整批拒绝。

use std::collections::{HashMap, HashSet};

use crate::error::ValidationError;
use crate::models::{CandidateMap, OracleResponse, Sense, VocabularyEntry};

/// 校验通过的结果：vocab_id → 有序义项列表
///
/// 保留判定服务返回的顺序，写入时按此顺序执行。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedBatch {
    pub entries: Vec<(String, Vec<Sense>)>,
}

impl ValidatedBatch {
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// 校验判定结果
///
/// # 规则
/// - 结果中的每个 vocab_id 都必须属于本批次，且只出现一次
/// - 每个结果至少一个义项
/// - 每个义项的 krdict_id 必须在**该词条自己的**候选集中
/// - 同一结果内 krdict_id 不可重复
/// - 本批次每个词条都必须有结果
pub fn validate(
    response: &OracleResponse,
    batch: &[VocabularyEntry],
    candidates: &CandidateMap,
) -> Result<ValidatedBatch, ValidationError> {
    let rows: HashMap<&str, &VocabularyEntry> =
        batch.iter().map(|r| (r.vocab_id.as_str(), r)).collect();

    let mut seen: HashSet<String> = HashSet::new();
    let mut entries = Vec::with_capacity(response.results.len());

    for result in &response.results {
        let vocab_id = result.vocab_id.trim();
        let row = rows
            .get(vocab_id)
            .ok_or_else(|| ValidationError::UnknownRow {
                vocab_id: vocab_id.to_string(),
            })?;

        if !seen.insert(vocab_id.to_string()) {
            return Err(ValidationError::DuplicateRow {
                vocab_id: vocab_id.to_string(),
            });
        }

        if result.senses.is_empty() {
            return Err(ValidationError::EmptySenses {
                vocab_id: vocab_id.to_string(),
            });
        }

        let allowed: HashSet<&str> = candidates
            .get(&row.lemma_key)
            .map(|list| list.iter().map(|c| c.krdict_id.as_str()).collect())
            .unwrap_or_default();

        let mut used: HashSet<String> = HashSet::new();
        let mut senses = Vec::with_capacity(result.senses.len());
        for sense in &result.senses {
            let krdict_id = sense.krdict_id.trim().to_string();
            if !allowed.contains(krdict_id.as_str()) {
                return Err(ValidationError::CandidateNotAllowed {
                    vocab_id: vocab_id.to_string(),
                    lemma: row.lemma_key.clone(),
                    krdict_id,
                });
            }
            if !used.insert(krdict_id.clone()) {
                return Err(ValidationError::RepeatedCandidate {
                    vocab_id: vocab_id.to_string(),
                    krdict_id,
                });
            }
            senses.push(Sense {
                sense_label: sense.sense_label.trim().to_string(),
                gloss_en: sense.gloss_en.trim().to_string(),
                krdict_id,
            });
        }

        entries.push((vocab_id.to_string(), senses));
    }

    let missing: Vec<String> = batch
        .iter()
        .filter(|r| !seen.contains(&r.vocab_id))
        .map(|r| r.vocab_id.clone())
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingResults { missing });
    }

    Ok(ValidatedBatch { entries })
}
