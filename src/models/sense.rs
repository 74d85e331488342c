use serde::{Deserialize, Serialize};

use super::candidate::{CandidateMap, DictionaryCandidate};
use super::vocab::VocabularyEntry;

/// 判定服务给出的一个义项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sense {
    pub sense_label: String,
    pub gloss_en: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub krdict_id: String,
}

/// 单个词条的判定结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenseResult {
    #[serde(deserialize_with = "deserialize_id")]
    pub vocab_id: String,
    /// 回显的词形，仅供参考，不参与校验
    #[serde(default)]
    pub lemma: String,
    #[serde(default)]
    pub senses: Vec<Sense>,
}

/// 判定服务的完整结构化结果
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OracleResponse {
    pub results: Vec<SenseResult>,
}

/// 发给判定服务的候选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OracleCandidate {
    pub krdict_id: String,
    pub pos: Option<String>,
    pub en_lemma: Option<String>,
}

impl From<&DictionaryCandidate> for OracleCandidate {
    fn from(c: &DictionaryCandidate) -> Self {
        Self {
            krdict_id: c.krdict_id.clone(),
            pos: c.pos.clone(),
            en_lemma: c.en_lemma.clone(),
        }
    }
}

/// 发给判定服务的单个词条
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OracleItem {
    pub vocab_id: String,
    pub lemma: String,
    pub gloss_en: Option<String>,
    pub candidates: Vec<OracleCandidate>,
}

/// 一次批量判定请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OracleRequest {
    pub level: String,
    pub items: Vec<OracleItem>,
}

impl OracleRequest {
    /// 按批次顺序构建请求，候选通过匹配键查找
    pub fn from_batch(
        level: impl Into<String>,
        batch: &[VocabularyEntry],
        candidates: &CandidateMap,
    ) -> Self {
        let items = batch
            .iter()
            .map(|row| OracleItem {
                vocab_id: row.vocab_id.clone(),
                lemma: row.lemma_key.clone(),
                gloss_en: row.gloss_en.clone(),
                candidates: candidates
                    .get(&row.lemma_key)
                    .map(|list| list.iter().map(OracleCandidate::from).collect())
                    .unwrap_or_default(),
            })
            .collect();

        Self {
            level: level.into(),
            items,
        }
    }
}

// 允许 ID 以字符串或整数形式出现
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Visitor;
    use std::fmt;

    struct IdVisitor;

    impl<'de> Visitor<'de> for IdVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or integer id")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.trim().to_string())
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }
    }

    deserializer.deserialize_any(IdVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_accept_numbers() {
        let parsed: OracleResponse = serde_json::from_str(
            r#"{"results":[{"vocab_id":"v1","lemma":"사과","senses":[
                {"sense_label":"fruit","gloss_en":"apple","krdict_id":55}]}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.results[0].senses[0].krdict_id, "55");
    }

    #[test]
    fn test_request_uses_keyed_lookup() {
        let mut candidates = CandidateMap::new();
        candidates.insert(
            "사과".to_string(),
            vec![DictionaryCandidate {
                krdict_id: "55".to_string(),
                pos: Some("명사".to_string()),
                en_lemma: Some("apple".to_string()),
                headword_raw: "사과".to_string(),
            }],
        );
        let batch = vec![
            VocabularyEntry::new("v2", "가다"),
            VocabularyEntry::new("v1", " 사과").with_gloss("apple"),
        ];

        let request = OracleRequest::from_batch("TOPIK I", &batch, &candidates);

        assert_eq!(request.items[0].vocab_id, "v2");
        assert!(request.items[0].candidates.is_empty());
        assert_eq!(request.items[1].lemma, "사과");
        assert_eq!(request.items[1].gloss_en.as_deref(), Some("apple"));
        assert_eq!(request.items[1].candidates[0].krdict_id, "55");
    }
}
