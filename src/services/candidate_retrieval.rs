//! 候选检索服务 - 业务能力层
//!
//! 只负责"给定一组匹配键，取回词典候选"能力。
//! 一个批次只发一条查询，与词典表中词头的规范化形式无关。

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::{LinkerError, Result};
use crate::infrastructure::{placeholders, Database};
use crate::models::{CandidateMap, DictionaryCandidate, VocabularyEntry};
use crate::services::normalization::{lemma_key, query_variants};

#[derive(Debug, sqlx::FromRow)]
struct CandidateRow {
    krdict_id: String,
    pos: Option<String>,
    en_lemma: Option<String>,
    headword_raw: Option<String>,
}

/// 候选检索服务
pub struct CandidateRetriever {
    db: Database,
    krdict_table: String,
}

impl CandidateRetriever {
    pub fn new(db: Database, krdict_table: impl Into<String>) -> Self {
        Self {
            db,
            krdict_table: krdict_table.into(),
        }
    }

    /// 取回一组匹配键的全部候选
    ///
    /// # 参数
    /// - `keys`: 匹配键（去空白 + NFC）
    ///
    /// # 返回
    /// 匹配键 → 候选列表；每个列表按 ID 排序。没有候选的键不会出现在结果中。
    pub async fn fetch_candidates(&self, keys: &[String]) -> Result<CandidateMap> {
        let variants = query_variants(keys);
        let mut out = CandidateMap::new();
        if variants.is_empty() {
            return Ok(out);
        }

        let sql = format!(
            "SELECT CAST(kd.source_entry_id AS TEXT) AS krdict_id, \
             CAST(kd.pos AS TEXT) AS pos, CAST(kd.en_lemma AS TEXT) AS en_lemma, \
             CAST(kd.headword AS TEXT) AS headword_raw \
             FROM {} kd WHERE trim(kd.headword) IN ({})",
            self.krdict_table,
            placeholders(1, variants.len())
        );
        let mut query = sqlx::query_as::<_, CandidateRow>(&sql);
        for v in &variants {
            query = query.bind(v.as_str());
        }

        let rows = query.fetch_all(&self.db.pool).await?;

        debug!(
            "候选查询: {} 个匹配键, {} 个变体, 返回 {} 行",
            keys.len(),
            variants.len(),
            rows.len()
        );

        for row in rows {
            let headword_raw = row.headword_raw.unwrap_or_default();
            // 把词头折回匹配键空间
            let key = lemma_key(&headword_raw);
            out.entry(key).or_default().push(DictionaryCandidate {
                krdict_id: row.krdict_id,
                pos: row.pos,
                en_lemma: row.en_lemma,
                headword_raw,
            });
        }

        for list in out.values_mut() {
            list.sort_by(|a, b| a.id_order(b));
        }

        Ok(out)
    }
}

/// 检查批次中每个词条都至少有一个候选
///
/// 缺候选是数据完整性问题，整批拒绝，不跳过。
pub fn ensure_candidates(batch: &[VocabularyEntry], candidates: &CandidateMap) -> Result<()> {
    let missing: BTreeSet<String> = batch
        .iter()
        .filter(|row| {
            candidates
                .get(&row.lemma_key)
                .map_or(true, |list| list.is_empty())
        })
        .map(|row| row.lemma_key.clone())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(LinkerError::MissingCandidates {
            lemmas: missing.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableNames;
    use crate::infrastructure::{bootstrap_schema, connect};

    const GADA_NFD: &str = "\u{1100}\u{1161}\u{1103}\u{1161}";

    async fn setup() -> (Database, TableNames) {
        let db = connect("sqlite::memory:").await.unwrap();
        let tables = TableNames::default();
        bootstrap_schema(&db, &tables).await.unwrap();
        (db, tables)
    }

    async fn insert_candidate(db: &Database, table: &str, id: &str, en: &str, headword: &str) {
        sqlx::query(&format!(
            "INSERT INTO {} (source_entry_id, pos, en_lemma, headword) VALUES ($1, '동사', $2, $3)",
            table
        ))
        .bind(id)
        .bind(en)
        .bind(headword)
        .execute(&db.pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_decomposed_headword_matches_composed_key() {
        let (db, tables) = setup().await;
        insert_candidate(&db, &tables.krdict, "102", "leave", GADA_NFD).await;
        insert_candidate(&db, &tables.krdict, "101", "go", " 가다 ").await;
        insert_candidate(&db, &tables.krdict, "7", "apple", "사과").await;

        let retriever = CandidateRetriever::new(db, tables.krdict);
        let map = retriever
            .fetch_candidates(&["가다".to_string()])
            .await
            .unwrap();

        assert_eq!(map.len(), 1);
        let ids: Vec<&str> = map["가다"].iter().map(|c| c.krdict_id.as_str()).collect();
        assert_eq!(ids, vec!["101", "102"]);
        assert_eq!(map["가다"][1].headword_raw, GADA_NFD);
    }

    #[tokio::test]
    async fn test_composed_headword_matches_decomposed_key() {
        let (db, tables) = setup().await;
        insert_candidate(&db, &tables.krdict, "101", "go", "가다").await;

        let retriever = CandidateRetriever::new(db, tables.krdict);
        let map = retriever
            .fetch_candidates(&[GADA_NFD.to_string()])
            .await
            .unwrap();

        // 结果总是以 NFC 匹配键为索引
        assert_eq!(map["가다"].len(), 1);
    }

    #[tokio::test]
    async fn test_empty_keys_skip_query() {
        let (db, tables) = setup().await;
        let retriever = CandidateRetriever::new(db, tables.krdict);
        assert!(retriever.fetch_candidates(&[]).await.unwrap().is_empty());
    }

    #[test]
    fn test_ensure_candidates_reports_sorted_missing() {
        let batch = vec![
            VocabularyEntry::new("v1", "하다"),
            VocabularyEntry::new("v2", "사과"),
            VocabularyEntry::new("v3", "가다"),
            VocabularyEntry::new("v4", "하다"),
        ];
        let mut map = CandidateMap::new();
        map.insert("사과".to_string(), vec![]);

        match ensure_candidates(&batch, &map) {
            Err(LinkerError::MissingCandidates { lemmas }) => {
                assert_eq!(lemmas, vec!["가다", "사과", "하다"]);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
