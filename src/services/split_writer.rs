//! 拆分写入服务
//!
//! 把校验后的义项写回词表，分两步：
//! 1. `plan`：纯函数，(源词条, 有序义项) → (源词条更新, 新增词条列表)
//! 2. `SplitWriter::apply`：在批次事务内执行计划
//!
//! 第一个义项总是落在源词条上，源词条的 ID 保持不变。

use sqlx::{Any, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::config::TableNames;
use crate::error::{LinkerError, Result};
use crate::infrastructure::Dialect;
use crate::models::{ActionRecord, InsertRecord, Sense, SenseRecord, VocabularyEntry};

/// 源词条上的更新
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowUpdate {
    pub vocab_id: String,
    pub canonical_ref: String,
    pub gloss_en: String,
}

/// 拆分出的新词条
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowInsert {
    pub new_vocab_id: String,
    pub canonical_ref: String,
    pub gloss_en: String,
    pub sense_label: String,
}

/// 单个词条的写入计划
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyPlan {
    pub primary: Sense,
    pub update: RowUpdate,
    pub inserts: Vec<RowInsert>,
}

impl ApplyPlan {
    pub fn is_split(&self) -> bool {
        !self.inserts.is_empty()
    }

    /// 转换为审计记录
    pub fn action_record(&self, source: &VocabularyEntry) -> ActionRecord {
        if self.is_split() {
            ActionRecord::Split {
                vocab_id: source.vocab_id.clone(),
                lemma_raw: source.lemma_raw.clone(),
                lemma_key: source.lemma_key.clone(),
                primary: SenseRecord::from(&self.primary),
                inserts: self
                    .inserts
                    .iter()
                    .map(|i| InsertRecord {
                        new_vocab_id: i.new_vocab_id.clone(),
                        krdict_id: i.canonical_ref.clone(),
                        gloss_en: i.gloss_en.clone(),
                        sense_label: i.sense_label.clone(),
                    })
                    .collect(),
            }
        } else {
            ActionRecord::Single {
                vocab_id: source.vocab_id.clone(),
                lemma_raw: source.lemma_raw.clone(),
                lemma_key: source.lemma_key.clone(),
                set_canonical_ref: self.update.canonical_ref.clone(),
                set_gloss_en: self.update.gloss_en.clone(),
            }
        }
    }
}

/// 生成写入计划
///
/// 义项为空时返回 `None`（校验阶段已经排除）。
pub fn plan(source: &VocabularyEntry, senses: &[Sense]) -> Option<ApplyPlan> {
    let (first, rest) = senses.split_first()?;

    let inserts = rest
        .iter()
        .map(|s| RowInsert {
            new_vocab_id: Uuid::new_v4().to_string(),
            canonical_ref: s.krdict_id.clone(),
            gloss_en: s.gloss_en.clone(),
            sense_label: s.sense_label.clone(),
        })
        .collect();

    Some(ApplyPlan {
        primary: first.clone(),
        update: RowUpdate {
            vocab_id: source.vocab_id.clone(),
            canonical_ref: first.krdict_id.clone(),
            gloss_en: first.gloss_en.clone(),
        },
        inserts,
    })
}

/// 拆分写入服务
///
/// 只通过传入的事务写库，不自行提交或回滚。
pub struct SplitWriter {
    tables: TableNames,
    dialect: Dialect,
}

impl SplitWriter {
    pub fn new(tables: TableNames, dialect: Dialect) -> Self {
        Self { tables, dialect }
    }

    /// 在事务内执行写入计划
    pub async fn apply(
        &self,
        tx: &mut Transaction<'_, Any>,
        source: &VocabularyEntry,
        plan: &ApplyPlan,
    ) -> Result<()> {
        self.update_canonical_ref(tx, &plan.update.vocab_id, &plan.update.canonical_ref)
            .await?;
        self.upsert_primary_gloss(tx, &plan.update.vocab_id, &plan.update.gloss_en)
            .await?;

        for insert in &plan.inserts {
            self.insert_split_row(tx, &source.vocab_id, &insert.new_vocab_id, &insert.canonical_ref)
                .await?;
            self.upsert_primary_gloss(tx, &insert.new_vocab_id, &insert.gloss_en)
                .await?;
        }

        debug!(
            vocab_id = %source.vocab_id,
            canonical_ref = %plan.update.canonical_ref,
            inserted = plan.inserts.len(),
            "写入词条"
        );

        Ok(())
    }

    async fn update_canonical_ref(
        &self,
        tx: &mut Transaction<'_, Any>,
        vocab_id: &str,
        krdict_id: &str,
    ) -> Result<()> {
        sqlx::query(&format!(
            "UPDATE {} SET canonical_ref = $1, updated_at = CURRENT_TIMESTAMP WHERE id = {}",
            self.tables.teaching,
            self.dialect.id_param(2)
        ))
        .bind(krdict_id)
        .bind(vocab_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// 先更新，没有命中再插入
    async fn upsert_primary_gloss(
        &self,
        tx: &mut Transaction<'_, Any>,
        vocab_id: &str,
        text: &str,
    ) -> Result<()> {
        let updated = sqlx::query(&format!(
            "UPDATE {} SET text = $1 WHERE vocab_id = {} AND language = 'en' AND is_primary = TRUE",
            self.tables.glosses,
            self.dialect.id_param(2)
        ))
        .bind(text)
        .bind(vocab_id)
        .execute(&mut **tx)
        .await?;

        if updated.rows_affected() == 0 {
            sqlx::query(&format!(
                "INSERT INTO {} (vocab_id, language, text, is_primary) VALUES ({}, 'en', $2, TRUE)",
                self.tables.glosses,
                self.dialect.id_param(1)
            ))
            .bind(vocab_id)
            .bind(text)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// 在库内复制源词条的描述属性，写入新 ID 和新的 canonical_ref
    ///
    /// 属性列按原类型复制，不经过应用层转换。
    async fn insert_split_row(
        &self,
        tx: &mut Transaction<'_, Any>,
        source_id: &str,
        new_vocab_id: &str,
        canonical_ref: &str,
    ) -> Result<()> {
        let inserted = sqlx::query(&format!(
            r#"
            INSERT INTO {table} (
              id, lemma, part_of_speech, level, tags, status, canonical_ref,
              created_at, updated_at, pos_code, pos_label
            )
            SELECT {new_id}, lemma, part_of_speech, level, tags, status, $2,
                   CURRENT_TIMESTAMP, CURRENT_TIMESTAMP, pos_code, pos_label
            FROM {table}
            WHERE id = {source_id}
            "#,
            table = self.tables.teaching,
            new_id = self.dialect.id_param(1),
            source_id = self.dialect.id_param(3),
        ))
        .bind(new_vocab_id)
        .bind(canonical_ref)
        .bind(source_id)
        .execute(&mut **tx)
        .await?;

        if inserted.rows_affected() != 1 {
            return Err(LinkerError::Database(sqlx::Error::RowNotFound));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{bootstrap_schema, connect, Database};

    fn sense(id: &str, gloss: &str) -> Sense {
        Sense {
            sense_label: gloss.to_string(),
            gloss_en: gloss.to_string(),
            krdict_id: id.to_string(),
        }
    }

    fn source() -> VocabularyEntry {
        VocabularyEntry {
            part_of_speech: Some("동사".to_string()),
            level: Some("1".to_string()),
            tags: Some(r#"["topik1"]"#.to_string()),
            status: Some("active".to_string()),
            pos_code: Some("V".to_string()),
            pos_label: Some("verb".to_string()),
            ..VocabularyEntry::new("v1", "가다").with_gloss("to go, to leave")
        }
    }

    async fn setup() -> (Database, TableNames) {
        let db = connect("sqlite::memory:").await.unwrap();
        let tables = TableNames::default();
        bootstrap_schema(&db, &tables).await.unwrap();
        let src = source();
        sqlx::query(&format!(
            "INSERT INTO {} (id, lemma, part_of_speech, level, tags, status, pos_code, pos_label) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            tables.teaching
        ))
        .bind(&src.vocab_id)
        .bind(&src.lemma_raw)
        .bind(&src.part_of_speech)
        .bind(&src.level)
        .bind(&src.tags)
        .bind(&src.status)
        .bind(&src.pos_code)
        .bind(&src.pos_label)
        .execute(&db.pool)
        .await
        .unwrap();
        (db, tables)
    }

    #[test]
    fn test_plan_single() {
        let plan = plan(&source(), &[sense("55", "apple")]).unwrap();
        assert!(!plan.is_split());
        assert_eq!(plan.update.vocab_id, "v1");
        assert_eq!(plan.update.canonical_ref, "55");
        assert_eq!(plan.action_record(&source()).action(), "single");
    }

    #[test]
    fn test_plan_split_allocates_distinct_ids() {
        let senses = [sense("101", "to go"), sense("102", "to leave"), sense("103", "to head")];
        let plan = plan(&source(), &senses).unwrap();

        assert!(plan.is_split());
        assert_eq!(plan.update.canonical_ref, "101");
        assert_eq!(plan.inserts.len(), 2);
        assert_ne!(plan.inserts[0].new_vocab_id, plan.inserts[1].new_vocab_id);
        assert_ne!(plan.inserts[0].new_vocab_id, "v1");

        match plan.action_record(&source()) {
            ActionRecord::Split { primary, inserts, .. } => {
                assert_eq!(primary.krdict_id, "101");
                assert_eq!(inserts[1].krdict_id, "103");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_plan_empty_senses() {
        assert!(plan(&source(), &[]).is_none());
    }

    #[tokio::test]
    async fn test_apply_single_inserts_missing_gloss() {
        let (db, tables) = setup().await;
        let writer = SplitWriter::new(tables.clone(), db.dialect);
        let plan = plan(&source(), &[sense("101", "to go")]).unwrap();

        let mut tx = db.pool.begin().await.unwrap();
        writer.apply(&mut tx, &source(), &plan).await.unwrap();
        tx.commit().await.unwrap();

        let (cref,): (Option<String>,) = sqlx::query_as(&format!(
            "SELECT canonical_ref FROM {} WHERE id = 'v1'",
            tables.teaching
        ))
        .fetch_one(&db.pool)
        .await
        .unwrap();
        assert_eq!(cref.as_deref(), Some("101"));

        let gloss: String = sqlx::query_scalar(&format!(
            "SELECT text FROM {} WHERE vocab_id = 'v1' AND language = 'en' AND is_primary = TRUE",
            tables.glosses
        ))
        .fetch_one(&db.pool)
        .await
        .unwrap();
        assert_eq!(gloss, "to go");
    }

    #[tokio::test]
    async fn test_apply_split_clones_attributes() {
        let (db, tables) = setup().await;
        sqlx::query(&format!(
            "INSERT INTO {} (vocab_id, language, text, is_primary) VALUES ('v1', 'en', 'to go, to leave', TRUE)",
            tables.glosses
        ))
        .execute(&db.pool)
        .await
        .unwrap();

        let writer = SplitWriter::new(tables.clone(), db.dialect);
        let plan = plan(&source(), &[sense("101", "to go"), sense("102", "to leave")]).unwrap();

        let mut tx = db.pool.begin().await.unwrap();
        writer.apply(&mut tx, &source(), &plan).await.unwrap();
        tx.commit().await.unwrap();

        let rows: Vec<(String, String, Option<String>, Option<String>, Option<String>)> =
            sqlx::query_as(&format!(
                "SELECT id, canonical_ref, level, tags, pos_label FROM {} ORDER BY canonical_ref",
                tables.teaching
            ))
            .fetch_all(&db.pool)
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, "v1");
        assert_eq!(rows[0].1, "101");
        assert_eq!(rows[1].0, plan.inserts[0].new_vocab_id);
        assert_eq!(rows[1].1, "102");
        assert_eq!(rows[1].2.as_deref(), Some("1"));
        assert_eq!(rows[1].3.as_deref(), Some(r#"["topik1"]"#));
        assert_eq!(rows[1].4.as_deref(), Some("verb"));

        let glosses: Vec<(String, String)> = sqlx::query_as(&format!(
            "SELECT vocab_id, text FROM {} ORDER BY text",
            tables.glosses
        ))
        .fetch_all(&db.pool)
        .await
        .unwrap();
        assert_eq!(glosses.len(), 2);
        assert_eq!(glosses[0], ("v1".to_string(), "to go".to_string()));
        assert_eq!(glosses[1].1, "to leave");
    }

    #[tokio::test]
    async fn test_split_from_missing_source_fails() {
        let (db, tables) = setup().await;
        let writer = SplitWriter::new(tables.clone(), db.dialect);
        let ghost = VocabularyEntry::new("v9", "가다");
        let plan = plan(&ghost, &[sense("101", "to go"), sense("102", "to leave")]).unwrap();

        let mut tx = db.pool.begin().await.unwrap();
        let err = writer.apply(&mut tx, &ghost, &plan).await.unwrap_err();
        assert_eq!(err.code(), "STORAGE_FAILURE");
    }
}
