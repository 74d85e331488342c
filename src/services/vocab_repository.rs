//! 词表查询服务 - 业务能力层
//!
//! 负责"哪些词条需要处理"。每批独立提交，重跑时已处理的词条自然不再被选中，
//! 这就是唯一的断点续跑机制。

use tracing::debug;

use crate::config::TableNames;
use crate::error::Result;
use crate::infrastructure::Database;
use crate::models::{VocabularyEntry, WorkMode};
use crate::services::normalization::lemma_key;

#[derive(Debug, sqlx::FromRow)]
struct VocabRow {
    vocab_id: String,
    lemma_raw: Option<String>,
    part_of_speech: Option<String>,
    level: Option<String>,
    tags: Option<String>,
    status: Option<String>,
    canonical_ref: Option<String>,
    pos_code: Option<String>,
    pos_label: Option<String>,
    gloss_en: Option<String>,
}

impl From<VocabRow> for VocabularyEntry {
    fn from(row: VocabRow) -> Self {
        let lemma_raw = row.lemma_raw.unwrap_or_default();
        Self {
            vocab_id: row.vocab_id,
            lemma_key: lemma_key(&lemma_raw),
            lemma_raw,
            part_of_speech: row.part_of_speech,
            level: row.level,
            tags: row.tags,
            status: row.status,
            canonical_ref: row.canonical_ref,
            pos_code: row.pos_code,
            pos_label: row.pos_label,
            gloss_en: row.gloss_en,
        }
    }
}

/// 选择策略
#[derive(Debug, Clone)]
pub struct SelectionPolicy {
    pub mode: WorkMode,
    /// `needs_work` 下的多义标记字符
    pub rework_markers: Vec<String>,
    /// 0 表示不限制
    pub max_rows: usize,
}

/// `LIKE` 模式中转义通配符，配合 `ESCAPE '\'` 使用
fn like_contains(marker: &str) -> String {
    let mut pattern = String::with_capacity(marker.len() + 2);
    pattern.push('%');
    for ch in marker.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// 词表查询服务
pub struct VocabRepository {
    db: Database,
    tables: TableNames,
}

impl VocabRepository {
    pub fn new(db: Database, tables: TableNames) -> Self {
        Self { db, tables }
    }

    /// 按策略选出待处理词条，按词形排序
    pub async fn select_pending(&self, policy: &SelectionPolicy) -> Result<Vec<VocabularyEntry>> {
        let markers: Vec<String> = match policy.mode {
            WorkMode::NeedsWork => policy
                .rework_markers
                .iter()
                .filter(|m| !m.is_empty())
                .map(|m| like_contains(m))
                .collect(),
            WorkMode::Unlinked => Vec::new(),
        };

        let mut sql = format!(
            r#"
            SELECT
              CAST(tv.id AS TEXT) AS vocab_id,
              CAST(tv.lemma AS TEXT) AS lemma_raw,
              CAST(tv.part_of_speech AS TEXT) AS part_of_speech,
              CAST(tv.level AS TEXT) AS level,
              CAST(tv.tags AS TEXT) AS tags,
              CAST(tv.status AS TEXT) AS status,
              CAST(tv.canonical_ref AS TEXT) AS canonical_ref,
              CAST(tv.pos_code AS TEXT) AS pos_code,
              CAST(tv.pos_label AS TEXT) AS pos_label,
              CAST(vg.text AS TEXT) AS gloss_en
            FROM {teaching} tv
            LEFT JOIN {glosses} vg
              ON vg.vocab_id = tv.id
             AND vg.language = 'en'
             AND vg.is_primary = TRUE
            WHERE (tv.canonical_ref IS NULL"#,
            teaching = self.tables.teaching,
            glosses = self.tables.glosses,
        );

        let mut param = 0;
        for _ in &markers {
            param += 1;
            sql.push_str(&format!(" OR vg.text LIKE ${} ESCAPE '\\'", param));
        }
        sql.push_str(") ORDER BY tv.lemma, tv.id");

        if policy.max_rows > 0 {
            param += 1;
            sql.push_str(&format!(" LIMIT ${}", param));
        }

        let mut query = sqlx::query_as::<_, VocabRow>(&sql);
        for pattern in &markers {
            query = query.bind(pattern.as_str());
        }
        if policy.max_rows > 0 {
            query = query.bind(policy.max_rows as i64);
        }

        let rows = query.fetch_all(&self.db.pool).await?;
        debug!("选择策略 {} 返回 {} 行", policy.mode, rows.len());

        Ok(rows.into_iter().map(VocabularyEntry::from).collect())
    }

    /// 统计仍未关联的词条数
    pub async fn count_unlinked(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE canonical_ref IS NULL",
            self.tables.teaching
        ))
        .fetch_one(&self.db.pool)
        .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{bootstrap_schema, connect};

    async fn seed(db: &Database, tables: &TableNames) {
        let rows = [
            ("v1", "사과", None, Some("apple")),
            ("v2", "가다", None, Some("to go, to leave")),
            ("v3", "오다", Some("300"), Some("to come")),
            ("v4", "보다", Some("400"), Some("to see ~ to watch")),
            ("v5", "먹다", Some("500"), Some("to eat, to have")),
            ("v6", "자다", None, None),
        ];
        for (id, lemma, cref, gloss) in rows {
            sqlx::query(&format!(
                "INSERT INTO {} (id, lemma, canonical_ref, level) VALUES ($1, $2, $3, 1)",
                tables.teaching
            ))
            .bind(id)
            .bind(lemma)
            .bind(cref)
            .execute(&db.pool)
            .await
            .unwrap();
            if let Some(text) = gloss {
                sqlx::query(&format!(
                    "INSERT INTO {} (vocab_id, language, text, is_primary) VALUES ($1, 'en', $2, TRUE)",
                    tables.glosses
                ))
                .bind(id)
                .bind(text)
                .execute(&db.pool)
                .await
                .unwrap();
            }
        }
    }

    async fn repo() -> VocabRepository {
        let db = connect("sqlite::memory:").await.unwrap();
        let tables = TableNames::default();
        bootstrap_schema(&db, &tables).await.unwrap();
        seed(&db, &tables).await;
        VocabRepository::new(db, tables)
    }

    fn ids(rows: &[VocabularyEntry]) -> Vec<&str> {
        rows.iter().map(|r| r.vocab_id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_unlinked_mode() {
        let repo = repo().await;
        let rows = repo
            .select_pending(&SelectionPolicy {
                mode: WorkMode::Unlinked,
                rework_markers: vec![",".to_string()],
                max_rows: 0,
            })
            .await
            .unwrap();

        // 按词形排序: 가다 < 사과 < 자다
        assert_eq!(ids(&rows), vec!["v2", "v1", "v6"]);
        assert_eq!(rows[0].gloss_en.as_deref(), Some("to go, to leave"));
        assert_eq!(rows[2].gloss_en, None);
        assert_eq!(rows[0].level.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_needs_work_mode_picks_marked_glosses() {
        let repo = repo().await;
        let rows = repo
            .select_pending(&SelectionPolicy {
                mode: WorkMode::NeedsWork,
                rework_markers: vec![",".to_string(), "~".to_string()],
                max_rows: 0,
            })
            .await
            .unwrap();

        assert_eq!(ids(&rows), vec!["v2", "v5", "v4", "v1", "v6"]);
    }

    #[tokio::test]
    async fn test_markers_are_configurable() {
        let repo = repo().await;
        let rows = repo
            .select_pending(&SelectionPolicy {
                mode: WorkMode::NeedsWork,
                rework_markers: vec!["~".to_string()],
                max_rows: 0,
            })
            .await
            .unwrap();

        assert_eq!(ids(&rows), vec!["v2", "v4", "v1", "v6"]);
    }

    #[tokio::test]
    async fn test_max_rows_caps_selection() {
        let repo = repo().await;
        let rows = repo
            .select_pending(&SelectionPolicy {
                mode: WorkMode::NeedsWork,
                rework_markers: vec![",".to_string()],
                max_rows: 2,
            })
            .await
            .unwrap();

        assert_eq!(ids(&rows), vec!["v2", "v5"]);
        assert_eq!(repo.count_unlinked().await.unwrap(), 3);
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_contains(","), "%,%");
        assert_eq!(like_contains("_"), "%\\_%");
        assert_eq!(like_contains("%"), "%\\%%");
    }

    #[tokio::test]
    async fn test_wildcard_marker_matches_literally() {
        let repo = repo().await;
        let rows = repo
            .select_pending(&SelectionPolicy {
                mode: WorkMode::NeedsWork,
                rework_markers: vec!["_".to_string()],
                max_rows: 0,
            })
            .await
            .unwrap();

        // 没有释义含下划线，只剩未关联词条
        assert_eq!(ids(&rows), vec!["v2", "v1", "v6"]);
    }
}
