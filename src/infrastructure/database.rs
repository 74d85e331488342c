//! 数据库连接
//!
//! 持有连接池，只暴露连接与建表能力。
//!
//! 生产库是 PostgreSQL（词条 ID 为 uuid），本地演练和测试使用 SQLite。
//! 两者都通过 `sqlx::Any` 访问，SQL 一律使用 `$N` 占位符；
//! 只有 ID 参数的类型转换由 [`Dialect`] 区分。

use std::time::Duration;

use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::AnyPool;
use tracing::{debug, info};

use crate::config::TableNames;
use crate::error::{ConfigError, Result};

/// 数据库方言
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    /// 根据连接串判断方言
    pub fn from_url(database_url: &str) -> std::result::Result<Self, ConfigError> {
        let url = database_url.trim();
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(Dialect::Postgres)
        } else if url.starts_with("sqlite:") {
            Ok(Dialect::Sqlite)
        } else {
            Err(ConfigError::Invalid {
                name: "DATABASE_URL".to_string(),
                value: url.split("://").next().unwrap_or_default().to_string(),
                expected: "postgres:// | sqlite:".to_string(),
            })
        }
    }

    /// 第 `n` 个参数作为词条 ID 使用时的写法
    pub fn id_param(&self, n: usize) -> String {
        match self {
            Dialect::Postgres => format!("CAST(${} AS uuid)", n),
            Dialect::Sqlite => format!("${}", n),
        }
    }
}

/// 生成 `$start, $start+1, ...` 共 `count` 个占位符
pub fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|n| format!("${}", n))
        .collect::<Vec<_>>()
        .join(", ")
}

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// 数据库句柄：连接池 + 方言
#[derive(Debug, Clone)]
pub struct Database {
    pub pool: AnyPool,
    pub dialect: Dialect,
}

/// 连接数据库
///
/// 整个流程是单线程顺序执行的，一个连接就够用。
/// 数据库不可达时最多等待 `CONNECT_TIMEOUT` 后失败。
pub async fn connect(database_url: &str) -> Result<Database> {
    let dialect = Dialect::from_url(database_url)?;
    install_default_drivers();

    let pool = AnyPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(CONNECT_TIMEOUT)
        .connect(database_url)
        .await?;

    info!("✓ 数据库连接成功 ({:?})", dialect);
    Ok(Database { pool, dialect })
}

/// 创建三张表（已存在则跳过）
///
/// 用于本地演练和测试；生产库的表结构由上游维护。
pub async fn bootstrap_schema(db: &Database, tables: &TableNames) -> Result<()> {
    debug!("初始化表结构: {:?}", tables);

    let (id_type, gloss_key, bool_type) = match db.dialect {
        Dialect::Postgres => ("uuid", "BIGSERIAL PRIMARY KEY", "BOOLEAN"),
        Dialect::Sqlite => ("TEXT", "INTEGER PRIMARY KEY AUTOINCREMENT", "BOOLEAN"),
    };

    let statements = [
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {teaching} (
                id {id_type} PRIMARY KEY,
                lemma TEXT NOT NULL,
                part_of_speech TEXT,
                level TEXT,
                tags TEXT,
                status TEXT,
                canonical_ref TEXT,
                pos_code TEXT,
                pos_label TEXT,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            teaching = tables.teaching,
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {glosses} (
                id {gloss_key},
                vocab_id {id_type} NOT NULL REFERENCES {teaching}(id),
                language TEXT NOT NULL,
                text TEXT NOT NULL,
                is_primary {bool_type} NOT NULL DEFAULT FALSE,
                UNIQUE (vocab_id, language, is_primary)
            )
            "#,
            glosses = tables.glosses,
            teaching = tables.teaching,
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {krdict} (
                source_entry_id TEXT NOT NULL,
                pos TEXT,
                en_lemma TEXT,
                headword TEXT NOT NULL
            )
            "#,
            krdict = tables.krdict
        ),
    ];

    for sql in statements.iter() {
        sqlx::query(sql).execute(&db.pool).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LinkerError;

    #[test]
    fn test_dialect_from_url() {
        assert_eq!(
            Dialect::from_url("postgres://user:pw@127.0.0.1:5432/hakmun").unwrap(),
            Dialect::Postgres
        );
        assert_eq!(
            Dialect::from_url("postgresql://db/hakmun").unwrap(),
            Dialect::Postgres
        );
        assert_eq!(Dialect::from_url("sqlite::memory:").unwrap(), Dialect::Sqlite);
        assert!(Dialect::from_url("mysql://db/x").is_err());
    }

    #[test]
    fn test_id_param_casts_only_on_postgres() {
        assert_eq!(Dialect::Postgres.id_param(2), "CAST($2 AS uuid)");
        assert_eq!(Dialect::Sqlite.id_param(2), "$2");
    }

    #[test]
    fn test_placeholders_numbering() {
        assert_eq!(placeholders(1, 3), "$1, $2, $3");
        assert_eq!(placeholders(4, 1), "$4");
        assert_eq!(placeholders(1, 0), "");
    }

    #[tokio::test]
    async fn test_unknown_scheme_is_config_error() {
        let err = connect("mysql://db/x").await.unwrap_err();
        assert!(matches!(err, LinkerError::Config(_)));
    }

    #[tokio::test]
    async fn test_unreachable_postgres_is_storage_error() {
        // 端口 1 上没有服务，错误来自 Postgres 驱动而不是 SQLite 文件打开
        let err = connect("postgres://user:pw@127.0.0.1:1/hakmun")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "STORAGE_FAILURE");
        assert!(!err.to_string().contains("unable to open database file"));
    }

    #[tokio::test]
    async fn test_bootstrap_is_repeatable() {
        let db = connect("sqlite::memory:").await.unwrap();
        let tables = TableNames::default();

        bootstrap_schema(&db, &tables).await.unwrap();
        bootstrap_schema(&db, &tables).await.unwrap();

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ($1, $2, $3)",
        )
        .bind(&tables.teaching)
        .bind(&tables.glosses)
        .bind(&tables.krdict)
        .fetch_one(&db.pool)
        .await
        .unwrap();
        assert_eq!(count, 3);
    }
}
