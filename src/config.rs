use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::models::WorkMode;

/// 程序配置
///
/// 在 `main` 中构造一次，之后按引用传入各组件；组件本身不读取环境变量。
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- 判定服务（OpenAI） ---
    pub openai_api_key: String,
    pub openai_api_base_url: String,
    pub openai_model: String,
    /// 单次请求超时（秒）
    pub oracle_timeout_secs: u64,
    /// 提示给判定服务的学习者等级
    pub level_hint: String,
    // --- 数据库 ---
    pub database_url: String,
    pub teaching_table: String,
    pub glosses_table: String,
    pub krdict_table: String,
    // --- 运行行为 ---
    /// 每批词条数量
    pub batch_size: usize,
    /// 两次判定请求之间的固定间隔（毫秒）
    pub sleep_between_calls_ms: u64,
    /// 只记录决策，不写数据库
    pub dry_run: bool,
    /// 最多处理的词条数，0 表示不限制
    pub max_rows: usize,
    pub mode: WorkMode,
    /// `needs_work` 模式下，释义中出现这些字符即视为可能包含多个义项
    pub rework_markers: Vec<String>,
    /// 审计日志（JSONL）路径
    pub audit_log_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_api_base_url: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-4.1-mini".to_string(),
            oracle_timeout_secs: 120,
            level_hint: "TOPIK I".to_string(),
            database_url: String::new(),
            teaching_table: "teaching_vocab".to_string(),
            glosses_table: "vocab_glosses".to_string(),
            krdict_table: "krdict_lexical_entry_fast".to_string(),
            batch_size: 10,
            sleep_between_calls_ms: 200,
            dry_run: false,
            max_rows: 0,
            mode: WorkMode::NeedsWork,
            rework_markers: vec![",".to_string(), "~".to_string()],
            audit_log_path: "krdict_resolve_log.jsonl".to_string(),
        }
    }
}

impl Config {
    /// 从环境变量加载（基于默认值）
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().overlay(|name| std::env::var(name).ok())
    }

    /// 从 TOML 文件加载，未出现的字段使用默认值
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::FileParse {
            path: path.display().to_string(),
            source,
        })
    }

    /// 用变量查找函数覆盖当前配置
    ///
    /// 未设置或为空的变量保持原值。
    pub fn overlay<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = get("OPENAI_API_KEY") {
            self.openai_api_key = v;
        }
        if let Some(v) = get("OPENAI_API_BASE_URL") {
            self.openai_api_base_url = v;
        }
        if let Some(v) = get("OPENAI_MODEL") {
            self.openai_model = v;
        }
        if let Some(v) = get("KRDICT_RESOLVE_TIMEOUT_SEC") {
            self.oracle_timeout_secs = parse_num("KRDICT_RESOLVE_TIMEOUT_SEC", &v)?;
        }
        if let Some(v) = get("KRDICT_RESOLVE_LEVEL_HINT") {
            self.level_hint = v;
        }
        if let Some(v) = get("DATABASE_URL").or_else(|| get("DATABASE_PUBLIC_URL")) {
            self.database_url = v;
        }
        if let Some(v) = get("TEACHING_TABLE") {
            self.teaching_table = v;
        }
        if let Some(v) = get("GLOSSES_TABLE") {
            self.glosses_table = v;
        }
        if let Some(v) = get("KRDICT_TABLE") {
            self.krdict_table = v;
        }
        if let Some(v) = get("KRDICT_RESOLVE_BATCH_SIZE") {
            self.batch_size = parse_num("KRDICT_RESOLVE_BATCH_SIZE", &v)?;
        }
        if let Some(v) = get("KRDICT_RESOLVE_SLEEP_MS") {
            self.sleep_between_calls_ms = parse_num("KRDICT_RESOLVE_SLEEP_MS", &v)?;
        }
        if let Some(v) = get("KRDICT_RESOLVE_DRY_RUN") {
            self.dry_run = parse_flag(&v);
        }
        if let Some(v) = get("KRDICT_RESOLVE_MAX_ROWS") {
            self.max_rows = parse_num("KRDICT_RESOLVE_MAX_ROWS", &v)?;
        }
        if let Some(v) = get("KRDICT_RESOLVE_MODE") {
            self.mode = v.parse().map_err(|_| ConfigError::Invalid {
                name: "KRDICT_RESOLVE_MODE".to_string(),
                value: v.clone(),
                expected: "unlinked | needs_work".to_string(),
            })?;
        }
        if let Some(v) = get("KRDICT_RESOLVE_REWORK_MARKERS") {
            self.rework_markers = v.chars().map(|c| c.to_string()).collect();
        }
        if let Some(v) = get("KRDICT_RESOLVE_LOG_PATH") {
            self.audit_log_path = v;
        }

        Ok(self)
    }

    /// 启动前校验
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.openai_api_key.trim().is_empty() {
            return Err(ConfigError::Missing {
                name: "OPENAI_API_KEY".to_string(),
            });
        }
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::Missing {
                name: "DATABASE_URL / DATABASE_PUBLIC_URL".to_string(),
            });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid {
                name: "batch_size".to_string(),
                value: "0".to_string(),
                expected: "正整数".to_string(),
            });
        }
        // 表名会直接拼进 SQL
        for (name, value) in [
            ("teaching_table", &self.teaching_table),
            ("glosses_table", &self.glosses_table),
            ("krdict_table", &self.krdict_table),
        ] {
            if !is_plain_identifier(value) {
                return Err(ConfigError::Invalid {
                    name: name.to_string(),
                    value: value.clone(),
                    expected: "SQL 标识符 (字母、数字、下划线)".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.sleep_between_calls_ms)
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle_timeout_secs)
    }

    /// 数据库中三张表的名称
    pub fn tables(&self) -> TableNames {
        TableNames {
            teaching: self.teaching_table.clone(),
            glosses: self.glosses_table.clone(),
            krdict: self.krdict_table.clone(),
        }
    }
}

/// 表名集合
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableNames {
    pub teaching: String,
    pub glosses: String,
    pub krdict: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Config::default().tables()
    }
}

fn parse_num<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        name: name.to_string(),
        value: value.to_string(),
        expected: std::any::type_name::<T>().to_string(),
    })
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes")
}

fn is_plain_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
