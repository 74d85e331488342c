//! 错误类型
//!
//! 每一类错误都对应一种终止方式：要么回滚当前批次，要么终止整个运行。
//! 本 crate 内不存在"降级为警告"的错误。

use async_openai::error::OpenAIError;
use thiserror::Error;

/// 错误信息中最多展示的词条 / ID 数量
const DISPLAY_LIMIT: usize = 10;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum LinkerError {
    /// 配置错误（启动阶段，尚未选择任何数据）
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 数据完整性错误：某些词条在词典表中没有任何候选
    #[error("以下词条没有任何 KRDict 候选: {}", preview(.lemmas, 20))]
    MissingCandidates { lemmas: Vec<String> },

    /// 判定服务错误（传输 / HTTP / 响应契约）
    #[error(transparent)]
    Oracle(#[from] OracleError),

    /// 判定结果校验失败
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// 数据库错误
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    /// 审计日志写入失败
    #[error("审计日志写入失败 ({path}): {source}")]
    AuditLog {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 必填项缺失
    #[error("缺少必要配置: {name}")]
    Missing { name: String },

    /// 值无法解析
    #[error("配置项 {name} 解析失败: 值 '{value}' 无法转换为 {expected}")]
    Invalid {
        name: String,
        value: String,
        expected: String,
    },

    /// 配置文件读取失败
    #[error("无法读取配置文件 {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 配置文件解析失败
    #[error("无法解析配置文件 {path}: {source}")]
    FileParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 判定服务错误
#[derive(Debug, Error)]
pub enum OracleError {
    /// 网络请求失败，或客户端无法构建
    #[error("判定服务请求失败 (模型: {model}): {source}")]
    Transport {
        model: String,
        #[source]
        source: OpenAIError,
    },

    /// 服务端返回错误（非成功状态码），`message` 为截断后的响应体或错误信息
    #[error("判定服务返回错误 (模型: {model}): {message}")]
    Api { model: String, message: String },

    /// 回复中没有文本内容
    #[error("判定服务返回内容为空 (模型: {model})")]
    EmptyOutput { model: String },

    /// 响应无法解析为结构化结果
    #[error("无法解析判定结果 (响应: {snippet}): {source}")]
    Contract {
        snippet: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 判定结果校验错误
#[derive(Debug, Error)]
pub enum ValidationError {
    /// 批次中有词条没有得到结果
    #[error("判定结果缺少以下 vocab_id: {}", preview(.missing, DISPLAY_LIMIT))]
    MissingResults { missing: Vec<String> },

    /// 结果中出现了不属于本批次的词条
    #[error("判定结果包含不属于本批次的 vocab_id: {vocab_id}")]
    UnknownRow { vocab_id: String },

    /// 同一个词条出现了多次
    #[error("判定结果中 vocab_id 重复出现: {vocab_id}")]
    DuplicateRow { vocab_id: String },

    /// 结果没有任何义项
    #[error("vocab_id={vocab_id} 的判定结果没有任何义项")]
    EmptySenses { vocab_id: String },

    /// 选择了不在该词条候选集中的词典 ID
    #[error("vocab_id={vocab_id} lemma={lemma} 选择了不在候选中的 krdict_id={krdict_id}")]
    CandidateNotAllowed {
        vocab_id: String,
        lemma: String,
        krdict_id: String,
    },

    /// 同一结果内多个义项复用同一个词典 ID
    #[error("vocab_id={vocab_id} 的多个义项重复使用 krdict_id={krdict_id}")]
    RepeatedCandidate { vocab_id: String, krdict_id: String },
}

impl LinkerError {
    /// 审计日志中使用的错误代码
    pub fn code(&self) -> &'static str {
        match self {
            LinkerError::Config(_) => "CONFIG",
            LinkerError::MissingCandidates { .. } => "NO_KRDICT_CANDIDATES",
            LinkerError::Oracle(_) => "ORACLE_FAILURE",
            LinkerError::Validation(_) => "VALIDATION_FAILURE",
            LinkerError::Database(_) => "STORAGE_FAILURE",
            LinkerError::AuditLog { .. } => "AUDIT_LOG_FAILURE",
        }
    }
}

/// 截断列表用于显示
fn preview(items: &[String], limit: usize) -> String {
    let shown: Vec<&str> = items.iter().take(limit).map(String::as_str).collect();
    if items.len() > limit {
        format!("[{}]...", shown.join(", "))
    } else {
        format!("[{}]", shown.join(", "))
    }
}

/// 应用程序结果类型
pub type Result<T> = std::result::Result<T, LinkerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_results_are_truncated() {
        let missing: Vec<String> = (0..12).map(|i| format!("id-{}", i)).collect();
        let msg = ValidationError::MissingResults { missing }.to_string();
        assert!(msg.contains("id-9"));
        assert!(!msg.contains("id-10"));
        assert!(msg.ends_with("..."));
    }

    #[test]
    fn test_short_list_not_truncated() {
        let err = LinkerError::MissingCandidates {
            lemmas: vec!["가다".to_string()],
        };
        assert_eq!(err.to_string(), "以下词条没有任何 KRDict 候选: [가다]");
        assert_eq!(err.code(), "NO_KRDICT_CANDIDATES");
    }
}
