//! 审计日志服务 - 业务能力层
//!
//! 只负责"追加一行 JSON"能力，不关心流程，也不关心事务是否提交

use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{LinkerError, Result};

/// 审计日志服务
///
/// 职责：
/// - 每个批次 / 每个致命异常写一行 JSON
/// - 只追加，从不改写或压缩
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    /// 使用指定路径创建
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一条记录
    pub fn append<T: Serialize>(&self, record: &T) -> Result<()> {
        let line = serde_json::to_string(record).map_err(|e| self.io_error(e.into()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;

        writeln!(file, "{}", line).map_err(|e| self.io_error(e))?;

        debug!("写入审计日志: {} 字节", line.len());
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> LinkerError {
        LinkerError::AuditLog {
            path: self.path.display().to_string(),
            source,
        }
    }
}
