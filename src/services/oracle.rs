//! 判定服务抽象
//!
//! 判定服务的输出被视为不可信，所有返回的 ID 都要经过 `validator` 校验。

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{OracleRequest, OracleResponse};

/// 批量义项判定能力
#[async_trait]
pub trait DisambiguationOracle: Send + Sync {
    /// 写入审计日志的模型标识
    fn model_name(&self) -> &str;

    /// 对一个批次做判定
    async fn disambiguate(&self, request: &OracleRequest) -> Result<OracleResponse>;
}
