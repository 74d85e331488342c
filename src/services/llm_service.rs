//! LLM 服务 - 业务能力层
//!
//! 只负责"批量义项判定"能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 调用 Chat Completions API
//! - 通过 `response_format` 的严格 `json_schema` 在服务端约束结果结构
//! - 不自动重试：任何失败都由上层终止本批次
//! - 响应解析分两步：严格解析，失败后截取首个 `{` 到最后一个 `}` 再解析

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs, ResponseFormat, ResponseFormatJsonSchema,
    },
    Client,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{OracleError, Result};
use crate::models::{OracleRequest, OracleResponse};
use crate::services::oracle::DisambiguationOracle;
use crate::utils::logging::truncate_text;

/// 错误信息中保留的响应长度
const ERROR_BODY_LIMIT: usize = 1200;

const SCHEMA_NAME: &str = "krdict_split_selection";

const SYSTEM_PROMPT: &str = "You are resolving Korean TOPIK teaching vocabulary items to KRDict senses.\n\
For each item, output 1 or more SENSES.\n\
Each sense MUST map to exactly one candidate krdict_id from the provided candidate list.\n\
Only split into multiple senses if you can assign a DISTINCT candidate krdict_id to each sense.\n\
Use gloss_en as the primary signal. gloss_en may contain comma-separated synonyms or multiple meanings.\n\
Split only when multiple meanings correspond to distinct candidates. Otherwise keep ONE sense.\n\
Return exactly one result per input item, keyed by its vocab_id.\n\
Return JSON only. No explanations.\n";

/// LLM 服务
///
/// 职责：
/// - 把一个批次打包成一次 Chat Completions 请求
/// - 取出回复文本并解析为结构化结果
/// - 不做 ID 校验（交给 validator）
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.oracle_timeout())
            .build()
            .map_err(|e| OracleError::Transport {
                model: config.openai_model.clone(),
                source: OpenAIError::Reqwest(e),
            })?;

        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.openai_api_key)
            .with_api_base(config.openai_api_base_url.trim_end_matches('/'));

        // 失败一次即返回，不做退避重试
        let no_retry = backoff::ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();

        let client = Client::with_config(openai_config)
            .with_http_client(http)
            .with_backoff(no_retry);

        Ok(Self {
            client,
            model_name: config.openai_model.clone(),
        })
    }

    /// 构建请求
    fn build_request(&self, request: &OracleRequest) -> Result<CreateChatCompletionRequest> {
        let user_message = serde_json::to_string(request).map_err(|source| {
            OracleError::Contract {
                snippet: "<request>".to_string(),
                source,
            }
        })?;

        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(SYSTEM_PROMPT)
            .build()
            .map_err(|e| self.oracle_error(e))?;
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(|e| self.oracle_error(e))?;

        let response_format = ResponseFormat::JsonSchema {
            json_schema: ResponseFormatJsonSchema {
                description: None,
                name: SCHEMA_NAME.to_string(),
                schema: Some(response_schema()),
                strict: Some(true),
            },
        };

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![
                ChatCompletionRequestMessage::System(system),
                ChatCompletionRequestMessage::User(user),
            ])
            .response_format(response_format)
            .build()
            .map_err(|e| self.oracle_error(e))?;

        Ok(chat_request)
    }

    /// 把客户端错误归类
    ///
    /// - 服务端返回的错误（含 5xx 原始响应体）截断到 1200 字符
    /// - 响应体无法反序列化视为契约错误
    /// - 其余（连接、超时、参数）视为传输错误
    fn oracle_error(&self, err: OpenAIError) -> OracleError {
        match err {
            OpenAIError::ApiError(api) => OracleError::Api {
                model: self.model_name.clone(),
                message: truncate_text(&api.to_string(), ERROR_BODY_LIMIT),
            },
            OpenAIError::JSONDeserialize(source, content) => OracleError::Contract {
                snippet: truncate_text(&content, 200),
                source,
            },
            other => OracleError::Transport {
                model: self.model_name.clone(),
                source: other,
            },
        }
    }
}

#[async_trait]
impl DisambiguationOracle for LlmService {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn disambiguate(&self, request: &OracleRequest) -> Result<OracleResponse> {
        let chat_request = self.build_request(request)?;
        debug!(
            "调用判定服务，模型: {}，词条数: {}",
            self.model_name,
            request.items.len()
        );

        let started = Instant::now();
        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e| {
                warn!("判定服务请求失败: {}", e);
                self.oracle_error(e)
            })?;
        debug!("判定服务返回，耗时 {:?}", started.elapsed());

        let text = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .map(str::trim)
            .unwrap_or_default();
        if text.is_empty() {
            return Err(OracleError::EmptyOutput {
                model: self.model_name.clone(),
            }
            .into());
        }

        parse_oracle_payload(text)
    }
}

/// 结果的 JSON Schema
pub fn response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "results": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "vocab_id": {"type": "string"},
                        "lemma": {"type": "string"},
                        "senses": {
                            "type": "array",
                            "minItems": 1,
                            "items": {
                                "type": "object",
                                "properties": {
                                    "sense_label": {"type": "string"},
                                    "gloss_en": {"type": "string"},
                                    "krdict_id": {"type": "string"},
                                },
                                "required": ["sense_label", "gloss_en", "krdict_id"],
                                "additionalProperties": false,
                            },
                        },
                    },
                    "required": ["vocab_id", "lemma", "senses"],
                    "additionalProperties": false,
                },
            }
        },
        "required": ["results"],
        "additionalProperties": false,
    })
}

/// 解析判定结果
///
/// 1. 严格按 JSON 解析
/// 2. 失败时截取首个 `{` 到最后一个 `}` 之间的子串再解析一次
///
/// 两步都失败则返回契约错误。
pub fn parse_oracle_payload(text: &str) -> Result<OracleResponse> {
    let strict_err = match serde_json::from_str::<OracleResponse>(text) {
        Ok(parsed) => return Ok(parsed),
        Err(e) => e,
    };

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            debug!("严格解析失败，尝试截取 JSON 子串");
            return serde_json::from_str(&text[start..=end]).map_err(|source| {
                OracleError::Contract {
                    snippet: truncate_text(text, 200),
                    source,
                }
                .into()
            });
        }
    }

    Err(OracleError::Contract {
        snippet: truncate_text(text, 200),
        source: strict_err,
    }
    .into())
}
