//! LLM 服务 - 业务能力层
//!
//! 只负责"按 JSON Schema 生成对象"的能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, FinishReason,
        ResponseFormat, ResponseFormatJsonSchema,
    },
    Client,
};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use super::prompts;
use crate::config::Config;
use crate::error::{AppResult, ConfigError, ExtractionServiceError};
use crate::infrastructure::{
    GenerationRequest, GenerationResponse, StructuredGenerator, UsageMetadata,
};

/// 单次生成的最大输出 token
const MAX_COMPLETION_TOKENS: u32 = 4096;

/// OpenAI 兼容的结构化生成服务
///
/// 职责：
/// - 调用 chat completions 接口，使用 json_schema 响应格式
/// - 把返回内容解析为 JSON 对象
/// - 只做单次调用，重试由抽取器负责
/// - 不做类型校验
pub struct OpenAiGenerator {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl OpenAiGenerator {
    /// 创建新的生成服务
    pub fn new(config: &Config) -> AppResult<Self> {
        if config.llm_api_key.trim().is_empty() {
            return Err(ConfigError::Missing {
                name: "LLM_API_KEY".to_string(),
            }
            .into());
        }

        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.llm_request_timeout_secs))
            .build()
            .map_err(|e| ConfigError::EnvVarParseFailed {
                var_name: "LLM_REQUEST_TIMEOUT_SECS".to_string(),
                value: config.llm_request_timeout_secs.to_string(),
                expected_type: format!("可用的 HTTP 超时 ({})", e),
            })?;

        let client = Client::with_config(openai_config).with_http_client(http_client);

        Ok(Self {
            client,
            model_name: config.llm_model_name.clone(),
        })
    }

    fn api_error(&self, err: async_openai::error::OpenAIError) -> ExtractionServiceError {
        ExtractionServiceError::from_openai(&self.model_name, err)
    }

    fn build_messages(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<ChatCompletionRequestMessage>, ExtractionServiceError> {
        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(request.system_prompt.as_str())
            .build()
            .map_err(|e| self.api_error(e))?;

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(prompts::user_message(&request.source))
            .build()
            .map_err(|e| self.api_error(e))?;

        Ok(vec![
            ChatCompletionRequestMessage::System(system_msg),
            ChatCompletionRequestMessage::User(user_msg),
        ])
    }
}

/// 解析模型返回的文本为 JSON 对象
///
/// 兼容被 ``` 代码块包裹的输出
fn parse_object(schema_name: &str, content: &str) -> Result<JsonValue, ExtractionServiceError> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let value: JsonValue =
        serde_json::from_str(body).map_err(|e| ExtractionServiceError::TypeValidation {
            schema: schema_name.to_string(),
            message: format!("返回内容不是合法 JSON: {}", e),
        })?;

    if !value.is_object() {
        return Err(ExtractionServiceError::TypeValidation {
            schema: schema_name.to_string(),
            message: "返回内容不是 JSON 对象".to_string(),
        });
    }
    Ok(value)
}

#[async_trait]
impl StructuredGenerator for OpenAiGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ExtractionServiceError> {
        debug!(
            "调用 LLM API，模型: {}, schema: {}",
            self.model_name, request.schema_name
        );

        let messages = self.build_messages(request)?;

        // 构建请求
        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.0)
            .max_tokens(MAX_COMPLETION_TOKENS)
            .response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: Some(format!("Structured {} data", request.schema_name)),
                    name: request.schema_name.clone(),
                    schema: Some(request.schema.clone()),
                    strict: Some(false),
                },
            })
            .build()
            .map_err(|e| self.api_error(e))?;

        // 调用 API
        let response = self.client.chat().create(chat_request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            self.api_error(e)
        })?;

        let usage = response
            .usage
            .as_ref()
            .map(|u| UsageMetadata {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        let Some(choice) = response.choices.into_iter().next() else {
            return Err(ExtractionServiceError::EmptyResponse {
                model: self.model_name.clone(),
            });
        };

        if let Some(refusal) = choice.message.refusal.filter(|r| !r.trim().is_empty()) {
            return Err(ExtractionServiceError::Api {
                model: self.model_name.clone(),
                message: format!("模型拒绝生成: {}", refusal),
                retryable: false,
            });
        }

        let content = choice
            .message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ExtractionServiceError::EmptyResponse {
                model: self.model_name.clone(),
            })?;

        let mut warnings = Vec::new();
        match choice.finish_reason {
            Some(FinishReason::Length) => {
                warnings.push(format!("输出达到 {} token 上限被截断", MAX_COMPLETION_TOKENS))
            }
            Some(FinishReason::ContentFilter) => warnings.push("输出触发内容过滤".to_string()),
            _ => {}
        }

        let object = parse_object(&request.schema_name, &content)?;
        debug!("LLM API 调用成功，共 {} tokens", usage.total_tokens);

        Ok(GenerationResponse {
            object,
            usage,
            warnings,
        })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
