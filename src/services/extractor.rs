//! 结构化抽取 - 业务能力层
//!
//! 只负责"一段页面 → 一个通过校验的分类对象"，不关心队列和流程

use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, warn};

use super::prompts;
use crate::config::ExtractorSettings;
use crate::error::{AppResult, ExtractionServiceError, ValidationError};
use crate::infrastructure::{GenerationRequest, Source, StructuredGenerator, UsageMetadata};
use crate::models::{Category, CategoryData};

/// 一次成功抽取的结果
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub data: CategoryData,
    pub usage: UsageMetadata,
    pub warnings: Vec<String>,
    /// 实际调用生成服务的次数
    pub attempts: usize,
}

/// 结构化抽取器
///
/// 职责：
/// - 按分类组装 schema 和系统提示词
/// - 对瞬时错误做有限次重试
/// - 把返回对象校验为强类型数据
pub struct StructuredExtractor {
    generator: Arc<dyn StructuredGenerator>,
    settings: ExtractorSettings,
}

impl StructuredExtractor {
    pub fn new(generator: Arc<dyn StructuredGenerator>, settings: ExtractorSettings) -> Self {
        Self {
            generator,
            settings,
        }
    }

    pub fn settings(&self) -> &ExtractorSettings {
        &self.settings
    }

    /// 构造生成请求
    pub fn request_for(&self, category: Category, source: Source) -> GenerationRequest {
        GenerationRequest {
            category,
            schema_name: category.schema_name().to_string(),
            schema: CategoryData::json_schema(category),
            system_prompt: prompts::system_prompt(category).to_string(),
            source,
            max_retries: self.settings.max_retries,
        }
    }

    /// 抽取单个页面
    pub async fn extract(&self, category: Category, source: Source) -> AppResult<Extraction> {
        let request = self.request_for(category, source);
        self.run(&request).await.map_err(Into::into)
    }

    async fn run(&self, request: &GenerationRequest) -> Result<Extraction, ExtractionServiceError> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            let outcome = self.generator.generate(request).await;

            let response = match outcome {
                Ok(response) => response,
                Err(e) if e.is_retryable() && attempt <= request.max_retries => {
                    let delay = self.settings.retry_delay * attempt as u32;
                    warn!(
                        "⚠️  生成失败 ({})，{:?} 后重试 [{}/{}]: {}",
                        e.kind(),
                        delay,
                        attempt,
                        request.max_retries,
                        request.source.url()
                    );
                    sleep(delay).await;
                    continue;
                }
                Err(e) => return Err(e),
            };

            debug!(
                "{} 抽取用量: prompt {} / completion {} / total {} tokens (模型: {})",
                request.schema_name,
                response.usage.prompt_tokens,
                response.usage.completion_tokens,
                response.usage.total_tokens,
                self.generator.model_name()
            );
            for warning in &response.warnings {
                warn!("⚠️  {} 抽取警告: {}", request.schema_name, warning);
            }

            let data = CategoryData::from_value(request.category, response.object).map_err(
                |e| match e {
                    ValidationError::SchemaMismatch { schema, message } => {
                        ExtractionServiceError::TypeValidation { schema, message }
                    }
                    other => ExtractionServiceError::TypeValidation {
                        schema: request.schema_name.clone(),
                        message: other.to_string(),
                    },
                },
            )?;

            return Ok(Extraction {
                data,
                usage: response.usage,
                warnings: response.warnings,
                attempts: attempt,
            });
        }
    }
}
