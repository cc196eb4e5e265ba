// 外部协作方的边界
//
// 这里只定义能力，不包含业务逻辑：
// - PageFetcher: 页面渲染 / 浏览器自动化服务
// - StructuredGenerator: 结构化生成服务（LLM）
// - DocumentStore: 文档存储

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::{AppResult, ExtractionServiceError, StorageError};
use crate::models::{Category, ExtractionResult};

// =============================================================================
// 页面抓取
// =============================================================================

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// 渲染 URL 并返回展开 iframe 后的完整 DOM 字符串
    async fn fetch(&self, url: &str) -> AppResult<String>;
}

// =============================================================================
// 结构化生成
// =============================================================================

/// 交给生成服务的页面来源
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Source {
    /// 只给 URL，由服务自行获取页面
    Url { url: String },
    /// 已抓取并清洗过的 HTML
    Html { url: String, html: String },
}

impl Source {
    pub fn url(&self) -> &str {
        match self {
            Source::Url { url } | Source::Html { url, .. } => url,
        }
    }
}

/// 生成请求
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub category: Category,
    pub schema_name: String,
    pub schema: JsonValue,
    pub system_prompt: String,
    pub source: Source,
    pub max_retries: usize,
}

/// token 用量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UsageMetadata {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// 生成结果
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResponse {
    /// 未经类型校验的对象
    pub object: JsonValue,
    pub usage: UsageMetadata,
    /// 非致命警告，只记录日志
    pub warnings: Vec<String>,
}

#[async_trait]
pub trait StructuredGenerator: Send + Sync {
    /// 单次调用，不做重试
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ExtractionServiceError>;

    /// 用于日志的模型名
    fn model_name(&self) -> &str;
}

// =============================================================================
// 文档存储
// =============================================================================

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn save(&self, category: Category, result: &ExtractionResult) -> Result<(), StorageError>;

    async fn list(&self, category: Category) -> Result<Vec<ExtractionResult>, StorageError>;
}
