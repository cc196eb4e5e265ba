//! 把"抓取 + 抽取"暴露为上层智能体可调用的工具

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::info;
use uuid::Uuid;

use crate::error::{AppResult, ExtractionServiceError};
use crate::models::{validate_url, Category, ExtractionResult};
use crate::workflow::{ScrapeCtx, ScrapeFlow};

/// 工具参数
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ScrapeToolArgs {
    /// Absolute http(s) URL of the page to scrape
    pub url: String,
    /// Target schema: "person", "news" or "home"
    pub category: String,
}

/// 抓取工具
pub struct ScrapeTool {
    flow: Arc<ScrapeFlow>,
}

impl ScrapeTool {
    pub const NAME: &'static str = "scrape_page";

    pub fn new(flow: Arc<ScrapeFlow>) -> Self {
        Self { flow }
    }

    /// OpenAI function tool 描述
    pub fn definition() -> JsonValue {
        let parameters = serde_json::to_value(schemars::schema_for!(ScrapeToolArgs))
            .unwrap_or_else(|_| json!({ "type": "object" }));
        json!({
            "type": "function",
            "function": {
                "name": Self::NAME,
                "description": "Render a university web page in a headless browser and extract a structured person, news or home page object from it.",
                "parameters": parameters,
            }
        })
    }

    /// 解析工具参数
    ///
    /// JSON 格式错误是工具参数错误；分类和 URL 不合法是校验错误，都在任何网络调用之前返回
    pub fn parse_args(arguments: &str) -> AppResult<(String, Category)> {
        let args: ScrapeToolArgs =
            serde_json::from_str(arguments).map_err(|e| ExtractionServiceError::ToolArgument {
                tool: Self::NAME.to_string(),
                message: e.to_string(),
            })?;
        let category: Category = args.category.parse()?;
        let url = validate_url(&args.url)?;
        Ok((url, category))
    }

    /// 执行一次工具调用
    pub async fn call(&self, arguments: &str) -> AppResult<ExtractionResult> {
        let (url, category) = Self::parse_args(arguments)?;
        info!("🔧 工具调用 {}: {} ({})", Self::NAME, url, category);

        let ctx = ScrapeCtx::new(Uuid::new_v4(), url, category, 0);
        self.flow.run(&ctx).await
    }
}
