//! 单个 URL 的处理流程 - 流程层
//!
//! 核心职责：定义"一个 URL"的完整处理流程
//!
//! 流程顺序：
//! 1. 渲染页面（滚动 + 展开 iframe）
//! 2. 清洗 HTML 并截断
//! 3. 结构化抽取 + 类型校验
//! 4. 组装抽取结果

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::infrastructure::{PageFetcher, Source};
use crate::models::ExtractionResult;
use crate::services::html_normalizer::normalize_html;
use crate::services::StructuredExtractor;
use crate::utils::logging::truncate_text;
use crate::workflow::scrape_ctx::ScrapeCtx;

/// URL 处理流程
///
/// - 编排 抓取 → 清洗 → 抽取
/// - 不持有浏览器（每次抓取由 fetcher 自行启动和释放）
/// - 不修改队列状态，只返回结果或错误
pub struct ScrapeFlow {
    fetcher: Arc<dyn PageFetcher>,
    extractor: StructuredExtractor,
}

impl ScrapeFlow {
    /// 创建新的处理流程
    pub fn new(fetcher: Arc<dyn PageFetcher>, extractor: StructuredExtractor) -> Self {
        Self { fetcher, extractor }
    }

    pub async fn run(&self, ctx: &ScrapeCtx) -> AppResult<ExtractionResult> {
        // ========== 步骤 1: 渲染页面 ==========
        info!("{} 🌐 正在渲染页面: {}", ctx, ctx.url);
        let raw_html = self.fetcher.fetch(&ctx.url).await?;

        // ========== 步骤 2: 清洗 HTML ==========
        let max_chars = self.extractor.settings().max_html_chars;
        let html = normalize_html(&raw_html, max_chars);
        debug!(
            "{} HTML 清洗完成: {} → {} 字符",
            ctx,
            raw_html.chars().count(),
            html.chars().count()
        );
        if html.is_empty() {
            warn!("{} ⚠️ 清洗后页面为空，仍交给抽取服务判断", ctx);
        }

        // ========== 步骤 3: 结构化抽取 ==========
        info!("{} 🤖 正在抽取 {} 数据...", ctx, ctx.category);
        let extraction = self
            .extractor
            .extract(
                ctx.category,
                Source::Html {
                    url: ctx.url.clone(),
                    html,
                },
            )
            .await?;

        // ========== 步骤 4: 组装结果 ==========
        let result = ExtractionResult::new(ctx.url.clone(), extraction.data);
        info!(
            "{} ✓ 抽取成功: {} ({} tokens, {} 次调用)",
            ctx,
            truncate_text(&result.title, 60),
            extraction.usage.total_tokens,
            extraction.attempts
        );

        Ok(result)
    }
}
