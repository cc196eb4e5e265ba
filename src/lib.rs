//! # Campus Scraper
//!
//! 一个把大学网站页面批量转换为结构化数据的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 外部协作方边界，只暴露能力
//! - `PageFetcher` / `StructuredGenerator` / `DocumentStore` - 浏览器、LLM、存储
//! - `JsExecutor` - 唯一的 page owner，提供 eval() 能力
//! - `browser/` - 基于 chromiumoxide 的页面抓取器（滚动 + 展开 iframe）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个页面
//! - `html_normalizer` - HTML 清洗与截断
//! - `StructuredExtractor` - 按分类抽取并校验，瞬时错误有限重试
//! - `OpenAiGenerator` - OpenAI 兼容的结构化生成
//! - `ScrapeTool` - 作为工具暴露给上层智能体
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个 URL"的完整处理流程
//! - `ScrapeCtx` - 上下文封装（entry_id + url + category）
//! - `ScrapeFlow` - 流程编排（fetch → normalize → extract → result）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/queue_store` - 队列状态、reducer 与订阅
//! - `orchestrator/batch_processor` - 批量处理器，扇出并控制并发
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::ChromiumFetcher;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{DocumentStore, JsExecutor, PageFetcher, StructuredGenerator};
pub use models::{Category, EntryStatus, ExtractionResult, UrlEntry};
pub use orchestrator::{App, BatchProcessor, BatchSummary, QueueAction, QueueStore};
pub use services::{ScrapeTool, StructuredExtractor};
pub use workflow::{ScrapeCtx, ScrapeFlow};
