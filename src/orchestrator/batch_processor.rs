//! 批量处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责驱动队列中的条目完成 抓取 + 抽取。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：创建生成服务、页面抓取器、处理流程
//! 2. **批量加载**：从 TOML 文件加载 URL 并逐个入队
//! 3. **扇出处理**：选中所有未完成的条目，同时发起处理，全部结束后才返回
//! 4. **并发控制**：使用 Semaphore 限制同时运行的浏览器数量
//! 5. **状态更新**：每个条目的结果都通过 reducer 按 id 写回队列
//! 6. **全局统计**：汇总本轮处理结果并写出队列快照
//!
//! ## 设计特点
//!
//! - **错误隔离**：单个条目的失败只会让该条目进入 error，不影响其他条目
//! - **无自动重试**：error 条目在下一轮被重新选中
//! - **向下委托**：委托 ScrapeFlow 处理单个 URL

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::browser::ChromiumFetcher;
use crate::config::Config;
use crate::error::AppError;
use crate::infrastructure::DocumentStore;
use crate::models::{load_url_list, Transition};
use crate::orchestrator::queue_store::{ItemsUpdate, QueueAction, QueueStore};
use crate::services::{MemoryStore, OpenAiGenerator, StructuredExtractor};
use crate::utils::logging;
use crate::workflow::{ScrapeCtx, ScrapeFlow};

/// 单轮处理统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// 本轮选中的条目数
    pub selected: usize,
    pub completed: usize,
    pub failed: usize,
}

/// 批量处理器
pub struct BatchProcessor {
    flow: Arc<ScrapeFlow>,
    semaphore: Semaphore,
    max_concurrent: usize,
    documents: Option<Arc<dyn DocumentStore>>,
}

impl BatchProcessor {
    pub fn new(flow: Arc<ScrapeFlow>, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            flow,
            semaphore: Semaphore::new(max_concurrent),
            max_concurrent,
            documents: None,
        }
    }

    /// 完成的结果同时交给文档存储
    pub fn with_document_store(mut self, documents: Arc<dyn DocumentStore>) -> Self {
        self.documents = Some(documents);
        self
    }

    /// 处理队列中所有未完成的条目
    ///
    /// 已完成的条目不会被选中；正在被其他轮次处理的条目也会跳过。
    /// 选中与标记为 processing 是一次原子修改。
    /// processing 标记只在没有任何条目仍在处理时关闭。
    pub async fn process_queue(&self, store: &QueueStore) -> BatchSummary {
        let selected = store.claim_selectable(Utc::now());
        if selected.is_empty() {
            info!("没有待处理的条目");
            return BatchSummary::default();
        }

        logging::log_batch_start(selected.len(), self.max_concurrent);

        let tasks = selected.iter().enumerate().map(|(idx, entry)| {
            self.process_entry(store, ScrapeCtx::from_entry(entry, idx + 1))
        });
        let outcomes = join_all(tasks).await;

        store.settle_processing();

        let completed = outcomes.iter().filter(|ok| **ok).count();
        let summary = BatchSummary {
            selected: selected.len(),
            completed,
            failed: selected.len() - completed,
        };
        logging::log_batch_complete(summary.completed, summary.selected);
        summary
    }

    /// 处理单个条目，返回是否成功
    async fn process_entry(&self, store: &QueueStore, ctx: ScrapeCtx) -> bool {
        // Semaphore 不会被关闭
        let _permit = self.semaphore.acquire().await.ok();

        match self.flow.run(&ctx).await {
            Ok(result) => {
                if let Some(documents) = &self.documents {
                    if let Err(e) = documents.save(result.category(), &result).await {
                        let e: AppError = e.into();
                        warn!("{} ⚠️ 结果保存失败（不影响条目状态）: {}", ctx, e);
                    }
                }

                store.dispatch(QueueAction::SetItems(ItemsUpdate::Transition {
                    id: ctx.entry_id,
                    transition: Transition::Complete(Box::new(result)),
                    at: Utc::now(),
                }));
                true
            }
            Err(e) => {
                error!("{} ❌ 处理失败 ({}): {}", ctx, e.kind(), e);
                store.dispatch(QueueAction::SetItems(ItemsUpdate::Transition {
                    id: ctx.entry_id,
                    transition: Transition::Fail(e.to_string()),
                    at: Utc::now(),
                }));
                false
            }
        }
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    store: QueueStore,
    processor: BatchProcessor,
    documents: Arc<MemoryStore>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::log_startup(&config);

        let generator = Arc::new(OpenAiGenerator::new(&config)?);
        let fetcher = Arc::new(ChromiumFetcher::new(config.fetch_settings()));
        let extractor = StructuredExtractor::new(generator, config.extractor_settings());
        let flow = Arc::new(ScrapeFlow::new(fetcher, extractor));

        let documents = Arc::new(MemoryStore::new());
        let processor = BatchProcessor::new(flow, config.max_concurrent_urls)
            .with_document_store(documents.clone());

        Ok(Self {
            config,
            store: QueueStore::new(),
            processor,
            documents,
        })
    }

    pub fn store(&self) -> &QueueStore {
        &self.store
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        info!("\n📁 正在加载 URL 列表...");
        let specs = load_url_list(Path::new(&self.config.url_list_file)).await?;

        if specs.is_empty() {
            warn!("⚠️ URL 列表为空，程序结束");
            return Ok(());
        }

        let mut rejected = 0;
        for spec in &specs {
            if let Err(e) = self.store.submit(&spec.url, &spec.category) {
                warn!("⚠️ 跳过非法条目 {}: {}", spec.url, e);
                rejected += 1;
            }
        }
        logging::log_urls_loaded(specs.len() - rejected, rejected);

        // 处理所有条目
        let summary = self.processor.process_queue(&self.store).await;

        // 输出结果
        self.write_output().await?;
        logging::print_final_stats(
            summary.completed,
            summary.failed,
            rejected,
            self.documents.len().await,
            &self.config.output_file,
        );

        Ok(())
    }

    /// 把队列快照写成 JSON
    async fn write_output(&self) -> Result<(), AppError> {
        let snapshot = self.store.snapshot();
        let json = serde_json::to_string_pretty(&snapshot)?;
        tokio::fs::write(&self.config.output_file, json)
            .await
            .map_err(|e| AppError::file_write_failed(self.config.output_file.clone(), e))?;
        Ok(())
    }
}

