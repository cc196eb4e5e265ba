//! 进程内文档存储
//!
//! 按分类保存已完成的抽取结果，用于本地运行和测试

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StorageError;
use crate::infrastructure::DocumentStore;
use crate::models::{Category, ExtractionResult};

#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<Category, Vec<ExtractionResult>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有分类的文档总数
    pub async fn len(&self) -> usize {
        self.documents.read().await.values().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn save(
        &self,
        category: Category,
        result: &ExtractionResult,
    ) -> Result<(), StorageError> {
        if result.category() != category {
            return Err(StorageError::SaveFailed {
                category: category.to_string(),
                message: format!("结果分类为 {}", result.category()),
            });
        }

        let mut documents = self.documents.write().await;
        let bucket = documents.entry(category).or_default();
        // 同一 URL 只保留最新结果
        bucket.retain(|existing| existing.url != result.url);
        bucket.push(result.clone());
        debug!("已保存 {} 结果: {}", category, result.url);
        Ok(())
    }

    async fn list(&self, category: Category) -> Result<Vec<ExtractionResult>, StorageError> {
        Ok(self
            .documents
            .read()
            .await
            .get(&category)
            .cloned()
            .unwrap_or_default())
    }
}
