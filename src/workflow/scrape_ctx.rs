//! 抓取上下文
//!
//! 封装"我正在处理队列里的哪个条目"这一信息

use std::fmt::Display;

use crate::models::{Category, EntryId, UrlEntry};

/// 抓取上下文
///
/// 包含处理单个 URL 所需的所有上下文信息
#[derive(Debug, Clone)]
pub struct ScrapeCtx {
    /// 条目 ID
    pub entry_id: EntryId,

    /// 目标 URL
    pub url: String,

    /// 目标分类
    pub category: Category,

    /// 条目在本轮批次中的序号（从1开始，仅用于日志显示）
    pub index: usize,
}

impl ScrapeCtx {
    /// 创建新的抓取上下文
    pub fn new(entry_id: EntryId, url: String, category: Category, index: usize) -> Self {
        Self {
            entry_id,
            url,
            category,
            index,
        }
    }

    /// 从队列条目创建上下文
    pub fn from_entry(entry: &UrlEntry, index: usize) -> Self {
        Self::new(entry.id, entry.url.clone(), entry.category, index)
    }
}

impl Display for ScrapeCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[条目 {}]", self.index)
    }
}
