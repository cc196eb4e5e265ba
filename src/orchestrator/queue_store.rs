//! 队列状态与 reducer
//!
//! 队列是唯一的共享可变状态。所有修改都通过 `QueueAction` 描述，
//! 由纯函数 `reduce` 基于最新快照算出新状态，再整体替换。
//! 条目更新一律按 id 定位，不依赖数组下标。

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::ValidationError;
use crate::models::{validate_url, Category, EntryId, EntryStatus, Transition, UrlEntry};

/// 队列快照
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueState {
    pub items: Vec<UrlEntry>,
    pub is_processing: bool,
    /// 批次级错误（与单个条目的错误无关）
    pub error: Option<String>,
}

impl QueueState {
    pub fn entry(&self, id: EntryId) -> Option<&UrlEntry> {
        self.items.iter().find(|entry| entry.id == id)
    }

    /// 是否还有条目处于 processing
    pub fn has_in_flight(&self) -> bool {
        self.items
            .iter()
            .any(|entry| entry.status == EntryStatus::Processing)
    }
}

/// 条目列表的更新方式
#[derive(Debug, Clone, PartialEq)]
pub enum ItemsUpdate {
    Add(UrlEntry),
    Remove(EntryId),
    Clear,
    /// 对单个条目应用状态迁移
    Transition {
        id: EntryId,
        transition: Transition,
        at: DateTime<Utc>,
    },
    /// 整体替换
    Replace(Vec<UrlEntry>),
}

/// 展示层与流水线之间唯一的接口
#[derive(Debug, Clone, PartialEq)]
pub enum QueueAction {
    SetItems(ItemsUpdate),
    SetIsProcessing(bool),
    SetError(Option<String>),
}

/// 纯函数：旧状态 + 动作 → 新状态
pub fn reduce(state: &QueueState, action: QueueAction) -> QueueState {
    match action {
        QueueAction::SetItems(update) => QueueState {
            items: reduce_items(&state.items, update),
            ..state.clone()
        },
        QueueAction::SetIsProcessing(is_processing) => QueueState {
            is_processing,
            ..state.clone()
        },
        QueueAction::SetError(error) => QueueState {
            error,
            ..state.clone()
        },
    }
}

fn reduce_items(items: &[UrlEntry], update: ItemsUpdate) -> Vec<UrlEntry> {
    match update {
        ItemsUpdate::Add(entry) => {
            if items.iter().any(|existing| existing.id == entry.id) {
                debug!("条目 {} 已存在，忽略重复添加", entry.id);
                return items.to_vec();
            }
            let mut next = items.to_vec();
            next.push(entry);
            next
        }
        ItemsUpdate::Remove(id) => items.iter().filter(|e| e.id != id).cloned().collect(),
        ItemsUpdate::Clear => Vec::new(),
        ItemsUpdate::Replace(next) => next,
        ItemsUpdate::Transition { id, transition, at } => {
            let Some(position) = items.iter().position(|e| e.id == id) else {
                // 处理期间被移除的条目，结果直接丢弃
                debug!("条目 {} 已不在队列中，忽略 {}", id, transition.name());
                return items.to_vec();
            };

            let mut next = items.to_vec();
            match items[position].transitioned(transition, at) {
                Ok(entry) => next[position] = entry,
                Err(e) => warn!("⚠️ 条目 {} 状态迁移被拒绝: {}", id, e),
            }
            next
        }
    }
}

/// 队列存储
///
/// 包装 watch 通道：写入走 `dispatch`，展示层通过 `subscribe` 拿到只读接收端
pub struct QueueStore {
    tx: watch::Sender<QueueState>,
}

impl Default for QueueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueStore {
    pub fn new() -> Self {
        Self::with_state(QueueState::default())
    }

    pub fn with_state(state: QueueState) -> Self {
        let (tx, _rx) = watch::channel(state);
        Self { tx }
    }

    /// 基于最新快照原子地应用一个动作
    pub fn dispatch(&self, action: QueueAction) {
        self.tx.send_modify(|state| *state = reduce(state, action));
    }

    /// 当前快照
    pub fn snapshot(&self) -> QueueState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueueState> {
        self.tx.subscribe()
    }

    /// 原子地选出所有 pending / error 条目并标记为 processing
    ///
    /// 选择和标记在同一次修改中完成，并发的两轮处理不会选中同一个条目。
    /// 有条目被选中时打开 processing 标记并清除批次级错误；
    /// 没有时标记只反映是否还有其他轮次在处理。
    pub fn claim_selectable(&self, at: DateTime<Utc>) -> Vec<UrlEntry> {
        let mut claimed = Vec::new();
        self.tx.send_modify(|state| {
            claimed = state
                .items
                .iter()
                .filter(|entry| entry.status.is_selectable())
                .cloned()
                .collect();

            let mut next = claimed.iter().fold(state.clone(), |next, entry| {
                reduce(
                    &next,
                    QueueAction::SetItems(ItemsUpdate::Transition {
                        id: entry.id,
                        transition: Transition::Start,
                        at,
                    }),
                )
            });
            if claimed.is_empty() {
                let busy = next.has_in_flight();
                next = reduce(&next, QueueAction::SetIsProcessing(busy));
            } else {
                next = reduce(&next, QueueAction::SetIsProcessing(true));
                next = reduce(&next, QueueAction::SetError(None));
            }
            *state = next;
        });
        claimed
    }

    /// 一轮处理结束：只有在没有条目仍处于 processing 时才关闭标记
    pub fn settle_processing(&self) {
        self.tx.send_modify(|state| {
            let busy = state.has_in_flight();
            *state = reduce(state, QueueAction::SetIsProcessing(busy));
        });
    }

    /// 用户提交一个 URL
    ///
    /// 分类或 URL 不合法时设置批次级错误并返回校验错误，不入队
    pub fn submit(&self, url: &str, category: &str) -> Result<EntryId, ValidationError> {
        let validated = category
            .parse::<Category>()
            .and_then(|category| validate_url(url).map(|url| (url, category)));

        match validated {
            Ok((url, category)) => {
                let entry = UrlEntry::new(url, category);
                let id = entry.id;
                self.dispatch(QueueAction::SetItems(ItemsUpdate::Add(entry)));
                Ok(id)
            }
            Err(e) => {
                self.dispatch(QueueAction::SetError(Some(e.to_string())));
                Err(e)
            }
        }
    }
}
