//! URL 条目及其状态机
//!
//! `pending → processing → {completed | error}`，`error` 可被重新选中再次进入 `processing`。
//! 结果与错误信息分别挂在终态变体上，类型本身保证二者互斥。

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::category::Category;
use crate::models::result::ExtractionResult;

pub type EntryId = Uuid;

/// 条目状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Processing,
    Completed {
        #[serde(rename = "processedAt")]
        processed_at: DateTime<Utc>,
        result: Box<ExtractionResult>,
    },
    Error {
        #[serde(rename = "processedAt")]
        processed_at: DateTime<Utc>,
        #[serde(rename = "error")]
        message: String,
    },
}

/// 状态迁移
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// 被编排器选中
    Start,
    /// 抓取 + 抽取成功
    Complete(Box<ExtractionResult>),
    /// 抓取或抽取失败，附带可读的错误信息
    Fail(String),
}

impl Transition {
    pub fn name(&self) -> &'static str {
        match self {
            Transition::Start => "start",
            Transition::Complete(_) => "complete",
            Transition::Fail(_) => "fail",
        }
    }
}

/// 非法迁移
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: &'static str,
    pub transition: &'static str,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "状态 {} 不允许迁移 {}", self.from, self.transition)
    }
}

impl std::error::Error for InvalidTransition {}

impl EntryStatus {
    pub fn name(&self) -> &'static str {
        match self {
            EntryStatus::Pending => "pending",
            EntryStatus::Processing => "processing",
            EntryStatus::Completed { .. } => "completed",
            EntryStatus::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EntryStatus::Completed { .. } | EntryStatus::Error { .. })
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, EntryStatus::Completed { .. })
    }

    /// 可以被新一轮处理选中（pending 或 error）
    pub fn is_selectable(&self) -> bool {
        matches!(self, EntryStatus::Pending | EntryStatus::Error { .. })
    }

    /// 计算迁移后的状态，不修改自身
    pub fn apply(
        &self,
        transition: Transition,
        at: DateTime<Utc>,
    ) -> Result<EntryStatus, InvalidTransition> {
        match (self, transition) {
            (EntryStatus::Pending | EntryStatus::Error { .. }, Transition::Start) => {
                Ok(EntryStatus::Processing)
            }
            (EntryStatus::Processing, Transition::Complete(result)) => Ok(EntryStatus::Completed {
                processed_at: at,
                result,
            }),
            (EntryStatus::Processing, Transition::Fail(message)) => {
                let message = if message.trim().is_empty() {
                    "未知错误".to_string()
                } else {
                    message
                };
                Ok(EntryStatus::Error {
                    processed_at: at,
                    message,
                })
            }
            (from, transition) => Err(InvalidTransition {
                from: from.name(),
                transition: transition.name(),
            }),
        }
    }
}

/// 队列中的一个 URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlEntry {
    pub id: EntryId,
    pub url: String,
    pub category: Category,
    pub added_at: DateTime<Utc>,
    #[serde(flatten)]
    pub status: EntryStatus,
}

impl UrlEntry {
    /// 新建一个 `pending` 条目
    pub fn new(url: impl Into<String>, category: Category) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            category,
            added_at: Utc::now(),
            status: EntryStatus::Pending,
        }
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        match &self.status {
            EntryStatus::Completed { processed_at, .. }
            | EntryStatus::Error { processed_at, .. } => Some(*processed_at),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&ExtractionResult> {
        match &self.status {
            EntryStatus::Completed { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            EntryStatus::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    /// 返回应用迁移后的新条目，其余字段保持不变
    pub fn transitioned(
        &self,
        transition: Transition,
        at: DateTime<Utc>,
    ) -> Result<UrlEntry, InvalidTransition> {
        let status = self.status.apply(transition, at)?;
        Ok(UrlEntry {
            status,
            ..self.clone()
        })
    }
}
