use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::models::category::Category;
use crate::models::schemas::CategoryData;

/// 单个 URL 的抽取结果
///
/// 每个条目只产生一次，以值的形式嵌入该条目，不在条目之间共享。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub scraped_at: DateTime<Utc>,
    pub domain: String,
    /// 序列化为 `category` + `data` 两个字段
    #[serde(flatten)]
    pub data: CategoryData,
}

impl ExtractionResult {
    pub fn new(url: impl Into<String>, data: CategoryData) -> Self {
        let url = url.into();
        Self {
            id: Uuid::new_v4(),
            title: data.title(),
            domain: domain_of(&url),
            url,
            scraped_at: Utc::now(),
            data,
        }
    }

    pub fn category(&self) -> Category {
        self.data.category()
    }
}

/// 提取 URL 的主机名，解析失败时返回空串
pub fn domain_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_default()
}

/// 校验并规范化待抓取的 URL，只接受绝对的 http / https 地址
pub fn validate_url(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    let invalid = |reason: &str| ValidationError::InvalidUrl {
        url: trimmed.to_string(),
        reason: reason.to_string(),
    };

    let parsed = url::Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(&format!("不支持的协议 {}", other))),
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid("缺少主机名"));
    }
    Ok(trimmed.to_string())
}
