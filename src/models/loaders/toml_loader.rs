use std::path::Path;

use serde::Deserialize;
use tokio::fs;

use crate::error::{AppError, AppResult, FileError};

/// URL 列表文件中的一行
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UrlSpec {
    pub url: String,
    /// 保持原始字符串，由队列在入队时校验
    pub category: String,
}

#[derive(Debug, Deserialize)]
struct UrlListFile {
    #[serde(default)]
    urls: Vec<UrlSpec>,
}

/// 解析 URL 列表
///
/// ```toml
/// [[urls]]
/// url = "https://example.edu/people/jane-doe"
/// category = "person"
/// ```
pub fn parse_url_list(content: &str) -> Result<Vec<UrlSpec>, toml::de::Error> {
    let file: UrlListFile = toml::from_str(content)?;
    Ok(file.urls)
}

/// 从 TOML 文件加载待抓取的 URL 列表
pub async fn load_url_list(path: &Path) -> AppResult<Vec<UrlSpec>> {
    if !path.exists() {
        return Err(AppError::File(FileError::NotFound {
            path: path.display().to_string(),
        }));
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

    let urls = parse_url_list(&content).map_err(|e| {
        AppError::File(FileError::TomlParseFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })
    })?;

    tracing::info!(
        "已加载 {} 个 URL: {}",
        urls.len(),
        path.file_name().unwrap_or_default().to_string_lossy()
    );

    Ok(urls)
}
