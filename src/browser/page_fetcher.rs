//! 页面抓取器
//!
//! 每次 fetch 启动一个独立的无头浏览器：
//! 导航 → 等待稳定 → 逐步滚动触发懒加载 → 展开 iframe → 序列化 DOM

use std::path::Path;

use async_trait::async_trait;
use chromiumoxide::Browser;
use chrono::Utc;
use serde::Deserialize;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

use super::headless::launch_headless_browser;
use super::iframe::{
    body_of, iframe_sources, inline_iframes, resolve_frame_url, InlinedFrame,
};
use crate::config::FetchSettings;
use crate::error::{AppError, AppResult, FetchError};
use crate::infrastructure::{JsExecutor, PageFetcher};
use crate::models::result::domain_of;

/// 导航完成后等待网络空闲的固定时长
const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// 轮询 iframe 出现的间隔
const IFRAME_POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScrollPosition {
    scroll_y: f64,
    inner_height: f64,
    scroll_height: f64,
}

impl ScrollPosition {
    fn at_bottom(&self) -> bool {
        self.scroll_y + self.inner_height >= self.scroll_height
    }
}

/// 基于 chromiumoxide 的页面抓取器
#[derive(Debug, Clone)]
pub struct ChromiumFetcher {
    settings: FetchSettings,
}

impl ChromiumFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    /// 在新标签页中打开 URL 并等待加载完成
    async fn open(&self, browser: &Browser, url: &str) -> AppResult<JsExecutor> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| AppError::navigation_failed(url, e))?;
        let executor = JsExecutor::new(page);

        let navigation = async {
            executor.page().goto(url).await?;
            executor.page().wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        };

        let outcome = match timeout(self.settings.navigation_timeout, navigation).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(AppError::navigation_failed(url, e)),
            Err(_) => Err(AppError::Fetch(FetchError::Timeout {
                url: url.to_string(),
                timeout_secs: self.settings.navigation_timeout.as_secs(),
            })),
        };

        if let Err(e) = outcome {
            if let Err(close_err) = executor.close().await {
                debug!("关闭标签页失败: {}", close_err);
            }
            return Err(e);
        }

        sleep(SETTLE_DELAY).await;
        Ok(executor)
    }

    /// 逐步滚动到底部，触发懒加载内容
    async fn auto_scroll(&self, executor: &JsExecutor, url: &str) -> AppResult<()> {
        let script = format!(
            "() => {{ window.scrollBy(0, {}); return {{ scrollY: window.scrollY, innerHeight: window.innerHeight, scrollHeight: document.documentElement.scrollHeight }}; }}",
            self.settings.scroll_step_px
        );

        for step in 1..=self.settings.max_scroll_steps {
            let position: ScrollPosition = executor.eval_as(script.as_str()).await?;
            if position.at_bottom() {
                debug!("滚动到底部: {} (共 {} 步)", url, step);
                return Ok(());
            }
            sleep(self.settings.scroll_interval).await;
        }

        warn!(
            "⚠️  滚动达到上限 {} 步仍未到底部，按当前内容继续: {}",
            self.settings.max_scroll_steps, url
        );
        Ok(())
    }

    /// 等待 iframe 出现，超时或没有 iframe 时返回 false
    async fn wait_for_iframes(&self, executor: &JsExecutor) -> bool {
        let wait_for_frames = async {
            loop {
                match executor.page().find_elements("iframe").await {
                    Ok(elements) if !elements.is_empty() => return elements.len(),
                    Ok(_) => {}
                    Err(e) => debug!("查找 iframe 失败: {}", e),
                }
                sleep(IFRAME_POLL_INTERVAL).await;
            }
        };

        match timeout(self.settings.iframe_wait_timeout, wait_for_frames).await {
            Ok(count) => {
                debug!("页面包含 {} 个 iframe", count);
                true
            }
            Err(_) => {
                debug!("等待 iframe 超时，按无 iframe 处理");
                false
            }
        }
    }

    /// 在新标签页渲染单个 iframe，返回其 body 内容
    async fn render_frame(&self, browser: &Browser, frame_url: &str) -> AppResult<String> {
        let executor = self.open(browser, frame_url).await?;
        let content = executor.content(frame_url).await;
        if let Err(e) = executor.close().await {
            debug!("关闭 iframe 标签页失败: {}", e);
        }
        Ok(body_of(&content?))
    }

    /// 渲染页面并展开 iframe
    async fn render(&self, browser: &Browser, url: &str) -> AppResult<String> {
        let executor = self.open(browser, url).await?;
        let outcome = self.render_opened(browser, &executor, url).await;
        if let Err(e) = executor.close().await {
            debug!("关闭标签页失败: {}", e);
        }
        outcome
    }

    async fn render_opened(
        &self,
        browser: &Browser,
        executor: &JsExecutor,
        url: &str,
    ) -> AppResult<String> {
        self.auto_scroll(executor, url).await?;

        let has_frames = self.wait_for_iframes(executor).await;
        let html = executor.content(url).await?;
        // src 从序列化后的 DOM 中读取，保证与拼接时的匹配方式一致
        let sources = if has_frames { iframe_sources(&html) } else { Vec::new() };
        if sources.is_empty() {
            return Ok(html);
        }

        let mut frames = Vec::with_capacity(sources.len());
        for src in sources {
            let Some(frame_url) = resolve_frame_url(url, &src) else {
                debug!("跳过无法访问的 iframe: {}", src);
                continue;
            };
            match self.render_frame(browser, &frame_url).await {
                Ok(frame_html) => frames.push(InlinedFrame { src, html: frame_html }),
                Err(e) => warn!("⚠️  iframe 渲染失败，保留原始元素: {} ({})", frame_url, e),
            }
        }

        info!("✓ 已展开 {} 个 iframe: {}", frames.len(), url);
        Ok(inline_iframes(&html, &frames))
    }

    /// 把展开后的 HTML 写入调试目录，失败只记录日志
    async fn dump_debug_html(&self, dir: &Path, url: &str, html: &str) {
        let file_name = format!(
            "{}-{}.html",
            debug_file_stem(url),
            Utc::now().format("%Y%m%dT%H%M%S%3f")
        );
        let path = dir.join(file_name);

        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            warn!("⚠️  创建调试目录失败 {}: {}", dir.display(), e);
            return;
        }
        match tokio::fs::write(&path, html).await {
            Ok(()) => debug!("调试 HTML 已写入: {}", path.display()),
            Err(e) => warn!("⚠️  写入调试 HTML 失败 {}: {}", path.display(), e),
        }
    }
}

/// 调试文件名中的主机部分
fn debug_file_stem(url: &str) -> String {
    let host = domain_of(url);
    let stem: String = host
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "page".to_string()
    } else {
        stem
    }
}

#[async_trait]
impl PageFetcher for ChromiumFetcher {
    async fn fetch(&self, url: &str) -> AppResult<String> {
        let (mut browser, handle) = launch_headless_browser(&self.settings).await?;

        let outcome = self.render(&browser, url).await;

        // 无论成功与否都关闭浏览器
        if let Err(e) = browser.close().await {
            debug!("关闭浏览器失败: {}", e);
        }
        if let Err(e) = browser.wait().await {
            debug!("等待浏览器进程退出失败: {}", e);
        }
        handle.abort();

        let html = outcome?;
        if let Some(dir) = &self.settings.debug_html_dir {
            self.dump_debug_html(dir, url, &html).await;
        }
        Ok(html)
    }
}
