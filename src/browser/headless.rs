use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::config::FetchSettings;
use crate::error::{AppResult, FetchError};

/// 启动一个隔离的无头浏览器
///
/// 返回浏览器和 CDP 事件循环的任务句柄，调用方负责关闭浏览器并 abort 句柄
pub async fn launch_headless_browser(
    settings: &FetchSettings,
) -> AppResult<(Browser, JoinHandle<()>)> {
    debug!("🚀 启动无头浏览器...");

    // 配置无头浏览器
    let mut builder = BrowserConfig::builder().new_headless_mode().args(vec![
        "--disable-gpu",             // 无头模式禁用 GPU
        "--no-sandbox",              // 禁用沙盒，防止容器内权限问题导致的崩溃
        "--disable-dev-shm-usage",   // 防止共享内存不足
        "--remote-debugging-port=0", // 让浏览器自动选择端口
    ]);
    if let Some(executable) = &settings.chrome_executable {
        builder = builder.chrome_executable(executable);
    }
    let config = builder.build().map_err(|e| {
        error!("配置无头浏览器失败: {}", e);
        FetchError::LaunchFailed { message: e }
    })?;

    // 启动浏览器
    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动无头浏览器失败: {}", e);
        FetchError::LaunchFailed {
            message: e.to_string(),
        }
    })?;

    // 在后台处理浏览器事件
    let handle = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    info!("✅ 无头浏览器已启动");
    Ok((browser, handle))
}
