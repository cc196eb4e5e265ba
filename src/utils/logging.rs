/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// 初始化 tracing 日志
///
/// 优先使用 `RUST_LOG`，否则默认 info，开启详细日志时为 debug
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 并发网页抓取模式");
    info!("📊 最大并发数: {}", config.max_concurrent_urls);
    info!("🤖 模型: {}", config.llm_model_name);
    info!("{}", "=".repeat(60));
}

/// 记录 URL 加载信息
///
/// # 参数
/// - `accepted`: 成功入队的数量
/// - `rejected`: 校验失败被跳过的数量
pub fn log_urls_loaded(accepted: usize, rejected: usize) {
    info!("✓ 已入队 {} 个 URL", accepted);
    if rejected > 0 {
        info!("⚠️ {} 个条目校验失败已跳过", rejected);
    }
}

/// 记录批次开始信息
///
/// # 参数
/// - `selected`: 本轮选中的条目数
/// - `max_concurrent`: 同时运行的浏览器上限
pub fn log_batch_start(selected: usize, max_concurrent: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理 {} 个条目", selected);
    info!("📋 同时运行的浏览器上限: {}", max_concurrent);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(completed: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 本轮完成: 成功 {}/{}", completed, total);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `completed`: 成功数量
/// - `failed`: 失败数量
/// - `rejected`: 入队前被拒绝的数量
/// - `stored`: 文档存储中的结果数
/// - `output_file`: 队列快照输出路径
pub fn print_final_stats(
    completed: usize,
    failed: usize,
    rejected: usize,
    stored: usize,
    output_file: &str,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", completed, completed + failed);
    info!("❌ 失败: {}", failed);
    info!("⏭️  跳过: {}", rejected);
    info!("💾 已保存结果: {}", stored);
    info!("{}", "=".repeat(60));
    info!("\n结果已保存至: {}", output_file);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("hello", 10), "hello");
        assert_eq!(truncate_text("hello world", 5), "hello...");
        assert_eq!(truncate_text("北京大学物理学院", 4), "北京大学...");
    }
}
