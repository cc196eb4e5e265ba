use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 同时启动的浏览器数量上限
    pub max_concurrent_urls: usize,
    /// 浏览器可执行文件路径（为空时由 chromiumoxide 自动探测）
    pub chrome_executable: Option<String>,
    /// 导航超时（秒）
    pub navigation_timeout_secs: u64,
    /// 每次滚动的像素
    pub scroll_step_px: u32,
    /// 滚动间隔（毫秒）
    pub scroll_interval_ms: u64,
    /// 最大滚动次数
    pub max_scroll_steps: usize,
    /// 等待 iframe 的超时（毫秒）
    pub iframe_wait_timeout_ms: u64,
    /// 清洗后 HTML 的最大字符数
    pub max_html_chars: usize,
    /// 调试用：保存展开后的 HTML 的目录
    pub debug_html_dir: Option<String>,
    /// 待处理 URL 列表（TOML）
    pub url_list_file: String,
    /// 结果输出文件（JSON）
    pub output_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_max_retries: usize,
    pub llm_retry_delay_ms: u64,
    pub llm_request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_urls: 8,
            chrome_executable: None,
            navigation_timeout_secs: 60,
            scroll_step_px: 100,
            scroll_interval_ms: 100,
            max_scroll_steps: 500,
            iframe_wait_timeout_ms: 5_000,
            max_html_chars: 30_000,
            debug_html_dir: None,
            url_list_file: "urls.toml".to_string(),
            output_file: "scrape_results.json".to_string(),
            verbose_logging: false,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            llm_max_retries: 2,
            llm_retry_delay_ms: 1_000,
            llm_request_timeout_secs: 120,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 从任意键值来源构建配置，缺失或无法解析的值回退到默认值
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();
        let text = |name: &str| lookup(name).filter(|v| !v.is_empty());
        Self {
            max_concurrent_urls: parsed(&lookup, "MAX_CONCURRENT_URLS")
                .unwrap_or(default.max_concurrent_urls),
            chrome_executable: text("CHROME_EXECUTABLE").or(default.chrome_executable),
            navigation_timeout_secs: parsed(&lookup, "NAVIGATION_TIMEOUT_SECS")
                .unwrap_or(default.navigation_timeout_secs),
            scroll_step_px: parsed(&lookup, "SCROLL_STEP_PX").unwrap_or(default.scroll_step_px),
            scroll_interval_ms: parsed(&lookup, "SCROLL_INTERVAL_MS")
                .unwrap_or(default.scroll_interval_ms),
            max_scroll_steps: parsed(&lookup, "MAX_SCROLL_STEPS")
                .unwrap_or(default.max_scroll_steps),
            iframe_wait_timeout_ms: parsed(&lookup, "IFRAME_WAIT_TIMEOUT_MS")
                .unwrap_or(default.iframe_wait_timeout_ms),
            max_html_chars: parsed(&lookup, "MAX_HTML_CHARS").unwrap_or(default.max_html_chars),
            debug_html_dir: text("DEBUG_HTML_DIR").or(default.debug_html_dir),
            url_list_file: lookup("URL_LIST_FILE").unwrap_or(default.url_list_file),
            output_file: lookup("OUTPUT_FILE").unwrap_or(default.output_file),
            verbose_logging: parsed(&lookup, "VERBOSE_LOGGING").unwrap_or(default.verbose_logging),
            llm_api_key: lookup("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: lookup("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: lookup("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            llm_max_retries: parsed(&lookup, "LLM_MAX_RETRIES").unwrap_or(default.llm_max_retries),
            llm_retry_delay_ms: parsed(&lookup, "LLM_RETRY_DELAY_MS")
                .unwrap_or(default.llm_retry_delay_ms),
            llm_request_timeout_secs: parsed(&lookup, "LLM_REQUEST_TIMEOUT_SECS")
                .unwrap_or(default.llm_request_timeout_secs),
        }
    }

    /// 页面抓取相关设置
    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            chrome_executable: self.chrome_executable.clone(),
            navigation_timeout: Duration::from_secs(self.navigation_timeout_secs),
            scroll_step_px: self.scroll_step_px.max(1),
            scroll_interval: Duration::from_millis(self.scroll_interval_ms),
            max_scroll_steps: self.max_scroll_steps,
            iframe_wait_timeout: Duration::from_millis(self.iframe_wait_timeout_ms),
            debug_html_dir: self.debug_html_dir.as_ref().map(PathBuf::from),
        }
    }

    /// 结构化抽取相关设置
    pub fn extractor_settings(&self) -> ExtractorSettings {
        ExtractorSettings {
            max_retries: self.llm_max_retries,
            retry_delay: Duration::from_millis(self.llm_retry_delay_ms),
            max_html_chars: self.max_html_chars,
        }
    }
}

/// 读取并解析一个配置项，缺失或无法解析时返回 None
fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    lookup(name).and_then(|v| v.trim().parse().ok())
}

/// 页面抓取设置
#[derive(Clone, Debug)]
pub struct FetchSettings {
    pub chrome_executable: Option<String>,
    pub navigation_timeout: Duration,
    pub scroll_step_px: u32,
    pub scroll_interval: Duration,
    pub max_scroll_steps: usize,
    pub iframe_wait_timeout: Duration,
    pub debug_html_dir: Option<PathBuf>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Config::default().fetch_settings()
    }
}

/// 结构化抽取设置
#[derive(Clone, Debug)]
pub struct ExtractorSettings {
    pub max_retries: usize,
    pub retry_delay: Duration,
    pub max_html_chars: usize,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Config::default().extractor_settings()
    }
}
