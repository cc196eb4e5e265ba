use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 页面抓取错误（导航 / 渲染）
    #[error("抓取错误: {0}")]
    Fetch(#[from] FetchError),
    /// 校验错误（未知分类 / 非法 URL / 结构不匹配）
    #[error("校验错误: {0}")]
    Validation(#[from] ValidationError),
    /// 结构化生成服务错误
    #[error("抽取服务错误: {0}")]
    ExtractionService(#[from] ExtractionServiceError),
    /// 存储错误（外部协作方）
    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 页面抓取错误
#[derive(Debug, Error)]
pub enum FetchError {
    /// 启动浏览器失败
    #[error("启动无头浏览器失败: {message}")]
    LaunchFailed { message: String },
    /// 导航失败
    #[error("导航到 {url} 失败: {source}")]
    Navigation {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 导航超时
    #[error("导航到 {url} 超时 ({timeout_secs} 秒)")]
    Timeout { url: String, timeout_secs: u64 },
    /// 执行页面脚本失败
    #[error("执行页面脚本失败: {source}")]
    Script {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 序列化 DOM 失败
    #[error("读取 {url} 的页面内容失败: {source}")]
    Content {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 校验错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// 未知分类
    #[error("未知分类 '{0}'，可选值: person / news / home")]
    UnknownCategory(String),
    /// 非法 URL
    #[error("非法 URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    /// 返回对象不满足结构约束
    #[error("{schema} 结构校验失败: {message}")]
    SchemaMismatch { schema: String, message: String },
}

/// 结构化生成服务错误
///
/// 子类型仅用于日志区分，编排层统一视为该 URL 的一次失败。
#[derive(Debug, Error)]
pub enum ExtractionServiceError {
    /// API / 网络错误
    #[error("生成服务调用失败 (模型: {model}): {message}")]
    Api {
        model: String,
        message: String,
        retryable: bool,
    },
    /// 服务返回为空
    #[error("生成服务返回内容为空 (模型: {model})")]
    EmptyResponse { model: String },
    /// 返回对象未通过结构校验
    #[error("{schema} 类型校验失败: {message}")]
    TypeValidation { schema: String, message: String },
    /// 作为工具调用时参数错误
    #[error("工具 {tool} 参数错误: {message}")]
    ToolArgument { tool: String, message: String },
}

impl ExtractionServiceError {
    /// 是否属于可自动重试的瞬时错误
    pub fn is_retryable(&self) -> bool {
        match self {
            ExtractionServiceError::Api { retryable, .. } => *retryable,
            ExtractionServiceError::EmptyResponse { .. } => true,
            ExtractionServiceError::TypeValidation { .. }
            | ExtractionServiceError::ToolArgument { .. } => false,
        }
    }

    /// 日志用的错误种类标签
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractionServiceError::Api { .. } => "api",
            ExtractionServiceError::EmptyResponse { .. } => "empty_response",
            ExtractionServiceError::TypeValidation { .. } => "type_validation",
            ExtractionServiceError::ToolArgument { .. } => "tool_argument",
        }
    }
}

impl ExtractionServiceError {
    /// 把 OpenAI 兼容接口的错误映射为服务错误
    ///
    /// 网络错误、反序列化错误以及非请求类的 API 错误视为瞬时错误
    pub fn from_openai(model: &str, err: async_openai::error::OpenAIError) -> Self {
        use async_openai::error::OpenAIError;

        let retryable = match &err {
            OpenAIError::Reqwest(_) | OpenAIError::JSONDeserialize(..) => true,
            OpenAIError::ApiError(api) => {
                let permanent = ["invalid_request_error", "invalid_api_key", "insufficient_quota"];
                ![api.r#type.as_deref(), api.code.as_deref()]
                    .into_iter()
                    .flatten()
                    .any(|tag| permanent.contains(&tag))
            }
            _ => false,
        };

        ExtractionServiceError::Api {
            model: model.to_string(),
            message: err.to_string(),
            retryable,
        }
    }
}

/// 存储错误
#[derive(Debug, Error)]
pub enum StorageError {
    /// 保存失败
    #[error("保存 {category} 结果失败: {message}")]
    SaveFailed { category: String, message: String },
    /// 读取失败
    #[error("读取 {category} 结果失败: {message}")]
    ListFailed { category: String, message: String },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// JSON 序列化失败
    #[error("JSON序列化失败: {source}")]
    JsonFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 缺少必需配置
    #[error("缺少必需配置: {name}")]
    Missing { name: String },
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Fetch(FetchError::Script {
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::File(FileError::JsonFailed {
            source: Box::new(err),
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::File(FileError::TomlParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建导航失败错误
    pub fn navigation_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Fetch(FetchError::Navigation {
            url: url.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 日志用的错误种类标签
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Fetch(_) => "fetch",
            AppError::Validation(_) => "validation",
            AppError::ExtractionService(e) => e.kind(),
            AppError::Storage(_) => "storage",
            AppError::File(_) => "file",
            AppError::Config(_) => "config",
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_by_kind() {
        let transient = ExtractionServiceError::Api {
            model: "m".into(),
            message: "503".into(),
            retryable: true,
        };
        let mismatch = ExtractionServiceError::TypeValidation {
            schema: "Person".into(),
            message: "missing field".into(),
        };
        let tool = ExtractionServiceError::ToolArgument {
            tool: "scrape".into(),
            message: "bad json".into(),
        };

        assert!(transient.is_retryable());
        assert!(ExtractionServiceError::EmptyResponse { model: "m".into() }.is_retryable());
        assert!(!mismatch.is_retryable());
        assert!(!tool.is_retryable());
    }

    #[test]
    fn test_kind_is_forwarded_from_service_error() {
        let err: AppError = ExtractionServiceError::TypeValidation {
            schema: "News".into(),
            message: "slug".into(),
        }
        .into();
        assert_eq!(err.kind(), "type_validation");

        let err: AppError = ValidationError::UnknownCategory("blog".into()).into();
        assert_eq!(err.kind(), "validation");
        assert!(err.to_string().contains("blog"));
    }

    #[test]
    fn test_openai_error_mapping() {
        use async_openai::error::{ApiError, OpenAIError};

        let overloaded = OpenAIError::ApiError(ApiError {
            message: "The server is overloaded".into(),
            r#type: Some("server_error".into()),
            param: None,
            code: None,
        });
        let bad_request = OpenAIError::ApiError(ApiError {
            message: "Invalid schema".into(),
            r#type: Some("invalid_request_error".into()),
            param: Some("response_format".into()),
            code: None,
        });

        assert!(ExtractionServiceError::from_openai("gpt-4o-mini", overloaded).is_retryable());
        assert!(!ExtractionServiceError::from_openai("gpt-4o-mini", bad_request).is_retryable());
        assert!(!ExtractionServiceError::from_openai(
            "gpt-4o-mini",
            OpenAIError::InvalidArgument("missing model".into())
        )
        .is_retryable());
    }
}
