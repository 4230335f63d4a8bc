use thiserror::Error;

/// 抓取程序错误类型
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// HTTP 请求相关错误
    #[error("HTTP错误: {0}")]
    Http(#[from] HttpError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 站点适配器错误
    #[error("适配器错误 [{site}]: {message}")]
    Adapter { site: String, message: String },
}

/// HTTP 请求相关错误
#[derive(Debug, Error)]
pub enum HttpError {
    /// 网络请求失败（连接失败、超时等）
    #[error("请求失败 ({url}): {source}")]
    RequestFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// 服务器返回非成功状态码
    #[error("服务器返回状态码 {status} ({url})")]
    BadStatus { url: String, status: u16 },
    /// 等待响应或响应体的下一段数据超时
    #[error("请求超时 ({url})")]
    Timeout { url: String },
    /// 读取响应体失败
    #[error("读取响应失败 ({url}): {source}")]
    BodyReadFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// 无法构建 HTTP 客户端
    #[error("无法创建 HTTP 客户端: {0}")]
    ClientBuildFailed(#[source] reqwest::Error),
    /// 无效的 URL
    #[error("无效的URL: {0}")]
    InvalidUrl(String),
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 创建目录失败
    #[error("创建目录失败 ({path}): {source}")]
    CreateDirFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// JSON 序列化失败
    #[error("JSON处理失败 ({path}): {source}")]
    JsonFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 站点配置文件解析失败
    #[error("站点配置解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 未知的站点代码
    #[error("未知的站点: {0}")]
    UnknownSite(String),
    /// 站点配置缺少必填项或取值非法
    #[error("站点 {site} 配置无效: {reason}")]
    InvalidSite { site: String, reason: String },
    /// CSS 选择器无法解析
    #[error("站点 {site} 的选择器无效: {selector}")]
    InvalidSelector { site: String, selector: String },
}

// ========== 便捷构造函数 ==========

impl ScrapeError {
    /// 创建适配器错误
    pub fn adapter(site: impl Into<String>, message: impl Into<String>) -> Self {
        ScrapeError::Adapter {
            site: site.into(),
            message: message.into(),
        }
    }

    /// 创建请求失败错误
    pub fn request_failed(url: impl Into<String>, source: reqwest::Error) -> Self {
        ScrapeError::Http(HttpError::RequestFailed {
            url: url.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn write_failed(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        ScrapeError::File(FileError::WriteFailed {
            path: path.as_ref().display().to_string(),
            source,
        })
    }

    /// 创建目录创建错误
    pub fn create_dir_failed(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        ScrapeError::File(FileError::CreateDirFailed {
            path: path.as_ref().display().to_string(),
            source,
        })
    }
}

// ========== Result 类型别名 ==========

/// 抓取程序结果类型
pub type AppResult<T> = Result<T, ScrapeError>;
