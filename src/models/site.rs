//! 站点配置 - 由 sites.toml 反序列化
//!
//! 每个 `[[sites]]` 条目描述一个公告板：地址、翻页方式、CSS 选择器和附件下载规则

use serde::Deserialize;

use crate::error::{AppResult, ConfigError};

/// 站点注册表文件
#[derive(Debug, Clone, Deserialize)]
pub struct SiteRegistryFile {
    #[serde(default)]
    pub sites: Vec<SiteConfig>,
}

/// 单个站点配置
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// 站点代码（命令行 --site 使用，也用于已处理标题文件名）
    pub code: String,
    /// 显示名称
    pub name: String,
    /// 输出子目录，默认与站点代码相同
    #[serde(default)]
    pub output_subdir: Option<String>,
    pub base_url: String,
    pub list_url: String,
    /// "auto" 或编码名称（如 "euc-kr"）
    #[serde(default = "default_encoding")]
    pub encoding: String,
    #[serde(default = "default_true")]
    pub ssl_verify: bool,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub pagination: Pagination,
    #[serde(default)]
    pub selectors: Selectors,
    /// javascript: 链接的详情页地址模板，`{1}`、`{2}` 依次替换为函数参数
    #[serde(default)]
    pub detail_url_template: Option<String>,
    /// javascript: 附件链接的下载规则
    #[serde(default)]
    pub download: Option<DownloadConfig>,
}

fn default_encoding() -> String {
    "auto".to_string()
}

fn default_true() -> bool {
    true
}

fn default_page_param() -> String {
    "page".to_string()
}

/// 翻页方式
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Pagination {
    /// `?page=N`（第一页直接使用 list_url）
    QueryParam {
        #[serde(default = "default_page_param")]
        param: String,
    },
    /// `?offset=(N-1)*page_size`
    Offset { param: String, page_size: u32 },
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination::QueryParam {
            param: default_page_param(),
        }
    }
}

/// CSS 选择器
#[derive(Debug, Clone, Deserialize)]
pub struct Selectors {
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_rows")]
    pub rows: String,
    #[serde(default = "default_title_link")]
    pub title_link: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub writer: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub views: Option<String>,
    /// 详情页正文区域
    #[serde(default)]
    pub content: Option<String>,
    /// 详情页附件链接
    #[serde(default)]
    pub attachments: Option<String>,
}

fn default_table() -> String {
    "table".to_string()
}

fn default_rows() -> String {
    "tbody tr".to_string()
}

fn default_title_link() -> String {
    "a[href]".to_string()
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            table: default_table(),
            rows: default_rows(),
            title_link: default_title_link(),
            date: None,
            writer: None,
            status: None,
            period: None,
            views: None,
            content: None,
            attachments: None,
        }
    }
}

/// javascript: 附件下载配置
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadConfig {
    /// 只匹配该函数名（如 fn_egov_downFile），为空时匹配任意函数调用
    #[serde(default)]
    pub function: Option<String>,
    #[serde(flatten)]
    pub rule: DownloadRule,
}

/// 下载规则
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum DownloadRule {
    /// GET 地址模板
    Get { url: String },
    /// POST，`fields[i]` 取第 i+1 个参数
    Post { url: String, fields: Vec<String> },
    /// 先请求 prepare_url，再下载 url；fields 为空时两步都是 GET
    TwoStep {
        prepare_url: String,
        url: String,
        #[serde(default)]
        fields: Vec<String>,
    },
}

impl SiteConfig {
    pub fn output_subdir(&self) -> &str {
        self.output_subdir.as_deref().unwrap_or(&self.code)
    }

    /// 检查必填项
    pub fn validate(&self) -> AppResult<()> {
        let invalid = |reason: &str| ConfigError::InvalidSite {
            site: self.code.clone(),
            reason: reason.to_string(),
        };

        if self.code.trim().is_empty() {
            return Err(invalid("code 不能为空").into());
        }
        if url::Url::parse(&self.base_url).is_err() {
            return Err(invalid("base_url 不是有效的地址").into());
        }
        if url::Url::parse(&self.list_url).is_err() {
            return Err(invalid("list_url 不是有效的地址").into());
        }
        if let Pagination::Offset { page_size: 0, .. } = self.pagination {
            return Err(invalid("page_size 必须大于 0").into());
        }
        Ok(())
    }
}
