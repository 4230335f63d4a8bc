//! 站点适配器层
//!
//! ## 职责
//!
//! 每个适配器只负责一个公告板：
//! - `list_page` - 目录页 → `Vec<AnnouncementRecord>`，空列表表示没有更多页
//! - `detail` - 详情页 → 正文 + 附件列表
//! - `download` - 下载单个附件，失败返回 `None` 而不是错误
//!
//! 运行器只依赖 `SiteAdapter` trait，任何实现都可以互换

pub mod js_call;
pub mod standard_table;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::error::AppResult;
use crate::infrastructure::FetcherOptions;
use crate::models::{AnnouncementRecord, AttachmentDescriptor, DetailResult, SavedFile, SiteConfig};

pub use js_call::JsCall;
pub use standard_table::StandardTableAdapter;

/// 站点适配器
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    /// 站点代码（已处理标题文件名使用）
    fn site_code(&self) -> &str;

    /// 获取第 `page` 页（从 1 开始）的公告列表
    async fn list_page(&self, page: u32) -> AppResult<Vec<AnnouncementRecord>>;

    /// 获取详情页；页面无法识别时返回占位正文，只有网络错误才返回 Err
    async fn detail(&self, record: &AnnouncementRecord) -> AppResult<DetailResult>;

    /// 下载附件到 `destination`，无法下载时返回 None
    async fn download(
        &self,
        descriptor: &AttachmentDescriptor,
        destination: &Path,
    ) -> Option<SavedFile>;
}

/// 适配器工厂，在工作任务内部创建适配器
pub type AdapterFactory = Arc<dyn Fn() -> AppResult<Box<dyn SiteAdapter>> + Send + Sync>;

/// 基于站点配置的标准表格适配器工厂
pub fn standard_table_factory(
    site: SiteConfig,
    options: FetcherOptions,
    max_filename_bytes: usize,
) -> AdapterFactory {
    Arc::new(move || {
        let adapter = StandardTableAdapter::new(site.clone(), &options, max_filename_bytes)?;
        Ok(Box::new(adapter) as Box<dyn SiteAdapter>)
    })
}
