//! 公告数据模型
//!
//! 目录页的一行 → `AnnouncementRecord`，详情页 → `DetailResult`，
//! 附件链接 → `AttachmentDescriptor`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// 目录页中的一条公告
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncementRecord {
    /// 标题（同时作为去重键）
    pub title: String,
    /// 详情页地址（或适配器自定义的定位信息）
    pub detail_url: String,
    /// 适配器附加的字段（作者、日期、状态等），不做校验
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl AnnouncementRecord {
    pub fn new(title: impl Into<String>, detail_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            detail_url: detail_url.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// 附加一个元数据字段（空值忽略）
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.trim().is_empty() {
            self.metadata.insert(key.into(), value.trim().to_string());
        }
        self
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

/// 详情页解析结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailResult {
    /// 正文（Markdown）
    pub body: String,
    /// 附件列表（保持页面顺序）
    pub attachments: Vec<AttachmentDescriptor>,
}

/// 附件描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentDescriptor {
    /// 页面上显示的文件名（下载时可能被 Content-Disposition 中的真实文件名覆盖）
    pub display_name: String,
    /// 下载方式
    pub locator: AttachmentLocator,
}

impl AttachmentDescriptor {
    pub fn simple(display_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            locator: AttachmentLocator::Simple { url: url.into() },
        }
    }
}

/// 附件下载方式
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttachmentLocator {
    /// 直接 GET
    Simple { url: String },
    /// 带表单字段的 POST
    FormPost {
        url: String,
        fields: Vec<(String, String)>,
    },
    /// 先发送准备请求（丢弃响应），再执行真正的下载
    TwoStep {
        prepare: DownloadStep,
        fetch: DownloadStep,
    },
}

impl AttachmentLocator {
    /// 最终下载使用的地址（日志显示用）
    pub fn target_url(&self) -> &str {
        match self {
            AttachmentLocator::Simple { url } | AttachmentLocator::FormPost { url, .. } => url,
            AttachmentLocator::TwoStep { fetch, .. } => fetch.url(),
        }
    }
}

/// 两步下载中的单个请求
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DownloadStep {
    Get { url: String },
    Post {
        url: String,
        fields: Vec<(String, String)>,
    },
}

impl DownloadStep {
    pub fn url(&self) -> &str {
        match self {
            DownloadStep::Get { url } | DownloadStep::Post { url, .. } => url,
        }
    }
}

/// 已保存到磁盘的附件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    /// 最终路径（服务器给出真实文件名时可能与预定路径不同）
    pub path: PathBuf,
    /// 文件大小（字节）
    pub bytes: u64,
}
