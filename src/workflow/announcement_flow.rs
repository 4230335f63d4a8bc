//! 公告处理流程 - 流程层
//!
//! 核心职责：定义"一条公告"的完整处理流程
//!
//! 流程顺序：
//! 1. 获取详情页（失败则跳过，不记为已处理）
//! 2. 写入 `NNN_标题/content.md`（元数据头 + 正文）
//! 3. 下载附件到 `NNN_标题/attachments/`（单个失败不影响其他附件）

use phf::phf_ordered_map;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::adapters::SiteAdapter;
use crate::error::{AppResult, ScrapeError};
use crate::infrastructure::{attachment_filename, folder_name, unique_path};
use crate::models::{AnnouncementRecord, AttachmentDescriptor, RunCounters};
use crate::utils::logging::truncate_text;

/// 元数据键 → content.md 中的标签（按输出顺序）
static META_LABELS: phf::OrderedMap<&'static str, &'static str> = phf_ordered_map! {
    "writer" => "작성자",
    "date" => "작성일",
    "period" => "접수기간",
    "status" => "상태",
    "organization" => "기관",
    "views" => "조회수",
};

/// 公告处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessResult {
    /// 已保存
    Saved {
        folder: PathBuf,
        files_downloaded: usize,
        bytes_downloaded: u64,
    },
    /// 详情页获取失败，已跳过
    Skipped,
}

impl ProcessResult {
    /// 累加到站点计数
    pub fn add_to(&self, counters: &mut RunCounters) {
        if let ProcessResult::Saved {
            files_downloaded,
            bytes_downloaded,
            ..
        } = self
        {
            counters.announcements_processed += 1;
            counters.files_downloaded += files_downloaded;
            counters.bytes_downloaded += bytes_downloaded;
        }
    }
}

/// 公告处理流程
///
/// - 不持有适配器，只借用
/// - 不关心翻页和去重
pub struct AnnouncementFlow<'a> {
    adapter: &'a dyn SiteAdapter,
    site_dir: &'a Path,
    max_filename_bytes: usize,
}

impl<'a> AnnouncementFlow<'a> {
    pub fn new(adapter: &'a dyn SiteAdapter, site_dir: &'a Path, max_filename_bytes: usize) -> Self {
        Self {
            adapter,
            site_dir,
            max_filename_bytes,
        }
    }

    /// 处理一条公告
    ///
    /// 只有文件系统错误会返回 Err
    pub async fn run(&self, record: &AnnouncementRecord, index: usize) -> AppResult<ProcessResult> {
        let site = self.adapter.site_code();
        info!("[{}] 📄 {:03} {}", site, index, truncate_text(&record.title, 60));

        let detail = match self.adapter.detail(record).await {
            Ok(detail) => detail,
            Err(e) => {
                warn!("[{}] ⚠️ 详情页获取失败，跳过: {} ({})", site, record.title, e);
                return Ok(ProcessResult::Skipped);
            }
        };

        let folder = self.site_dir.join(folder_name(index, &record.title));
        tokio::fs::create_dir_all(&folder)
            .await
            .map_err(|e| ScrapeError::create_dir_failed(&folder, e))?;

        let content_path = folder.join("content.md");
        tokio::fs::write(&content_path, render_content(record, &detail.body))
            .await
            .map_err(|e| ScrapeError::write_failed(&content_path, e))?;

        let (files_downloaded, bytes_downloaded) =
            self.download_attachments(&folder, &detail.attachments).await?;

        Ok(ProcessResult::Saved {
            folder,
            files_downloaded,
            bytes_downloaded,
        })
    }

    async fn download_attachments(
        &self,
        folder: &Path,
        attachments: &[AttachmentDescriptor],
    ) -> AppResult<(usize, u64)> {
        if attachments.is_empty() {
            return Ok((0, 0));
        }

        let site = self.adapter.site_code();
        let dir = folder.join("attachments");
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ScrapeError::create_dir_failed(&dir, e))?;

        info!("[{}] 📎 {} 个附件", site, attachments.len());

        let mut files = 0;
        let mut bytes = 0;
        for (i, attachment) in attachments.iter().enumerate() {
            let file_name =
                attachment_filename(&attachment.display_name, i + 1, self.max_filename_bytes);
            let destination = unique_path(&dir.join(file_name));
            match self.adapter.download(attachment, &destination).await {
                Some(saved) => {
                    files += 1;
                    bytes += saved.bytes;
                }
                None => warn!("[{}] 附件未保存: {}", site, attachment.display_name),
            }
        }

        Ok((files, bytes))
    }
}

/// 生成 content.md 内容
pub fn render_content(record: &AnnouncementRecord, body: &str) -> String {
    let mut lines = vec![format!("# {}", record.title), String::new()];

    for (key, label) in META_LABELS.entries() {
        if let Some(value) = record.meta(key) {
            lines.push(format!("**{}**: {}", label, value));
        }
    }
    lines.push(format!("**원본 URL**: {}", record.detail_url));
    lines.push(String::new());
    lines.push("---".to_string());
    lines.push(String::new());
    lines.push(body.to_string());

    let mut content = lines.join("\n");
    content.push('\n');
    content
}
