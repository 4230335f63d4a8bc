//! 已处理标题跟踪 - 业务能力层
//!
//! 每个站点一个 `processed_titles_<site_code>.json`（JSON 字符串数组），
//! 用来在多次运行之间跳过已经保存过的公告。
//! 标题先经过 [`normalize_title`] 再比较和保存

use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use crate::error::{AppResult, FileError, ScrapeError};
use crate::models::AnnouncementRecord;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s()\-]").expect("valid regex"));

/// 标题规范化：去首尾空白、合并连续空白、去掉标点符号（保留括号和连字符）、转小写
///
/// 规范化后为空（标题只有标点）时退回到合并空白后的原标题
pub fn normalize_title(title: &str) -> String {
    let collapsed = WHITESPACE.replace_all(title.trim(), " ");
    let stripped = PUNCTUATION.replace_all(&collapsed, "");
    let normalized = stripped.trim().to_lowercase();
    if normalized.is_empty() {
        collapsed.into_owned()
    } else {
        normalized
    }
}

/// 过滤结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    /// 尚未处理过的公告（保持原顺序）
    pub new_records: Vec<AnnouncementRecord>,
    /// 连续重复数达到阈值，应停止翻页
    pub should_stop: bool,
    /// 过滤结束时的连续重复数
    pub streak: usize,
}

/// 已处理标题集合
#[derive(Debug)]
pub struct SeenTitleTracker {
    path: PathBuf,
    titles: HashSet<String>,
}

impl SeenTitleTracker {
    /// 已处理标题文件路径
    pub fn file_path(output_dir: &Path, site_code: &str) -> PathBuf {
        output_dir.join(format!("processed_titles_{}.json", site_code))
    }

    /// 空集合（不读取文件）
    pub fn empty(output_dir: &Path, site_code: &str) -> Self {
        Self {
            path: Self::file_path(output_dir, site_code),
            titles: HashSet::new(),
        }
    }

    /// 加载已处理标题
    ///
    /// 文件不存在时返回空集合；文件损坏时记录警告并返回空集合
    pub async fn load(output_dir: &Path, site_code: &str) -> Self {
        let mut tracker = Self::empty(output_dir, site_code);

        let content = match tokio::fs::read_to_string(&tracker.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("未找到已处理标题文件，从空集合开始: {}", tracker.path.display());
                return tracker;
            }
            Err(e) => {
                warn!("⚠️ 无法读取已处理标题文件 {}: {}", tracker.path.display(), e);
                return tracker;
            }
        };

        match serde_json::from_str::<Vec<String>>(&content) {
            Ok(titles) => {
                tracker.titles = titles.iter().map(|t| normalize_title(t)).collect();
                info!("📂 已加载 {} 个已处理标题: {}", tracker.len(), tracker.path.display());
            }
            Err(e) => {
                warn!("⚠️ 已处理标题文件已损坏，忽略: {} ({})", tracker.path.display(), e);
            }
        }

        tracker
    }

    pub fn contains(&self, title: &str) -> bool {
        self.titles.contains(&normalize_title(title))
    }

    /// 添加标题（按规范化形式），返回是否为新标题
    pub fn add(&mut self, title: impl AsRef<str>) -> bool {
        self.titles.insert(normalize_title(title.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 覆盖写入文件（按字典序排列）
    pub async fn save(&self) -> AppResult<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| ScrapeError::create_dir_failed(dir, e))?;
        }

        let sorted: BTreeSet<&String> = self.titles.iter().collect();
        let json = serde_json::to_string_pretty(&sorted).map_err(|source| FileError::JsonFailed {
            path: self.path.display().to_string(),
            source,
        })?;

        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| ScrapeError::write_failed(&self.path, e))?;

        debug!("💾 已保存 {} 个已处理标题: {}", self.len(), self.path.display());
        Ok(())
    }

    /// 按顺序过滤出新公告
    ///
    /// 已处理的标题累加连续重复数，新标题清零并保留；
    /// 连续重复数达到 `threshold` 时停止遍历（`threshold == 0` 时不提前停止）
    pub fn filter_new(&self, records: Vec<AnnouncementRecord>, threshold: usize) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();

        for record in records {
            if self.contains(&record.title) {
                outcome.streak += 1;
                debug!("跳过已处理公告: {}", record.title);
                if threshold > 0 && outcome.streak >= threshold {
                    outcome.should_stop = true;
                    break;
                }
            } else {
                outcome.streak = 0;
                outcome.new_records.push(record);
            }
        }

        outcome
    }
}
