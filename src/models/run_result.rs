//! 运行结果模型

use std::fmt;
use std::time::Duration;

/// 站点运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Error,
}

/// 翻页结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// 达到最大页数
    MaxPagesReached,
    /// 目录页为空（最后一页之后）
    EmptyPage { page: u32 },
    /// 连续出现已处理过的标题
    DuplicateStreak { page: u32, streak: usize },
    /// 第二页及之后没有任何新公告
    NoNewAnnouncements { page: u32 },
    /// 运行中出现致命错误
    Aborted { page: u32 },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::MaxPagesReached => write!(f, "达到最大页数"),
            StopReason::EmptyPage { page } if *page == 1 => write!(f, "第一页没有公告"),
            StopReason::EmptyPage { page } => write!(f, "第 {} 页为空，已到最后一页", page),
            StopReason::DuplicateStreak { page, streak } => {
                write!(f, "第 {} 页连续 {} 条重复公告，提前结束", page, streak)
            }
            StopReason::NoNewAnnouncements { page } => {
                write!(f, "第 {} 页没有新公告，提前结束", page)
            }
            StopReason::Aborted { page } => write!(f, "第 {} 页处理出错，已中止", page),
        }
    }
}

/// 单个站点运行器的计数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub announcements_processed: usize,
    pub files_downloaded: usize,
    pub bytes_downloaded: u64,
}

/// 单个站点的运行结果
#[derive(Debug, Clone)]
pub struct SiteRunResult {
    pub site_code: String,
    pub display_name: String,
    pub status: RunStatus,
    pub duration: Duration,
    pub counters: RunCounters,
    pub stop_reason: Option<StopReason>,
    pub error_detail: Option<String>,
}

impl SiteRunResult {
    pub fn success(
        site_code: impl Into<String>,
        display_name: impl Into<String>,
        duration: Duration,
        counters: RunCounters,
        stop_reason: StopReason,
    ) -> Self {
        Self {
            site_code: site_code.into(),
            display_name: display_name.into(),
            status: RunStatus::Success,
            duration,
            counters,
            stop_reason: Some(stop_reason),
            error_detail: None,
        }
    }

    pub fn error(
        site_code: impl Into<String>,
        display_name: impl Into<String>,
        duration: Duration,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            site_code: site_code.into(),
            display_name: display_name.into(),
            status: RunStatus::Error,
            duration,
            counters: RunCounters::default(),
            stop_reason: None,
            error_detail: Some(detail.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}

/// 整批运行的汇总报告
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// 按注册顺序排列的各站点结果
    pub results: Vec<SiteRunResult>,
    /// 整批的实际耗时
    pub wall_clock: Duration,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn total_announcements(&self) -> usize {
        self.results
            .iter()
            .map(|r| r.counters.announcements_processed)
            .sum()
    }

    pub fn total_files(&self) -> usize {
        self.results.iter().map(|r| r.counters.files_downloaded).sum()
    }

    pub fn total_bytes(&self) -> u64 {
        self.results.iter().map(|r| r.counters.bytes_downloaded).sum()
    }

    pub fn find(&self, site_code: &str) -> Option<&SiteRunResult> {
        self.results.iter().find(|r| r.site_code == site_code)
    }
}
