//! 使用内存中的假适配器驱动运行器和批量协调器

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use gov_notice_scraper::adapters::{AdapterFactory, SiteAdapter};
use gov_notice_scraper::models::{RunStatus, StopReason};
use gov_notice_scraper::{
    run_site, AnnouncementRecord, AppResult, AttachmentDescriptor, BatchCoordinator, DetailResult,
    RunnerSettings, SavedFile, ScrapeError, SeenTitleTracker, SiteEntry,
};

/// 假适配器
#[derive(Clone, Default)]
struct FakeAdapter {
    code: String,
    pages: Vec<Vec<AnnouncementRecord>>,
    attachments_per_record: usize,
    /// 所有附件共用的显示名称
    attachment_name: Option<String>,
    downloads_succeed: bool,
    /// list_page 在这一页返回错误
    fail_on_page: Option<u32>,
    /// detail 对这些标题返回错误
    broken_details: HashSet<String>,
    panic_on_list: bool,
    list_calls: Arc<Mutex<Vec<u32>>>,
}

impl FakeAdapter {
    fn new(code: &str, pages: Vec<Vec<AnnouncementRecord>>) -> Self {
        Self {
            code: code.to_string(),
            pages,
            downloads_succeed: true,
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<u32> {
        self.list_calls.lock().unwrap().clone()
    }

    fn factory(self) -> AdapterFactory {
        Arc::new(move || Ok(Box::new(self.clone()) as Box<dyn SiteAdapter>))
    }
}

#[async_trait]
impl SiteAdapter for FakeAdapter {
    fn site_code(&self) -> &str {
        &self.code
    }

    async fn list_page(&self, page: u32) -> AppResult<Vec<AnnouncementRecord>> {
        self.list_calls.lock().unwrap().push(page);
        if self.panic_on_list {
            panic!("목록 파싱 중 패닉");
        }
        if self.fail_on_page == Some(page) {
            return Err(ScrapeError::adapter(&self.code, "목록 페이지 연결 실패"));
        }
        Ok(self.pages.get(page as usize - 1).cloned().unwrap_or_default())
    }

    async fn detail(&self, record: &AnnouncementRecord) -> AppResult<DetailResult> {
        if self.broken_details.contains(&record.title) {
            return Err(ScrapeError::adapter(&self.code, "상세 페이지 시간 초과"));
        }
        let attachments = (1..=self.attachments_per_record)
            .map(|i| {
                AttachmentDescriptor::simple(
                    self.attachment_name
                        .clone()
                        .unwrap_or_else(|| format!("첨부<{}>.hwp", i)),
                    format!("https://example.or.kr/file/{}", i),
                )
            })
            .collect();
        Ok(DetailResult {
            body: format!("{} 본문", record.title),
            attachments,
        })
    }

    async fn download(&self, _descriptor: &AttachmentDescriptor, destination: &Path) -> Option<SavedFile> {
        if !self.downloads_succeed {
            return None;
        }
        tokio::fs::write(destination, b"HWP!").await.ok()?;
        Some(SavedFile {
            path: destination.to_path_buf(),
            bytes: 4,
        })
    }
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "gov_notice_{}_{}_{}",
        name,
        std::process::id(),
        chrono::Local::now().timestamp_nanos_opt().unwrap_or_default()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn page(titles: impl IntoIterator<Item = String>) -> Vec<AnnouncementRecord> {
    titles
        .into_iter()
        .enumerate()
        .map(|(i, title)| {
            AnnouncementRecord::new(title, format!("https://example.or.kr/view?id={}", i))
                .with_meta("date", "2024-03-02")
        })
        .collect()
}

fn numbered(range: std::ops::RangeInclusive<usize>) -> Vec<AnnouncementRecord> {
    page(range.map(|n| format!("지원사업 공고 {:02}", n)))
}

fn settings() -> RunnerSettings {
    RunnerSettings::default().without_delays()
}

fn folder_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_folders_numbered_in_list_order() {
    let dir = temp_dir("ordering");
    let adapter = FakeAdapter::new("order", vec![numbered(1..=5), numbered(6..=10)]);

    let outcome = run_site(&adapter, &dir, &settings()).await.unwrap();

    assert_eq!(outcome.counters.announcements_processed, 10);
    assert_eq!(outcome.stop_reason, StopReason::EmptyPage { page: 3 });

    let expected: Vec<String> = (1..=10)
        .map(|n| format!("{:03}_지원사업 공고 {:02}", n, n))
        .collect();
    assert_eq!(folder_names(&dir), expected);

    let content = std::fs::read_to_string(dir.join("001_지원사업 공고 01").join("content.md")).unwrap();
    assert!(content.starts_with("# 지원사업 공고 01\n"));
    assert!(content.contains("**작성일**: 2024-03-02"));
    assert!(content.contains("**원본 URL**: https://example.or.kr/view?id=0"));
    assert!(content.contains("지원사업 공고 01 본문"));
}

#[tokio::test]
async fn test_rerun_processes_nothing() {
    let dir = temp_dir("rerun");
    let adapter = FakeAdapter::new("rerun", vec![numbered(1..=5)]);

    let first = run_site(&adapter, &dir, &settings()).await.unwrap();
    assert_eq!(first.counters.announcements_processed, 5);

    let again = FakeAdapter::new("rerun", vec![numbered(1..=5)]);
    let second = run_site(&again, &dir, &settings()).await.unwrap();
    assert_eq!(second.counters.announcements_processed, 0);
    assert_eq!(second.stop_reason, StopReason::DuplicateStreak { page: 1, streak: 3 });
    assert_eq!(again.calls(), vec![1]);

    assert_eq!(folder_names(&dir).len(), 5);
    let tracker = SeenTitleTracker::load(&dir, "rerun").await;
    assert_eq!(tracker.len(), 5);
}

#[tokio::test]
async fn test_duplicate_streak_stops_paging() {
    let dir = temp_dir("streak");
    let mut tracker = SeenTitleTracker::empty(&dir, "streak");
    for record in numbered(6..=10) {
        tracker.add(record.title);
    }
    tracker.save().await.unwrap();

    let adapter = FakeAdapter::new("streak", vec![numbered(1..=5), numbered(6..=10), numbered(11..=15)]);
    let outcome = run_site(&adapter, &dir, &settings()).await.unwrap();

    assert_eq!(adapter.calls(), vec![1, 2]);
    assert_eq!(outcome.counters.announcements_processed, 5);
    assert_eq!(outcome.stop_reason, StopReason::DuplicateStreak { page: 2, streak: 3 });
}

#[tokio::test]
async fn test_new_records_before_streak_are_processed() {
    let dir = temp_dir("partial");
    let mut tracker = SeenTitleTracker::empty(&dir, "partial");
    for record in numbered(3..=5) {
        tracker.add(record.title);
    }
    tracker.save().await.unwrap();

    let adapter = FakeAdapter::new("partial", vec![numbered(1..=5), numbered(6..=10)]);
    let outcome = run_site(&adapter, &dir, &settings()).await.unwrap();

    assert_eq!(adapter.calls(), vec![1]);
    assert_eq!(outcome.counters.announcements_processed, 2);
    assert_eq!(
        folder_names(&dir),
        vec!["001_지원사업 공고 01", "002_지원사업 공고 02"]
    );
}

#[tokio::test]
async fn test_page_without_new_records_stops() {
    let dir = temp_dir("caught_up");
    let mut tracker = SeenTitleTracker::empty(&dir, "caught_up");
    tracker.add("지원사업 공고 06");
    tracker.add("지원사업 공고 08");
    tracker.save().await.unwrap();

    let mut second = numbered(6..=6);
    second.extend(numbered(8..=8));
    let adapter = FakeAdapter::new("caught_up", vec![numbered(1..=2), second, numbered(9..=10)]);
    let outcome = run_site(&adapter, &dir, &settings()).await.unwrap();

    assert_eq!(adapter.calls(), vec![1, 2]);
    assert_eq!(outcome.stop_reason, StopReason::NoNewAnnouncements { page: 2 });
}

#[tokio::test]
async fn test_max_pages_reached() {
    let dir = temp_dir("max_pages");
    let adapter = FakeAdapter::new(
        "max_pages",
        vec![numbered(1..=2), numbered(3..=4), numbered(5..=6), numbered(7..=8)],
    );
    let settings = RunnerSettings {
        max_pages: 2,
        ..settings()
    };
    let outcome = run_site(&adapter, &dir, &settings).await.unwrap();

    assert_eq!(adapter.calls(), vec![1, 2]);
    assert_eq!(outcome.counters.announcements_processed, 4);
    assert_eq!(outcome.stop_reason, StopReason::MaxPagesReached);
}

#[tokio::test]
async fn test_failed_downloads_are_not_fatal() {
    let dir = temp_dir("downloads_fail");
    let mut adapter = FakeAdapter::new("nofile", vec![numbered(1..=3)]);
    adapter.attachments_per_record = 2;
    adapter.downloads_succeed = false;

    let outcome = run_site(&adapter, &dir, &settings()).await.unwrap();

    assert_eq!(outcome.counters.announcements_processed, 3);
    assert_eq!(outcome.counters.files_downloaded, 0);
    for folder in folder_names(&dir) {
        assert!(dir.join(&folder).join("content.md").is_file());
        let attachments = dir.join(&folder).join("attachments");
        assert!(attachments.is_dir());
        assert_eq!(std::fs::read_dir(attachments).unwrap().count(), 0);
    }
}

#[tokio::test]
async fn test_same_named_attachments_kept_apart() {
    let dir = temp_dir("same_name");
    let mut adapter = FakeAdapter::new("same_name", vec![numbered(1..=1)]);
    adapter.attachments_per_record = 3;
    adapter.attachment_name = Some("다운로드".to_string());

    let outcome = run_site(&adapter, &dir, &settings()).await.unwrap();

    assert_eq!(outcome.counters.files_downloaded, 3);
    let attachments = dir.join("001_지원사업 공고 01").join("attachments");
    let mut on_disk: Vec<String> = std::fs::read_dir(&attachments)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    on_disk.sort();
    assert_eq!(on_disk, vec!["다운로드", "다운로드_2", "다운로드_3"]);
}

#[tokio::test]
async fn test_downloaded_attachments_are_counted() {
    let dir = temp_dir("downloads_ok");
    let mut adapter = FakeAdapter::new("files", vec![numbered(1..=2)]);
    adapter.attachments_per_record = 2;

    let outcome = run_site(&adapter, &dir, &settings()).await.unwrap();

    assert_eq!(outcome.counters.files_downloaded, 4);
    assert_eq!(outcome.counters.bytes_downloaded, 16);
    let attachments = dir.join("001_지원사업 공고 01").join("attachments");
    assert!(attachments.join("첨부_1_.hwp").is_file());
    assert!(attachments.join("첨부_2_.hwp").is_file());
}

#[tokio::test]
async fn test_broken_detail_is_skipped_and_retried_later() {
    let dir = temp_dir("broken_detail");
    let mut adapter = FakeAdapter::new("broken", vec![numbered(1..=3)]);
    adapter.broken_details.insert("지원사업 공고 02".to_string());

    let outcome = run_site(&adapter, &dir, &settings()).await.unwrap();

    assert_eq!(outcome.counters.announcements_processed, 2);
    assert_eq!(
        folder_names(&dir),
        vec!["001_지원사업 공고 01", "003_지원사업 공고 03"]
    );
    let tracker = SeenTitleTracker::load(&dir, "broken").await;
    assert!(!tracker.contains("지원사업 공고 02"));
    assert!(tracker.contains("지원사업 공고 03"));
}

#[tokio::test]
async fn test_list_error_persists_tracker() {
    let dir = temp_dir("list_error");
    let mut adapter = FakeAdapter::new("flaky", vec![numbered(1..=3), numbered(4..=6)]);
    adapter.fail_on_page = Some(2);

    let result = run_site(&adapter, &dir, &settings()).await;

    assert!(result.is_err());
    let tracker = SeenTitleTracker::load(&dir, "flaky").await;
    assert_eq!(tracker.len(), 3);
}

#[tokio::test]
async fn test_unsafe_titles_become_safe_folders() {
    let dir = temp_dir("unsafe");
    let long_title = "가".repeat(120);
    let adapter = FakeAdapter::new(
        "unsafe",
        vec![page(vec![
            "2024/03 모집: \"긴급\" <공고>?".to_string(),
            long_title.clone(),
            "..".to_string(),
        ])],
    );

    run_site(&adapter, &dir, &settings()).await.unwrap();

    let names = folder_names(&dir);
    assert_eq!(names[0], "001_2024_03 모집_ _긴급_ _공고__");
    assert!(names[1].starts_with("002_가"));
    assert!(names[1].len() <= 4 + 150);
    assert_eq!(names[2], "003_untitled");
}

#[tokio::test]
async fn test_batch_isolates_failures() {
    let dir = temp_dir("batch");
    let ok_a = FakeAdapter::new("site_a", vec![numbered(1..=3)]);
    let mut broken = FakeAdapter::new("site_b", vec![numbered(1..=3)]);
    broken.fail_on_page = Some(1);
    let ok_c = FakeAdapter::new("site_c", vec![numbered(1..=2)]);

    let entries = vec![
        SiteEntry::new("site_a", "A 기관", "a", ok_a.factory()),
        SiteEntry::new("site_b", "B 기관", "b", broken.factory()),
        SiteEntry::new("site_c", "C 기관", "c", ok_c.factory()),
    ];
    let report = BatchCoordinator::new(&dir, 3, settings())
        .with_entries(entries)
        .run()
        .await;

    assert_eq!(report.total(), 3);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.total_announcements(), 5);

    let codes: Vec<&str> = report.results.iter().map(|r| r.site_code.as_str()).collect();
    assert_eq!(codes, vec!["site_a", "site_b", "site_c"]);

    let failed = report.find("site_b").unwrap();
    assert_eq!(failed.status, RunStatus::Error);
    assert!(failed.error_detail.as_deref().unwrap().contains("목록 페이지 연결 실패"));

    assert_eq!(report.find("site_a").unwrap().counters.announcements_processed, 3);
    assert_eq!(report.find("site_c").unwrap().counters.announcements_processed, 2);
    assert!(dir.join("a").join("processed_titles_site_a.json").is_file());
}

#[tokio::test]
async fn test_batch_survives_panic_and_factory_error() {
    let dir = temp_dir("batch_panic");
    let mut panicking = FakeAdapter::new("panics", vec![]);
    panicking.panic_on_list = true;
    let failing_factory: AdapterFactory =
        Arc::new(|| Err(ScrapeError::adapter("nofactory", "설정 오류")));
    let fine = FakeAdapter::new("fine", vec![numbered(1..=1)]);

    let mut coordinator = BatchCoordinator::new(&dir, 2, settings());
    coordinator.register(SiteEntry::new("panics", "패닉", "panics", panicking.factory()));
    coordinator.register(SiteEntry::new("nofactory", "팩토리 실패", "nofactory", failing_factory));
    coordinator.register(SiteEntry::new("fine", "정상", "fine", fine.clone().factory()));

    let report = coordinator.run().await;

    assert_eq!(report.total(), 3);
    assert_eq!(report.failed(), 2);
    assert!(report.find("panics").unwrap().error_detail.is_some());
    assert!(report
        .find("nofactory")
        .unwrap()
        .error_detail
        .as_deref()
        .unwrap()
        .contains("설정 오류"));
    assert!(report.find("fine").unwrap().is_success());
    assert_eq!(fine.calls(), vec![1, 2]);
}
