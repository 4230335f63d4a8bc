//! 单个站点运行器 - 编排层
//!
//! ## 职责
//!
//! 1. **加载去重集合**：读取 `processed_titles_<code>.json`
//! 2. **翻页**：从第 1 页到 `max_pages`，遇到以下情况提前结束
//!    - 目录页为空
//!    - 连续重复标题达到阈值
//!    - 第二页之后没有任何新公告
//! 3. **逐条处理**：委托 `AnnouncementFlow`，编号在整次运行中连续递增
//! 4. **保存去重集合**：正常结束和出错时都会保存

use std::path::Path;
use tracing::{debug, error, info, warn};

use crate::adapters::SiteAdapter;
use crate::config::RunnerSettings;
use crate::error::AppResult;
use crate::models::{RunCounters, StopReason};
use crate::services::SeenTitleTracker;
use crate::workflow::{AnnouncementFlow, ProcessResult};

/// 站点运行结果（成功时）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRunOutcome {
    pub counters: RunCounters,
    pub stop_reason: StopReason,
}

/// 运行单个站点
///
/// # 参数
/// - `adapter`: 站点适配器
/// - `site_dir`: 站点输出目录（公告文件夹和已处理标题文件都放在这里）
/// - `settings`: 页数、阈值、等待时间等
///
/// # 返回
/// 目录页请求失败或文件写入失败时返回 Err（去重集合已先行保存）
pub async fn run_site(
    adapter: &dyn SiteAdapter,
    site_dir: &Path,
    settings: &RunnerSettings,
) -> AppResult<SiteRunOutcome> {
    let site = adapter.site_code().to_string();
    let mut tracker = SeenTitleTracker::load(site_dir, &site).await;
    let flow = AnnouncementFlow::new(adapter, site_dir, settings.max_filename_bytes);

    let mut counters = RunCounters::default();
    let mut stop_reason = StopReason::MaxPagesReached;
    let mut index = 0;

    for page in 1..=settings.max_pages {
        if page > 1 && !settings.delay_between_pages.is_zero() {
            tokio::time::sleep(settings.delay_between_pages).await;
        }

        let records = match adapter.list_page(page).await {
            Ok(records) => records,
            Err(e) => {
                error!("[{}] ❌ {}: {}", site, StopReason::Aborted { page }, e);
                save_quietly(&tracker).await;
                return Err(e);
            }
        };

        if records.is_empty() {
            stop_reason = StopReason::EmptyPage { page };
            break;
        }

        let total = records.len();
        let outcome = tracker.filter_new(records, settings.duplicate_threshold);
        info!(
            "[{}] 📃 第 {} 页: {} 条公告，新公告 {} 条",
            site,
            page,
            total,
            outcome.new_records.len()
        );

        for record in &outcome.new_records {
            // 同一页内标题重复
            if tracker.contains(&record.title) {
                debug!("[{}] 跳过同页重复标题: {}", site, record.title);
                continue;
            }

            index += 1;
            let result = match flow.run(record, index).await {
                Ok(result) => result,
                Err(e) => {
                    error!("[{}] ❌ 保存公告失败: {}", site, e);
                    save_quietly(&tracker).await;
                    return Err(e);
                }
            };

            if matches!(result, ProcessResult::Saved { .. }) {
                tracker.add(&record.title);
            }
            result.add_to(&mut counters);

            if !settings.delay_between_requests.is_zero() {
                tokio::time::sleep(settings.delay_between_requests).await;
            }
        }

        if outcome.should_stop {
            stop_reason = StopReason::DuplicateStreak {
                page,
                streak: outcome.streak,
            };
            break;
        }
        if page > 1 && outcome.new_records.is_empty() {
            stop_reason = StopReason::NoNewAnnouncements { page };
            break;
        }
    }

    info!("[{}] 🏁 {}", site, stop_reason);
    tracker.save().await?;

    Ok(SiteRunOutcome {
        counters,
        stop_reason,
    })
}

async fn save_quietly(tracker: &SeenTitleTracker) {
    if let Err(e) = tracker.save().await {
        warn!("⚠️ 已处理标题保存失败: {}", e);
    }
}
