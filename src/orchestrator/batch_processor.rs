//! 批量站点处理器 - 编排层
//!
//! ## 职责
//!
//! 1. **站点注册**：调用方按顺序注册 `SiteEntry`（没有全局注册表）
//! 2. **分批执行**：每批 `group_size` 个站点，批内并发，批间串行
//! 3. **故障隔离**：适配器创建失败、运行器出错、任务 panic 都只影响该站点
//! 4. **全局统计**：汇总为 `BatchReport`
//!
//! ## 设计特点
//!
//! - 适配器在任务内部通过工厂创建，站点之间不共享任何可变状态
//! - 通过 Semaphore 和 tokio::spawn 实现并发

use futures::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::adapters::{standard_table_factory, AdapterFactory};
use crate::config::RunnerSettings;
use crate::infrastructure::FetcherOptions;
use crate::models::{BatchReport, SiteConfig, SiteRunResult};
use crate::orchestrator::site_runner;
use crate::utils::logging::{log_group_complete, log_group_start};

/// 注册表中的一个站点
#[derive(Clone)]
pub struct SiteEntry {
    pub code: String,
    pub display_name: String,
    /// 相对于输出根目录的子目录
    pub output_subdir: String,
    pub factory: AdapterFactory,
}

impl SiteEntry {
    pub fn new(
        code: impl Into<String>,
        display_name: impl Into<String>,
        output_subdir: impl Into<String>,
        factory: AdapterFactory,
    ) -> Self {
        Self {
            code: code.into(),
            display_name: display_name.into(),
            output_subdir: output_subdir.into(),
            factory,
        }
    }

    /// 由 sites.toml 中的配置生成标准表格站点
    pub fn from_site_config(site: &SiteConfig, options: &FetcherOptions, max_filename_bytes: usize) -> Self {
        Self::new(
            site.code.clone(),
            site.name.clone(),
            site.output_subdir(),
            standard_table_factory(site.clone(), options.clone(), max_filename_bytes),
        )
    }
}

/// 批量协调器
pub struct BatchCoordinator {
    entries: Vec<SiteEntry>,
    output_dir: PathBuf,
    group_size: usize,
    settings: RunnerSettings,
}

impl BatchCoordinator {
    pub fn new(output_dir: impl Into<PathBuf>, group_size: usize, settings: RunnerSettings) -> Self {
        Self {
            entries: Vec::new(),
            output_dir: output_dir.into(),
            group_size: group_size.max(1),
            settings,
        }
    }

    /// 注册站点（保持注册顺序）
    pub fn register(&mut self, entry: SiteEntry) {
        self.entries.push(entry);
    }

    pub fn with_entries(mut self, entries: impl IntoIterator<Item = SiteEntry>) -> Self {
        self.entries.extend(entries);
        self
    }

    /// 运行全部站点
    pub async fn run(&self) -> BatchReport {
        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.group_size));
        let total_groups = self.entries.len().div_ceil(self.group_size);
        let mut results = Vec::with_capacity(self.entries.len());

        for (group_idx, group) in self.entries.chunks(self.group_size).enumerate() {
            let group_num = group_idx + 1;
            let codes: Vec<String> = group.iter().map(|e| e.code.clone()).collect();
            log_group_start(group_num, total_groups, &codes);

            let group_results = self.run_group(group, semaphore.clone()).await;
            log_group_complete(group_num, &group_results);
            results.extend(group_results);
        }

        BatchReport {
            results,
            wall_clock: started.elapsed(),
        }
    }

    /// 运行一批站点，全部结束后返回（保持注册顺序）
    async fn run_group(&self, group: &[SiteEntry], semaphore: Arc<Semaphore>) -> Vec<SiteRunResult> {
        let group_started = Instant::now();
        let mut handles = Vec::with_capacity(group.len());

        for entry in group {
            let semaphore = semaphore.clone();
            let entry = entry.clone();
            let site_dir = self.output_dir.join(&entry.output_subdir);
            let settings = self.settings.clone();

            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return SiteRunResult::error(&entry.code, &entry.display_name, Duration::ZERO, e.to_string())
                    }
                };
                run_entry(&entry, site_dir, &settings).await
            }));
        }

        join_all(handles)
            .await
            .into_iter()
            .zip(group)
            .map(|(joined, entry)| {
                joined.unwrap_or_else(|e| {
                    error!("[{}] 任务执行失败: {}", entry.code, e);
                    SiteRunResult::error(
                        &entry.code,
                        &entry.display_name,
                        group_started.elapsed(),
                        format!("任务异常退出: {}", e),
                    )
                })
            })
            .collect()
    }
}

/// 在任务内创建适配器并运行
async fn run_entry(entry: &SiteEntry, site_dir: PathBuf, settings: &RunnerSettings) -> SiteRunResult {
    let started = Instant::now();
    info!("[{}] ▶️ 开始抓取: {}", entry.code, entry.display_name);

    let adapter = match (entry.factory)() {
        Ok(adapter) => adapter,
        Err(e) => {
            error!("[{}] ❌ 适配器创建失败: {}", entry.code, e);
            return SiteRunResult::error(&entry.code, &entry.display_name, started.elapsed(), e.to_string());
        }
    };

    match site_runner::run_site(adapter.as_ref(), &site_dir, settings).await {
        Ok(outcome) => {
            info!(
                "[{}] ✅ 完成: 公告 {} 条，附件 {} 个",
                entry.code, outcome.counters.announcements_processed, outcome.counters.files_downloaded
            );
            SiteRunResult::success(
                &entry.code,
                &entry.display_name,
                started.elapsed(),
                outcome.counters,
                outcome.stop_reason,
            )
        }
        Err(e) => {
            error!("[{}] ❌ 处理过程中发生错误: {}", entry.code, e);
            SiteRunResult::error(&entry.code, &entry.display_name, started.elapsed(), e.to_string())
        }
    }
}
