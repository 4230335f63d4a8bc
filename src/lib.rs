//! # Gov Notice Scraper
//!
//! 批量抓取机构公告板（支援事业公告）并保存为 Markdown + 附件的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有 HTTP 客户端，只暴露能力
//! - `HttpFetcher` - 取页面、下载附件
//! - `text_decode` / `filename` - 编码回退与安全文件名
//!
//! ### ② 适配器与业务能力层（Adapters / Services）
//! - `adapters/` - `SiteAdapter` trait 与标准表格适配器
//! - `services/` - `SeenTitleTracker` 已处理标题去重
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一条公告"的完整处理流程
//! - `AnnouncementFlow` - 详情 → content.md → 附件
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 分批并发运行站点
//! - `orchestrator/site_runner` - 单个站点的翻页与提前结束
//!
//! ## 模块结构

pub mod adapters;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use adapters::{AdapterFactory, SiteAdapter, StandardTableAdapter};
pub use config::{Config, RunnerSettings};
pub use error::{AppResult, ScrapeError};
pub use models::{AnnouncementRecord, AttachmentDescriptor, BatchReport, DetailResult, SavedFile, SiteRunResult};
pub use orchestrator::{run_site, BatchCoordinator, SiteEntry};
pub use services::SeenTitleTracker;
