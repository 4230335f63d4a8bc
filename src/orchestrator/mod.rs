//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量站点处理器
//! - 按注册顺序分批运行站点
//! - 控制并发数量（Semaphore），每批结束后再开始下一批
//! - 把每个站点的结果汇总为 `BatchReport`
//!
//! ### `site_runner` - 单个站点运行器
//! - 翻页、去重、提前结束
//! - 为每条新公告分配编号并交给 `AnnouncementFlow`
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<SiteEntry>)
//!     ↓
//! site_runner (处理 Vec<AnnouncementRecord>)
//!     ↓
//! workflow::AnnouncementFlow (处理单条公告)
//!     ↓
//! adapters (站点适配器) / services (已处理标题)
//!     ↓
//! infrastructure (HTTP、解码、文件名)
//! ```

pub mod batch_processor;
pub mod site_runner;

pub use batch_processor::{BatchCoordinator, SiteEntry};
pub use site_runner::{run_site, SiteRunOutcome};
