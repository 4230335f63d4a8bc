pub mod announcement;
pub mod loaders;
pub mod run_result;
pub mod site;

pub use announcement::{
    AnnouncementRecord, AttachmentDescriptor, AttachmentLocator, DetailResult, DownloadStep,
    SavedFile,
};
pub use loaders::{load_site_registry, select_sites};
pub use run_result::{BatchReport, RunCounters, RunStatus, SiteRunResult, StopReason};
pub use site::{DownloadConfig, DownloadRule, Pagination, Selectors, SiteConfig};
