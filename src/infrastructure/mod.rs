//! 基础设施层
//!
//! - `http_client` - 唯一持有 reqwest 客户端的地方
//! - `text_decode` - 旧式站点的编码回退
//! - `filename` - 安全文件名与 Content-Disposition 文件名恢复

pub mod filename;
pub mod http_client;
pub mod text_decode;

pub use filename::{
    attachment_filename, filename_from_content_disposition, folder_name, sanitize_filename, unique_path,
};
pub use http_client::{FetcherOptions, HttpFetcher};
