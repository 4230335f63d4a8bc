//! HTTP 抓取器 - 基础设施层
//!
//! 持有 reqwest 客户端（带 cookie 会话），只暴露"取页面"和"下载文件"的能力，
//! 不认识具体站点的页面结构

use encoding_rs::Encoding;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_DISPOSITION, CONTENT_TYPE, REFERER};
use reqwest::{Client, Response};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::{AppResult, HttpError, ScrapeError};
use crate::models::{AttachmentLocator, DownloadStep, SavedFile};

use super::filename::{filename_from_content_disposition, sanitize_filename, unique_path};
use super::text_decode::{decode_html, encoding_for_label};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// 抓取器选项
#[derive(Debug, Clone)]
pub struct FetcherOptions {
    /// 连接超时，同时也是等待响应头和每段响应体的最长时间
    pub timeout: Duration,
    pub user_agent: Option<String>,
    pub ssl_verify: bool,
    /// "auto" 或编码名称
    pub encoding: String,
    /// 下载附件时使用的 Referer
    pub referer: Option<String>,
}

impl Default for FetcherOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: None,
            ssl_verify: true,
            encoding: "auto".to_string(),
            referer: None,
        }
    }
}

/// HTTP 抓取器
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
    forced_encoding: Option<&'static Encoding>,
    referer: Option<String>,
}

impl HttpFetcher {
    /// 创建新的抓取器
    pub fn new(options: &FetcherOptions) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7"),
        );

        let client = Client::builder()
            .connect_timeout(options.timeout)
            .user_agent(options.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT))
            .default_headers(headers)
            .cookie_store(true)
            .danger_accept_invalid_certs(!options.ssl_verify)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(HttpError::ClientBuildFailed)?;

        Ok(Self {
            client,
            timeout: options.timeout,
            forced_encoding: encoding_for_label(&options.encoding),
            referer: options.referer.clone(),
        })
    }

    /// GET 页面并解码为文本
    pub async fn get_html(&self, url: &str) -> AppResult<String> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ScrapeError::request_failed(url, e))?;
        self.read_html(url, response).await
    }

    async fn read_html(&self, url: &str, response: Response) -> AppResult<String> {
        let response = ensure_success(url, response)?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response.bytes().await.map_err(|source| HttpError::BodyReadFailed {
            url: url.to_string(),
            source,
        })?;

        Ok(decode_html(&bytes, content_type.as_deref(), self.forced_encoding))
    }

    /// 下载附件到 `destination`
    ///
    /// 响应头中带有真实文件名时，保存到同目录下的该文件名
    pub async fn download(
        &self,
        locator: &AttachmentLocator,
        destination: &Path,
        max_filename_bytes: usize,
    ) -> AppResult<SavedFile> {
        let url = locator.target_url().to_string();
        info!("开始下载文件: {}", url);

        let response = match locator {
            AttachmentLocator::Simple { url } => {
                self.send_step(&DownloadStep::Get { url: url.clone() }).await?
            }
            AttachmentLocator::FormPost { url, fields } => {
                self.send_step(&DownloadStep::Post {
                    url: url.clone(),
                    fields: fields.clone(),
                })
                .await?
            }
            AttachmentLocator::TwoStep { prepare, fetch } => {
                let prepared = self.send_step(prepare).await?;
                ensure_success(prepare.url(), prepared)?;
                self.send_step(fetch).await?
            }
        };

        let mut response = ensure_success(&url, response)?;

        let path = match response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| filename_from_content_disposition(v.as_bytes()))
            .map(|name| sanitize_filename(&name, max_filename_bytes))
            .filter(|name| !name.is_empty())
        {
            Some(name) => unique_path(&destination.with_file_name(name)),
            None => unique_path(destination),
        };

        // 先写入 .part，完整收到后再改名
        let part = part_path(&path);
        let bytes = match self.write_body(&url, &mut response, &part).await {
            Ok(bytes) => bytes,
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&part).await {
                    debug!("清理未完成的文件失败 {}: {}", part.display(), cleanup);
                }
                return Err(e);
            }
        };
        tokio::fs::rename(&part, &path)
            .await
            .map_err(|e| ScrapeError::write_failed(&path, e))?;

        if bytes == 0 {
            warn!("下载的文件为空: {}", path.display());
        }

        Ok(SavedFile { path, bytes })
    }

    /// 逐段写入响应体，每段数据的等待时间不超过超时设置
    async fn write_body(&self, url: &str, response: &mut Response, part: &Path) -> AppResult<u64> {
        let mut file = tokio::fs::File::create(part)
            .await
            .map_err(|e| ScrapeError::write_failed(part, e))?;

        let mut bytes: u64 = 0;
        loop {
            let chunk = tokio::time::timeout(self.timeout, response.chunk())
                .await
                .map_err(|_| HttpError::Timeout { url: url.to_string() })?
                .map_err(|source| HttpError::BodyReadFailed {
                    url: url.to_string(),
                    source,
                })?;
            let Some(chunk) = chunk else { break };

            file.write_all(&chunk)
                .await
                .map_err(|e| ScrapeError::write_failed(part, e))?;
            bytes += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| ScrapeError::write_failed(part, e))?;

        Ok(bytes)
    }

    async fn send_step(&self, step: &DownloadStep) -> AppResult<Response> {
        let request = match step {
            DownloadStep::Get { url } => self.client.get(url),
            DownloadStep::Post { url, fields } => self.client.post(url).form(fields),
        };
        let request = match &self.referer {
            Some(referer) => request.header(REFERER, referer),
            None => request,
        };

        tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| HttpError::Timeout {
                url: step.url().to_string(),
            })?
            .map_err(|e| ScrapeError::request_failed(step.url(), e))
    }
}

fn part_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}.part", name))
}

fn ensure_success(url: &str, response: Response) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(HttpError::BadStatus {
            url: url.to_string(),
            status: status.as_u16(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    /// 本地单次响应的 HTTP 服务：先写响应头，再按间隔逐段写出 `chunks`，写完即断开
    async fn serve_once(head: String, chunks: Vec<Vec<u8>>, pause: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            if socket.write_all(head.as_bytes()).await.is_err() {
                return;
            }
            for chunk in chunks {
                tokio::time::sleep(pause).await;
                if socket.write_all(&chunk).await.is_err() {
                    return;
                }
                let _ = socket.flush().await;
            }
        });

        format!("http://{}/download", addr)
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gov_notice_http_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn fetcher(timeout: Duration) -> HttpFetcher {
        HttpFetcher::new(&FetcherOptions {
            timeout,
            ..FetcherOptions::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_slow_body_within_chunk_timeout() {
        let dir = temp_dir("slow");
        let head = "HTTP/1.1 200 OK\r\nContent-Length: 6\r\nConnection: close\r\n\r\n".to_string();
        let chunks = b"HWP!ok".iter().map(|b| vec![*b]).collect();
        let url = serve_once(head, chunks, Duration::from_millis(100)).await;

        // 总耗时约 600ms，超过 300ms 的超时设置，但每段间隔都在限制内
        let saved = fetcher(Duration::from_millis(300))
            .download(&AttachmentLocator::Simple { url }, &dir.join("공고문.hwp"), 200)
            .await
            .expect("慢速下载应该成功");

        assert_eq!(saved.bytes, 6);
        assert_eq!(saved.path, dir.join("공고문.hwp"));
        assert_eq!(std::fs::read(&saved.path).unwrap(), b"HWP!ok");
        assert!(!dir.join("공고문.hwp.part").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_stalled_body_times_out() {
        let dir = temp_dir("stalled");
        let head = "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\n".to_string();
        let url = serve_once(head, vec![b"ab".to_vec()], Duration::from_millis(1500)).await;

        let err = fetcher(Duration::from_millis(200))
            .download(&AttachmentLocator::Simple { url }, &dir.join("stalled.pdf"), 200)
            .await
            .unwrap_err();

        assert!(matches!(err, ScrapeError::Http(HttpError::Timeout { .. })), "{:?}", err);
        assert!(!dir.join("stalled.pdf").exists());
        assert!(!dir.join("stalled.pdf.part").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_truncated_body_leaves_no_file() {
        let dir = temp_dir("truncated");
        let head = "HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\n".to_string();
        let url = serve_once(head, vec![b"HWP!".to_vec()], Duration::from_millis(10)).await;

        let result = fetcher(Duration::from_secs(5))
            .download(&AttachmentLocator::Simple { url }, &dir.join("붙임.hwp"), 200)
            .await;

        assert!(result.is_err());
        assert!(!dir.join("붙임.hwp").exists());
        assert!(!dir.join("붙임.hwp.part").exists());
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_content_disposition_name_does_not_overwrite() {
        let dir = temp_dir("collision");
        std::fs::write(dir.join("공고문.hwp"), b"first").unwrap();

        let head = concat!(
            "HTTP/1.1 200 OK\r\n",
            "Content-Length: 6\r\n",
            "Content-Disposition: attachment; filename*=UTF-8''%EA%B3%B5%EA%B3%A0%EB%AC%B8.hwp\r\n",
            "Connection: close\r\n\r\n"
        )
        .to_string();
        let url = serve_once(head, vec![b"second".to_vec()], Duration::from_millis(10)).await;

        let saved = fetcher(Duration::from_secs(5))
            .download(&AttachmentLocator::Simple { url }, &dir.join("attachment_2"), 200)
            .await
            .unwrap();

        assert_eq!(saved.path, dir.join("공고문_2.hwp"));
        assert_eq!(std::fs::read(dir.join("공고문.hwp")).unwrap(), b"first");
        assert_eq!(std::fs::read(dir.join("공고문_2.hwp")).unwrap(), b"second");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
