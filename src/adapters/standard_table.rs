//! 标准表格公告板适配器
//!
//! 大多数机构公告板都是 `<table>` 目录 + 详情页 + 附件链接的结构，
//! 差异只在选择器、翻页参数和附件下载方式上，全部由 `SiteConfig` 描述

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};
use url::Url;

use super::js_call::{is_javascript_href, JsCall};
use super::SiteAdapter;
use crate::error::{AppResult, ConfigError, HttpError};
use crate::infrastructure::{FetcherOptions, HttpFetcher};
use crate::models::{
    AnnouncementRecord, AttachmentDescriptor, AttachmentLocator, DetailResult, DownloadConfig,
    DownloadRule, DownloadStep, Pagination, SavedFile, SiteConfig,
};

/// 找不到正文时的占位内容
pub const MISSING_BODY_PLACEHOLDER: &str = "내용을 찾을 수 없습니다.";

/// 未配置正文选择器时依次尝试
const FALLBACK_CONTENT_SELECTORS: [&str; 10] = [
    ".board_view .view_con",
    ".view_content",
    ".view_cont",
    ".bbs_view",
    ".board-view",
    ".bdView",
    "div.content",
    "td.content",
    "#content",
    "article",
];

const DEFAULT_ATTACHMENT_SELECTOR: &str = "a[href*='download'], a[href*='Download'], a[href*='fileDown'], a[href*='FileDown'], a[onclick*='fileDown'], a[onclick*='FileDown'], a[onclick*='downFile'], a[href*='downFile']";

/// 预编译的选择器
struct CompiledSelectors {
    table: Selector,
    rows: Selector,
    title_link: Selector,
    /// (元数据键, 选择器)
    fields: Vec<(&'static str, Selector)>,
    content: Vec<Selector>,
    attachments: Selector,
}

/// 标准表格适配器
pub struct StandardTableAdapter {
    site: SiteConfig,
    fetcher: HttpFetcher,
    list_url: Url,
    selectors: CompiledSelectors,
    max_filename_bytes: usize,
}

impl StandardTableAdapter {
    /// 创建适配器，站点配置中的编码、证书校验和 UA 覆盖 `base_options`
    pub fn new(site: SiteConfig, base_options: &FetcherOptions, max_filename_bytes: usize) -> AppResult<Self> {
        site.validate()?;

        let options = FetcherOptions {
            timeout: base_options.timeout,
            user_agent: site.user_agent.clone().or_else(|| base_options.user_agent.clone()),
            ssl_verify: site.ssl_verify,
            encoding: site.encoding.clone(),
            referer: Some(site.base_url.clone()),
        };
        let fetcher = HttpFetcher::new(&options)?;
        let list_url =
            Url::parse(&site.list_url).map_err(|_| HttpError::InvalidUrl(site.list_url.clone()))?;
        let selectors = compile_selectors(&site)?;

        Ok(Self {
            site,
            fetcher,
            list_url,
            selectors,
            max_filename_bytes,
        })
    }

    /// 第 `page` 页的目录地址
    pub fn list_url(&self, page: u32) -> String {
        if page <= 1 {
            return self.site.list_url.clone();
        }

        let (param, value) = match &self.site.pagination {
            Pagination::QueryParam { param } => (param, page),
            Pagination::Offset { param, page_size } => (param, (page - 1) * page_size),
        };
        let separator = if self.site.list_url.contains('?') { '&' } else { '?' };
        format!("{}{}{}={}", self.site.list_url, separator, param, value)
    }

    /// 解析目录页
    pub fn parse_list(&self, html: &str) -> Vec<AnnouncementRecord> {
        let document = Html::parse_document(html);

        let Some(table) = document.select(&self.selectors.table).next() else {
            warn!("[{}] 找不到目录表格: {}", self.site.code, self.site.selectors.table);
            return Vec::new();
        };

        let mut records = Vec::new();
        for row in table.select(&self.selectors.rows) {
            let Some(link) = row.select(&self.selectors.title_link).next() else {
                continue;
            };

            let title = element_text(&link);
            if title.is_empty() {
                continue;
            }

            let Some(detail_url) = self.resolve_detail_url(&link) else {
                debug!("[{}] 无法确定详情页地址，跳过: {}", self.site.code, title);
                continue;
            };

            let mut record = AnnouncementRecord::new(title, detail_url);
            for (key, selector) in &self.selectors.fields {
                if let Some(cell) = row.select(selector).next() {
                    record = record.with_meta(*key, element_text(&cell));
                }
            }
            records.push(record);
        }

        records
    }

    /// 解析详情页
    pub fn parse_detail(&self, html: &str, detail_url: &str) -> DetailResult {
        let document = Html::parse_document(html);

        let body = self
            .selectors
            .content
            .iter()
            .find_map(|selector| document.select(selector).next())
            .map(|content| html_to_markdown(&content.inner_html()))
            .filter(|body| !body.trim().is_empty())
            .unwrap_or_else(|| {
                warn!("[{}] 找不到正文区域: {}", self.site.code, detail_url);
                MISSING_BODY_PLACEHOLDER.to_string()
            });

        let page_url = Url::parse(detail_url).unwrap_or_else(|_| self.list_url.clone());
        let mut seen = HashSet::new();
        let mut attachments = Vec::new();

        for link in document.select(&self.selectors.attachments) {
            let name = attachment_name(&link);
            let Some(locator) = self.resolve_attachment(&link, &page_url) else {
                debug!("[{}] 无法解析附件链接: {}", self.site.code, name);
                continue;
            };
            if seen.insert(locator.clone()) {
                attachments.push(AttachmentDescriptor {
                    display_name: name,
                    locator,
                });
            }
        }

        DetailResult { body, attachments }
    }

    fn resolve_detail_url(&self, link: &ElementRef) -> Option<String> {
        let href = link.value().attr("href").unwrap_or("").trim();

        if !href.is_empty() && !href.starts_with('#') && !is_javascript_href(href) {
            return self.list_url.join(href).ok().map(String::from);
        }

        let template = self.site.detail_url_template.as_deref()?;
        let call = JsCall::parse(href)
            .filter(|call| !call.args.is_empty())
            .or_else(|| link.value().attr("onclick").and_then(JsCall::parse))?;
        Some(call.fill_template(template))
    }

    fn resolve_attachment(&self, link: &ElementRef, page_url: &Url) -> Option<AttachmentLocator> {
        let href = link.value().attr("href").unwrap_or("").trim();

        if !href.is_empty() && !href.starts_with('#') && !is_javascript_href(href) {
            let url = page_url.join(href).ok()?;
            return Some(AttachmentLocator::Simple { url: url.into() });
        }

        let download = self.site.download.as_ref()?;
        let call = [Some(href), link.value().attr("onclick")]
            .into_iter()
            .flatten()
            .filter_map(JsCall::parse)
            .find(|call| matches_function(download, call))?;

        Some(locator_from_rule(&download.rule, &call))
    }
}

#[async_trait]
impl SiteAdapter for StandardTableAdapter {
    fn site_code(&self) -> &str {
        &self.site.code
    }

    async fn list_page(&self, page: u32) -> AppResult<Vec<AnnouncementRecord>> {
        let url = self.list_url(page);
        match self.fetcher.get_html(&url).await {
            Ok(html) => Ok(self.parse_list(&html)),
            Err(e) => {
                // 目录页请求失败按"本页无数据"处理
                warn!("[{}] 第 {} 页获取失败: {}", self.site.code, page, e);
                Ok(Vec::new())
            }
        }
    }

    async fn detail(&self, record: &AnnouncementRecord) -> AppResult<DetailResult> {
        let html = self.fetcher.get_html(&record.detail_url).await?;
        Ok(self.parse_detail(&html, &record.detail_url))
    }

    async fn download(
        &self,
        descriptor: &AttachmentDescriptor,
        destination: &Path,
    ) -> Option<SavedFile> {
        match self
            .fetcher
            .download(&descriptor.locator, destination, self.max_filename_bytes)
            .await
        {
            Ok(saved) => {
                info!(
                    "[{}] 下载完成: {} ({} bytes)",
                    self.site.code,
                    saved.path.display(),
                    saved.bytes
                );
                Some(saved)
            }
            Err(e) => {
                warn!("[{}] 附件下载失败 {}: {}", self.site.code, descriptor.display_name, e);
                None
            }
        }
    }
}

fn compile_selectors(site: &SiteConfig) -> AppResult<CompiledSelectors> {
    let code = site.code.as_str();
    let s = &site.selectors;

    let optional_fields = [
        ("date", &s.date),
        ("writer", &s.writer),
        ("status", &s.status),
        ("period", &s.period),
        ("views", &s.views),
    ];
    let mut fields = Vec::new();
    for (key, selector) in optional_fields {
        if let Some(selector) = selector {
            fields.push((key, compile(code, selector)?));
        }
    }

    let content = match &s.content {
        Some(selector) => vec![compile(code, selector)?],
        None => FALLBACK_CONTENT_SELECTORS
            .iter()
            .map(|selector| compile(code, selector))
            .collect::<Result<Vec<_>, _>>()?,
    };

    Ok(CompiledSelectors {
        table: compile(code, &s.table)?,
        rows: compile(code, &s.rows)?,
        title_link: compile(code, &s.title_link)?,
        fields,
        content,
        attachments: compile(code, s.attachments.as_deref().unwrap_or(DEFAULT_ATTACHMENT_SELECTOR))?,
    })
}

fn compile(site: &str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|_| ConfigError::InvalidSelector {
        site: site.to_string(),
        selector: selector.to_string(),
    })
}

fn matches_function(download: &DownloadConfig, call: &JsCall) -> bool {
    match &download.function {
        Some(function) => call.short_name() == function,
        None => !call.args.is_empty(),
    }
}

fn locator_from_rule(rule: &DownloadRule, call: &JsCall) -> AttachmentLocator {
    match rule {
        DownloadRule::Get { url } => AttachmentLocator::Simple {
            url: call.fill_template(url),
        },
        DownloadRule::Post { url, fields } => AttachmentLocator::FormPost {
            url: call.fill_template(url),
            fields: call.form_fields(fields),
        },
        DownloadRule::TwoStep {
            prepare_url,
            url,
            fields,
        } => {
            let step = |url: &str| {
                if fields.is_empty() {
                    DownloadStep::Get {
                        url: call.fill_template(url),
                    }
                } else {
                    DownloadStep::Post {
                        url: call.fill_template(url),
                        fields: call.form_fields(fields),
                    }
                }
            };
            AttachmentLocator::TwoStep {
                prepare: step(prepare_url),
                fetch: step(url),
            }
        }
    }
}

/// 元素文本，合并空白
fn element_text(element: &ElementRef) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn attachment_name(link: &ElementRef) -> String {
    let text = element_text(link);
    if !text.is_empty() {
        return text;
    }
    link.value()
        .attr("title")
        .or_else(|| link.value().attr("download"))
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn html_to_markdown(html: &str) -> String {
    htmd::convert(html)
        .unwrap_or_else(|_| {
            let fragment = Html::parse_fragment(html);
            fragment.root_element().text().collect::<String>()
        })
        .trim()
        .to_string()
}
