//! 文本解码 - 基础设施层
//!
//! 旧式政府网站经常不声明编码，或者在响应头里声明错误的编码（ISO-8859-1），
//! 这里按固定顺序尝试解码

use encoding_rs::{Encoding, EUC_KR, UTF_8, WINDOWS_1252};
use regex::Regex;
use std::sync::LazyLock;

static META_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?\s*([a-z0-9_\-]+)"#).expect("valid regex")
});

/// 文件名解码顺序：UTF-8 → EUC-KR（encoding_rs 中即 CP949 超集）→ Latin-1 原样
const FALLBACK_CHAIN: [&Encoding; 3] = [UTF_8, EUC_KR, WINDOWS_1252];

/// 把编码名称解析为编码，"auto" 或无法识别时返回 None
pub fn encoding_for_label(label: &str) -> Option<&'static Encoding> {
    if label.trim().eq_ignore_ascii_case("auto") {
        return None;
    }
    Encoding::for_label(label.trim().as_bytes())
}

/// 按回退顺序解码，返回第一个非空且可打印的结果
pub fn decode_with_fallback(bytes: &[u8]) -> Option<String> {
    FALLBACK_CHAIN.iter().find_map(|encoding| {
        encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|text| text.into_owned())
            .filter(|text| is_printable(text))
    })
}

/// 以指定编码严格解码，失败或不可打印时返回 None
pub fn decode_strict(bytes: &[u8], encoding: &'static Encoding) -> Option<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
        .filter(|text| is_printable(text))
}

/// 非空、不含控制字符和替换字符
pub fn is_printable(text: &str) -> bool {
    !text.trim().is_empty() && !text.chars().any(|c| c.is_control() || c == '\u{FFFD}')
}

/// 解码 HTML 响应体
///
/// 顺序：强制编码 → Content-Type 中的 charset（忽略 ISO-8859-1）→ `<meta charset>`
/// → 严格 UTF-8 → EUC-KR
pub fn decode_html(
    bytes: &[u8],
    content_type: Option<&str>,
    forced: Option<&'static Encoding>,
) -> String {
    if let Some(encoding) = forced {
        return encoding.decode(bytes).0.into_owned();
    }

    if let Some(encoding) = content_type.and_then(charset_from_content_type) {
        return encoding.decode(bytes).0.into_owned();
    }

    if let Some(encoding) = sniff_meta_charset(bytes) {
        return encoding.decode(bytes).0.into_owned();
    }

    match UTF_8.decode_without_bom_handling_and_without_replacement(bytes) {
        Some(text) => text.into_owned(),
        None => EUC_KR.decode(bytes).0.into_owned(),
    }
}

fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    let charset = content_type
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.trim().trim_matches('"'))?;

    // 很多服务器默认返回 ISO-8859-1，实际内容并不是
    let encoding = Encoding::for_label(charset.as_bytes())?;
    if encoding == WINDOWS_1252 {
        None
    } else {
        Some(encoding)
    }
}

fn sniff_meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(4096)]);
    let label = META_CHARSET.captures(&head)?.get(1)?.as_str().to_string();
    Encoding::for_label(label.as_bytes())
}
