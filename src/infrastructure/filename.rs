//! 文件名处理 - 基础设施层
//!
//! - 把公告标题、附件名变成安全的文件名
//! - 从 Content-Disposition 响应头恢复真实文件名

use regex::bytes::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use super::text_decode::{decode_strict, decode_with_fallback, encoding_for_label};

/// 文件系统不允许的字符
const ILLEGAL_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// 文件夹名中标题部分的最大字节数
pub const MAX_FOLDER_TITLE_BYTES: usize = 150;

/// 视为扩展名的最大长度（含点）
const MAX_EXTENSION_BYTES: usize = 16;

static RFC5987_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i-u)filename\*\s*=\s*([^']*)'[^']*'([^;\s]+)"#).expect("valid regex")
});

static PLAIN_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i-u)(?:^|;)\s*filename\s*=\s*(?:"([^"]*)"|([^;]*))"#).expect("valid regex")
});

static PERCENT_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%[0-9A-Fa-f]{2}").expect("valid regex"));

/// 清理单个路径片段：URL 解码、替换非法字符、合并空白
pub fn clean_component(name: &str) -> String {
    let decoded = urlencoding::decode(name)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| name.to_string());

    let replaced: String = decoded
        .chars()
        .map(|c| {
            if ILLEGAL_CHARS.contains(&c) || (c.is_control() && !c.is_whitespace()) {
                '_'
            } else {
                c
            }
        })
        .collect();

    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");

    // "." 和 ".." 会指向当前/上级目录
    if collapsed.chars().all(|c| c == '.') {
        return String::new();
    }
    collapsed
}

/// 生成安全的文件名，超过 `max_bytes` 时截断并保留扩展名
///
/// 长度按 UTF-8 字节计算（韩文每字 3 字节，按字符数限制仍可能超出文件系统上限）
pub fn sanitize_filename(name: &str, max_bytes: usize) -> String {
    let cleaned = clean_component(name);
    truncate_preserving_extension(&cleaned, max_bytes)
}

/// 附件文件名，清理后为空时使用 `attachment_<序号>`
pub fn attachment_filename(display_name: &str, index: usize, max_bytes: usize) -> String {
    let name = sanitize_filename(display_name, max_bytes);
    if name.is_empty() {
        format!("attachment_{}", index)
    } else {
        name
    }
}

/// 公告文件夹名：`NNN_标题`
pub fn folder_name(index: usize, title: &str) -> String {
    let cleaned = clean_component(title);
    let title = truncate_bytes(&cleaned, MAX_FOLDER_TITLE_BYTES).trim_end();
    if title.is_empty() {
        format!("{:03}_untitled", index)
    } else {
        format!("{:03}_{}", index, title)
    }
}

fn truncate_preserving_extension(name: &str, max_bytes: usize) -> String {
    if name.len() <= max_bytes {
        return name.to_string();
    }

    match name.rfind('.') {
        Some(dot)
            if dot > 0
                && name.len() - dot <= MAX_EXTENSION_BYTES
                && name.len() - dot < max_bytes
                && !name[dot..].contains(' ') =>
        {
            let extension = &name[dot..];
            let stem = truncate_bytes(&name[..dot], max_bytes - extension.len()).trim_end();
            format!("{}{}", stem, extension)
        }
        _ => truncate_bytes(name, max_bytes).trim_end().to_string(),
    }
}

/// 按字节截断，保证落在字符边界上
fn truncate_bytes(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// 从 Content-Disposition 原始字节中提取文件名
///
/// 先尝试 RFC 5987（`filename*=UTF-8''...`），再尝试普通 `filename=`；
/// 普通形式的值依次按 UTF-8、EUC-KR、Latin-1 解码
pub fn filename_from_content_disposition(raw: &[u8]) -> Option<String> {
    if let Some(caps) = RFC5987_FILENAME.captures(raw) {
        let charset = caps.get(1).map(|m| m.as_bytes()).unwrap_or_default();
        let value = caps.get(2).map(|m| m.as_bytes()).unwrap_or_default();
        let bytes = urlencoding::decode_binary(value);
        let encoding = std::str::from_utf8(charset)
            .ok()
            .and_then(encoding_for_label)
            .unwrap_or(encoding_rs::UTF_8);

        if let Some(name) = decode_strict(&bytes, encoding).or_else(|| decode_with_fallback(&bytes)) {
            return Some(name.trim().to_string());
        }
    }

    let caps = PLAIN_FILENAME.captures(raw)?;
    let value = caps.get(1).or_else(|| caps.get(2))?.as_bytes();
    let value = trim_bytes(value);

    if PERCENT_ESCAPE.is_match(value) {
        // URL 编码形式，'+' 代表空格
        let bytes = urlencoding::decode_binary(value);
        return decode_with_fallback(&bytes).map(|name| name.replace('+', " ").trim().to_string());
    }

    decode_with_fallback(value).map(|name| name.trim().to_string())
}

/// 目标已存在时在扩展名前追加 `_2`、`_3` ...，直到找到空位
pub fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (2usize..)
        .map(|n| path.with_file_name(format!("{}_{}{}", stem, n, extension)))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

fn trim_bytes(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| !b.is_ascii_whitespace()).map_or(start, |i| i + 1);
    &bytes[start..end]
}
