//! `javascript:` 链接与 onclick 处理函数解析
//!
//! 例：`javascript:fn_egov_downFile('FILE_000000000012345','0');`
//! → 函数名 `fn_egov_downFile`，参数 `["FILE_000000000012345", "0"]`

use regex::Regex;
use std::sync::LazyLock;

static CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z_$][\w$.]*)\s*\(([^)]*)\)").expect("valid regex")
});

static ARG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"'([^']*)'|"([^"]*)"|([^,\s]+)"#).expect("valid regex")
});

/// 一次 JavaScript 函数调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsCall {
    pub function: String,
    pub args: Vec<String>,
}

impl JsCall {
    /// 从 href 或 onclick 中解析第一个函数调用
    pub fn parse(source: &str) -> Option<Self> {
        let source = source.trim();
        let source = if is_javascript_href(source) {
            &source[11..]
        } else {
            source
        };

        let caps = CALL.captures(source)?;
        let function = caps.get(1)?.as_str().to_string();
        let args = ARG
            .captures_iter(caps.get(2).map_or("", |m| m.as_str()))
            .filter_map(|arg| arg.get(1).or_else(|| arg.get(2)).or_else(|| arg.get(3)))
            .map(|m| m.as_str().trim().to_string())
            .collect();

        Some(Self { function, args })
    }

    /// 函数名的最后一段（`window.fnDown` → `fnDown`）
    pub fn short_name(&self) -> &str {
        self.function.rsplit('.').next().unwrap_or(&self.function)
    }

    /// 用参数填充模板中的 `{1}`、`{2}` …，参数值做 URL 编码
    pub fn fill_template(&self, template: &str) -> String {
        self.args
            .iter()
            .enumerate()
            .fold(template.to_string(), |acc, (i, arg)| {
                acc.replace(&format!("{{{}}}", i + 1), &urlencoding::encode(arg))
            })
    }

    /// 字段名依次对应参数，多余的字段名忽略
    pub fn form_fields(&self, names: &[String]) -> Vec<(String, String)> {
        names
            .iter()
            .zip(self.args.iter())
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

/// 是否为 javascript: 伪链接
pub fn is_javascript_href(href: &str) -> bool {
    href.trim()
        .get(..11)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("javascript:"))
}
