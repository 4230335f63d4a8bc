//! 日志工具模块
//!
//! 提供日志初始化、横幅输出和格式化的辅助函数

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::models::{BatchReport, SiteRunResult};

/// 初始化 tracing（`RUST_LOG` 未设置时使用 info）
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n公告抓取日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .with_context(|| format!("无法创建日志文件: {}", log_file_path))?;
    Ok(())
}

/// 追加内容到日志文件
pub fn append_log_file(log_file_path: &str, text: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .with_context(|| format!("无法打开日志文件: {}", log_file_path))?;
    file.write_all(text.as_bytes())?;
    Ok(())
}

/// 记录程序启动信息
///
/// # 参数
/// - `site_count`: 站点数量
/// - `group_size`: 每批站点数
/// - `max_pages`: 每个站点最多页数
pub fn log_startup(site_count: usize, group_size: usize, max_pages: u32) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 公告板批量抓取");
    info!("🌐 站点数量: {}", site_count);
    info!("📊 每批站点数: {} | 每站最多 {} 页", group_size, max_pages);
    info!("{}", "=".repeat(60));
}

/// 记录批次开始信息
pub fn log_group_start(group_num: usize, total_groups: usize, codes: &[String]) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批: {}", group_num, total_groups, codes.join(", "));
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_group_complete(group_num: usize, results: &[SiteRunResult]) {
    let success = results.iter().filter(|r| r.is_success()).count();
    info!("\n{}", "─".repeat(60));
    info!("✓ 第 {} 批完成: 成功 {}/{}", group_num, success, results.len());
    info!("{}", "─".repeat(60));
}

/// 生成汇总表
pub fn render_report(report: &BatchReport) -> String {
    let mut lines = Vec::new();
    lines.push("=".repeat(60));
    lines.push(format!(
        "📊 全部处理完成统计 - {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    lines.push("=".repeat(60));

    for result in &report.results {
        if result.is_success() {
            lines.push(format!(
                "✅ {} ({}) | 公告 {} | 附件 {} ({}) | {}",
                result.display_name,
                result.site_code,
                result.counters.announcements_processed,
                result.counters.files_downloaded,
                format_size(result.counters.bytes_downloaded),
                format_duration(result.duration)
            ));
        } else {
            lines.push(format!(
                "❌ {} ({}) | {} | {}",
                result.display_name,
                result.site_code,
                result.error_detail.as_deref().unwrap_or("未知错误"),
                format_duration(result.duration)
            ));
        }
    }

    lines.push("─".repeat(60));
    lines.push(format!("✅ 成功: {}/{}", report.succeeded(), report.total()));
    lines.push(format!("❌ 失败: {}", report.failed()));
    lines.push(format!("📄 公告: {}", report.total_announcements()));
    lines.push(format!(
        "📎 附件: {} ({})",
        report.total_files(),
        format_size(report.total_bytes())
    ));
    lines.push(format!("⏱️ 总耗时: {}", format_duration(report.wall_clock)));
    lines.push("=".repeat(60));
    lines.join("\n")
}

/// 打印最终统计信息，并追加到日志文件
pub fn print_final_report(report: &BatchReport, log_file_path: &str) {
    let table = render_report(report);
    for line in table.lines() {
        info!("{}", line);
    }

    match append_log_file(log_file_path, &format!("{}\n", table)) {
        Ok(()) => info!("\n日志已保存至: {}", log_file_path),
        Err(e) => error!("日志文件写入失败: {:#}", e),
    }
}

/// 字节数 → B / KB / MB / GB
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

/// 耗时显示（秒，保留一位小数）
pub fn format_duration(duration: Duration) -> String {
    format!("{:.1}s", duration.as_secs_f64())
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
