use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::warn;

use gov_notice_scraper::infrastructure::FetcherOptions;
use gov_notice_scraper::models::{load_site_registry, select_sites};
use gov_notice_scraper::utils::logging;
use gov_notice_scraper::{BatchCoordinator, Config, SiteEntry};

/// 机构公告板批量抓取
#[derive(Debug, Parser)]
#[command(name = "gov_notice_scraper", version)]
struct Cli {
    /// 每个站点最多抓取的页数
    #[arg(long)]
    pages: Option<u32>,

    /// 站点代码（可重复或逗号分隔），all 表示全部
    #[arg(long = "site", value_name = "CODE")]
    sites: Vec<String>,

    /// 输出根目录
    #[arg(long)]
    output: Option<PathBuf>,

    /// 站点注册表文件
    #[arg(long)]
    sites_config: Option<PathBuf>,

    /// 每批同时运行的站点数量
    #[arg(long)]
    group_size: Option<usize>,
}

impl Cli {
    /// 命令行参数覆盖环境变量
    fn apply(self, mut config: Config) -> (Config, Vec<String>) {
        if let Some(pages) = self.pages {
            config.max_pages = pages;
        }
        if let Some(output) = self.output {
            config.output_dir = output;
        }
        if let Some(path) = self.sites_config {
            config.sites_config = path;
        }
        if let Some(group_size) = self.group_size {
            config.group_size = group_size;
        }
        (config, self.sites)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    logging::init();

    let (config, selection) = cli.apply(Config::from_env());

    if let Err(e) = logging::init_log_file(&config.output_log_file) {
        warn!("⚠️ {:#}", e);
    }

    let registry = load_site_registry(&config.sites_config)
        .await
        .with_context(|| format!("无法加载站点注册表: {}", config.sites_config.display()))?;
    let sites = select_sites(registry, &selection)?;

    if sites.is_empty() {
        warn!("⚠️ 没有可运行的站点，程序结束");
        return Ok(());
    }

    logging::log_startup(sites.len(), config.group_size, config.max_pages);

    let options = FetcherOptions {
        timeout: config.request_timeout(),
        ..FetcherOptions::default()
    };
    let entries = sites
        .iter()
        .map(|site| SiteEntry::from_site_config(site, &options, config.max_filename_bytes));

    let report = BatchCoordinator::new(config.output_dir.clone(), config.group_size, config.runner_settings())
        .with_entries(entries)
        .run()
        .await;

    logging::print_final_report(&report, &config.output_log_file);

    Ok(())
}
