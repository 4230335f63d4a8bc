use gov_notice_scraper::adapters::SiteAdapter;
use gov_notice_scraper::infrastructure::FetcherOptions;
use gov_notice_scraper::models::{load_site_registry, select_sites};
use gov_notice_scraper::utils::logging;
use gov_notice_scraper::{run_site, RunnerSettings, StandardTableAdapter};
use std::path::Path;

async fn btp_adapter() -> StandardTableAdapter {
    let registry = load_site_registry(Path::new("sites.toml"))
        .await
        .expect("加载 sites.toml 失败");
    let site = select_sites(registry, &["btp".to_string()])
        .expect("找不到 btp 站点")
        .remove(0);
    StandardTableAdapter::new(site, &FetcherOptions::default(), 200).expect("创建适配器失败")
}

#[tokio::test]
#[ignore] // 默认忽略，需要网络：cargo test -- --ignored
async fn test_btp_first_page() {
    logging::init();

    let adapter = btp_adapter().await;
    let records = adapter.list_page(1).await.expect("获取目录失败");
    assert!(!records.is_empty(), "第一页应该有公告");

    let detail = adapter.detail(&records[0]).await.expect("获取详情失败");
    assert!(!detail.body.is_empty());
}

#[tokio::test]
#[ignore]
async fn test_btp_single_page_run() {
    logging::init();

    let adapter = btp_adapter().await;
    let dir = std::env::temp_dir().join(format!("gov_notice_btp_{}", std::process::id()));
    let settings = RunnerSettings {
        max_pages: 1,
        ..RunnerSettings::default()
    };

    let outcome = run_site(&adapter, &dir, &settings).await.expect("运行失败");
    assert!(dir.join("processed_titles_btp.json").is_file());
    println!("{:?}", outcome);
}

#[test]
fn test_bundled_registry_parses() {
    let content = std::fs::read_to_string("sites.toml").expect("读取 sites.toml 失败");
    let sites = gov_notice_scraper::models::loaders::parse_site_registry(&content, Path::new("sites.toml"))
        .expect("sites.toml 应该可以解析");
    assert!(sites.iter().any(|s| s.code == "btp"));
    for site in sites {
        StandardTableAdapter::new(site, &FetcherOptions::default(), 200).expect("选择器应该有效");
    }
}
