use crate::error::{AppResult, ConfigError, FileError};
use crate::models::site::{SiteConfig, SiteRegistryFile};
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;

/// 从 TOML 文件加载站点注册表
pub async fn load_site_registry(path: &Path) -> AppResult<Vec<SiteConfig>> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|source| FileError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;

    let sites = parse_site_registry(&content, path)?;
    tracing::info!("站点配置加载完成: {} 个站点 ({})", sites.len(), path.display());
    Ok(sites)
}

/// 解析站点注册表内容并校验每个站点
pub fn parse_site_registry(content: &str, path: &Path) -> AppResult<Vec<SiteConfig>> {
    let registry: SiteRegistryFile =
        toml::from_str(content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.display().to_string(),
            source,
        })?;

    let mut seen = HashSet::new();
    for site in &registry.sites {
        site.validate()?;
        if !seen.insert(site.code.as_str()) {
            return Err(ConfigError::InvalidSite {
                site: site.code.clone(),
                reason: "站点代码重复".to_string(),
            }
            .into());
        }
    }

    Ok(registry.sites)
}

/// 按命令行选择过滤站点
///
/// `selection` 为空或包含 "all" 时返回全部站点；保持注册表中的顺序
pub fn select_sites(sites: Vec<SiteConfig>, selection: &[String]) -> AppResult<Vec<SiteConfig>> {
    let wanted: Vec<String> = selection
        .iter()
        .flat_map(|s| s.split(','))
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();

    if wanted.is_empty() || wanted.iter().any(|s| s == "all") {
        return Ok(sites);
    }

    if let Some(unknown) = wanted
        .iter()
        .find(|code| !sites.iter().any(|site| site.code.eq_ignore_ascii_case(code)))
    {
        return Err(ConfigError::UnknownSite(unknown.clone()).into());
    }

    Ok(sites
        .into_iter()
        .filter(|site| wanted.iter().any(|code| site.code.eq_ignore_ascii_case(code)))
        .collect())
}
