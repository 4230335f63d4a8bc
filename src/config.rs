use std::path::PathBuf;
use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 每个站点最多抓取的页数
    pub max_pages: u32,
    /// 每批同时运行的站点数量
    pub group_size: usize,
    /// 输出根目录
    pub output_dir: PathBuf,
    /// 站点注册表（TOML）路径
    pub sites_config: PathBuf,
    /// 单个 HTTP 请求超时（秒）
    pub request_timeout_secs: u64,
    /// 公告之间的等待时间（毫秒）
    pub delay_between_requests_ms: u64,
    /// 页面之间的等待时间（毫秒）
    pub delay_between_pages_ms: u64,
    /// 连续重复标题达到该数量时停止翻页，0 表示不提前停止
    pub duplicate_threshold: usize,
    /// 文件名最大字节数
    pub max_filename_bytes: usize,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_pages: 3,
            group_size: 3,
            output_dir: PathBuf::from("output"),
            sites_config: PathBuf::from("sites.toml"),
            request_timeout_secs: 30,
            delay_between_requests_ms: 1000,
            delay_between_pages_ms: 2000,
            duplicate_threshold: 3,
            max_filename_bytes: 200,
            output_log_file: "scrape_log.txt".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_pages: env_parse("MAX_PAGES").unwrap_or(default.max_pages),
            group_size: env_parse("GROUP_SIZE").unwrap_or(default.group_size),
            output_dir: std::env::var("OUTPUT_DIR").map(PathBuf::from).unwrap_or(default.output_dir),
            sites_config: std::env::var("SITES_CONFIG").map(PathBuf::from).unwrap_or(default.sites_config),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS").unwrap_or(default.request_timeout_secs),
            delay_between_requests_ms: env_parse("DELAY_BETWEEN_REQUESTS_MS").unwrap_or(default.delay_between_requests_ms),
            delay_between_pages_ms: env_parse("DELAY_BETWEEN_PAGES_MS").unwrap_or(default.delay_between_pages_ms),
            duplicate_threshold: env_parse("DUPLICATE_THRESHOLD").unwrap_or(default.duplicate_threshold),
            max_filename_bytes: env_parse("MAX_FILENAME_BYTES").unwrap_or(default.max_filename_bytes),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
        }
    }

    /// 请求超时
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 生成单个站点运行器使用的设置
    pub fn runner_settings(&self) -> RunnerSettings {
        RunnerSettings {
            max_pages: self.max_pages,
            duplicate_threshold: self.duplicate_threshold,
            delay_between_requests: Duration::from_millis(self.delay_between_requests_ms),
            delay_between_pages: Duration::from_millis(self.delay_between_pages_ms),
            max_filename_bytes: self.max_filename_bytes,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// 站点运行器设置
#[derive(Clone, Debug)]
pub struct RunnerSettings {
    pub max_pages: u32,
    pub duplicate_threshold: usize,
    pub delay_between_requests: Duration,
    pub delay_between_pages: Duration,
    pub max_filename_bytes: usize,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Config::default().runner_settings()
    }
}

impl RunnerSettings {
    /// 不等待的设置（测试及本地回放使用）
    pub fn without_delays(mut self) -> Self {
        self.delay_between_requests = Duration::ZERO;
        self.delay_between_pages = Duration::ZERO;
        self
    }
}
