/// 工作站配置 - 前台终端的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | BACKEND_URL | http://localhost:3000 | 订单后端地址 |
/// | PRINTER_URL | http://localhost:9100 | 打印机桥接地址 |
/// | RESTAURANT_ID | demo | 餐厅标识 (实时频道名) |
/// | POLL_INTERVAL_MS | 15000 | 轮询间隔(毫秒) |
/// | REQUEST_TIMEOUT_MS | 10000 | HTTP 请求超时(毫秒) |
/// | PRINT_TIMEOUT_MS | 10000 | 单次打印超时(毫秒) |
/// | HEALTH_TIMEOUT_MS | 3000 | 打印机健康探测超时(毫秒) |
/// | QUEUE_SWEEP_INTERVAL_MS | 5000 | 打印队列巡检间隔(毫秒) |
/// | PRINTER_HEALTH_INTERVAL_MS | 30000 | 打印机健康检查间隔(毫秒) |
///
/// # 示例
///
/// ```ignore
/// BACKEND_URL=https://api.example.com RESTAURANT_ID=coral-7 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 订单后端 URL
    pub backend_url: String,
    /// 打印机桥接 URL
    pub printer_url: String,
    /// 餐厅标识，决定实时频道名
    pub restaurant_id: String,
    /// 轮询间隔 (毫秒)
    pub poll_interval_ms: u64,
    /// HTTP 请求超时 (毫秒)
    pub request_timeout_ms: u64,
    /// 单次打印超时 (毫秒)
    pub print_timeout_ms: u64,
    /// 打印机健康探测超时 (毫秒)
    pub health_timeout_ms: u64,
    /// 打印队列巡检间隔 (毫秒)
    pub queue_sweep_interval_ms: u64,
    /// 打印机健康检查间隔 (毫秒)
    pub printer_health_interval_ms: u64,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            backend_url: std::env::var("BACKEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            printer_url: std::env::var("PRINTER_URL")
                .unwrap_or_else(|_| "http://localhost:9100".into()),
            restaurant_id: std::env::var("RESTAURANT_ID").unwrap_or_else(|_| "demo".into()),
            poll_interval_ms: std::env::var("POLL_INTERVAL_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(15000),
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10000),
            print_timeout_ms: std::env::var("PRINT_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10000),
            health_timeout_ms: std::env::var("HEALTH_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            queue_sweep_interval_ms: std::env::var("QUEUE_SWEEP_INTERVAL_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            printer_health_interval_ms: std::env::var("PRINTER_HEALTH_INTERVAL_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(30000),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(
        backend_url: impl Into<String>,
        printer_url: impl Into<String>,
        restaurant_id: impl Into<String>,
    ) -> Self {
        let mut config = Self::from_env();
        config.backend_url = backend_url.into();
        config.printer_url = printer_url.into();
        config.restaurant_id = restaurant_id.into();
        config
    }

    /// 实时频道名
    pub fn realtime_channel(&self) -> String {
        format!("restaurant:{}", self.restaurant_id)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
