// ==========================================
// 期末考试排考系统 - 日志初始化
// ==========================================
// 输出: stderr (stdout 留给 JSON 报告)
// 环境变量:
// - RUST_LOG: 过滤器, 缺省 info
// - EXAM_SCHEDULER_LOG_FORMAT: text (缺省) | json
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 日志格式环境变量
pub const LOG_FORMAT_ENV: &str = "EXAM_SCHEDULER_LOG_FORMAT";

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json, // 每行一个 JSON 事件, 便于批量运行后采集
}

impl LogFormat {
    /// 解析格式名（大小写不敏感, 未知值回退 Text）
    pub fn from_env_value(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()) {
            Some(v) if v == "json" => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// 初始化命令行日志
///
/// ```no_run
/// // RUST_LOG=exam_scheduler=debug EXAM_SCHEDULER_LOG_FORMAT=json exam-scheduler ...
/// exam_scheduler::logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let format = LogFormat::from_env_value(std::env::var(LOG_FORMAT_ENV).ok().as_deref());

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// 集成测试用: 本 crate 的 debug 事件写入测试捕获输出, 可重复调用
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("exam_scheduler=debug"))
        .with_test_writer()
        .try_init();
}
