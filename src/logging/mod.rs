use std::time::Instant;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 日志格式配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// 人类可读格式
    Pretty,
    /// 紧凑格式
    Compact,
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 日志级别，`RUST_LOG` 存在时以其为准
    pub level: Level,
    /// 输出格式
    pub format: LogFormat,
    /// 是否显示目标模块
    pub show_target: bool,
    /// 是否启用 ANSI 颜色
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Compact,
            show_target: true,
            ansi: true,
        }
    }
}

impl LoggingConfig {
    /// 开发环境：输出解析细节
    pub fn development() -> Self {
        Self {
            level: Level::TRACE,
            format: LogFormat::Pretty,
            show_target: true,
            ansi: true,
        }
    }

    /// 测试环境：只输出错误
    pub fn testing() -> Self {
        Self {
            level: Level::ERROR,
            format: LogFormat::Compact,
            show_target: false,
            ansi: false,
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }
}

/// 初始化日志系统
///
/// 已经存在全局 subscriber 时返回 `false`，不会 panic。
pub fn init_logging(config: LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str().to_ascii_lowercase()));

    let initialized = match config.format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(config.show_target)
                    .with_ansi(config.ansi),
            )
            .try_init()
            .is_ok(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_target(config.show_target)
                    .with_ansi(config.ansi),
            )
            .try_init()
            .is_ok(),
    };

    if initialized {
        tracing::debug!(level = ?config.level, format = ?config.format, "Logging system initialized");
    }
    initialized
}

/// 单次解析的计时器
pub struct ResolutionTimer {
    start: Instant,
    type_key: String,
    depth: usize,
}

impl ResolutionTimer {
    pub fn start(type_key: &str, depth: usize) -> Self {
        Self {
            start: Instant::now(),
            type_key: type_key.to_string(),
            depth,
        }
    }

    /// 完成计时并记录日志
    pub fn finish(self, succeeded: bool) {
        let duration = self.elapsed();

        tracing::debug!(
            type_key = %self.type_key,
            depth = self.depth,
            succeeded,
            duration_us = duration.as_micros() as u64,
            "Resolution completed"
        );
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_logging_config_creation() {
        let dev_config = LoggingConfig::development();
        assert_eq!(dev_config.level, Level::TRACE);
        assert_eq!(dev_config.format, LogFormat::Pretty);

        let test_config = LoggingConfig::testing().with_level(Level::WARN);
        assert_eq!(test_config.level, Level::WARN);
        assert_eq!(test_config.format, LogFormat::Compact);
        assert!(!test_config.ansi);
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging(LoggingConfig::testing());
        assert!(!init_logging(LoggingConfig::testing()));
    }

    #[test]
    fn test_resolution_timer() {
        let timer = ResolutionTimer::start("Engine", 2);
        assert_eq!(timer.type_key, "Engine");
        assert_eq!(timer.depth, 2);

        std::thread::sleep(Duration::from_millis(1));
        assert!(timer.elapsed().as_nanos() > 0);
        timer.finish(true);
    }
}
