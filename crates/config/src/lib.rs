//! 统一配置中心
//!
//! 提供应用的全局配置管理，包括：
//! - 服务监听地址
//! - 事件订阅表（GC、缓冲上限、长轮询节奏）
//! - 匿名聊天缓存保留时间
//! - 评分次数补充
//!
//! 加载顺序：内置默认值 → 可选的 YAML 文件（`APP_CONFIG` 指定路径）→ `APP_` 前缀的环境变量，
//! 段落之间用 `__` 分隔，例如 `APP_EVENTS__MAX_PENDING=500`。

use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// 全局应用配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 服务配置
    pub server: ServerConfig,
    /// 事件投递配置
    pub events: EventsConfig,
    /// 匿名聊天配置
    pub anon_chat: AnonChatConfig,
    /// 评分配置
    pub rating: RatingConfig,
}

/// 服务器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 事件订阅表配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// GC 扫描周期
    pub gc_interval_secs: u64,
    /// 超过该时长未读取的订阅会被回收
    pub inactivity_timeout_secs: u64,
    /// 每个 profile 最多保留的待投递事件数，也是推送通道的容量
    pub max_pending: usize,
    /// 长轮询开始前的合并等待，突发事件会在一次响应中返回
    pub coalesce_delay_ms: u64,
    /// 长轮询在没有事件时最多挂起的时长
    pub drain_timeout_ms: u64,
    /// SSE keep-alive 注释帧间隔
    pub sse_keep_alive_secs: u64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            gc_interval_secs: 30,
            inactivity_timeout_secs: 5 * 60,
            max_pending: 1000,
            coalesce_delay_ms: 2000,
            drain_timeout_ms: 30_000,
            sse_keep_alive_secs: 15,
        }
    }
}

impl EventsConfig {
    pub fn gc_interval(&self) -> Duration {
        Duration::from_secs(self.gc_interval_secs)
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }

    pub fn coalesce_delay(&self) -> Duration {
        Duration::from_millis(self.coalesce_delay_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    pub fn sse_keep_alive(&self) -> Duration {
        Duration::from_secs(self.sse_keep_alive_secs)
    }
}

/// 匿名聊天配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnonChatConfig {
    /// 会话结束后仍可评分/屏蔽的时长
    pub retention_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for AnonChatConfig {
    fn default() -> Self {
        Self {
            retention_secs: 10 * 60,
            sweep_interval_secs: 60,
        }
    }
}

impl AnonChatConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// 评分配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    pub replenish_interval_secs: u64,
    pub max_rates: u32,
    /// 为 true 时评分次数用尽返回 Forbidden，否则静默忽略
    pub reject_when_exhausted: bool,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            replenish_interval_secs: 60 * 60,
            max_rates: 10,
            reject_when_exhausted: false,
        }
    }
}

impl RatingConfig {
    pub fn replenish_interval(&self) -> Duration {
        Duration::from_secs(self.replenish_interval_secs)
    }
}

impl AppConfig {
    /// 环境变量前缀
    pub const ENV_PREFIX: &'static str = "APP_";
    /// 指定 YAML 配置文件路径的环境变量
    pub const FILE_ENV: &'static str = "APP_CONFIG";

    /// 构建配置来源，便于在测试中替换
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
        if let Ok(path) = std::env::var(Self::FILE_ENV) {
            figment = figment.merge(Yaml::file(path));
        }
        figment.merge(
            Env::prefixed(Self::ENV_PREFIX)
                .ignore(&["CONFIG"])
                .split("__"),
        )
    }

    /// 加载并验证配置
    pub fn load() -> Result<Self, ConfigError> {
        let config: AppConfig = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidServerConfig(
                "port must be greater than 0".to_string(),
            ));
        }

        let intervals = [
            ("events.gc_interval_secs", self.events.gc_interval_secs),
            ("events.inactivity_timeout_secs", self.events.inactivity_timeout_secs),
            ("events.drain_timeout_ms", self.events.drain_timeout_ms),
            ("events.sse_keep_alive_secs", self.events.sse_keep_alive_secs),
            ("anon_chat.retention_secs", self.anon_chat.retention_secs),
            ("anon_chat.sweep_interval_secs", self.anon_chat.sweep_interval_secs),
            ("rating.replenish_interval_secs", self.rating.replenish_interval_secs),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::InvalidInterval(name.to_string()));
        }

        if self.events.max_pending == 0 {
            return Err(ConfigError::InvalidEventsConfig(
                "max_pending must be greater than 0".to_string(),
            ));
        }

        if !(1..=10).contains(&self.rating.max_rates) {
            return Err(ConfigError::InvalidRatingConfig(
                "max_rates must be between 1 and 10".to_string(),
            ));
        }

        Ok(())
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("Invalid server configuration: {0}")]
    InvalidServerConfig(String),
    #[error("Interval must be greater than 0: {0}")]
    InvalidInterval(String),
    #[error("Invalid events configuration: {0}")]
    InvalidEventsConfig(String),
    #[error("Invalid rating configuration: {0}")]
    InvalidRatingConfig(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Load(Box::new(err))
    }
}
