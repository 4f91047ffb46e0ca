// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// 应用程序配置设置
///
/// 包含服务器、数据库、Redis与检测器等所有配置项
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// 服务器配置
    pub server: ServerSettings,
    /// 数据库配置
    pub database: DatabaseSettings,
    /// Redis配置
    pub redis: RedisSettings,
    /// 检测器配置
    pub checker: CheckerSettings,
    /// 管理密钥配置
    pub admin: AdminSettings,
}

/// 服务器配置设置
#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

/// 数据库配置设置
#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
}

/// Redis配置设置
///
/// 缓存后端可缺席，此时所有缓存操作停用而非报错
#[derive(Debug, Deserialize)]
pub struct RedisSettings {
    /// 是否启用Redis缓存
    pub enabled: bool,
    /// Redis连接URL
    pub url: String,
    /// 无效链接统一过期时间（小时）
    pub invalid_ttl_hours: i64,
}

/// 检测器配置设置
#[derive(Debug, Deserialize)]
pub struct CheckerSettings {
    /// 默认并发数
    pub default_concurrency: usize,
    /// 单次探测超时时间（秒）
    pub timeout_seconds: u64,
}

/// 管理密钥配置
#[derive(Debug, Deserialize)]
pub struct AdminSettings {
    /// 管理接口共享密钥，恒定时间比较
    pub secret: String,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从配置文件和环境变量加载，环境变量前缀 `PANCHECK__`
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "mysql://root@localhost:3306/pancheck")?
            .set_default("database.max_connections", 100)?
            .set_default("database.min_connections", 10)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            .set_default("redis.enabled", false)?
            .set_default("redis.url", "redis://localhost:6379")?
            .set_default("redis.invalid_ttl_hours", 168)?
            .set_default("checker.default_concurrency", 5)?
            .set_default("checker.timeout_seconds", 30)?
            .set_default("admin.secret", "")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("PANCHECK").separator("__"));

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::new().expect("default settings should load");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.checker.timeout_seconds, 30);
        assert_eq!(settings.redis.invalid_ttl_hours, 168);
        assert!(!settings.redis.enabled);
    }
}
