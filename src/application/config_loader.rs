// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::platform::Platform;
use crate::domain::models::setting::PlatformRateConfig;
use crate::domain::repositories::settings_repository::SettingsRepository;
use crate::infrastructure::cache::TtlConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// settings 表中的Redis覆盖配置
#[derive(Debug, Clone, Deserialize)]
pub struct RedisOverride {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub invalid_ttl_hours: i64,
}

/// 运行时配置装载器
///
/// 管线从 settings 表读取的键：`platform_rate_config_<platform>`
/// 和 `redis_config`
pub struct RuntimeConfigLoader {
    settings: Arc<dyn SettingsRepository>,
}

impl RuntimeConfigLoader {
    pub fn new(settings: Arc<dyn SettingsRepository>) -> Self {
        Self { settings }
    }

    /// 读取全部平台的频率配置，缺失或损坏的键用默认值
    pub async fn load_rate_configs(&self) -> HashMap<Platform, PlatformRateConfig> {
        let mut configs = HashMap::new();
        for platform in Platform::all() {
            let key = format!("platform_rate_config_{}", platform);
            let config = match self.settings.find_by_key(&key).await {
                Ok(Some(setting)) => match serde_json::from_str(&setting.value) {
                    Ok(config) => config,
                    Err(e) => {
                        warn!("Invalid rate config for {}: {}", platform, e);
                        PlatformRateConfig::default()
                    }
                },
                Ok(None) => PlatformRateConfig::default(),
                Err(e) => {
                    warn!("Failed to load rate config for {}: {}", platform, e);
                    PlatformRateConfig::default()
                }
            };
            configs.insert(platform, config);
        }
        configs
    }

    /// 读取Redis覆盖配置
    pub async fn load_redis_override(&self) -> Option<RedisOverride> {
        match self.settings.find_by_key("redis_config").await {
            Ok(Some(setting)) => match serde_json::from_str(&setting.value) {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!("Invalid redis_config setting: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to load redis_config setting: {}", e);
                None
            }
        }
    }

    /// 由频率配置推导TTL配置
    pub fn build_ttl_config(
        rate_configs: &HashMap<Platform, PlatformRateConfig>,
        invalid_ttl_hours: i64,
    ) -> TtlConfig {
        let platform_ttl_hours = rate_configs
            .iter()
            .map(|(platform, config)| (*platform, config.cache_ttl_hours))
            .collect();
        TtlConfig {
            invalid_ttl_hours,
            platform_ttl_hours,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_ttl_config() {
        let mut rate_configs = HashMap::new();
        rate_configs.insert(
            Platform::Quark,
            PlatformRateConfig {
                concurrency: 5,
                request_delay_ms: 0,
                max_requests_per_second: 0,
                cache_ttl_hours: 48,
            },
        );
        let ttl = RuntimeConfigLoader::build_ttl_config(&rate_configs, 72);
        assert_eq!(ttl.invalid_ttl_hours, 72);
        assert_eq!(ttl.platform_ttl_hours.get(&Platform::Quark), Some(&48));
    }
}
