// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::link::CheckOutcome;
use crate::domain::models::platform::Platform;
use crate::infrastructure::cache::redis_client::RedisClient;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::warn;

/// 默认有效链接TTL（小时）
const DEFAULT_VALID_TTL_HOURS: i64 = 24;
/// 默认无效链接TTL（小时，7天）
const DEFAULT_INVALID_TTL_HOURS: i64 = 168;

/// TTL配置
///
/// 读多写少，热更新时整体替换
#[derive(Debug, Clone, Default)]
pub struct TtlConfig {
    /// 无效链接统一过期时间（小时），<=0 时用默认值
    pub invalid_ttl_hours: i64,
    /// 各平台有效链接过期时间（小时）
    pub platform_ttl_hours: HashMap<Platform, i64>,
}

/// 检测结果缓存
///
/// 规范化链接 -> CheckOutcome 的键值存储。后端缺失不是错误，
/// 只是停用所有缓存操作；损坏的条目在读取时删除并按未命中处理。
pub struct OutcomeCache {
    client: Option<RedisClient>,
    ttl: RwLock<TtlConfig>,
}

impl OutcomeCache {
    /// 创建缓存层，`client=None` 表示无后端
    pub fn new(client: Option<RedisClient>, ttl: TtlConfig) -> Self {
        Self {
            client,
            ttl: RwLock::new(ttl),
        }
    }

    /// 缓存是否可用
    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// 热更新TTL配置
    pub async fn update_ttl_config(&self, ttl: TtlConfig) {
        *self.ttl.write().await = ttl;
    }

    /// 查询缓存的检测结果
    ///
    /// 未命中、后端缺失或条目损坏都返回None
    pub async fn get(&self, link: &str) -> Option<CheckOutcome> {
        let client = self.client.as_ref()?;
        let key = cache_key(link);

        let value = match client.get(&key).await {
            Ok(value) => value?,
            Err(e) => {
                warn!("Failed to get cache for link {}: {}", link, e);
                return None;
            }
        };

        match serde_json::from_str::<CheckOutcome>(&value) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!("Failed to unmarshal cache result for link {}: {}", link, e);
                // 删除损坏的缓存条目
                if let Err(del_err) = client.delete(&key).await {
                    warn!("Failed to delete corrupted cache entry {}: {}", key, del_err);
                }
                None
            }
        }
    }

    /// 写入检测结果
    ///
    /// 有效链接按平台TTL（缺省24小时），无效链接按统一TTL（缺省7天）
    pub async fn set(&self, link: &str, outcome: &CheckOutcome, platform: Platform) {
        let Some(client) = self.client.as_ref() else {
            return;
        };

        let ttl_hours = {
            let ttl = self.ttl.read().await;
            if outcome.valid {
                match ttl.platform_ttl_hours.get(&platform) {
                    Some(hours) if *hours > 0 => *hours,
                    _ => DEFAULT_VALID_TTL_HOURS,
                }
            } else if ttl.invalid_ttl_hours > 0 {
                ttl.invalid_ttl_hours
            } else {
                DEFAULT_INVALID_TTL_HOURS
            }
        };

        let value = match serde_json::to_string(outcome) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to marshal outcome for link {}: {}", link, e);
                return;
            }
        };

        let ttl_seconds = (ttl_hours as u64) * 3600;
        if let Err(e) = client.set(&cache_key(link), &value, ttl_seconds).await {
            warn!("Failed to set cache for link {}: {}", link, e);
        }
    }

    /// 删除链接的缓存条目
    pub async fn delete(&self, link: &str) {
        let Some(client) = self.client.as_ref() else {
            return;
        };
        if let Err(e) = client.delete(&cache_key(link)).await {
            warn!("Failed to delete cache for link {}: {}", link, e);
        }
    }

    /// 计算写入该结果时会使用的TTL（小时），测试与诊断用
    pub async fn derive_ttl_hours(&self, valid: bool, platform: Platform) -> i64 {
        let ttl = self.ttl.read().await;
        if valid {
            match ttl.platform_ttl_hours.get(&platform) {
                Some(hours) if *hours > 0 => *hours,
                _ => DEFAULT_VALID_TTL_HOURS,
            }
        } else if ttl.invalid_ttl_hours > 0 {
            ttl.invalid_ttl_hours
        } else {
            DEFAULT_INVALID_TTL_HOURS
        }
    }
}

fn cache_key(link: &str) -> String {
    format!("link:check:{}", link)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_cache_is_noop() {
        let cache = OutcomeCache::new(None, TtlConfig::default());
        assert!(!cache.is_enabled());
        assert!(cache.get("https://pan.quark.cn/s/abc").await.is_none());
        // set 在无后端时静默跳过
        cache
            .set(
                "https://pan.quark.cn/s/abc",
                &CheckOutcome::valid(10),
                Platform::Quark,
            )
            .await;
    }

    #[tokio::test]
    async fn test_ttl_derivation() {
        let mut platform_ttl = HashMap::new();
        platform_ttl.insert(Platform::Quark, 48i64);
        platform_ttl.insert(Platform::Baidu, 0i64);
        let cache = OutcomeCache::new(
            None,
            TtlConfig {
                invalid_ttl_hours: 72,
                platform_ttl_hours: platform_ttl,
            },
        );

        // 有效：平台配置存在且>0时用平台值
        assert_eq!(cache.derive_ttl_hours(true, Platform::Quark).await, 48);
        // 有效：平台配置<=0或缺失时回退24小时
        assert_eq!(cache.derive_ttl_hours(true, Platform::Baidu).await, 24);
        assert_eq!(cache.derive_ttl_hours(true, Platform::Uc).await, 24);
        // 无效：统一TTL
        assert_eq!(cache.derive_ttl_hours(false, Platform::Quark).await, 72);

        // 无效统一TTL未配置时回退168小时
        cache.update_ttl_config(TtlConfig::default()).await;
        assert_eq!(cache.derive_ttl_hours(false, Platform::Quark).await, 168);
    }
}
