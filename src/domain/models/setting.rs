// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

/// 系统设置项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    /// 设置ID
    pub id: i64,
    /// 配置键（唯一）
    pub key: String,
    /// 配置值
    pub value: String,
    /// 配置分类
    pub category: String,
    /// 配置描述
    pub description: String,
}

/// 平台频率控制配置
///
/// 存储在 settings 表 `platform_rate_config_<platform>` 键下的JSON
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlatformRateConfig {
    /// 并发数
    #[serde(default)]
    pub concurrency: usize,
    /// 请求间隔（毫秒）
    #[serde(default)]
    pub request_delay_ms: u64,
    /// 每秒最大请求数（0表示不限制）
    #[serde(default)]
    pub max_requests_per_second: u32,
    /// 有效链接缓存过期时间（小时）
    #[serde(default)]
    pub cache_ttl_hours: i64,
}

impl Default for PlatformRateConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            request_delay_ms: 0,
            max_requests_per_second: 0,
            cache_ttl_hours: 0,
        }
    }
}
