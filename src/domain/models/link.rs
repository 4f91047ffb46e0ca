// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::platform::Platform;
use serde::{Deserialize, Serialize};

/// 链接信息
///
/// 解析后的分享链接，`canonical` 为流经整个检测管线的规范化形式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkInfo {
    /// 原始输入
    pub raw: String,
    /// 规范化后的链接（补全协议、去除首尾空白、重编码查询参数）
    pub canonical: String,
    /// 识别出的平台
    pub platform: Platform,
}

/// 检测结果
///
/// 探测器对单条链接的判定，永远不会向上抛错
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// 链接是否有效
    pub valid: bool,
    /// 失败原因（无效时）
    #[serde(default)]
    pub failure_reason: String,
    /// 检测耗时（毫秒）
    #[serde(default)]
    pub duration_ms: i64,
    /// 失败是否由平台限流导致，而非链接自身失效
    ///
    /// 限流结果不得作为永久失效缓存或短路依据
    #[serde(default)]
    pub rate_limited: bool,
}

impl CheckOutcome {
    /// 构造有效结果
    pub fn valid(duration_ms: i64) -> Self {
        Self {
            valid: true,
            failure_reason: String::new(),
            duration_ms,
            rate_limited: false,
        }
    }

    /// 构造无效结果
    pub fn invalid(reason: impl Into<String>, duration_ms: i64) -> Self {
        Self {
            valid: false,
            failure_reason: reason.into(),
            duration_ms,
            rate_limited: false,
        }
    }

    /// 构造被平台限流的无效结果
    pub fn rate_limited(reason: impl Into<String>, duration_ms: i64) -> Self {
        Self {
            valid: false,
            failure_reason: reason.into(),
            duration_ms,
            rate_limited: true,
        }
    }
}
