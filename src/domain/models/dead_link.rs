// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::platform::Platform;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// 失效链接
///
/// 已知无效链接的持久化负缓存，以规范化链接为唯一键。
/// `rate_limited=true` 的记录属于"存疑"，查询时不得短路，必须重新探测。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLink {
    /// 记录ID
    pub id: i64,
    /// 规范化分享链接（唯一）
    pub link: String,
    /// 网盘平台类型
    pub platform: Platform,
    /// 失败原因
    pub failure_reason: String,
    /// 检测耗时（毫秒）
    pub check_duration: Option<i64>,
    /// 是否被平台限流
    pub rate_limited: bool,
    /// 来源提交记录ID
    pub submission_id: Option<i64>,
    /// 创建时间
    pub created_at: DateTime<FixedOffset>,
}

impl DeadLink {
    /// 由检测结果构造一条失效记录
    pub fn from_outcome(
        link: String,
        platform: Platform,
        failure_reason: String,
        check_duration: Option<i64>,
        rate_limited: bool,
        submission_id: Option<i64>,
    ) -> Self {
        Self {
            id: 0,
            link,
            platform,
            failure_reason,
            check_duration,
            rate_limited,
            submission_id,
            created_at: Utc::now().into(),
        }
    }
}
