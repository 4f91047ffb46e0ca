// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::platform::Platform;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 提交记录
///
/// 一次用户批量提交的生命周期实体。`original_links` 在创建后不可变，
/// 检测完成后 `valid_links` 与失效链接表共同划分原始链接集合。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    /// 提交记录ID
    pub id: i64,
    /// 用户原始提交内容（去重后）
    pub original_links: Vec<String>,
    /// 待检测链接
    pub pending_links: Vec<String>,
    /// 检测完成后的有效链接
    pub valid_links: Vec<String>,
    /// 提交时选择的平台（空集表示检测全部）
    pub selected_platforms: Vec<Platform>,
    /// 生命周期状态
    pub status: SubmissionStatus,
    /// 总耗时（毫秒）
    pub total_duration: Option<i64>,
    /// 提交的链接总数（去重后）
    pub total_links: i32,
    /// 客户端IP
    pub client_ip: String,
    /// 浏览器
    pub browser: String,
    /// 操作系统
    pub os: String,
    /// 设备类型（desktop/mobile）
    pub device: String,
    /// 语言
    pub language: String,
    /// 创建时间
    pub created_at: DateTime<FixedOffset>,
    /// 更新时间
    pub updated_at: DateTime<FixedOffset>,
    /// 检测完成时间
    pub checked_at: Option<DateTime<FixedOffset>>,
}

/// 提交记录状态
///
/// pending -> checking 由调度器以原子CAS完成，防止重复执行；
/// checked 为终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// 待检测
    #[default]
    Pending,
    /// 检测中
    Checking,
    /// 已检测
    Checked,
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SubmissionStatus::Pending => write!(f, "pending"),
            SubmissionStatus::Checking => write!(f, "checking"),
            SubmissionStatus::Checked => write!(f, "checked"),
        }
    }
}

impl FromStr for SubmissionStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SubmissionStatus::Pending),
            "checking" => Ok(SubmissionStatus::Checking),
            "checked" => Ok(SubmissionStatus::Checked),
            _ => Err(()),
        }
    }
}

/// 提交来源的客户端信息
///
/// 由外部调用方解析填充，管线内只做透传
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    pub browser: String,
    pub os: String,
    pub device: String,
    pub language: String,
}

impl Submission {
    /// 创建一条待检测的提交记录
    pub fn new(
        original_links: Vec<String>,
        pending_links: Vec<String>,
        selected_platforms: Vec<Platform>,
        client_ip: String,
        device_info: DeviceInfo,
    ) -> Self {
        let total_links = original_links.len() as i32;
        Self {
            id: 0,
            original_links,
            pending_links,
            valid_links: Vec::new(),
            selected_platforms,
            status: SubmissionStatus::Pending,
            total_duration: None,
            total_links,
            client_ip,
            browser: device_info.browser,
            os: device_info.os,
            device: device_info.device,
            language: device_info.language,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
            checked_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            SubmissionStatus::Pending,
            SubmissionStatus::Checking,
            SubmissionStatus::Checked,
        ] {
            let parsed: SubmissionStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_new_submission_is_pending() {
        let submission = Submission::new(
            vec!["https://pan.quark.cn/s/abc".into()],
            vec!["https://pan.quark.cn/s/abc".into()],
            vec![],
            "127.0.0.1".into(),
            DeviceInfo::default(),
        );
        assert_eq!(submission.status, SubmissionStatus::Pending);
        assert_eq!(submission.total_links, 1);
        assert!(submission.valid_links.is_empty());
    }
}
