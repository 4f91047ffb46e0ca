// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 定时任务
///
/// 存储的链接采集任务定义：HTTP命令 + JS转换脚本 + cron表达式
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledJob {
    /// 任务ID
    pub id: i64,
    /// 任务名称（唯一）
    pub name: String,
    /// 任务描述
    pub description: String,
    /// 标签
    pub tags: Vec<String>,
    /// HTTP命令（curl风格的请求配方）
    pub http_command: String,
    /// JavaScript转换脚本
    pub transform_script: String,
    /// cron表达式（支持5位、6位和 @daily 等描述符）
    pub cron_expression: String,
    /// 任务状态
    pub status: JobStatus,
    /// 自动销毁时间
    pub auto_destroy_at: Option<DateTime<FixedOffset>>,
    /// 上次执行时间
    pub last_run_at: Option<DateTime<FixedOffset>>,
    /// 下次执行时间
    pub next_run_at: Option<DateTime<FixedOffset>>,
    /// 创建时间
    pub created_at: DateTime<FixedOffset>,
}

/// 定时任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// 启用中
    Active,
    /// 已停止
    #[default]
    Stopped,
    /// 已过期
    Expired,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobStatus::Active => write!(f, "active"),
            JobStatus::Stopped => write!(f, "stopped"),
            JobStatus::Expired => write!(f, "expired"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(JobStatus::Active),
            "stopped" => Ok(JobStatus::Stopped),
            "expired" => Ok(JobStatus::Expired),
            _ => Err(()),
        }
    }
}

impl ScheduledJob {
    /// 判断任务是否已到自动销毁时间
    pub fn is_expired(&self, now: DateTime<FixedOffset>) -> bool {
        self.auto_destroy_at.is_some_and(|at| at <= now)
    }
}

/// 任务执行记录
///
/// 定时任务的一次运行及其统计
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobExecution {
    /// 执行记录ID
    pub id: i64,
    /// 所属任务ID
    pub job_id: i64,
    /// 执行状态
    pub status: ExecutionStatus,
    /// 开始时间
    pub started_at: DateTime<FixedOffset>,
    /// 结束时间
    pub finished_at: Option<DateTime<FixedOffset>>,
    /// 执行耗时（毫秒）
    pub execution_duration: Option<i64>,
    /// 采集到的链接数量
    pub links_count: i32,
    /// 实际检测的链接数量
    pub checked_count: i32,
    /// 有效链接数量
    pub valid_count: i32,
    /// 无效链接数量
    pub invalid_count: i32,
    /// 错误信息
    pub error_message: Option<String>,
}

/// 任务执行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// 执行中
    #[default]
    Running,
    /// 执行成功
    Success,
    /// 执行失败
    Failed,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExecutionStatus::Running => write!(f, "running"),
            ExecutionStatus::Success => write!(f, "success"),
            ExecutionStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for ExecutionStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(ExecutionStatus::Running),
            "success" => Ok(ExecutionStatus::Success),
            "failed" => Ok(ExecutionStatus::Failed),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_job_expiry() {
        let now: DateTime<FixedOffset> = Utc::now().into();
        let job = ScheduledJob {
            id: 1,
            name: "test".into(),
            description: String::new(),
            tags: vec![],
            http_command: "curl https://example.com".into(),
            transform_script: String::new(),
            cron_expression: "*/10 * * * * *".into(),
            status: JobStatus::Active,
            auto_destroy_at: Some(now - Duration::seconds(1)),
            last_run_at: None,
            next_run_at: None,
            created_at: now,
        };
        assert!(job.is_expired(now));

        let mut alive = job.clone();
        alive.auto_destroy_at = Some(now + Duration::hours(1));
        assert!(!alive.is_expired(now));

        let mut forever = job;
        forever.auto_destroy_at = None;
        assert!(!forever.is_expired(now));
    }
}
