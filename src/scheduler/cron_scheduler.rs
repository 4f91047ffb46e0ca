// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scheduled_job::{JobStatus, ScheduledJob};
use crate::domain::repositories::scheduled_job_repository::ScheduledJobRepository;
use crate::scheduler::job_executor::JobExecutor;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use dashmap::DashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};
use uuid::Uuid;

/// 任务重载接口
///
/// 任务变更的HTTP处理器只依赖这个窄接口，而非调度器本体，
/// 以打断处理器与调度器的环形依赖
#[async_trait]
pub trait JobReloader: Send + Sync {
    /// 重新加载指定任务（更新/启停后调用）
    async fn reload_job(&self, job_id: i64) -> anyhow::Result<()>;
}

/// 定时任务调度器
///
/// 进程生命周期的守护对象：启动时装载所有 active 任务，
/// 条目按任务ID索引以支持原子的移除+重装；每分钟扫描一次
/// 到期任务，转为 expired 并解除注册。单进程运行，不做跨副本协调。
#[derive(Clone)]
pub struct CronScheduler {
    engine: JobScheduler,
    jobs: Arc<dyn ScheduledJobRepository>,
    executor: Arc<JobExecutor>,
    entries: Arc<DashMap<i64, Uuid>>,
}

impl CronScheduler {
    /// 创建调度器
    pub async fn new(
        jobs: Arc<dyn ScheduledJobRepository>,
        executor: Arc<JobExecutor>,
    ) -> anyhow::Result<Self> {
        let engine = JobScheduler::new().await?;
        Ok(Self {
            engine,
            jobs,
            executor,
            entries: Arc::new(DashMap::new()),
        })
    }

    /// 启动调度器
    ///
    /// 装载所有活跃任务、启动cron引擎与过期扫描
    pub async fn start(&self) -> anyhow::Result<()> {
        info!("Starting task scheduler...");

        let active = self.jobs.find_active().await?;
        let count = active.len();
        for job in active {
            if let Err(e) = self.install_job(&job).await {
                error!("Failed to install job {}: {}", job.id, e);
            }
        }

        self.engine.start().await?;

        let sweeper = self.clone();
        tokio::spawn(async move {
            sweeper.run_expiry_sweep().await;
        });

        info!("Task scheduler started with {} active jobs", count);
        Ok(())
    }

    /// 将任务装入cron引擎
    ///
    /// 已存在的条目先移除再重装
    pub async fn install_job(&self, job: &ScheduledJob) -> anyhow::Result<()> {
        let normalized = normalize_cron_expression(&job.cron_expression)?;

        self.remove_job(job.id).await;

        let this = self.clone();
        let job_id = job.id;
        let cron_job = Job::new_async(normalized.as_str(), move |_uuid, _lock| {
            let this = this.clone();
            Box::pin(async move {
                this.fire(job_id).await;
            })
        })?;

        let entry_id = self.engine.add(cron_job).await?;
        self.entries.insert(job_id, entry_id);

        let mut updated = job.clone();
        updated.next_run_at = next_run_time(&job.cron_expression);
        if let Err(e) = self.jobs.update(&updated).await {
            warn!("Failed to update next run time for job {}: {}", job_id, e);
        }

        info!(
            "Installed job {} with cron expression: {}, next run: {:?}",
            job_id, job.cron_expression, updated.next_run_at
        );
        Ok(())
    }

    /// 从cron引擎移除任务
    pub async fn remove_job(&self, job_id: i64) {
        if let Some((_, entry_id)) = self.entries.remove(&job_id) {
            if let Err(e) = self.engine.remove(&entry_id).await {
                warn!("Failed to remove job {} from scheduler: {}", job_id, e);
            } else {
                info!("Removed job {} from scheduler", job_id);
            }
        }
    }

    /// 一次触发
    async fn fire(&self, job_id: i64) {
        // 状态可能已变，重新读取
        let job = match self.jobs.find_by_id(job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                self.remove_job(job_id).await;
                return;
            }
            Err(e) => {
                error!("Failed to load job {}: {}", job_id, e);
                return;
            }
        };

        if job.status != JobStatus::Active {
            info!("Job {} is not active, removing from scheduler", job_id);
            self.remove_job(job_id).await;
            return;
        }

        let now: DateTime<FixedOffset> = Utc::now().into();
        if job.is_expired(now) {
            info!("Job {} has expired, stopping", job_id);
            let mut expired = job.clone();
            expired.status = JobStatus::Expired;
            if let Err(e) = self.jobs.update(&expired).await {
                warn!("Failed to mark job {} expired: {}", job_id, e);
            }
            self.remove_job(job_id).await;
            return;
        }

        if let Err(e) = self.executor.execute(&job).await {
            error!("Job {} execution failed: {}", job_id, e);
        }

        // 更新最后执行时间与下次执行时间
        if let Ok(Some(mut current)) = self.jobs.find_by_id(job_id).await {
            current.last_run_at = Some(Utc::now().into());
            current.next_run_at = next_run_time(&current.cron_expression);
            if let Err(e) = self.jobs.update(&current).await {
                warn!("Failed to update run times for job {}: {}", job_id, e);
            }
        }
    }

    /// 每分钟一次的过期扫描
    ///
    /// auto_destroy_at 已过的任务转为 expired 并解除注册；
    /// 粒度为一分钟，到期后最多还会触发一次
    async fn run_expiry_sweep(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match self.jobs.find_expired().await {
                Ok(expired) => {
                    for job in expired {
                        info!("Job {} passed auto destroy time, expiring", job.id);
                        let mut updated = job.clone();
                        updated.status = JobStatus::Expired;
                        if let Err(e) = self.jobs.update(&updated).await {
                            error!("Failed to expire job {}: {}", job.id, e);
                        }
                        self.remove_job(job.id).await;
                    }
                }
                Err(e) => error!("Failed to check expired jobs: {}", e),
            }
        }
    }
}

#[async_trait]
impl JobReloader for CronScheduler {
    async fn reload_job(&self, job_id: i64) -> anyhow::Result<()> {
        self.remove_job(job_id).await;
        if let Some(job) = self.jobs.find_by_id(job_id).await? {
            if job.status == JobStatus::Active {
                self.install_job(&job).await?;
            }
        }
        Ok(())
    }
}

/// 规范化cron表达式
///
/// 标准5位表达式补秒位，6/7位原样保留，`@daily` 等描述符
/// 展开为等价6位形式；最后整体校验一次
pub fn normalize_cron_expression(expr: &str) -> anyhow::Result<String> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        anyhow::bail!("empty cron expression");
    }

    let normalized = if let Some(descriptor) = trimmed.strip_prefix('@') {
        match descriptor.to_ascii_lowercase().as_str() {
            "yearly" | "annually" => "0 0 0 1 1 *".to_string(),
            "monthly" => "0 0 0 1 * *".to_string(),
            "weekly" => "0 0 0 * * SUN".to_string(),
            "daily" | "midnight" => "0 0 0 * * *".to_string(),
            "hourly" => "0 0 * * * *".to_string(),
            other => anyhow::bail!("unsupported cron descriptor: @{}", other),
        }
    } else {
        match trimmed.split_whitespace().count() {
            5 => format!("0 {}", trimmed),
            6 | 7 => trimmed.to_string(),
            count => anyhow::bail!("expected 5, 6 or 7 cron fields, got {}", count),
        }
    };

    cron::Schedule::from_str(&normalized)
        .map_err(|e| anyhow::anyhow!("invalid cron expression '{}': {}", expr, e))?;
    Ok(normalized)
}

/// 计算表达式的下次触发时间
pub fn next_run_time(expr: &str) -> Option<DateTime<FixedOffset>> {
    let normalized = normalize_cron_expression(expr).ok()?;
    let schedule = cron::Schedule::from_str(&normalized).ok()?;
    schedule.upcoming(Utc).next().map(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_five_field_expression_gains_seconds() {
        assert_eq!(
            normalize_cron_expression("*/5 * * * *").unwrap(),
            "0 */5 * * * *"
        );
    }

    #[test]
    fn test_six_field_expression_passthrough() {
        assert_eq!(
            normalize_cron_expression("*/10 * * * * *").unwrap(),
            "*/10 * * * * *"
        );
    }

    #[test]
    fn test_descriptors() {
        assert_eq!(normalize_cron_expression("@daily").unwrap(), "0 0 0 * * *");
        assert_eq!(normalize_cron_expression("@hourly").unwrap(), "0 0 * * * *");
        assert!(normalize_cron_expression("@fortnightly").is_err());
    }

    #[test]
    fn test_invalid_expressions_rejected() {
        assert!(normalize_cron_expression("").is_err());
        assert!(normalize_cron_expression("* *").is_err());
        assert!(normalize_cron_expression("99 * * * * *").is_err());
    }

    #[test]
    fn test_next_run_time_is_in_future() {
        let next = next_run_time("*/10 * * * * *").unwrap();
        let now: DateTime<FixedOffset> = Utc::now().into();
        assert!(next > now);
        // 10秒步长的表达式，下次触发不会超过10秒之后
        assert!((next - now).num_seconds() <= 10);
    }
}
