// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::dispatcher::Dispatcher;
use crate::application::submission_service::{CheckLinksRequest, SubmissionService};
use crate::domain::models::scheduled_job::{ExecutionStatus, JobExecution, ScheduledJob};
use crate::domain::models::submission::DeviceInfo;
use crate::domain::repositories::scheduled_job_repository::JobExecutionRepository;
use crate::domain::repositories::RepositoryError;
use crate::scheduler::http_command::{self, CommandError};
use crate::scheduler::transform::{self, TransformError};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info};

/// 任务执行错误类型
#[derive(Error, Debug)]
pub enum JobError {
    #[error("curl execution failed: {0}")]
    Command(#[from] CommandError),
    #[error("data transformation failed: {0}")]
    Transform(#[from] TransformError),
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("link check failed: {0}")]
    Dispatch(String),
}

/// 任务执行器
///
/// 一次任务触发 = 执行存储的HTTP命令取回响应体，跑JS转换脚本
/// 得到候选链接列表，再以客户端标识 "system"、不带平台过滤地
/// 走标准检测管线，最后把统计写回执行记录。
pub struct JobExecutor {
    executions: Arc<dyn JobExecutionRepository>,
    submission_service: Arc<SubmissionService>,
    dispatcher: Arc<Dispatcher>,
    client: reqwest::Client,
}

impl JobExecutor {
    /// 创建任务执行器
    pub fn new(
        executions: Arc<dyn JobExecutionRepository>,
        submission_service: Arc<SubmissionService>,
        dispatcher: Arc<Dispatcher>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            executions,
            submission_service,
            dispatcher,
            client,
        }
    }

    /// 执行一次任务并记录执行结果
    pub async fn execute(&self, job: &ScheduledJob) -> Result<(), JobError> {
        info!("Executing job {}: {}", job.id, job.name);

        let mut execution = self
            .executions
            .create(&JobExecution {
                id: 0,
                job_id: job.id,
                status: ExecutionStatus::Running,
                started_at: Utc::now().into(),
                finished_at: None,
                execution_duration: None,
                links_count: 0,
                checked_count: 0,
                valid_count: 0,
                invalid_count: 0,
                error_message: None,
            })
            .await?;

        let start = Instant::now();
        let result = self.run(job, &mut execution).await;

        execution.execution_duration = Some(start.elapsed().as_millis() as i64);
        execution.finished_at = Some(Utc::now().into());
        match &result {
            Ok(()) => execution.status = ExecutionStatus::Success,
            Err(e) => {
                execution.status = ExecutionStatus::Failed;
                execution.error_message = Some(e.to_string());
                error!("Job {} failed: {}", job.id, e);
            }
        }

        if let Err(e) = self.executions.update(&execution).await {
            error!("Failed to update execution record for job {}: {}", job.id, e);
        }
        result
    }

    async fn run(&self, job: &ScheduledJob, execution: &mut JobExecution) -> Result<(), JobError> {
        // 1. 执行HTTP命令获取数据
        let command = http_command::parse_curl_command(&job.http_command)?;
        let raw_data = http_command::execute(&self.client, &command).await?;

        // 2. 执行转换脚本得到链接列表
        let links = transform::transform_links(&raw_data, &job.transform_script)?;
        execution.links_count = links.len() as i32;
        if links.is_empty() {
            info!("Job {}: no links found, completing execution", job.id);
            return Ok(());
        }

        // 3. 以系统身份创建提交记录，不做平台过滤
        let request = CheckLinksRequest {
            links,
            selected_platforms: Vec::new(),
        };
        let response = self
            .submission_service
            .create_submission(&request, "system", DeviceInfo::default())
            .await?;
        if response.submission_id == 0 {
            info!("Job {}: no recognizable links, completing execution", job.id);
            return Ok(());
        }

        // 4. 走标准检测管线
        let record = self
            .dispatcher
            .dispatch(response.submission_id, response.pending_links, Vec::new())
            .await
            .map_err(|e| JobError::Dispatch(e.to_string()))?;

        // 5. 更新执行统计
        execution.checked_count = record.original_links.len() as i32;
        execution.valid_count = record.valid_links.len() as i32;
        let invalid = self
            .submission_service
            .dead_links_for_submission(record.id)
            .await
            .unwrap_or_default();
        execution.invalid_count = invalid.len() as i32;

        info!(
            "Job {} executed: {} links checked, {} valid, {} invalid",
            job.id, execution.checked_count, execution.valid_count, execution.invalid_count
        );
        Ok(())
    }

    /// 测试任务配置：执行命令与脚本但不创建提交记录
    pub async fn test_run(
        &self,
        http_command: &str,
        transform_script: &str,
    ) -> Result<Vec<String>, JobError> {
        let command = http_command::parse_curl_command(http_command)?;
        let raw_data = http_command::execute(&self.client, &command).await?;
        Ok(transform::transform_links(&raw_data, transform_script)?)
    }
}

#[cfg(test)]
#[path = "job_executor_test.rs"]
mod tests;
