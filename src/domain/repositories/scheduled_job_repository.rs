// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scheduled_job::{JobExecution, ScheduledJob};
use crate::domain::repositories::RepositoryError;
use async_trait::async_trait;

/// 定时任务仓库特质
#[async_trait]
pub trait ScheduledJobRepository: Send + Sync {
    /// 创建任务
    async fn create(&self, job: &ScheduledJob) -> Result<ScheduledJob, RepositoryError>;

    /// 根据ID查找任务
    async fn find_by_id(&self, id: i64) -> Result<Option<ScheduledJob>, RepositoryError>;

    /// 更新任务
    async fn update(&self, job: &ScheduledJob) -> Result<ScheduledJob, RepositoryError>;

    /// 删除任务
    async fn delete(&self, id: i64) -> Result<(), RepositoryError>;

    /// 检查任务名称是否已被占用（可排除指定ID）
    async fn exists_by_name(
        &self,
        name: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, RepositoryError>;

    /// 获取所有启用中的任务
    async fn find_active(&self) -> Result<Vec<ScheduledJob>, RepositoryError>;

    /// 获取所有已到自动销毁时间但仍为 active 的任务
    async fn find_expired(&self) -> Result<Vec<ScheduledJob>, RepositoryError>;
}

/// 任务执行记录仓库特质
#[async_trait]
pub trait JobExecutionRepository: Send + Sync {
    /// 创建执行记录，返回带ID的记录
    async fn create(&self, execution: &JobExecution) -> Result<JobExecution, RepositoryError>;

    /// 更新执行记录
    async fn update(&self, execution: &JobExecution) -> Result<(), RepositoryError>;

    /// 分页查询某任务的执行历史
    async fn list_by_job_id(
        &self,
        job_id: i64,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<JobExecution>, u64), RepositoryError>;
}
