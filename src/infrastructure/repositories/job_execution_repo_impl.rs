// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scheduled_job::JobExecution;
use crate::domain::repositories::scheduled_job_repository::JobExecutionRepository;
use crate::domain::repositories::RepositoryError;
use crate::infrastructure::database::entities::task_execution;
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;

/// 任务执行记录仓库实现
#[derive(Clone)]
pub struct JobExecutionRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl JobExecutionRepositoryImpl {
    /// 创建新的执行记录仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<task_execution::Model> for JobExecution {
    fn from(model: task_execution::Model) -> Self {
        Self {
            id: model.id,
            job_id: model.task_id,
            status: model.status.parse().unwrap_or_default(),
            started_at: model.started_at,
            finished_at: model.finished_at,
            execution_duration: model.execution_duration,
            links_count: model.links_count,
            checked_count: model.checked_count,
            valid_count: model.valid_count,
            invalid_count: model.invalid_count,
            error_message: model.error_message,
        }
    }
}

fn to_active_model(execution: &JobExecution) -> task_execution::ActiveModel {
    task_execution::ActiveModel {
        id: if execution.id > 0 {
            Set(execution.id)
        } else {
            NotSet
        },
        task_id: Set(execution.job_id),
        status: Set(execution.status.to_string()),
        started_at: Set(execution.started_at),
        finished_at: Set(execution.finished_at),
        execution_duration: Set(execution.execution_duration),
        links_count: Set(execution.links_count),
        checked_count: Set(execution.checked_count),
        valid_count: Set(execution.valid_count),
        invalid_count: Set(execution.invalid_count),
        error_message: Set(execution.error_message.clone()),
    }
}

#[async_trait]
impl JobExecutionRepository for JobExecutionRepositoryImpl {
    async fn create(&self, execution: &JobExecution) -> Result<JobExecution, RepositoryError> {
        let inserted = to_active_model(execution).insert(self.db.as_ref()).await?;
        Ok(inserted.into())
    }

    async fn update(&self, execution: &JobExecution) -> Result<(), RepositoryError> {
        if execution.id <= 0 {
            return Err(RepositoryError::NotFound);
        }
        to_active_model(execution).update(self.db.as_ref()).await?;
        Ok(())
    }

    async fn list_by_job_id(
        &self,
        job_id: i64,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<JobExecution>, u64), RepositoryError> {
        let paginator = task_execution::Entity::find()
            .filter(task_execution::Column::TaskId.eq(job_id))
            .order_by_desc(task_execution::Column::StartedAt)
            .paginate(self.db.as_ref(), page_size.max(1));
        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((models.into_iter().map(Into::into).collect(), total))
    }
}
