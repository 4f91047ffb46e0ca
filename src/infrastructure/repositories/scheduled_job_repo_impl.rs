// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scheduled_job::{JobStatus, ScheduledJob};
use crate::domain::repositories::scheduled_job_repository::ScheduledJobRepository;
use crate::domain::repositories::RepositoryError;
use crate::infrastructure::database::entities::scheduled_task;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, PaginatorTrait,
    QueryFilter, Set,
};
use std::sync::Arc;

/// 定时任务仓库实现
#[derive(Clone)]
pub struct ScheduledJobRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl ScheduledJobRepositoryImpl {
    /// 创建新的定时任务仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<scheduled_task::Model> for ScheduledJob {
    fn from(model: scheduled_task::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description.unwrap_or_default(),
            tags: model
                .tags
                .and_then(|v| serde_json::from_value(v).ok())
                .unwrap_or_default(),
            http_command: model.http_command,
            transform_script: model.transform_script.unwrap_or_default(),
            cron_expression: model.cron_expression,
            status: model.status.parse().unwrap_or_default(),
            auto_destroy_at: model.auto_destroy_at,
            last_run_at: model.last_run_at,
            next_run_at: model.next_run_at,
            created_at: model.created_at,
        }
    }
}

fn to_active_model(job: &ScheduledJob) -> scheduled_task::ActiveModel {
    scheduled_task::ActiveModel {
        id: if job.id > 0 { Set(job.id) } else { NotSet },
        name: Set(job.name.clone()),
        description: Set(Some(job.description.clone())),
        tags: Set(Some(serde_json::json!(job.tags))),
        http_command: Set(job.http_command.clone()),
        transform_script: Set(Some(job.transform_script.clone())),
        cron_expression: Set(job.cron_expression.clone()),
        status: Set(job.status.to_string()),
        auto_destroy_at: Set(job.auto_destroy_at),
        last_run_at: Set(job.last_run_at),
        next_run_at: Set(job.next_run_at),
        created_at: Set(job.created_at),
        updated_at: Set(Utc::now().into()),
    }
}

#[async_trait]
impl ScheduledJobRepository for ScheduledJobRepositoryImpl {
    async fn create(&self, job: &ScheduledJob) -> Result<ScheduledJob, RepositoryError> {
        let inserted = to_active_model(job).insert(self.db.as_ref()).await?;
        Ok(inserted.into())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ScheduledJob>, RepositoryError> {
        let model = scheduled_task::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn update(&self, job: &ScheduledJob) -> Result<ScheduledJob, RepositoryError> {
        if job.id <= 0 {
            return Err(RepositoryError::NotFound);
        }
        let updated = to_active_model(job).update(self.db.as_ref()).await?;
        Ok(updated.into())
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        scheduled_task::Entity::delete_by_id(id)
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }

    async fn exists_by_name(
        &self,
        name: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, RepositoryError> {
        let mut query =
            scheduled_task::Entity::find().filter(scheduled_task::Column::Name.eq(name));
        if let Some(id) = exclude_id {
            query = query.filter(scheduled_task::Column::Id.ne(id));
        }
        let count = query.count(self.db.as_ref()).await?;
        Ok(count > 0)
    }

    async fn find_active(&self) -> Result<Vec<ScheduledJob>, RepositoryError> {
        let models = scheduled_task::Entity::find()
            .filter(scheduled_task::Column::Status.eq(JobStatus::Active.to_string()))
            .all(self.db.as_ref())
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn find_expired(&self) -> Result<Vec<ScheduledJob>, RepositoryError> {
        let now: chrono::DateTime<chrono::FixedOffset> = Utc::now().into();
        let models = scheduled_task::Entity::find()
            .filter(scheduled_task::Column::Status.eq(JobStatus::Active.to_string()))
            .filter(scheduled_task::Column::AutoDestroyAt.is_not_null())
            .filter(scheduled_task::Column::AutoDestroyAt.lte(now))
            .all(self.db.as_ref())
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }
}
