// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::platform::Platform;
use crate::domain::models::submission::{Submission, SubmissionStatus};
use crate::domain::repositories::submission_repository::SubmissionRepository;
use crate::domain::repositories::RepositoryError;
use crate::infrastructure::database::entities::submission_record;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;

/// 提交记录仓库实现
///
/// 基于SeaORM实现的提交记录数据访问层
#[derive(Clone)]
pub struct SubmissionRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl SubmissionRepositoryImpl {
    /// 创建新的提交记录仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

fn json_string_array(value: Option<serde_json::Value>) -> Vec<String> {
    value
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

fn json_platform_array(value: Option<serde_json::Value>) -> Vec<Platform> {
    value
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

impl From<submission_record::Model> for Submission {
    fn from(model: submission_record::Model) -> Self {
        Self {
            id: model.id,
            original_links: json_string_array(Some(model.original_links)),
            pending_links: json_string_array(model.pending_links),
            valid_links: json_string_array(model.valid_links),
            selected_platforms: json_platform_array(model.selected_platforms),
            status: model.status.parse().unwrap_or_default(),
            total_duration: model.total_duration,
            total_links: model.total_links,
            client_ip: model.client_ip.unwrap_or_default(),
            browser: model.browser.unwrap_or_default(),
            os: model.os.unwrap_or_default(),
            device: model.device.unwrap_or_default(),
            language: model.language.unwrap_or_default(),
            created_at: model.created_at,
            updated_at: model.updated_at,
            checked_at: model.checked_at,
        }
    }
}

fn to_active_model(submission: &Submission) -> submission_record::ActiveModel {
    submission_record::ActiveModel {
        id: if submission.id > 0 {
            Set(submission.id)
        } else {
            NotSet
        },
        original_links: Set(serde_json::json!(submission.original_links)),
        pending_links: Set(Some(serde_json::json!(submission.pending_links))),
        valid_links: Set(Some(serde_json::json!(submission.valid_links))),
        selected_platforms: Set(Some(serde_json::json!(submission.selected_platforms))),
        status: Set(submission.status.to_string()),
        total_duration: Set(submission.total_duration),
        total_links: Set(submission.total_links),
        client_ip: Set(Some(submission.client_ip.clone())),
        browser: Set(Some(submission.browser.clone())),
        os: Set(Some(submission.os.clone())),
        device: Set(Some(submission.device.clone())),
        language: Set(Some(submission.language.clone())),
        created_at: Set(submission.created_at),
        updated_at: Set(Utc::now().into()),
        checked_at: Set(submission.checked_at),
    }
}

#[async_trait]
impl SubmissionRepository for SubmissionRepositoryImpl {
    async fn create(&self, submission: &Submission) -> Result<Submission, RepositoryError> {
        let model = to_active_model(submission);
        let inserted = model.insert(self.db.as_ref()).await?;
        Ok(inserted.into())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Submission>, RepositoryError> {
        let model = submission_record::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn update(&self, submission: &Submission) -> Result<Submission, RepositoryError> {
        if submission.id <= 0 {
            return Err(RepositoryError::NotFound);
        }
        let model = to_active_model(submission);
        let updated = model.update(self.db.as_ref()).await?;
        Ok(updated.into())
    }

    async fn update_status_to_checking(&self, id: i64) -> Result<u64, RepositoryError> {
        // WHERE id=? AND status='pending' 的条件更新即是CAS本身，
        // 由数据库串行化，保证同一提交至多一个执行者
        let result = submission_record::Entity::update_many()
            .col_expr(
                submission_record::Column::Status,
                Expr::value(SubmissionStatus::Checking.to_string()),
            )
            .col_expr(
                submission_record::Column::UpdatedAt,
                Expr::value(chrono::DateTime::<chrono::FixedOffset>::from(Utc::now())),
            )
            .filter(submission_record::Column::Id.eq(id))
            .filter(submission_record::Column::Status.eq(SubmissionStatus::Pending.to_string()))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }

    async fn find_pending(&self, limit: u64) -> Result<Vec<Submission>, RepositoryError> {
        let models = submission_record::Entity::find()
            .filter(submission_record::Column::Status.eq(SubmissionStatus::Pending.to_string()))
            .order_by_asc(submission_record::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }
}
