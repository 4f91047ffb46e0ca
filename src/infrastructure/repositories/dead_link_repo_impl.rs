// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::dead_link::DeadLink;
use crate::domain::models::platform::Platform;
use crate::domain::repositories::dead_link_repository::DeadLinkRepository;
use crate::domain::repositories::RepositoryError;
use crate::infrastructure::database::entities::invalid_link;
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;

/// 失效链接仓库实现
#[derive(Clone)]
pub struct DeadLinkRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl DeadLinkRepositoryImpl {
    /// 创建新的失效链接仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<invalid_link::Model> for DeadLink {
    fn from(model: invalid_link::Model) -> Self {
        Self {
            id: model.id,
            link: model.link,
            platform: model.platform.parse().unwrap_or_default(),
            failure_reason: model.failure_reason.unwrap_or_default(),
            check_duration: model.check_duration,
            rate_limited: model.is_rate_limited,
            submission_id: model.submission_id,
            created_at: model.created_at,
        }
    }
}

#[async_trait]
impl DeadLinkRepository for DeadLinkRepositoryImpl {
    async fn find_by_links(&self, links: &[String]) -> Result<Vec<DeadLink>, RepositoryError> {
        if links.is_empty() {
            return Ok(Vec::new());
        }
        let models = invalid_link::Entity::find()
            .filter(invalid_link::Column::Link.is_in(links.iter().cloned()))
            .all(self.db.as_ref())
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn exists(&self, link: &str) -> Result<bool, RepositoryError> {
        // 限流记录不算确认失效，不参与短路
        let count = invalid_link::Entity::find()
            .filter(invalid_link::Column::Link.eq(link))
            .filter(invalid_link::Column::IsRateLimited.eq(false))
            .count(self.db.as_ref())
            .await?;
        Ok(count > 0)
    }

    async fn create_or_update(&self, dead_link: &DeadLink) -> Result<(), RepositoryError> {
        let existing = invalid_link::Entity::find()
            .filter(invalid_link::Column::Link.eq(dead_link.link.as_str()))
            .one(self.db.as_ref())
            .await?;

        match existing {
            Some(model) => {
                let mut active: invalid_link::ActiveModel = model.into();
                active.platform = Set(dead_link.platform.to_string());
                active.failure_reason = Set(Some(dead_link.failure_reason.clone()));
                active.check_duration = Set(dead_link.check_duration);
                active.is_rate_limited = Set(dead_link.rate_limited);
                if dead_link.submission_id.is_some() {
                    active.submission_id = Set(dead_link.submission_id);
                }
                active.update(self.db.as_ref()).await?;
            }
            None => {
                let active = invalid_link::ActiveModel {
                    id: NotSet,
                    link: Set(dead_link.link.clone()),
                    platform: Set(dead_link.platform.to_string()),
                    failure_reason: Set(Some(dead_link.failure_reason.clone())),
                    check_duration: Set(dead_link.check_duration),
                    is_rate_limited: Set(dead_link.rate_limited),
                    submission_id: Set(dead_link.submission_id),
                    created_at: Set(dead_link.created_at),
                };
                active.insert(self.db.as_ref()).await?;
            }
        }
        Ok(())
    }

    async fn list_rate_limited(
        &self,
        page: u64,
        page_size: u64,
        platform: Option<Platform>,
    ) -> Result<(Vec<DeadLink>, u64), RepositoryError> {
        let mut query = invalid_link::Entity::find()
            .filter(invalid_link::Column::IsRateLimited.eq(true))
            .order_by_desc(invalid_link::Column::CreatedAt);
        if let Some(platform) = platform {
            query = query.filter(invalid_link::Column::Platform.eq(platform.to_string()));
        }

        let paginator = query.paginate(self.db.as_ref(), page_size.max(1));
        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((models.into_iter().map(Into::into).collect(), total))
    }

    async fn delete_rate_limited(&self) -> Result<u64, RepositoryError> {
        let result = invalid_link::Entity::delete_many()
            .filter(invalid_link::Column::IsRateLimited.eq(true))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }
}
