// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::setting::Setting;
use crate::domain::repositories::settings_repository::SettingsRepository;
use crate::domain::repositories::RepositoryError;
use crate::infrastructure::database::entities::setting;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter, Set,
};
use std::sync::Arc;

/// 设置仓库实现
#[derive(Clone)]
pub struct SettingsRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl SettingsRepositoryImpl {
    /// 创建新的设置仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<setting::Model> for Setting {
    fn from(model: setting::Model) -> Self {
        Self {
            id: model.id,
            key: model.key,
            value: model.value,
            category: model.category.unwrap_or_default(),
            description: model.description.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl SettingsRepository for SettingsRepositoryImpl {
    async fn find_by_key(&self, key: &str) -> Result<Option<Setting>, RepositoryError> {
        let model = setting::Entity::find()
            .filter(setting::Column::Key.eq(key))
            .one(self.db.as_ref())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn upsert(&self, value: &Setting) -> Result<(), RepositoryError> {
        let existing = setting::Entity::find()
            .filter(setting::Column::Key.eq(value.key.as_str()))
            .one(self.db.as_ref())
            .await?;

        match existing {
            Some(model) => {
                let mut active: setting::ActiveModel = model.into();
                active.value = Set(value.value.clone());
                active.category = Set(Some(value.category.clone()));
                active.description = Set(Some(value.description.clone()));
                active.updated_at = Set(Utc::now().into());
                active.update(self.db.as_ref()).await?;
            }
            None => {
                let active = setting::ActiveModel {
                    id: NotSet,
                    key: Set(value.key.clone()),
                    value: Set(value.value.clone()),
                    category: Set(Some(value.category.clone())),
                    description: Set(Some(value.description.clone())),
                    created_at: Set(Utc::now().into()),
                    updated_at: Set(Utc::now().into()),
                };
                active.insert(self.db.as_ref()).await?;
            }
        }
        Ok(())
    }

    async fn list_by_category(&self, category: &str) -> Result<Vec<Setting>, RepositoryError> {
        let models = setting::Entity::find()
            .filter(setting::Column::Category.eq(category))
            .all(self.db.as_ref())
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }
}
