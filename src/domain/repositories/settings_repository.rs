// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::setting::Setting;
use crate::domain::repositories::RepositoryError;
use async_trait::async_trait;

/// 设置仓库特质
///
/// 检测管线只读取三类键：`platform_rate_config_<platform>`、
/// `redis_config` 和内部覆盖项
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// 根据键查找设置项
    async fn find_by_key(&self, key: &str) -> Result<Option<Setting>, RepositoryError>;

    /// 写入或更新设置项
    async fn upsert(&self, setting: &Setting) -> Result<(), RepositoryError>;

    /// 按分类列出设置项
    async fn list_by_category(&self, category: &str) -> Result<Vec<Setting>, RepositoryError>;
}
