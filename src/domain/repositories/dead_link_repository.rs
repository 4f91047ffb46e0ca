// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::dead_link::DeadLink;
use crate::domain::models::platform::Platform;
use crate::domain::repositories::RepositoryError;
use async_trait::async_trait;

/// 失效链接仓库特质
///
/// 已知失效链接的持久化负缓存访问接口
#[async_trait]
pub trait DeadLinkRepository: Send + Sync {
    /// 批量查询链接对应的失效记录
    async fn find_by_links(&self, links: &[String]) -> Result<Vec<DeadLink>, RepositoryError>;

    /// 检查链接是否为确认失效
    ///
    /// 仅当记录存在且 `rate_limited=false` 时返回 true。
    /// 限流产生的历史失败不能作为短路依据，必须重新探测。
    async fn exists(&self, link: &str) -> Result<bool, RepositoryError>;

    /// 按链接upsert一条失效记录
    ///
    /// 已存在时刷新失败原因、耗时、限流标记和来源提交ID
    async fn create_or_update(&self, dead_link: &DeadLink) -> Result<(), RepositoryError>;

    /// 分页查询被限流的记录
    async fn list_rate_limited(
        &self,
        page: u64,
        page_size: u64,
        platform: Option<Platform>,
    ) -> Result<(Vec<DeadLink>, u64), RepositoryError>;

    /// 删除所有被限流的记录
    async fn delete_rate_limited(&self) -> Result<u64, RepositoryError>;
}
