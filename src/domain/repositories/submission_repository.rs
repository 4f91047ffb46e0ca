// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::submission::Submission;
use crate::domain::repositories::RepositoryError;
use async_trait::async_trait;

/// 提交记录仓库特质
///
/// 定义提交记录的数据访问接口
#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    /// 创建提交记录，返回带ID的记录
    async fn create(&self, submission: &Submission) -> Result<Submission, RepositoryError>;

    /// 根据ID查找提交记录
    async fn find_by_id(&self, id: i64) -> Result<Option<Submission>, RepositoryError>;

    /// 更新提交记录
    async fn update(&self, submission: &Submission) -> Result<Submission, RepositoryError>;

    /// 原子地将状态从 pending 更新为 checking
    ///
    /// 这是防止同一提交被重复执行的唯一持久化闸门。
    ///
    /// # 返回值
    ///
    /// 受影响的行数：1 表示获得所有权，0 表示已被其他执行者占用
    async fn update_status_to_checking(&self, id: i64) -> Result<u64, RepositoryError>;

    /// 获取待检测的提交记录
    async fn find_pending(&self, limit: u64) -> Result<Vec<Submission>, RepositoryError>;
}
