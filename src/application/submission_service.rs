// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::platform::Platform;
use crate::domain::models::submission::{DeviceInfo, Submission};
use crate::domain::repositories::dead_link_repository::DeadLinkRepository;
use crate::domain::repositories::submission_repository::SubmissionRepository;
use crate::domain::repositories::RepositoryError;
use crate::utils::link_parser;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// 检测链接请求
#[derive(Debug, Clone, Deserialize)]
pub struct CheckLinksRequest {
    /// 原始链接列表
    pub links: Vec<String>,
    /// 选择的平台（多选），空集等同于检测所有链接
    #[serde(default)]
    pub selected_platforms: Vec<Platform>,
}

/// 检测链接响应
#[derive(Debug, Clone, Serialize)]
pub struct CheckLinksResponse {
    /// 提交记录ID（没有可识别链接时为0）
    pub submission_id: i64,
    /// 已知失效链接
    pub invalid_links: Vec<String>,
    /// 待检测链接
    pub pending_links: Vec<String>,
    /// 有效链接（即时检测后填充）
    pub valid_links: Vec<String>,
    /// 总耗时（即时检测后填充）
    pub total_duration: Option<i64>,
    /// 不规范链接数量
    pub invalid_format_count: usize,
    /// 重复链接数量
    pub duplicate_count: usize,
}

/// 提交入口服务
///
/// 去重、解析、预过滤已确认失效的链接并落库一条 pending 提交。
/// 预过滤只排除 `rate_limited=false` 的失效记录，被限流的链接
/// 保留在待检测列表中等待重新探测。
pub struct SubmissionService {
    submissions: Arc<dyn SubmissionRepository>,
    dead_links: Arc<dyn DeadLinkRepository>,
}

impl SubmissionService {
    /// 创建提交入口服务
    pub fn new(
        submissions: Arc<dyn SubmissionRepository>,
        dead_links: Arc<dyn DeadLinkRepository>,
    ) -> Self {
        Self {
            submissions,
            dead_links,
        }
    }

    /// 接收一批原始链接，创建提交记录
    pub async fn create_submission(
        &self,
        request: &CheckLinksRequest,
        client_ip: &str,
        device_info: DeviceInfo,
    ) -> Result<CheckLinksResponse, RepositoryError> {
        // 1. 去除空白项并统计重复
        let mut seen = HashSet::new();
        let mut original_links = Vec::new();
        let mut unique_links = Vec::new();
        let mut duplicate_count = 0usize;

        for link in &request.links {
            let trimmed = link.trim();
            if trimmed.is_empty() {
                continue;
            }
            original_links.push(trimmed.to_string());
            if seen.insert(trimmed.to_string()) {
                unique_links.push(trimmed.to_string());
            } else {
                duplicate_count += 1;
            }
        }

        // 2. 解析链接识别平台
        let link_infos = link_parser::parse_links(&unique_links);
        let invalid_format_count = unique_links.len() - link_infos.len();

        if link_infos.is_empty() {
            return Ok(CheckLinksResponse {
                submission_id: 0,
                invalid_links: Vec::new(),
                pending_links: Vec::new(),
                valid_links: Vec::new(),
                total_duration: None,
                invalid_format_count,
                duplicate_count,
            });
        }

        // 3. 查失效链接表，只有确认失效（非限流）的记录参与预过滤
        let canonical_links: Vec<String> =
            link_infos.iter().map(|info| info.canonical.clone()).collect();
        let dead_rows = self.dead_links.find_by_links(&canonical_links).await?;
        let confirmed_dead: HashSet<String> = dead_rows
            .iter()
            .filter(|row| !row.rate_limited)
            .map(|row| row.link.clone())
            .collect();

        let invalid_links: Vec<String> = confirmed_dead.iter().cloned().collect();
        let pending_links: Vec<String> = canonical_links
            .iter()
            .filter(|link| !confirmed_dead.contains(*link))
            .cloned()
            .collect();

        // 4. 创建提交记录
        let submission = Submission::new(
            original_links,
            pending_links.clone(),
            request.selected_platforms.clone(),
            client_ip.to_string(),
            device_info,
        );
        let created = self.submissions.create(&submission).await?;

        Ok(CheckLinksResponse {
            submission_id: created.id,
            invalid_links,
            pending_links,
            valid_links: Vec::new(),
            total_duration: None,
            invalid_format_count,
            duplicate_count,
        })
    }

    /// 获取提交记录
    pub async fn get_submission(&self, id: i64) -> Result<Option<Submission>, RepositoryError> {
        self.submissions.find_by_id(id).await
    }

    /// 查询某提交相关的失效链接
    pub async fn dead_links_for_submission(
        &self,
        id: i64,
    ) -> Result<Vec<String>, RepositoryError> {
        let Some(record) = self.submissions.find_by_id(id).await? else {
            return Err(RepositoryError::NotFound);
        };

        let mut all_links = Vec::new();
        for raw in &record.original_links {
            all_links.push(link_parser::parse_link(raw).canonical);
        }
        all_links.extend(record.pending_links.iter().cloned());
        all_links.extend(record.valid_links.iter().cloned());

        let rows = self.dead_links.find_by_links(&all_links).await?;
        Ok(rows.into_iter().map(|row| row.link).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::dead_link::DeadLink;
    use crate::domain::models::submission::SubmissionStatus;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicI64, Ordering};
    use tokio::sync::Mutex;

    struct RecordingSubmissions {
        last: Mutex<Option<Submission>>,
        next_id: AtomicI64,
    }

    #[async_trait]
    impl SubmissionRepository for RecordingSubmissions {
        async fn create(&self, submission: &Submission) -> Result<Submission, RepositoryError> {
            let mut stored = submission.clone();
            stored.id = self.next_id.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().await = Some(stored.clone());
            Ok(stored)
        }

        async fn find_by_id(&self, _id: i64) -> Result<Option<Submission>, RepositoryError> {
            Ok(self.last.lock().await.clone())
        }

        async fn update(&self, submission: &Submission) -> Result<Submission, RepositoryError> {
            Ok(submission.clone())
        }

        async fn update_status_to_checking(&self, _id: i64) -> Result<u64, RepositoryError> {
            Ok(1)
        }

        async fn find_pending(&self, _limit: u64) -> Result<Vec<Submission>, RepositoryError> {
            Ok(Vec::new())
        }
    }

    struct FixedDeadLinks {
        rows: Vec<DeadLink>,
    }

    #[async_trait]
    impl DeadLinkRepository for FixedDeadLinks {
        async fn find_by_links(
            &self,
            links: &[String],
        ) -> Result<Vec<DeadLink>, RepositoryError> {
            Ok(self
                .rows
                .iter()
                .filter(|row| links.contains(&row.link))
                .cloned()
                .collect())
        }

        async fn exists(&self, link: &str) -> Result<bool, RepositoryError> {
            Ok(self
                .rows
                .iter()
                .any(|row| row.link == link && !row.rate_limited))
        }

        async fn create_or_update(&self, _dead_link: &DeadLink) -> Result<(), RepositoryError> {
            Ok(())
        }

        async fn list_rate_limited(
            &self,
            _page: u64,
            _page_size: u64,
            _platform: Option<Platform>,
        ) -> Result<(Vec<DeadLink>, u64), RepositoryError> {
            Ok((Vec::new(), 0))
        }

        async fn delete_rate_limited(&self) -> Result<u64, RepositoryError> {
            Ok(0)
        }
    }

    fn service(rows: Vec<DeadLink>) -> (SubmissionService, Arc<RecordingSubmissions>) {
        let submissions = Arc::new(RecordingSubmissions {
            last: Mutex::new(None),
            next_id: AtomicI64::new(1),
        });
        let service = SubmissionService::new(
            submissions.clone(),
            Arc::new(FixedDeadLinks { rows }),
        );
        (service, submissions)
    }

    #[tokio::test]
    async fn test_duplicates_counted_but_originals_kept() {
        let (service, submissions) = service(Vec::new());
        let request = CheckLinksRequest {
            links: vec![
                "https://pan.quark.cn/s/dup1".into(),
                "https://pan.quark.cn/s/dup1".into(),
                "  https://pan.quark.cn/s/dup1  ".into(),
            ],
            selected_platforms: vec![],
        };
        let response = service
            .create_submission(&request, "127.0.0.1", DeviceInfo::default())
            .await
            .unwrap();

        assert_eq!(response.duplicate_count, 2);
        assert_eq!(response.pending_links.len(), 1);

        let record = submissions.last.lock().await.clone().unwrap();
        // 原始提交内容保留全部三项（去除首尾空白后）
        assert_eq!(record.original_links.len(), 3);
        assert_eq!(record.total_links, 3);
        assert_eq!(record.status, SubmissionStatus::Pending);
    }

    #[tokio::test]
    async fn test_confirmed_dead_links_prefiltered() {
        let dead = DeadLink::from_outcome(
            "https://pan.quark.cn/s/dead1".into(),
            Platform::Quark,
            "链接已失效".into(),
            None,
            false,
            None,
        );
        let throttled = DeadLink::from_outcome(
            "https://pan.quark.cn/s/limit1".into(),
            Platform::Quark,
            "API频率限制".into(),
            None,
            true,
            None,
        );
        let (service, _submissions) = service(vec![dead, throttled]);

        let request = CheckLinksRequest {
            links: vec![
                "https://pan.quark.cn/s/dead1".into(),
                "https://pan.quark.cn/s/limit1".into(),
                "https://pan.quark.cn/s/fresh1".into(),
            ],
            selected_platforms: vec![],
        };
        let response = service
            .create_submission(&request, "127.0.0.1", DeviceInfo::default())
            .await
            .unwrap();

        // 确认失效的被预过滤，限流的保留待重新探测
        assert_eq!(response.invalid_links, vec!["https://pan.quark.cn/s/dead1"]);
        assert_eq!(
            response.pending_links,
            vec![
                "https://pan.quark.cn/s/limit1",
                "https://pan.quark.cn/s/fresh1"
            ]
        );
    }

    #[tokio::test]
    async fn test_unrecognized_only_batch_creates_nothing() {
        let (service, submissions) = service(Vec::new());
        let request = CheckLinksRequest {
            links: vec!["https://example.com/not-a-pan-link".into()],
            selected_platforms: vec![],
        };
        let response = service
            .create_submission(&request, "127.0.0.1", DeviceInfo::default())
            .await
            .unwrap();

        assert_eq!(response.submission_id, 0);
        assert_eq!(response.invalid_format_count, 1);
        assert!(submissions.last.lock().await.is_none());
    }
}
