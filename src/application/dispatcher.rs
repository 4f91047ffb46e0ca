// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::dead_link::DeadLink;
use crate::domain::models::link::CheckOutcome;
use crate::domain::models::platform::Platform;
use crate::domain::models::submission::{Submission, SubmissionStatus};
use crate::domain::repositories::dead_link_repository::DeadLinkRepository;
use crate::domain::repositories::submission_repository::SubmissionRepository;
use crate::domain::repositories::RepositoryError;
use crate::infrastructure::cache::OutcomeCache;
use crate::infrastructure::metrics;
use crate::probes::{LinkProbe, ProbeRegistry};
use crate::utils::link_parser;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, error, info, warn};

/// 调度错误类型
#[derive(Error, Debug)]
pub enum DispatchError {
    /// CAS失败，提交已被其他执行者占用
    #[error("Submission {0} is already being processed")]
    AlreadyOwned(i64),
    /// 提交记录不存在
    #[error("Submission {0} not found")]
    NotFound(i64),
    /// 仓库错误
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
    /// 调度过程发生panic
    #[error("Dispatch panicked for submission {0}")]
    Panicked(i64),
}

/// 调度器
///
/// 一次提交的协调者：CAS获得所有权后按平台分组扇出探测，
/// 每条链接依次查缓存、查失效表、活探测，聚合结果并落库。
/// 单条探测的panic被隔离在其任务内，不会波及同组或整次调度。
#[derive(Clone)]
pub struct Dispatcher {
    submissions: Arc<dyn SubmissionRepository>,
    dead_links: Arc<dyn DeadLinkRepository>,
    cache: Arc<OutcomeCache>,
    probes: Arc<ProbeRegistry>,
}

/// 一条链接的最终去向
struct LinkResult {
    canonical: String,
    outcome: CheckOutcome,
    platform: Platform,
}

type SharedResults = Arc<Mutex<Vec<LinkResult>>>;

impl Dispatcher {
    /// 创建调度器
    pub fn new(
        submissions: Arc<dyn SubmissionRepository>,
        dead_links: Arc<dyn DeadLinkRepository>,
        cache: Arc<OutcomeCache>,
        probes: Arc<ProbeRegistry>,
    ) -> Self {
        Self {
            submissions,
            dead_links,
            cache,
            probes,
        }
    }

    /// 调度一次提交的检测
    ///
    /// # 参数
    ///
    /// * `submission_id` - 提交记录ID
    /// * `links` - 待检测链接
    /// * `selected_platforms` - 平台过滤（空集或覆盖全部平台时不过滤）
    ///
    /// # 返回值
    ///
    /// * `Ok(Submission)` - 最终化的提交记录
    /// * `Err(DispatchError)` - CAS失败或持久化失败
    pub async fn dispatch(
        &self,
        submission_id: i64,
        links: Vec<String>,
        selected_platforms: Vec<Platform>,
    ) -> Result<Submission, DispatchError> {
        // 唯一的防重闸门：pending -> checking 原子转移
        let rows_affected = self
            .submissions
            .update_status_to_checking(submission_id)
            .await?;
        if rows_affected == 0 {
            debug!(
                "Submission {} is already being processed or not pending, skipping",
                submission_id
            );
            return Err(DispatchError::AlreadyOwned(submission_id));
        }

        let this = self.clone();
        let handle = tokio::spawn(async move {
            this.run(submission_id, links, selected_platforms).await
        });

        match handle.await {
            Ok(Ok(submission)) => Ok(submission),
            Ok(Err(e)) => {
                self.revert_to_pending(submission_id).await;
                Err(e)
            }
            Err(join_err) => {
                error!(
                    "Dispatch panicked for submission {}: {}, restoring status to pending",
                    submission_id, join_err
                );
                self.revert_to_pending(submission_id).await;
                Err(DispatchError::Panicked(submission_id))
            }
        }
    }

    /// 失败时尽力将状态恢复为 pending，等待后台扫描重试
    async fn revert_to_pending(&self, submission_id: i64) {
        match self.submissions.find_by_id(submission_id).await {
            Ok(Some(mut record)) => {
                if record.status == SubmissionStatus::Checking {
                    record.status = SubmissionStatus::Pending;
                    if let Err(e) = self.submissions.update(&record).await {
                        warn!(
                            "Failed to restore submission {} to pending: {}",
                            submission_id, e
                        );
                    }
                }
            }
            Ok(None) => {}
            Err(e) => warn!(
                "Failed to load submission {} for status restore: {}",
                submission_id, e
            ),
        }
    }

    async fn run(
        &self,
        submission_id: i64,
        links: Vec<String>,
        selected_platforms: Vec<Platform>,
    ) -> Result<Submission, DispatchError> {
        let start = Instant::now();

        // 按规范化形式去重，空白项丢弃
        let mut seen = HashSet::new();
        let mut link_infos = Vec::new();
        for link in &links {
            let trimmed = link.trim();
            if trimmed.is_empty() {
                continue;
            }
            let info = link_parser::parse_link(trimmed);
            if seen.insert(info.canonical.clone()) {
                link_infos.push(info);
            }
        }

        if link_infos.is_empty() {
            info!(
                "No links to check for submission {}, finalizing as checked",
                submission_id
            );
            return self
                .finalize(submission_id, start, Vec::new(), Vec::new(), Vec::new())
                .await;
        }

        // 过滤模式判定：空集或覆盖全部平台等同于不过滤
        let all_platforms: HashSet<Platform> = Platform::all().into_iter().collect();
        let selected: HashSet<Platform> = selected_platforms.into_iter().collect();
        let unfiltered = selected.is_empty() || selected == all_platforms;

        // 按平台分组
        let mut by_platform: HashMap<Platform, Vec<String>> = HashMap::new();
        let mut unknown_links = Vec::new();
        let mut skipped_links = Vec::new();

        for info in link_infos {
            if !info.platform.is_checkable() {
                unknown_links.push(info.canonical);
            } else if unfiltered || selected.contains(&info.platform) {
                by_platform
                    .entry(info.platform)
                    .or_default()
                    .push(info.canonical);
            } else {
                skipped_links.push(info.canonical);
            }
        }

        info!(
            "Dispatching submission {}: {} platform groups, {} unknown, {} skipped",
            submission_id,
            by_platform.len(),
            unknown_links.len(),
            skipped_links.len()
        );

        let results: SharedResults = Arc::new(Mutex::new(Vec::new()));

        // 未识别链接：不过滤模式下直接判无效，过滤模式下保留待检测
        if unfiltered && !unknown_links.is_empty() {
            let mut guard = results.lock().await;
            for link in unknown_links.drain(..) {
                guard.push(LinkResult {
                    canonical: link,
                    outcome: CheckOutcome::invalid("无法识别网盘平台类型", 0),
                    platform: Platform::Unknown,
                });
            }
        }

        // 每个平台一个工作组，组间并行
        let mut group_handles = Vec::new();
        for (platform, platform_links) in by_platform {
            let probe = match self.probes.get(platform) {
                Some(probe) => probe,
                None => {
                    let mut guard = results.lock().await;
                    for link in platform_links {
                        guard.push(LinkResult {
                            canonical: link,
                            outcome: CheckOutcome::invalid("该平台检测器未实现", 0),
                            platform,
                        });
                    }
                    continue;
                }
            };

            let this = self.clone();
            let results = results.clone();
            group_handles.push(tokio::spawn(async move {
                this.check_platform_group(probe, platform, platform_links, results)
                    .await;
            }));
        }

        for joined in futures::future::join_all(group_handles).await {
            if let Err(e) = joined {
                // 工作组的panic被隔离，不取消其它组，也不导致提交失败
                error!("Platform group panicked: {}", e);
            }
        }

        let results = std::mem::take(&mut *results.lock().await);

        let mut valid_links = Vec::new();
        let mut dead_rows = Vec::new();
        for result in results {
            if result.outcome.valid {
                valid_links.push(result.canonical);
            } else {
                dead_rows.push(DeadLink::from_outcome(
                    result.canonical,
                    result.platform,
                    result.outcome.failure_reason,
                    Some(result.outcome.duration_ms),
                    result.outcome.rate_limited,
                    Some(submission_id),
                ));
            }
        }

        let mut remaining_pending = skipped_links;
        remaining_pending.extend(unknown_links);

        let finalized = self
            .finalize(submission_id, start, valid_links, remaining_pending, dead_rows)
            .await?;
        Ok(finalized)
    }

    /// 一个平台工作组：计数信号量限制组内并发
    async fn check_platform_group(
        &self,
        probe: Arc<dyn LinkProbe>,
        platform: Platform,
        links: Vec<String>,
        results: SharedResults,
    ) {
        let limit = probe.concurrency_limit().max(1);
        let semaphore = Arc::new(Semaphore::new(limit));
        let total = links.len();
        debug!(
            "Checking {} links on platform {} with concurrency {}",
            total, platform, limit
        );

        let mut handles = Vec::with_capacity(total);
        for link in links {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let this = self.clone();
            let probe = probe.clone();
            let results = results.clone();
            handles.push(tokio::spawn(async move {
                let outcome = this.lookup(probe.as_ref(), &link, platform).await;
                results.lock().await.push(LinkResult {
                    canonical: link,
                    outcome,
                    platform,
                });
                drop(permit);
            }));
        }

        for joined in futures::future::join_all(handles).await {
            if let Err(e) = joined {
                // 单条探测panic只损失该链接的结果
                error!("Probe task panicked on platform {}: {}", platform, e);
            }
        }
        debug!("Platform {} group drained ({} links)", platform, total);
    }

    /// 三级查找：缓存 -> 失效表 -> 活探测
    async fn lookup(
        &self,
        probe: &dyn LinkProbe,
        link: &str,
        platform: Platform,
    ) -> CheckOutcome {
        // 1. 缓存命中直接使用，且不再回写
        if let Some(cached) = self.cache.get(link).await {
            metrics::record_cache_hit(&platform.to_string());
            debug!("Cache hit for link {} (platform {})", link, platform);
            return cached;
        }

        // 2. 失效表短路：仅对确认失效（非限流）的记录生效
        match self.dead_links.exists(link).await {
            Ok(true) => {
                if let Ok(rows) = self.dead_links.find_by_links(&[link.to_string()]).await {
                    if let Some(row) = rows.first() {
                        metrics::record_dead_link_short_circuit(&platform.to_string());
                        debug!("Known dead link {} (platform {})", link, platform);
                        let outcome = CheckOutcome {
                            valid: false,
                            failure_reason: row.failure_reason.clone(),
                            duration_ms: row.check_duration.unwrap_or(0),
                            rate_limited: row.rate_limited,
                        };
                        self.cache.set(link, &outcome, platform).await;
                        return outcome;
                    }
                }
            }
            Ok(false) => {}
            Err(e) => warn!("Dead link lookup failed for {}: {}", link, e),
        }

        // 3. 活探测
        let outcome = probe.check(link).await;
        metrics::record_probe(&platform.to_string(), outcome.valid, outcome.rate_limited);

        // 回写缓存；限流结果也缓存为无效，但保留 rate_limited 标记
        self.cache.set(link, &outcome, platform).await;
        outcome
    }

    /// 最终化提交记录并持久化失效链接
    async fn finalize(
        &self,
        submission_id: i64,
        start: Instant,
        valid_links: Vec<String>,
        remaining_pending: Vec<String>,
        dead_rows: Vec<DeadLink>,
    ) -> Result<Submission, DispatchError> {
        let mut record = self
            .submissions
            .find_by_id(submission_id)
            .await?
            .ok_or(DispatchError::NotFound(submission_id))?;

        let duration = start.elapsed().as_millis() as i64;
        record.valid_links = valid_links;
        record.pending_links = remaining_pending;
        record.total_duration = Some(duration);

        if record.pending_links.is_empty() {
            record.status = SubmissionStatus::Checked;
            record.checked_at = Some(Utc::now().into());
        } else {
            // 还有未检测的链接（未选中平台或未识别），留给后台扫描
            record.status = SubmissionStatus::Pending;
        }

        let updated = self.submissions.update(&record).await?;
        info!(
            "Submission {} finalized: status={}, valid={}, dead={}, pending={}",
            submission_id,
            updated.status,
            updated.valid_links.len(),
            dead_rows.len(),
            updated.pending_links.len()
        );

        // 失效链接落库：基础设施错误不影响主流程
        for row in &dead_rows {
            if let Err(e) = self.dead_links.create_or_update(row).await {
                warn!("Failed to save invalid link {}: {}", row.link, e);
            }
        }

        Ok(updated)
    }
}

#[cfg(test)]
#[path = "dispatcher_test.rs"]
mod tests;
