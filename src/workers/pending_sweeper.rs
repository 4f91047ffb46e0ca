// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::dispatcher::{DispatchError, Dispatcher};
use crate::domain::repositories::submission_repository::SubmissionRepository;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// 遗留提交扫描工作器
///
/// 定期捞起仍处于 pending 的提交（平台过滤后的剩余链接、
/// 崩溃恢复后的记录）并不带过滤地重新调度
pub struct PendingSweeper {
    submissions: Arc<dyn SubmissionRepository>,
    dispatcher: Arc<Dispatcher>,
    interval: Duration,
    batch_size: u64,
}

impl PendingSweeper {
    pub fn new(submissions: Arc<dyn SubmissionRepository>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            submissions,
            dispatcher,
            interval: Duration::from_secs(5 * 60),
            batch_size: 10,
        }
    }

    /// 运行工作器
    pub async fn run(&self) {
        info!("Pending submission sweeper started");

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if let Err(e) = self.sweep_once().await {
                error!("Pending sweep failed: {}", e);
            }
        }
    }

    /// 启动后台运行
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn sweep_once(&self) -> Result<(), String> {
        let records = self
            .submissions
            .find_pending(self.batch_size)
            .await
            .map_err(|e| e.to_string())?;

        if records.is_empty() {
            return Ok(());
        }
        info!("Sweeping {} pending submissions", records.len());

        for record in records {
            // pending_links 为空的记录由 dispatch 直接最终化为 checked
            let dispatcher = self.dispatcher.clone();
            let id = record.id;
            let links = record.pending_links.clone();
            tokio::spawn(async move {
                // 后台扫描不做平台过滤，检测全部剩余链接
                match dispatcher.dispatch(id, links, Vec::new()).await {
                    Ok(_) => info!("Swept submission {}", id),
                    Err(DispatchError::AlreadyOwned(_)) => {}
                    Err(e) => error!("Failed to sweep submission {}: {}", id, e),
                }
            });
        }
        Ok(())
    }
}
