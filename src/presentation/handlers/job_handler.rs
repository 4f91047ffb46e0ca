// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scheduled_job::{JobStatus, ScheduledJob};
use crate::domain::repositories::scheduled_job_repository::{
    JobExecutionRepository, ScheduledJobRepository,
};
use crate::scheduler::cron_scheduler::normalize_cron_expression;
use crate::scheduler::{JobExecutor, JobReloader};
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{DateTime, FixedOffset, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;

/// 创建/更新任务的请求体
#[derive(Debug, Deserialize)]
pub struct JobPayload {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub http_command: String,
    #[serde(default)]
    pub transform_script: String,
    pub cron_expression: String,
    pub auto_destroy_at: Option<DateTime<FixedOffset>>,
}

/// 创建任务
pub async fn create_job(
    Extension(jobs): Extension<Arc<dyn ScheduledJobRepository>>,
    Extension(reloader): Extension<Arc<dyn JobReloader>>,
    Json(payload): Json<JobPayload>,
) -> Result<(StatusCode, Json<serde_json::Value>), (StatusCode, String)> {
    if normalize_cron_expression(&payload.cron_expression).is_err() {
        return Err((StatusCode::BAD_REQUEST, "无效的cron表达式".into()));
    }
    let exists = jobs
        .exists_by_name(&payload.name, None)
        .await
        .map_err(internal)?;
    if exists {
        return Err((
            StatusCode::CONFLICT,
            format!("任务名称 '{}' 已存在，请使用其他名称", payload.name),
        ));
    }

    let job = ScheduledJob {
        id: 0,
        name: payload.name,
        description: payload.description,
        tags: payload.tags,
        http_command: payload.http_command,
        transform_script: payload.transform_script,
        cron_expression: payload.cron_expression,
        status: JobStatus::Stopped,
        auto_destroy_at: payload.auto_destroy_at,
        last_run_at: None,
        next_run_at: None,
        created_at: Utc::now().into(),
    };
    let created = jobs.create(&job).await.map_err(internal)?;
    reload(&reloader, created.id).await;
    Ok((StatusCode::CREATED, Json(json!(created))))
}

/// 更新任务
pub async fn update_job(
    Extension(jobs): Extension<Arc<dyn ScheduledJobRepository>>,
    Extension(reloader): Extension<Arc<dyn JobReloader>>,
    Path(id): Path<i64>,
    Json(payload): Json<JobPayload>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    if normalize_cron_expression(&payload.cron_expression).is_err() {
        return Err((StatusCode::BAD_REQUEST, "无效的cron表达式".into()));
    }
    let mut job = jobs
        .find_by_id(id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "任务不存在".to_string()))?;

    let exists = jobs
        .exists_by_name(&payload.name, Some(id))
        .await
        .map_err(internal)?;
    if exists {
        return Err((
            StatusCode::CONFLICT,
            format!("任务名称 '{}' 已存在，请使用其他名称", payload.name),
        ));
    }

    job.name = payload.name;
    job.description = payload.description;
    job.tags = payload.tags;
    job.http_command = payload.http_command;
    job.transform_script = payload.transform_script;
    job.cron_expression = payload.cron_expression;
    job.auto_destroy_at = payload.auto_destroy_at;
    let updated = jobs.update(&job).await.map_err(internal)?;
    reload(&reloader, id).await;
    Ok(Json(json!(updated)))
}

/// 删除任务
pub async fn delete_job(
    Extension(jobs): Extension<Arc<dyn ScheduledJobRepository>>,
    Extension(reloader): Extension<Arc<dyn JobReloader>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    jobs.delete(id).await.map_err(internal)?;
    reload(&reloader, id).await;
    Ok(StatusCode::NO_CONTENT)
}

/// 启用任务
pub async fn enable_job(
    Extension(jobs): Extension<Arc<dyn ScheduledJobRepository>>,
    Extension(reloader): Extension<Arc<dyn JobReloader>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    set_status(&jobs, &reloader, id, JobStatus::Active).await
}

/// 停用任务
pub async fn disable_job(
    Extension(jobs): Extension<Arc<dyn ScheduledJobRepository>>,
    Extension(reloader): Extension<Arc<dyn JobReloader>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    set_status(&jobs, &reloader, id, JobStatus::Stopped).await
}

async fn set_status(
    jobs: &Arc<dyn ScheduledJobRepository>,
    reloader: &Arc<dyn JobReloader>,
    id: i64,
    status: JobStatus,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let mut job = jobs
        .find_by_id(id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "任务不存在".to_string()))?;
    job.status = status;
    let updated = jobs.update(&job).await.map_err(internal)?;
    reload(reloader, id).await;
    Ok(Json(json!(updated)))
}

/// 测试任务配置的请求体
#[derive(Debug, Deserialize)]
pub struct TestJobPayload {
    pub http_command: String,
    #[serde(default)]
    pub transform_script: String,
}

/// 测试任务配置：执行命令与转换脚本，返回得到的链接列表
pub async fn test_job(
    Extension(executor): Extension<Arc<JobExecutor>>,
    Json(payload): Json<TestJobPayload>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    match executor
        .test_run(&payload.http_command, &payload.transform_script)
        .await
    {
        Ok(links) => Ok(Json(json!({ "links": links }))),
        Err(e) => Err((StatusCode::BAD_REQUEST, e.to_string())),
    }
}

/// 执行历史查询参数
#[derive(Debug, Deserialize)]
pub struct ExecutionsQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    20
}

/// 查询任务执行历史
pub async fn list_executions(
    Extension(executions): Extension<Arc<dyn JobExecutionRepository>>,
    Path(id): Path<i64>,
    Query(query): Query<ExecutionsQuery>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let (items, total) = executions
        .list_by_job_id(id, query.page, query.page_size)
        .await
        .map_err(internal)?;
    Ok(Json(json!({ "items": items, "total": total })))
}

async fn reload(reloader: &Arc<dyn JobReloader>, job_id: i64) {
    if let Err(e) = reloader.reload_job(job_id).await {
        error!("Failed to reload job {}: {}", job_id, e);
    }
}

fn internal(e: impl std::fmt::Display) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
