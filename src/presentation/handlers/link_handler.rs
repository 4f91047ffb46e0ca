// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::dispatcher::{DispatchError, Dispatcher};
use crate::application::submission_service::{CheckLinksRequest, SubmissionService};
use crate::domain::models::platform::Platform;
use crate::domain::models::submission::DeviceInfo;
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;

/// 检测链接
///
/// 创建提交记录并即时调度检测，返回最终化的结果
pub async fn check_links(
    Extension(service): Extension<Arc<SubmissionService>>,
    Extension(dispatcher): Extension<Arc<Dispatcher>>,
    headers: axum::http::HeaderMap,
    Json(request): Json<CheckLinksRequest>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let client_ip = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .unwrap_or("unknown")
        .trim()
        .to_string();
    let language = headers
        .get("accept-language")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .unwrap_or_default()
        .to_string();
    let device_info = DeviceInfo {
        language,
        ..DeviceInfo::default()
    };

    let mut response = service
        .create_submission(&request, &client_ip, device_info)
        .await
        .map_err(|e| {
            error!("Failed to create submission: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    if response.submission_id > 0 && !response.pending_links.is_empty() {
        match dispatcher
            .dispatch(
                response.submission_id,
                response.pending_links.clone(),
                request.selected_platforms.clone(),
            )
            .await
        {
            Ok(record) => {
                response.valid_links = record.valid_links;
                response.pending_links = record.pending_links;
                response.total_duration = record.total_duration;
            }
            Err(DispatchError::AlreadyOwned(_)) => {}
            Err(e) => {
                error!(
                    "Dispatch failed for submission {}: {}",
                    response.submission_id, e
                );
            }
        }
    }

    Ok(Json(json!(response)))
}

/// 查询提交记录
pub async fn get_submission(
    Extension(service): Extension<Arc<SubmissionService>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let submission = service
        .get_submission(id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;
    let dead_links = service
        .dead_links_for_submission(id)
        .await
        .unwrap_or_default();
    Ok(Json(json!({
        "submission": submission,
        "invalid_links": dead_links,
    })))
}

/// 被限流链接的查询参数
#[derive(Debug, Deserialize)]
pub struct RateLimitedQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    pub platform: Option<Platform>,
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    20
}

/// 分页查询被限流的失效链接
pub async fn list_rate_limited(
    Extension(dead_links): Extension<
        Arc<dyn crate::domain::repositories::dead_link_repository::DeadLinkRepository>,
    >,
    Query(query): Query<RateLimitedQuery>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let (rows, total) = dead_links
        .list_rate_limited(query.page, query.page_size, query.platform)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(json!({ "items": rows, "total": total })))
}

/// 清空所有被限流的失效链接
pub async fn clear_rate_limited(
    Extension(dead_links): Extension<
        Arc<dyn crate::domain::repositories::dead_link_repository::DeadLinkRepository>,
    >,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let deleted = dead_links
        .delete_rate_limited()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(json!({ "deleted": deleted })))
}
