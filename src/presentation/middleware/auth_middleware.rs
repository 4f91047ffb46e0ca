// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// 认证状态
#[derive(Clone)]
pub struct AuthState {
    /// 管理接口共享密钥
    pub admin_secret: Arc<String>,
}

/// 认证中间件
///
/// 校验请求的Bearer令牌与管理密钥一致，比较使用恒定时间实现
///
/// # 参数
///
/// * `state` - 认证状态
/// * `req` - HTTP请求
/// * `next` - 下一个中间件
///
/// # 返回值
///
/// * `Ok(Response)` - 认证成功的响应
/// * `Err(StatusCode)` - 认证失败的状态码
pub async fn auth_middleware(
    State(state): State<AuthState>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // Allow public endpoints
    let path = req.uri().path();
    if path == "/health" || path == "/v1/version" {
        return Ok(next.run(req).await);
    }

    if state.admin_secret.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let matches: bool = token
        .as_bytes()
        .ct_eq(state.admin_secret.as_bytes())
        .into();
    if !matches {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(req).await)
}
