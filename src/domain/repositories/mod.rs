// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 仓库层模块
//!
//! 定义各实体的数据访问接口

use sea_orm::DbErr;
use thiserror::Error;

pub mod dead_link_repository;
pub mod scheduled_job_repository;
pub mod settings_repository;
pub mod submission_repository;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
    /// 记录已存在
    #[error("Record already exists: {0}")]
    AlreadyExists(String),
}
