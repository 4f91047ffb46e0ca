// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "task_executions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub task_id: i64,
    pub status: String,
    pub started_at: ChronoDateTimeWithTimeZone,
    pub finished_at: Option<ChronoDateTimeWithTimeZone>,
    pub execution_duration: Option<i64>,
    pub links_count: i32,
    pub checked_count: i32,
    pub valid_count: i32,
    pub invalid_count: i32,
    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
