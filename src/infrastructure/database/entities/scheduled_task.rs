// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "scheduled_tasks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub name: String,
    pub description: Option<String>,
    pub tags: Option<Json>,
    #[sea_orm(column_type = "Text")]
    pub http_command: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub transform_script: Option<String>,
    pub cron_expression: String,
    pub status: String,
    pub auto_destroy_at: Option<ChronoDateTimeWithTimeZone>,
    pub last_run_at: Option<ChronoDateTimeWithTimeZone>,
    pub next_run_at: Option<ChronoDateTimeWithTimeZone>,
    pub created_at: ChronoDateTimeWithTimeZone,
    pub updated_at: ChronoDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
