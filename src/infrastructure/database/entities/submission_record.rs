// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "submission_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub original_links: Json,
    pub pending_links: Option<Json>,
    pub valid_links: Option<Json>,
    pub selected_platforms: Option<Json>,
    pub status: String,
    pub total_duration: Option<i64>,
    pub total_links: i32,
    pub client_ip: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub device: Option<String>,
    pub language: Option<String>,
    pub created_at: ChronoDateTimeWithTimeZone,
    pub updated_at: ChronoDateTimeWithTimeZone,
    pub checked_at: Option<ChronoDateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
