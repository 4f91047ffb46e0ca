use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create submission_records table
        manager
            .create_table(
                Table::create()
                    .table(SubmissionRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SubmissionRecords::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SubmissionRecords::OriginalLinks).json().not_null())
                    .col(ColumnDef::new(SubmissionRecords::PendingLinks).json())
                    .col(ColumnDef::new(SubmissionRecords::ValidLinks).json())
                    .col(ColumnDef::new(SubmissionRecords::SelectedPlatforms).json())
                    .col(
                        ColumnDef::new(SubmissionRecords::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(SubmissionRecords::TotalDuration).big_integer())
                    .col(
                        ColumnDef::new(SubmissionRecords::TotalLinks)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(SubmissionRecords::ClientIp).string_len(45))
                    .col(ColumnDef::new(SubmissionRecords::Browser).string_len(50))
                    .col(ColumnDef::new(SubmissionRecords::Os).string_len(50))
                    .col(ColumnDef::new(SubmissionRecords::Device).string_len(20))
                    .col(ColumnDef::new(SubmissionRecords::Language).string_len(10))
                    .col(
                        ColumnDef::new(SubmissionRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SubmissionRecords::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(SubmissionRecords::CheckedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_submission_status")
                    .table(SubmissionRecords::Table)
                    .col(SubmissionRecords::Status)
                    .to_owned(),
            )
            .await?;

        // Create invalid_links table
        manager
            .create_table(
                Table::create()
                    .table(InvalidLinks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InvalidLinks::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(InvalidLinks::Link).string_len(500).not_null())
                    .col(ColumnDef::new(InvalidLinks::Platform).string_len(20).not_null())
                    .col(ColumnDef::new(InvalidLinks::FailureReason).text())
                    .col(ColumnDef::new(InvalidLinks::CheckDuration).big_integer())
                    .col(
                        ColumnDef::new(InvalidLinks::IsRateLimited)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(InvalidLinks::SubmissionId).big_integer())
                    .col(
                        ColumnDef::new(InvalidLinks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uniq_invalid_link")
                    .table(InvalidLinks::Table)
                    .col(InvalidLinks::Link)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_invalid_platform")
                    .table(InvalidLinks::Table)
                    .col(InvalidLinks::Platform)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_invalid_rate_limited")
                    .table(InvalidLinks::Table)
                    .col(InvalidLinks::IsRateLimited)
                    .to_owned(),
            )
            .await?;

        // Create settings table
        manager
            .create_table(
                Table::create()
                    .table(Settings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Settings::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Settings::Key).string_len(100).not_null())
                    .col(ColumnDef::new(Settings::Value).text().not_null())
                    .col(ColumnDef::new(Settings::Category).string_len(50))
                    .col(ColumnDef::new(Settings::Description).string_len(500))
                    .col(
                        ColumnDef::new(Settings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Settings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uniq_setting_key")
                    .table(Settings::Table)
                    .col(Settings::Key)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create scheduled_tasks table
        manager
            .create_table(
                Table::create()
                    .table(ScheduledTasks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ScheduledTasks::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ScheduledTasks::Name).string_len(100).not_null())
                    .col(ColumnDef::new(ScheduledTasks::Description).string_len(500))
                    .col(ColumnDef::new(ScheduledTasks::Tags).json())
                    .col(ColumnDef::new(ScheduledTasks::HttpCommand).text().not_null())
                    .col(ColumnDef::new(ScheduledTasks::TransformScript).text())
                    .col(ColumnDef::new(ScheduledTasks::CronExpression).string_len(100).not_null())
                    .col(
                        ColumnDef::new(ScheduledTasks::Status)
                            .string_len(20)
                            .not_null()
                            .default("stopped"),
                    )
                    .col(ColumnDef::new(ScheduledTasks::AutoDestroyAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(ScheduledTasks::LastRunAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(ScheduledTasks::NextRunAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(ScheduledTasks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ScheduledTasks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uniq_task_name")
                    .table(ScheduledTasks::Table)
                    .col(ScheduledTasks::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_task_status")
                    .table(ScheduledTasks::Table)
                    .col(ScheduledTasks::Status)
                    .to_owned(),
            )
            .await?;

        // Create task_executions table
        manager
            .create_table(
                Table::create()
                    .table(TaskExecutions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TaskExecutions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TaskExecutions::TaskId).big_integer().not_null())
                    .col(
                        ColumnDef::new(TaskExecutions::Status)
                            .string_len(20)
                            .not_null()
                            .default("running"),
                    )
                    .col(
                        ColumnDef::new(TaskExecutions::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TaskExecutions::FinishedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(TaskExecutions::ExecutionDuration).big_integer())
                    .col(
                        ColumnDef::new(TaskExecutions::LinksCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(TaskExecutions::CheckedCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(TaskExecutions::ValidCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(TaskExecutions::InvalidCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(TaskExecutions::ErrorMessage).text())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_execution_task_id")
                    .table(TaskExecutions::Table)
                    .col(TaskExecutions::TaskId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TaskExecutions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ScheduledTasks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Settings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InvalidLinks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SubmissionRecords::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SubmissionRecords {
    Table,
    Id,
    OriginalLinks,
    PendingLinks,
    ValidLinks,
    SelectedPlatforms,
    Status,
    TotalDuration,
    TotalLinks,
    ClientIp,
    Browser,
    Os,
    Device,
    Language,
    CreatedAt,
    UpdatedAt,
    CheckedAt,
}

#[derive(DeriveIden)]
enum InvalidLinks {
    Table,
    Id,
    Link,
    Platform,
    FailureReason,
    CheckDuration,
    IsRateLimited,
    SubmissionId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Settings {
    Table,
    Id,
    Key,
    Value,
    Category,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ScheduledTasks {
    Table,
    Id,
    Name,
    Description,
    Tags,
    HttpCommand,
    TransformScript,
    CronExpression,
    Status,
    AutoDestroyAt,
    LastRunAt,
    NextRunAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum TaskExecutions {
    Table,
    Id,
    TaskId,
    Status,
    StartedAt,
    FinishedAt,
    ExecutionDuration,
    LinksCount,
    CheckedCount,
    ValidCount,
    InvalidCount,
    ErrorMessage,
}
