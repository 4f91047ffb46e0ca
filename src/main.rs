// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    routing::{delete, get, post, put},
    Extension, Router,
};
use migration::{Migrator, MigratorTrait};
use pancheck::application::config_loader::RuntimeConfigLoader;
use pancheck::application::dispatcher::Dispatcher;
use pancheck::application::submission_service::SubmissionService;
use pancheck::config::settings::Settings;
use pancheck::domain::repositories::dead_link_repository::DeadLinkRepository;
use pancheck::domain::repositories::scheduled_job_repository::{
    JobExecutionRepository, ScheduledJobRepository,
};
use pancheck::domain::repositories::settings_repository::SettingsRepository;
use pancheck::domain::repositories::submission_repository::SubmissionRepository;
use pancheck::infrastructure::cache::{OutcomeCache, RedisClient};
use pancheck::infrastructure::database::connection;
use pancheck::infrastructure::repositories::dead_link_repo_impl::DeadLinkRepositoryImpl;
use pancheck::infrastructure::repositories::job_execution_repo_impl::JobExecutionRepositoryImpl;
use pancheck::infrastructure::repositories::scheduled_job_repo_impl::ScheduledJobRepositoryImpl;
use pancheck::infrastructure::repositories::settings_repo_impl::SettingsRepositoryImpl;
use pancheck::infrastructure::repositories::submission_repo_impl::SubmissionRepositoryImpl;
use pancheck::presentation::handlers::{job_handler, link_handler};
use pancheck::presentation::middleware::auth_middleware::{auth_middleware, AuthState};
use pancheck::presentation::routes;
use pancheck::probes;
use pancheck::scheduler::{CronScheduler, JobExecutor, JobReloader};
use pancheck::utils::telemetry;
use pancheck::workers::pending_sweeper::PendingSweeper;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 初始化日志与指标
    telemetry::init_telemetry();
    info!("Starting pancheck...");
    pancheck::infrastructure::metrics::init_metrics();

    // 2. 加载配置
    let settings = Settings::new()?;
    info!("Configuration loaded");

    // 3. 建立数据库连接并迁移
    let db = Arc::new(connection::create_pool(&settings.database).await?);
    info!("Database connection established");
    Migrator::up(db.as_ref(), None).await?;
    info!("Database migrations applied");

    // 4. 仓库
    let submissions: Arc<dyn SubmissionRepository> =
        Arc::new(SubmissionRepositoryImpl::new(db.clone()));
    let dead_links: Arc<dyn DeadLinkRepository> = Arc::new(DeadLinkRepositoryImpl::new(db.clone()));
    let settings_repo: Arc<dyn SettingsRepository> =
        Arc::new(SettingsRepositoryImpl::new(db.clone()));
    let jobs_repo: Arc<dyn ScheduledJobRepository> =
        Arc::new(ScheduledJobRepositoryImpl::new(db.clone()));
    let executions_repo: Arc<dyn JobExecutionRepository> =
        Arc::new(JobExecutionRepositoryImpl::new(db.clone()));

    // 5. 运行时配置：平台频率与Redis覆盖
    let config_loader = RuntimeConfigLoader::new(settings_repo.clone());
    let rate_configs = config_loader.load_rate_configs().await;
    let redis_override = config_loader.load_redis_override().await;

    let redis_enabled = redis_override
        .as_ref()
        .map(|o| o.enabled)
        .unwrap_or(settings.redis.enabled);
    let redis_url = redis_override
        .as_ref()
        .filter(|o| !o.url.is_empty())
        .map(|o| o.url.clone())
        .unwrap_or_else(|| settings.redis.url.clone());
    let invalid_ttl_hours = redis_override
        .as_ref()
        .filter(|o| o.invalid_ttl_hours > 0)
        .map(|o| o.invalid_ttl_hours)
        .unwrap_or(settings.redis.invalid_ttl_hours);

    // 6. 缓存层：后端连接失败只停用缓存，不阻止启动
    let redis_client = if redis_enabled {
        match RedisClient::new(&redis_url).await {
            Ok(client) => {
                info!("Redis cache connected");
                Some(client)
            }
            Err(e) => {
                warn!("Failed to connect to Redis: {}, cache will be disabled", e);
                None
            }
        }
    } else {
        info!("Redis cache is disabled");
        None
    };
    let ttl_config = RuntimeConfigLoader::build_ttl_config(&rate_configs, invalid_ttl_hours);
    let cache = Arc::new(OutcomeCache::new(redis_client, ttl_config));

    // 7. 探测器与调度器
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.checker.timeout_seconds))
        .build()?;
    let registry = Arc::new(probes::build_registry(
        http_client.clone(),
        Duration::from_secs(settings.checker.timeout_seconds),
        &rate_configs,
    ));

    let dispatcher = Arc::new(Dispatcher::new(
        submissions.clone(),
        dead_links.clone(),
        cache.clone(),
        registry,
    ));
    let submission_service = Arc::new(SubmissionService::new(
        submissions.clone(),
        dead_links.clone(),
    ));

    // 8. 定时任务调度
    let job_executor = Arc::new(JobExecutor::new(
        executions_repo.clone(),
        submission_service.clone(),
        dispatcher.clone(),
        http_client.clone(),
    ));
    let scheduler = CronScheduler::new(jobs_repo.clone(), job_executor.clone()).await?;
    scheduler.start().await?;
    let reloader: Arc<dyn JobReloader> = Arc::new(scheduler);

    // 9. 遗留提交扫描
    let _sweeper = PendingSweeper::new(submissions.clone(), dispatcher.clone()).start();

    // 10. HTTP路由
    let auth_state = AuthState {
        admin_secret: Arc::new(std::env::var("ADMIN_SECRET").unwrap_or(settings.admin.secret)),
    };

    let public_routes = Router::new()
        .route("/health", get(routes::health_check))
        .route("/v1/version", get(routes::version));

    let protected_routes = Router::new()
        .route("/v1/links/check", post(link_handler::check_links))
        .route("/v1/submissions/{id}", get(link_handler::get_submission))
        .route("/v1/links/rate-limited", get(link_handler::list_rate_limited))
        .route(
            "/v1/links/rate-limited",
            delete(link_handler::clear_rate_limited),
        )
        .route("/v1/jobs", post(job_handler::create_job))
        .route("/v1/jobs/{id}", put(job_handler::update_job))
        .route("/v1/jobs/{id}", delete(job_handler::delete_job))
        .route("/v1/jobs/{id}/enable", post(job_handler::enable_job))
        .route("/v1/jobs/{id}/disable", post(job_handler::disable_job))
        .route("/v1/jobs/test", post(job_handler::test_job))
        .route("/v1/jobs/{id}/executions", get(job_handler::list_executions))
        .layer(axum::middleware::from_fn_with_state(
            auth_state.clone(),
            auth_middleware,
        ));

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(Extension(submission_service))
        .layer(Extension(dispatcher))
        .layer(Extension(dead_links))
        .layer(Extension(jobs_repo))
        .layer(Extension(executions_repo))
        .layer(Extension(job_executor))
        .layer(Extension(reloader));

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    // 收到终止信号后开始排空，HTTP层最多等待5秒；
    // 在途探测继续运行至完成或各自的超时
    let shutdown = Arc::new(tokio::sync::Notify::new());
    let drain = shutdown.clone();
    let server = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                drain.notified().await;
            })
            .await;
        if let Err(e) = result {
            warn!("Server error: {}", e);
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, draining (5s grace)...");
    shutdown.notify_one();
    if tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .is_err()
    {
        warn!("Drain deadline reached, exiting");
    }

    Ok(())
}
