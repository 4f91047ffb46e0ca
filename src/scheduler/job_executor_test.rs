use super::*;
use crate::domain::models::dead_link::DeadLink;
use crate::domain::models::link::CheckOutcome;
use crate::domain::models::platform::Platform;
use crate::domain::models::scheduled_job::JobStatus;
use crate::domain::models::submission::Submission;
use crate::domain::models::submission::SubmissionStatus;
use crate::domain::repositories::dead_link_repository::DeadLinkRepository;
use crate::domain::repositories::submission_repository::SubmissionRepository;
use crate::infrastructure::cache::{OutcomeCache, TtlConfig};
use crate::probes::{LinkProbe, ProbeRegistry};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

struct InMemorySubmissions {
    records: Mutex<HashMap<i64, Submission>>,
    next_id: AtomicUsize,
}

#[async_trait]
impl SubmissionRepository for InMemorySubmissions {
    async fn create(&self, submission: &Submission) -> Result<Submission, RepositoryError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i64;
        let mut stored = submission.clone();
        stored.id = id;
        self.records.lock().await.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Submission>, RepositoryError> {
        Ok(self.records.lock().await.get(&id).cloned())
    }

    async fn update(&self, submission: &Submission) -> Result<Submission, RepositoryError> {
        self.records
            .lock()
            .await
            .insert(submission.id, submission.clone());
        Ok(submission.clone())
    }

    async fn update_status_to_checking(&self, id: i64) -> Result<u64, RepositoryError> {
        let mut records = self.records.lock().await;
        match records.get_mut(&id) {
            Some(record) if record.status == SubmissionStatus::Pending => {
                record.status = SubmissionStatus::Checking;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn find_pending(&self, _limit: u64) -> Result<Vec<Submission>, RepositoryError> {
        Ok(Vec::new())
    }
}

struct InMemoryDeadLinks {
    rows: Mutex<HashMap<String, DeadLink>>,
}

#[async_trait]
impl DeadLinkRepository for InMemoryDeadLinks {
    async fn find_by_links(&self, links: &[String]) -> Result<Vec<DeadLink>, RepositoryError> {
        let rows = self.rows.lock().await;
        Ok(links.iter().filter_map(|link| rows.get(link).cloned()).collect())
    }

    async fn exists(&self, link: &str) -> Result<bool, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .await
            .get(link)
            .is_some_and(|row| !row.rate_limited))
    }

    async fn create_or_update(&self, dead_link: &DeadLink) -> Result<(), RepositoryError> {
        self.rows
            .lock()
            .await
            .insert(dead_link.link.clone(), dead_link.clone());
        Ok(())
    }

    async fn list_rate_limited(
        &self,
        _page: u64,
        _page_size: u64,
        _platform: Option<Platform>,
    ) -> Result<(Vec<DeadLink>, u64), RepositoryError> {
        Ok((Vec::new(), 0))
    }

    async fn delete_rate_limited(&self) -> Result<u64, RepositoryError> {
        Ok(0)
    }
}

struct InMemoryExecutions {
    rows: Mutex<HashMap<i64, JobExecution>>,
    next_id: AtomicUsize,
}

#[async_trait]
impl JobExecutionRepository for InMemoryExecutions {
    async fn create(&self, execution: &JobExecution) -> Result<JobExecution, RepositoryError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i64;
        let mut stored = execution.clone();
        stored.id = id;
        self.rows.lock().await.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, execution: &JobExecution) -> Result<(), RepositoryError> {
        self.rows.lock().await.insert(execution.id, execution.clone());
        Ok(())
    }

    async fn list_by_job_id(
        &self,
        job_id: i64,
        _page: u64,
        _page_size: u64,
    ) -> Result<(Vec<JobExecution>, u64), RepositoryError> {
        let rows: Vec<JobExecution> = self
            .rows
            .lock()
            .await
            .values()
            .filter(|row| row.job_id == job_id)
            .cloned()
            .collect();
        let total = rows.len() as u64;
        Ok((rows, total))
    }
}

struct AlwaysValidProbe;

#[async_trait]
impl LinkProbe for AlwaysValidProbe {
    async fn check(&self, _link: &str) -> CheckOutcome {
        CheckOutcome::valid(3)
    }

    fn platform(&self) -> Platform {
        Platform::Quark
    }

    fn concurrency_limit(&self) -> usize {
        5
    }
}

/// 单连接HTTP桩：返回固定JSON响应体
async fn spawn_http_stub(body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((mut stream, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes()).await;
        }
    });
    format!("http://{}", addr)
}

fn build_executor(
    submissions: Arc<InMemorySubmissions>,
    dead_links: Arc<InMemoryDeadLinks>,
    executions: Arc<InMemoryExecutions>,
) -> JobExecutor {
    let mut registry = ProbeRegistry::new();
    registry.register(Arc::new(AlwaysValidProbe));
    let dispatcher = Arc::new(Dispatcher::new(
        submissions.clone(),
        dead_links.clone(),
        Arc::new(OutcomeCache::new(None, TtlConfig::default())),
        Arc::new(registry),
    ));
    let service = Arc::new(SubmissionService::new(submissions, dead_links));
    JobExecutor::new(executions, service, dispatcher, reqwest::Client::new())
}

fn job_with_command(url: &str) -> ScheduledJob {
    ScheduledJob {
        id: 1,
        name: "feed".into(),
        description: String::new(),
        tags: vec![],
        http_command: format!("curl {}", url),
        transform_script: "return rawData;".into(),
        cron_expression: "*/10 * * * * *".into(),
        status: JobStatus::Active,
        auto_destroy_at: None,
        last_run_at: None,
        next_run_at: None,
        created_at: Utc::now().into(),
    }
}

#[tokio::test]
async fn test_job_execution_feeds_standard_pipeline() {
    let submissions = Arc::new(InMemorySubmissions {
        records: Mutex::new(HashMap::new()),
        next_id: AtomicUsize::new(1),
    });
    let dead_links = Arc::new(InMemoryDeadLinks {
        rows: Mutex::new(HashMap::new()),
    });
    let executions = Arc::new(InMemoryExecutions {
        rows: Mutex::new(HashMap::new()),
        next_id: AtomicUsize::new(1),
    });
    let executor = build_executor(submissions.clone(), dead_links.clone(), executions.clone());

    let url = spawn_http_stub(r#"["https://pan.quark.cn/s/feed01"]"#).await;
    executor.execute(&job_with_command(&url)).await.unwrap();

    // 恰好一条以 system 身份创建的提交，且已检测完成
    let records = submissions.records.lock().await;
    assert_eq!(records.len(), 1);
    let record = records.values().next().unwrap();
    assert_eq!(record.client_ip, "system");
    assert_eq!(record.status, SubmissionStatus::Checked);
    assert_eq!(record.valid_links, vec!["https://pan.quark.cn/s/feed01"]);
    drop(records);

    let executions = executions.rows.lock().await;
    assert_eq!(executions.len(), 1);
    let execution = executions.values().next().unwrap();
    assert_eq!(execution.status, ExecutionStatus::Success);
    assert_eq!(execution.links_count, 1);
    assert_eq!(execution.checked_count, 1);
    assert_eq!(execution.valid_count, 1);
    assert_eq!(execution.invalid_count, 0);
    assert!(execution.finished_at.is_some());
    assert!(execution.execution_duration.is_some());
}

#[tokio::test]
async fn test_failed_command_marks_execution_failed() {
    let submissions = Arc::new(InMemorySubmissions {
        records: Mutex::new(HashMap::new()),
        next_id: AtomicUsize::new(1),
    });
    let dead_links = Arc::new(InMemoryDeadLinks {
        rows: Mutex::new(HashMap::new()),
    });
    let executions = Arc::new(InMemoryExecutions {
        rows: Mutex::new(HashMap::new()),
        next_id: AtomicUsize::new(1),
    });
    let executor = build_executor(submissions, dead_links, executions.clone());

    // URL缺失时解析即失败
    let mut job = job_with_command("http://127.0.0.1:1");
    job.http_command = "curl -H 'X: y'".into();
    let result = executor.execute(&job).await;
    assert!(result.is_err());

    let executions = executions.rows.lock().await;
    let execution = executions.values().next().unwrap();
    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert!(execution.error_message.is_some());
}
