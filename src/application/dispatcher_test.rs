use super::*;
use crate::domain::models::submission::DeviceInfo;
use crate::infrastructure::cache::TtlConfig;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

struct MockSubmissionRepository {
    records: Mutex<HashMap<i64, Submission>>,
    next_id: AtomicUsize,
}

impl MockSubmissionRepository {
    fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            next_id: AtomicUsize::new(1),
        }
    }

    async fn seed(&self, links: Vec<String>, selected: Vec<Platform>) -> i64 {
        let submission = Submission::new(
            links.clone(),
            links,
            selected,
            "127.0.0.1".into(),
            DeviceInfo::default(),
        );
        self.create(&submission).await.unwrap().id
    }
}

#[async_trait]
impl SubmissionRepository for MockSubmissionRepository {
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
        let mut records = self.records.lock().await;
        if !records.contains_key(&submission.id) {
            return Err(RepositoryError::NotFound);
        }
        records.insert(submission.id, submission.clone());
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

    async fn find_pending(&self, limit: u64) -> Result<Vec<Submission>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .await
            .values()
            .filter(|record| record.status == SubmissionStatus::Pending)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

struct MockDeadLinkRepository {
    rows: Mutex<HashMap<String, DeadLink>>,
}

impl MockDeadLinkRepository {
    fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
        }
    }

    async fn get(&self, link: &str) -> Option<DeadLink> {
        self.rows.lock().await.get(link).cloned()
    }
}

#[async_trait]
impl DeadLinkRepository for MockDeadLinkRepository {
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
        let rows: Vec<DeadLink> = self
            .rows
            .lock()
            .await
            .values()
            .filter(|row| row.rate_limited)
            .cloned()
            .collect();
        let total = rows.len() as u64;
        Ok((rows, total))
    }

    async fn delete_rate_limited(&self) -> Result<u64, RepositoryError> {
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|_, row| !row.rate_limited);
        Ok((before - rows.len()) as u64)
    }
}

struct MockProbe {
    platform: Platform,
    outcome: CheckOutcome,
    calls: AtomicUsize,
}

impl MockProbe {
    fn new(platform: Platform, outcome: CheckOutcome) -> Arc<Self> {
        Arc::new(Self {
            platform,
            outcome,
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LinkProbe for MockProbe {
    async fn check(&self, _link: &str) -> CheckOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }

    fn platform(&self) -> Platform {
        self.platform
    }

    fn concurrency_limit(&self) -> usize {
        5
    }
}

struct Harness {
    submissions: Arc<MockSubmissionRepository>,
    dead_links: Arc<MockDeadLinkRepository>,
    dispatcher: Dispatcher,
}

fn harness(probes: Vec<Arc<MockProbe>>) -> Harness {
    let submissions = Arc::new(MockSubmissionRepository::new());
    let dead_links = Arc::new(MockDeadLinkRepository::new());
    let mut registry = ProbeRegistry::new();
    for probe in probes {
        registry.register(probe);
    }
    let dispatcher = Dispatcher::new(
        submissions.clone(),
        dead_links.clone(),
        Arc::new(OutcomeCache::new(None, TtlConfig::default())),
        Arc::new(registry),
    );
    Harness {
        submissions,
        dead_links,
        dispatcher,
    }
}

#[tokio::test]
async fn test_unfiltered_dispatch_partitions_links() {
    let quark = MockProbe::new(Platform::Quark, CheckOutcome::valid(5));
    let baidu = MockProbe::new(Platform::Baidu, CheckOutcome::invalid("分享文件已过期", 7));
    let h = harness(vec![quark.clone(), baidu.clone()]);

    let links = vec![
        "https://pan.quark.cn/s/aaa111".to_string(),
        "https://pan.baidu.com/s/1bbb222".to_string(),
        "https://unknown.example.com/x".to_string(),
    ];
    let id = h.submissions.seed(links.clone(), vec![]).await;

    let result = h.dispatcher.dispatch(id, links, vec![]).await.unwrap();

    assert_eq!(result.status, SubmissionStatus::Checked);
    assert!(result.checked_at.is_some());
    assert_eq!(result.valid_links, vec!["https://pan.quark.cn/s/aaa111"]);
    assert!(result.pending_links.is_empty());

    // 有效 ⊎ 失效 覆盖全部识别与未识别链接
    let baidu_row = h.dead_links.get("https://pan.baidu.com/s/1bbb222").await.unwrap();
    assert_eq!(baidu_row.failure_reason, "分享文件已过期");
    assert!(!baidu_row.rate_limited);
    assert_eq!(baidu_row.submission_id, Some(id));

    let unknown_row = h.dead_links.get("https://unknown.example.com/x").await.unwrap();
    assert_eq!(unknown_row.failure_reason, "无法识别网盘平台类型");
    assert_eq!(unknown_row.platform, Platform::Unknown);
}

#[tokio::test]
async fn test_concurrent_dispatch_single_owner() {
    let quark = MockProbe::new(Platform::Quark, CheckOutcome::valid(5));
    let h = harness(vec![quark]);

    let links = vec!["https://pan.quark.cn/s/race01".to_string()];
    let id = h.submissions.seed(links.clone(), vec![]).await;

    let (first, second) = tokio::join!(
        h.dispatcher.dispatch(id, links.clone(), vec![]),
        h.dispatcher.dispatch(id, links.clone(), vec![]),
    );

    // 恰有一个执行者，落败者观察到CAS=0静默退出
    let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    let loser = if first.is_err() { first } else { second };
    assert!(matches!(loser, Err(DispatchError::AlreadyOwned(_))));
}

#[tokio::test]
async fn test_confirmed_dead_link_short_circuits() {
    let quark = MockProbe::new(Platform::Quark, CheckOutcome::valid(5));
    let h = harness(vec![quark.clone()]);

    let link = "https://pan.quark.cn/s/dead01".to_string();
    h.dead_links
        .create_or_update(&DeadLink::from_outcome(
            link.clone(),
            Platform::Quark,
            "链接已失效".into(),
            Some(3),
            false,
            None,
        ))
        .await
        .unwrap();

    let id = h.submissions.seed(vec![link.clone()], vec![]).await;
    let result = h.dispatcher.dispatch(id, vec![link], vec![]).await.unwrap();

    // 确认失效的链接不再发起探测
    assert_eq!(quark.call_count(), 0);
    assert!(result.valid_links.is_empty());
    assert_eq!(result.status, SubmissionStatus::Checked);
}

#[tokio::test]
async fn test_rate_limited_row_reprobes() {
    let aliyun = MockProbe::new(Platform::Aliyun, CheckOutcome::valid(5));
    let h = harness(vec![aliyun.clone()]);

    let link = "https://www.alipan.com/s/limited1".to_string();
    h.dead_links
        .create_or_update(&DeadLink::from_outcome(
            link.clone(),
            Platform::Aliyun,
            "API频率限制（429错误）".into(),
            Some(3),
            true,
            None,
        ))
        .await
        .unwrap();

    let id = h.submissions.seed(vec![link.clone()], vec![]).await;
    let result = h.dispatcher.dispatch(id, vec![link.clone()], vec![]).await.unwrap();

    // 限流记录不短路，必须重新探测
    assert_eq!(aliyun.call_count(), 1);
    assert_eq!(result.valid_links, vec![link]);
}

#[tokio::test]
async fn test_rate_limited_outcome_recorded_and_reprobed() {
    let aliyun = MockProbe::new(
        Platform::Aliyun,
        CheckOutcome::rate_limited("API频率限制（429错误）", 9),
    );
    let h = harness(vec![aliyun.clone()]);

    let link = "https://www.alipan.com/s/throttle1".to_string();
    let id = h.submissions.seed(vec![link.clone()], vec![]).await;
    let result = h
        .dispatcher
        .dispatch(id, vec![link.clone()], vec![])
        .await
        .unwrap();

    assert!(result.valid_links.is_empty());
    let row = h.dead_links.get(&link).await.unwrap();
    assert!(row.rate_limited);

    // 第二次提交同一链接仍会探测
    let id2 = h.submissions.seed(vec![link.clone()], vec![]).await;
    h.dispatcher.dispatch(id2, vec![link], vec![]).await.unwrap();
    assert_eq!(aliyun.call_count(), 2);
}

#[tokio::test]
async fn test_platform_filter_keeps_pending() {
    let quark = MockProbe::new(Platform::Quark, CheckOutcome::valid(5));
    let baidu = MockProbe::new(Platform::Baidu, CheckOutcome::valid(5));
    let xunlei = MockProbe::new(Platform::Xunlei, CheckOutcome::valid(5));
    let h = harness(vec![quark.clone(), baidu.clone(), xunlei.clone()]);

    let links = vec![
        "https://pan.quark.cn/s/q1abc".to_string(),
        "https://pan.quark.cn/s/q2def".to_string(),
        "https://pan.baidu.com/s/1bd111".to_string(),
        "https://pan.baidu.com/s/1bd222".to_string(),
        "https://pan.xunlei.com/s/xl3333".to_string(),
    ];
    let id = h.submissions.seed(links.clone(), vec![Platform::Quark]).await;

    let result = h
        .dispatcher
        .dispatch(id, links, vec![Platform::Quark])
        .await
        .unwrap();

    // 只检测选中平台，其余保留待检测，状态维持pending
    assert_eq!(result.valid_links.len(), 2);
    assert_eq!(result.pending_links.len(), 3);
    assert_eq!(result.status, SubmissionStatus::Pending);
    assert!(result.checked_at.is_none());
    assert_eq!(quark.call_count(), 2);
    assert_eq!(baidu.call_count(), 0);
    assert_eq!(xunlei.call_count(), 0);
}

#[tokio::test]
async fn test_duplicate_links_collapse_to_one_probe() {
    let quark = MockProbe::new(Platform::Quark, CheckOutcome::valid(5));
    let h = harness(vec![quark.clone()]);

    let links = vec![
        "https://pan.quark.cn/s/dup001".to_string(),
        "https://pan.quark.cn/s/dup001".to_string(),
        "  https://pan.quark.cn/s/dup001  ".to_string(),
    ];
    let id = h.submissions.seed(links.clone(), vec![]).await;
    let result = h.dispatcher.dispatch(id, links, vec![]).await.unwrap();

    assert_eq!(quark.call_count(), 1);
    assert_eq!(result.valid_links.len(), 1);
}

#[tokio::test]
async fn test_checked_submission_rejects_second_dispatch() {
    let quark = MockProbe::new(Platform::Quark, CheckOutcome::valid(5));
    let h = harness(vec![quark]);

    let links = vec!["https://pan.quark.cn/s/once01".to_string()];
    let id = h.submissions.seed(links.clone(), vec![]).await;
    h.dispatcher.dispatch(id, links.clone(), vec![]).await.unwrap();

    let second = h.dispatcher.dispatch(id, links, vec![]).await;
    assert!(matches!(second, Err(DispatchError::AlreadyOwned(_))));
}
