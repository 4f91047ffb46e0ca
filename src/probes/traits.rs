// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::link::CheckOutcome;
use crate::domain::models::platform::Platform;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// 链接探测器特质
///
/// 一次探测 = 向平台询问一条规范化链接的可见性。
/// 探测器从不向调用方抛错，所有失败都折叠为 `CheckOutcome`。
#[async_trait]
pub trait LinkProbe: Send + Sync {
    /// 检测链接是否有效
    async fn check(&self, link: &str) -> CheckOutcome;

    /// 返回平台类型
    fn platform(&self) -> Platform;

    /// 返回平台并发限制数
    fn concurrency_limit(&self) -> usize;
}

/// 探测器注册表
///
/// 按平台索引的探测器集合，调度器据此分发
#[derive(Default)]
pub struct ProbeRegistry {
    probes: HashMap<Platform, Arc<dyn LinkProbe>>,
}

impl ProbeRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self {
            probes: HashMap::new(),
        }
    }

    /// 注册探测器
    pub fn register(&mut self, probe: Arc<dyn LinkProbe>) {
        self.probes.insert(probe.platform(), probe);
    }

    /// 获取指定平台的探测器
    pub fn get(&self, platform: Platform) -> Option<Arc<dyn LinkProbe>> {
        self.probes.get(&platform).cloned()
    }
}
