// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::platform::Platform;
use crate::domain::models::setting::PlatformRateConfig;
use crate::probes::rate_gate::RateGate;
use std::time::Duration;

/// 默认并发数
const DEFAULT_CONCURRENCY: usize = 5;

/// 探测策略开关
///
/// 将可疑的历史行为收敛为显式开关，运维可按平台调整而无需改动协议代码
#[derive(Debug, Clone, Copy, Default)]
pub struct ProbePolicy {
    /// 传输层错误（含超时）偏向判定为有效，避免误杀
    pub treat_errors_as_valid: bool,
    /// 无法归类的响应形态判定为被平台限流（百度挑战页场景）
    pub challenge_as_rate_limited: bool,
}

/// 探测器公共部分
///
/// 持有平台标识、超时、频率闸门、HTTP客户端与策略开关
pub struct ProbeCore {
    platform: Platform,
    timeout: Duration,
    concurrency: usize,
    rate_gate: RateGate,
    client: reqwest::Client,
    policy: ProbePolicy,
}

impl ProbeCore {
    /// 创建探测器公共部分
    pub fn new(
        platform: Platform,
        timeout: Duration,
        client: reqwest::Client,
        rate_config: &PlatformRateConfig,
        policy: ProbePolicy,
    ) -> Self {
        let concurrency = if rate_config.concurrency > 0 {
            rate_config.concurrency
        } else {
            DEFAULT_CONCURRENCY
        };
        Self {
            platform,
            timeout,
            concurrency,
            rate_gate: RateGate::new(rate_config),
            client,
            policy,
        }
    }

    /// 应用平台频率限制
    pub async fn pace(&self) {
        self.rate_gate.acquire().await;
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn policy(&self) -> ProbePolicy {
        self.policy
    }
}

/// 自起始时刻起的毫秒耗时
pub fn elapsed_ms(start: std::time::Instant) -> i64 {
    start.elapsed().as_millis() as i64
}

/// 查询参数百分号编码
pub(crate) fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len() * 3);
    for byte in value.as_bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(*byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

/// 桌面浏览器默认请求头
///
/// 各网盘接口按普通浏览器访问对待
pub fn apply_browser_headers(builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    builder
        .header("accept", "application/json;charset=UTF-8")
        .header("accept-language", "en,zh-CN;q=0.9,zh;q=0.8")
        .header(
            "user-agent",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/141.0.0.0 Safari/537.36",
        )
        .header("cache-control", "no-cache")
        .header("pragma", "no-cache")
}
