// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::link::CheckOutcome;
use crate::domain::models::platform::Platform;
use crate::probes::core::{elapsed_ms, ProbeCore};
use crate::probes::page_scan::{classify_share_page, PageVerdict};
use crate::probes::traits::LinkProbe;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Instant;

/// 移动端UA，UC分享页对桌面UA返回跳转页
const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 10; SM-G975F) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/87.0.4280.101 Mobile Safari/537.36";

static SHARE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:drive\.uc\.cn|yun\.uc\.cn|uc\.cn)/s/([a-zA-Z0-9]+)").unwrap());

/// UC网盘探测器
///
/// GET 分享页并按关键词分类。网络错误偏向判定为有效以避免误杀，
/// 该偏置由 `ProbePolicy::treat_errors_as_valid` 控制。
pub struct UcProbe {
    core: ProbeCore,
}

impl UcProbe {
    pub fn new(core: ProbeCore) -> Self {
        Self { core }
    }

    async fn probe(&self, link: &str, start: Instant) -> CheckOutcome {
        let share_id = match SHARE_ID.captures(link).and_then(|c| c.get(1)) {
            Some(m) => m.as_str().to_string(),
            None => {
                return CheckOutcome::invalid(
                    "链接格式无效: 无法提取share_id",
                    elapsed_ms(start),
                )
            }
        };

        let url = format!("https://drive.uc.cn/s/{}", share_id);
        let response = self
            .core
            .client()
            .get(&url)
            .header("User-Agent", MOBILE_USER_AGENT)
            .send()
            .await;

        let response = match response {
            Ok(resp) => resp,
            Err(e) => {
                if self.core.policy().treat_errors_as_valid && (e.is_timeout() || e.is_connect()) {
                    return CheckOutcome::valid(elapsed_ms(start));
                }
                return CheckOutcome::invalid(format!("请求失败: {}", e), elapsed_ms(start));
            }
        };

        if !response.status().is_success() {
            return CheckOutcome::invalid(
                format!("HTTP状态码: {}", response.status().as_u16()),
                elapsed_ms(start),
            );
        }

        let body = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                return CheckOutcome::invalid(format!("读取响应失败: {}", e), elapsed_ms(start))
            }
        };

        match classify_share_page(&body) {
            PageVerdict::Invalid => CheckOutcome::invalid("链接已失效", elapsed_ms(start)),
            PageVerdict::Valid => CheckOutcome::valid(elapsed_ms(start)),
            PageVerdict::Undecidable => {
                CheckOutcome::invalid("无法判断链接有效性", elapsed_ms(start))
            }
        }
    }
}

#[async_trait]
impl LinkProbe for UcProbe {
    async fn check(&self, link: &str) -> CheckOutcome {
        self.core.pace().await;
        let start = Instant::now();
        match tokio::time::timeout(self.core.timeout(), self.probe(link, start)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                if self.core.policy().treat_errors_as_valid {
                    // 超时视为有效，避免误判
                    CheckOutcome::valid(elapsed_ms(start))
                } else {
                    CheckOutcome::invalid("请求超时", elapsed_ms(start))
                }
            }
        }
    }

    fn platform(&self) -> Platform {
        self.core.platform()
    }

    fn concurrency_limit(&self) -> usize {
        self.core.concurrency_limit()
    }
}
