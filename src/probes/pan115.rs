// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::link::CheckOutcome;
use crate::domain::models::platform::Platform;
use crate::probes::core::{apply_browser_headers, elapsed_ms, ProbeCore};
use crate::probes::traits::LinkProbe;
use crate::utils::link_parser::extract_115_params;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Instant;

/// 115网盘探测器
///
/// GET webapi/share/snap 接口，Referer 指向分享页。
/// `state=true 且 errno=0` 即有效，否则以返回的 `error` 为失败原因。
pub struct Pan115Probe {
    core: ProbeCore,
}

#[derive(Debug, Deserialize)]
struct SnapResponse {
    #[serde(default)]
    state: bool,
    #[serde(default)]
    error: String,
    #[serde(default)]
    errno: i64,
}

impl Pan115Probe {
    pub fn new(core: ProbeCore) -> Self {
        Self { core }
    }

    async fn probe(&self, link: &str, start: Instant) -> CheckOutcome {
        let (share_code, receive_code) = match extract_115_params(link) {
            Some(params) => params,
            None => {
                return CheckOutcome::invalid("链接格式无效", elapsed_ms(start));
            }
        };
        if share_code.is_empty() {
            return CheckOutcome::invalid("链接格式无效: 缺少分享码", elapsed_ms(start));
        }
        if receive_code.is_empty() {
            return CheckOutcome::invalid("链接格式无效: 缺少提取码", elapsed_ms(start));
        }

        let api_url = format!(
            "https://115cdn.com/webapi/share/snap?share_code={}&offset=0&limit=20&receive_code={}&cid=",
            share_code, receive_code
        );
        let referer = format!(
            "https://115cdn.com/s/{}?password={}&",
            share_code, receive_code
        );

        let response = apply_browser_headers(self.core.client().get(&api_url))
            .header("Priority", "u=1, i")
            .header("Referer", referer)
            .header("Sec-Fetch-Dest", "empty")
            .header("Sec-Fetch-Mode", "cors")
            .header("Sec-Fetch-Site", "same-origin")
            .header("X-Requested-With", "XMLHttpRequest")
            .send()
            .await;

        let response = match response {
            Ok(resp) => resp,
            Err(e) => {
                if e.is_timeout() {
                    return CheckOutcome::invalid("请求超时", elapsed_ms(start));
                }
                return CheckOutcome::invalid(format!("检测失败: {}", e), elapsed_ms(start));
            }
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return CheckOutcome::invalid(
                format!("API返回错误状态码: {}, 响应: {}", status, body),
                elapsed_ms(start),
            );
        }

        let parsed: SnapResponse = match response.json().await {
            Ok(json) => json,
            Err(e) => {
                return CheckOutcome::invalid(format!("解析JSON失败: {}", e), elapsed_ms(start))
            }
        };

        if parsed.state && parsed.errno == 0 {
            return CheckOutcome::valid(elapsed_ms(start));
        }

        CheckOutcome::invalid(parsed.error, elapsed_ms(start))
    }
}

#[async_trait]
impl LinkProbe for Pan115Probe {
    async fn check(&self, link: &str) -> CheckOutcome {
        self.core.pace().await;
        let start = Instant::now();
        match tokio::time::timeout(self.core.timeout(), self.probe(link, start)).await {
            Ok(outcome) => outcome,
            Err(_) => CheckOutcome::invalid("请求超时", elapsed_ms(start)),
        }
    }

    fn platform(&self) -> Platform {
        self.core.platform()
    }

    fn concurrency_limit(&self) -> usize {
        self.core.concurrency_limit()
    }
}
