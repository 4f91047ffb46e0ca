// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::link::CheckOutcome;
use crate::domain::models::platform::Platform;
use crate::probes::core::{apply_browser_headers, elapsed_ms, ProbeCore};
use crate::probes::traits::LinkProbe;
use async_trait::async_trait;
use std::time::Instant;
use url::Url;

/// 阿里云盘探测器
///
/// 匿名POST get_share_by_anonymous 接口，携带固定跨站请求头。
/// 200即有效；429归类为被平台限流并持久化，但不短路后续探测。
pub struct AliyunProbe {
    core: ProbeCore,
}

impl AliyunProbe {
    pub fn new(core: ProbeCore) -> Self {
        Self { core }
    }

    fn extract_share_id(link: &str) -> Option<String> {
        let url = Url::parse(link).ok()?;
        let share_id = url.path().trim_matches('/').split('/').next_back()?;
        if share_id.is_empty() {
            None
        } else {
            Some(share_id.to_string())
        }
    }

    async fn probe(&self, link: &str, start: Instant) -> CheckOutcome {
        let share_id = match Self::extract_share_id(link) {
            Some(id) => id,
            None => {
                return CheckOutcome::invalid(
                    "链接格式无效: URL中未找到share_id",
                    elapsed_ms(start),
                )
            }
        };

        let api_url = format!(
            "https://api.aliyundrive.com/adrive/v3/share_link/get_share_by_anonymous?share_id={}",
            share_id
        );
        let body = format!(r#"{{"share_id":"{}"}}"#, share_id);

        let response = apply_browser_headers(self.core.client().post(&api_url))
            .header("authorization", "")
            .header("content-type", "application/json")
            .header("origin", "https://www.alipan.com")
            .header("priority", "u=1, i")
            .header("referer", "https://www.alipan.com/")
            .header("sec-fetch-dest", "empty")
            .header("sec-fetch-mode", "cors")
            .header("sec-fetch-site", "cross-site")
            .header("x-canary", "client=web,app=share,version=v2.3.1")
            .body(body)
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

        let status = response.status().as_u16();
        if status == 429 {
            let body = response.text().await.unwrap_or_default();
            return CheckOutcome::rate_limited(
                format!("API频率限制（429错误）: API返回错误状态码: 429, 响应: {}", body),
                elapsed_ms(start),
            );
        }
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return CheckOutcome::invalid(
                format!("检测失败: API返回错误状态码: {}, 响应: {}", status, body),
                elapsed_ms(start),
            );
        }

        // 200且带分享结构即有效，字段内容无需进一步检查
        CheckOutcome::valid(elapsed_ms(start))
    }
}

#[async_trait]
impl LinkProbe for AliyunProbe {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_share_id() {
        assert_eq!(
            AliyunProbe::extract_share_id("https://www.alipan.com/s/xyz987").as_deref(),
            Some("xyz987")
        );
        assert_eq!(
            AliyunProbe::extract_share_id("https://aliyundrive.com/s/AbC123").as_deref(),
            Some("AbC123")
        );
    }
}
