// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::link::CheckOutcome;
use crate::domain::models::platform::Platform;
use crate::probes::core::{elapsed_ms, ProbeCore};
use crate::probes::traits::LinkProbe;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::time::Instant;
use url::Url;

static SHARE_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:www\.)?(?:123684|123685|123912|123pan|123592|123865)\.com/s/([a-zA-Z0-9-]+)|(?:www\.)?123pan\.cn/s/([a-zA-Z0-9-]+)").unwrap()
});

/// 123网盘探测器
///
/// GET share/info 接口。`code=0` 或 `data.HasPwd=true` 即有效。
/// 传输错误与403偏向判定为有效（访问受限不等于链接失效），
/// 由 `ProbePolicy::treat_errors_as_valid` 控制。
pub struct Pan123Probe {
    core: ProbeCore,
}

#[derive(Debug, Deserialize)]
struct ShareInfoResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    data: ShareInfoData,
}

#[derive(Debug, Deserialize, Default)]
struct ShareInfoData {
    #[serde(default, rename = "HasPwd")]
    has_pwd: bool,
}

impl Pan123Probe {
    pub fn new(core: ProbeCore) -> Self {
        Self { core }
    }

    fn extract_share_key(link: &str) -> Option<String> {
        if let Some(caps) = SHARE_KEY.captures(link) {
            if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
                return Some(m.as_str().to_string());
            }
        }
        // 正则未命中时回退到路径最后一段
        let url = Url::parse(link).ok()?;
        let last = url.path().trim_matches('/').split('/').next_back()?;
        if last.is_empty() {
            None
        } else {
            Some(last.to_string())
        }
    }

    async fn probe(&self, link: &str, start: Instant) -> CheckOutcome {
        let share_key = match Self::extract_share_key(link) {
            Some(key) => key,
            None => {
                return CheckOutcome::invalid(
                    "链接格式无效: 无法提取shareKey",
                    elapsed_ms(start),
                )
            }
        };

        let api_url = format!("https://www.123pan.com/api/share/info?shareKey={}", share_key);
        let bias_valid = self.core.policy().treat_errors_as_valid;

        let response = self
            .core
            .client()
            .get(&api_url)
            .header(
                "User-Agent",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
            )
            .send()
            .await;

        let response = match response {
            Ok(resp) => resp,
            Err(e) => {
                if bias_valid {
                    return CheckOutcome::valid(elapsed_ms(start));
                }
                return CheckOutcome::invalid(format!("请求失败: {}", e), elapsed_ms(start));
            }
        };

        // 403是访问限制而非链接失效
        if response.status().as_u16() == 403 {
            return CheckOutcome::valid(elapsed_ms(start));
        }

        let parsed: ShareInfoResponse = match response.json().await {
            Ok(json) => json,
            Err(e) => {
                if bias_valid {
                    return CheckOutcome::valid(elapsed_ms(start));
                }
                return CheckOutcome::invalid(format!("解析响应失败: {}", e), elapsed_ms(start));
            }
        };

        if parsed.code == 0 || parsed.data.has_pwd {
            return CheckOutcome::valid(elapsed_ms(start));
        }

        CheckOutcome::invalid("链接已失效", elapsed_ms(start))
    }
}

#[async_trait]
impl LinkProbe for Pan123Probe {
    async fn check(&self, link: &str) -> CheckOutcome {
        self.core.pace().await;
        let start = Instant::now();
        match tokio::time::timeout(self.core.timeout(), self.probe(link, start)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                if self.core.policy().treat_errors_as_valid {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_share_key() {
        assert_eq!(
            Pan123Probe::extract_share_key("https://www.123pan.com/s/abc-def").as_deref(),
            Some("abc-def")
        );
        assert_eq!(
            Pan123Probe::extract_share_key("https://123865.com/s/xyz123").as_deref(),
            Some("xyz123")
        );
        assert_eq!(
            Pan123Probe::extract_share_key("https://www.123pan.cn/s/qq-11").as_deref(),
            Some("qq-11")
        );
    }
}
