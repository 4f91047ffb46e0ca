// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::link::CheckOutcome;
use crate::domain::models::platform::Platform;
use crate::probes::core::{apply_browser_headers, elapsed_ms, percent_encode, ProbeCore};
use crate::probes::traits::LinkProbe;
use crate::utils::link_parser::extract_tianyi_code;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Instant;

/// 天翼云盘探测器
///
/// 单次GET getShareInfoByCodeV2 接口。`shareId > 0` 即有效，
/// 即使分享需要访问码；否则以 `res_message` 作为失败原因。
pub struct TianyiProbe {
    core: ProbeCore,
}

/// 电信云盘API返回结构
#[derive(Debug, Deserialize)]
struct ShareInfoResponse {
    #[serde(default)]
    res_message: String,
    #[serde(default, rename = "shareId")]
    share_id: i64,
}

impl TianyiProbe {
    pub fn new(core: ProbeCore) -> Self {
        Self { core }
    }

    async fn probe(&self, link: &str, start: Instant) -> CheckOutcome {
        let (code, access_code) = match extract_tianyi_code(link) {
            Some(parts) => parts,
            None => {
                return CheckOutcome::invalid(
                    "链接格式无效: 未找到分享码",
                    elapsed_ms(start),
                )
            }
        };

        // 有访问码时以 分享码（访问码：xxx） 形式拼入参数
        let share_code_param = match &access_code {
            Some(access) => format!("{}（访问码：{}）", code, access),
            None => code,
        };

        let no_cache: f64 = rand::random();
        let url = format!(
            "https://cloud.189.cn/api/open/share/getShareInfoByCodeV2.action?noCache={}&shareCode={}",
            no_cache,
            percent_encode(&share_code_param)
        );

        let response = apply_browser_headers(self.core.client().get(&url))
            .header("priority", "u=1, i")
            .header("referer", link)
            .header("sec-fetch-dest", "empty")
            .header("sec-fetch-mode", "cors")
            .header("sec-fetch-site", "same-origin")
            .header("sign-type", "1")
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

        let parsed: ShareInfoResponse = match response.json().await {
            Ok(json) => json,
            Err(e) => {
                return CheckOutcome::invalid(format!("解析JSON失败: {}", e), elapsed_ms(start))
            }
        };

        if parsed.share_id > 0 {
            return CheckOutcome::valid(elapsed_ms(start));
        }

        let reason = if parsed.res_message.is_empty() {
            format!("无法获取分享信息 (ShareId={})", parsed.share_id)
        } else {
            parsed.res_message
        };
        CheckOutcome::invalid(reason, elapsed_ms(start))
    }
}

#[async_trait]
impl LinkProbe for TianyiProbe {
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
    fn test_percent_encode_access_code_param() {
        let encoded = percent_encode("abcDEF（访问码：xyz9）");
        assert!(encoded.starts_with("abcDEF%"));
        assert!(!encoded.contains('（'));
        assert!(encoded.contains("xyz9"));
    }
}
