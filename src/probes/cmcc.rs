// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::link::CheckOutcome;
use crate::domain::models::platform::Platform;
use crate::probes::cmcc_crypto;
use crate::probes::core::{elapsed_ms, ProbeCore};
use crate::probes::traits::LinkProbe;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use std::time::Instant;

static SHARE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https://(?:yun\.139\.com/shareweb/#/w/i/|caiyun\.139\.com/m/i\?)([^&]+)").unwrap()
});

/// 中国移动云盘探测器
///
/// POST getOutLinkInfoV6，请求与响应均为AES-CBC加密信封。
/// 解密后 `resultCode="0"` 且 `data` 非空即有效，否则取 `desc` 为原因。
pub struct CmccProbe {
    core: ProbeCore,
}

impl CmccProbe {
    pub fn new(core: ProbeCore) -> Self {
        Self { core }
    }

    async fn probe(&self, link: &str, start: Instant) -> CheckOutcome {
        let share_id = match SHARE_ID.captures(link).and_then(|c| c.get(1)) {
            Some(m) => m.as_str().to_string(),
            None => {
                return CheckOutcome::invalid(
                    "链接格式无效：无法提取分享ID",
                    elapsed_ms(start),
                )
            }
        };

        let response = match self.get_share_info(&share_id).await {
            Ok(value) => value,
            Err(e) => {
                return CheckOutcome::invalid(format!("检测失败: {}", e), elapsed_ms(start));
            }
        };

        let result_code = response
            .get("resultCode")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let has_data = response.get("data").is_some_and(|data| !data.is_null());

        if result_code == "0" && has_data {
            return CheckOutcome::valid(elapsed_ms(start));
        }

        let desc = response
            .get("desc")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let reason = if !desc.is_empty() {
            desc.to_string()
        } else if !result_code.is_empty() {
            format!("错误码: {}", result_code)
        } else {
            "获取分享信息失败".to_string()
        };
        CheckOutcome::invalid(reason, elapsed_ms(start))
    }

    /// 获取分享信息
    async fn get_share_info(&self, share_id: &str) -> Result<Value, anyhow::Error> {
        let request_data = json!({
            "getOutLinkInfoReq": {
                "account": "",
                "linkID": share_id,
                "passwd": "",
                "caSrt": 1,
                "coSrt": 1,
                "srtDr": 0,
                "bNum": 1,
                "pCaID": "root",
                "eNum": 200,
            },
            "commonAccountInfo": {
                "account": "",
                "accountType": 1,
            },
        });

        let encrypted = cmcc_crypto::encrypt(&request_data.to_string());
        // 加密后的字符串整体作为JSON字符串字面量发送
        let body = serde_json::to_string(&encrypted)?;

        let response = self
            .core
            .client()
            .post("https://share-kd-njs.yun.139.com/yun-share/richlifeApp/devapp/IOutLink/getOutLinkInfoV6")
            .header(
                "User-Agent",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
            )
            .header("Accept", "application/json, text/plain, */*")
            .header("Content-Type", "application/json")
            .header("hcy-cool-flag", "1")
            .header(
                "x-deviceinfo",
                "||3|12.27.0|chrome|131.0.0.0|5c7c68368f048245e1ce47f1c0f8f2d0||windows 10|1536X695|zh-CN|||",
            )
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let raw = response.text().await?;
        if status != 200 {
            anyhow::bail!("API返回错误状态码: {}, 响应: {}", status, raw);
        }

        let decrypted = cmcc_crypto::decrypt(&raw)
            .map_err(|e| anyhow::anyhow!("解密响应数据失败: {}", e))?;
        let parsed: Value = serde_json::from_str(&decrypted)
            .map_err(|e| anyhow::anyhow!("解析JSON响应失败: {}", e))?;
        Ok(parsed)
    }
}

#[async_trait]
impl LinkProbe for CmccProbe {
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
    fn test_share_id_extraction() {
        let caps = SHARE_ID
            .captures("https://yun.139.com/shareweb/#/w/i/005CiA3gQ")
            .unwrap();
        assert_eq!(caps.get(1).unwrap().as_str(), "005CiA3gQ");

        let caps = SHARE_ID
            .captures("https://caiyun.139.com/m/i?0F5CJUxcdemhy")
            .unwrap();
        assert_eq!(caps.get(1).unwrap().as_str(), "0F5CJUxcdemhy");
    }
}
