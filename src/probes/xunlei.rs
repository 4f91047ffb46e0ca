// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::link::CheckOutcome;
use crate::domain::models::platform::Platform;
use crate::probes::core::{elapsed_ms, percent_encode, ProbeCore};
use crate::probes::traits::LinkProbe;
use async_trait::async_trait;
use flate2::read::{GzDecoder, ZlibDecoder};
use md5::{Digest, Md5};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use std::io::Read;
use std::time::Instant;
use tracing::warn;
use url::Url;

const DEVICE_ID: &str = "5505bd0cab8c9469b98e5891d9fb3e0d";
const CLIENT_ID: &str = "ZUBzD9J_XPXfn7f7";
const CLIENT_VERSION: &str = "1.10.0.2633";
const PACKAGE_NAME: &str = "com.xunlei.browser";
const ANDROID_USER_AGENT: &str = "ANDROID-com.xunlei.browser/1.10.0.2633 networkType/WIFI appid/22062 deviceName/Xiaomi_M2004j7ac deviceModel/M2004J7AC OSVersion/13 protocolVersion/301 platformVersion/10 sdkVersion/233100 Oauth2Client/0.9 (Linux 4_9_337-perf-sn-uotan-gd9d488809c3d3d) (JAVA 0)";

/// 验证码签名盐值表
///
/// 迅雷客户端内置的不透明协议常量，提供方变更即失效
const CAPTCHA_SALTS: [&str; 9] = [
    "uWRwO7gPfdPB/0NfPtfQO+71",
    "F93x+qPluYy6jdgNpq+lwdH1ap6WOM+nfz8/V",
    "0HbpxvpXFsBK5CoTKam",
    "dQhzbhzFRcawnsZqRETT9AuPAJ+wTQso82mRv",
    "SAH98AmLZLRa6DB2u68sGhyiDh15guJpXhBzI",
    "unqfo7Z64Rie9RNHMOB",
    "7yxUdFADp3DOBvXdz0DPuKNVT35wqa5z0DEyEvf",
    "RBG",
    "ThTWPG5eC0UBqlbQ+04nZAptqGCdpv9o55A",
];

static SHARE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"pan\.xunlei\.com/s/([^?/#]+)").unwrap());

/// 迅雷云盘探测器
///
/// 两步协议：先向 shield/captcha/init 换取验证码token（签名为九轮
/// 盐值MD5链），再带 X-Captcha-Token 查询分享状态。
/// 响应可能为gzip或deflate压缩，需手动解码。
pub struct XunleiProbe {
    core: ProbeCore,
}

impl XunleiProbe {
    pub fn new(core: ProbeCore) -> Self {
        Self { core }
    }

    async fn probe(&self, link: &str, start: Instant) -> CheckOutcome {
        let share_id = match SHARE_ID.captures(link).and_then(|c| c.get(1)) {
            Some(m) => m.as_str().to_string(),
            None => {
                return CheckOutcome::invalid(
                    "链接格式无效：无法提取 share_id",
                    elapsed_ms(start),
                )
            }
        };

        let pass_code = Url::parse(link)
            .ok()
            .and_then(|url| {
                url.query_pairs()
                    .find(|(k, _)| k == "pwd")
                    .map(|(_, v)| v.into_owned())
            })
            .unwrap_or_default();

        let captcha_token = match self.fetch_captcha_token().await {
            Ok(token) => token,
            Err(e) => {
                warn!("获取 captcha token 失败: {}", e);
                String::new()
            }
        };

        let api_url = format!(
            "https://api-pan.xunlei.com/drive/v1/share?share_id={}&pass_code={}&limit=100&pass_code_token=&page_token=&thumbnail_size=SIZE_SMALL",
            percent_encode(&share_id),
            percent_encode(&pass_code)
        );

        let mut request = self
            .core
            .client()
            .get(&api_url)
            .header("Accept", "*/*")
            .header("content-type", "application/json")
            .header("origin", "https://pan.xunlei.com")
            .header("referer", "https://pan.xunlei.com/")
            .header(
                "user-agent",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/140.0.0.0 Safari/537.36",
            )
            .header("Accept-Encoding", "gzip, deflate")
            .header("X-Client-Id", CLIENT_ID)
            .header("X-Device-Id", DEVICE_ID);
        if !captcha_token.is_empty() {
            request = request.header("X-Captcha-Token", captcha_token);
        }

        let response = match request.send().await {
            Ok(resp) => resp,
            Err(e) => {
                if e.is_timeout() {
                    return CheckOutcome::invalid("请求超时", elapsed_ms(start));
                }
                return CheckOutcome::invalid(format!("请求失败: {}", e), elapsed_ms(start));
            }
        };

        let status = response.status().as_u16();
        let content_encoding = response
            .headers()
            .get("content-encoding")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let raw = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => {
                return CheckOutcome::invalid(format!("读取响应失败: {}", e), elapsed_ms(start))
            }
        };
        let body = decode_body(&raw, &content_encoding);

        if status != 200 {
            let mut rate_limited = false;
            if let Ok(parsed) = serde_json::from_slice::<Value>(&body) {
                // error_code 为 9 表示被限制，其余错误码均为失效链接
                if parsed.get("error_code").and_then(Value::as_i64) == Some(9) {
                    rate_limited = true;
                }
            }
            let reason = format!(
                "HTTP状态码: {}, 响应内容: {}",
                status,
                String::from_utf8_lossy(&body)
            );
            return if rate_limited {
                CheckOutcome::rate_limited(reason, elapsed_ms(start))
            } else {
                CheckOutcome::invalid(reason, elapsed_ms(start))
            };
        }

        let parsed: Value = match serde_json::from_slice(&body) {
            Ok(value) => value,
            Err(e) => {
                return CheckOutcome::invalid(format!("解析响应失败: {}", e), elapsed_ms(start))
            }
        };

        match parsed.get("share_status").and_then(Value::as_str) {
            Some("OK") => CheckOutcome::valid(elapsed_ms(start)),
            Some(share_status) => {
                let reason = parsed
                    .get("share_status_text")
                    .and_then(Value::as_str)
                    .filter(|text| !text.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("分享状态: {}", share_status));
                CheckOutcome::invalid(reason, elapsed_ms(start))
            }
            None => {
                if let Some(error) = parsed.get("error").and_then(Value::as_str) {
                    if !error.is_empty() {
                        return CheckOutcome::invalid(error, elapsed_ms(start));
                    }
                }
                CheckOutcome::invalid("响应格式异常：缺少 share_status 字段", elapsed_ms(start))
            }
        }
    }

    /// 获取验证码token
    async fn fetch_captcha_token(&self) -> Result<String, anyhow::Error> {
        let (timestamp, captcha_sign) = captcha_sign();

        let meta = json!({
            "username": "",
            "phone_number": "",
            "email": "",
            "user_id": "0",
            "timestamp": timestamp,
            "captcha_sign": captcha_sign,
            "client_version": CLIENT_VERSION,
            "package_name": PACKAGE_NAME,
        });
        let request_body = json!({
            "action": "get:/drive/v1/share",
            "captcha_token": "",
            "client_id": CLIENT_ID,
            "device_id": DEVICE_ID,
            "meta": meta,
            "redirect_uri": "xlaccsdk01://xunlei.com/callback?state=harbor",
        });

        let response = self
            .core
            .client()
            .post("https://xluser-ssl.xunlei.com/v1/shield/captcha/init")
            .header("Accept", "application/json;charset=UTF-8")
            .header("Content-Type", "application/json")
            .header("User-Agent", ANDROID_USER_AGENT)
            .header("x-device-id", DEVICE_ID)
            .header("x-client-id", CLIENT_ID)
            .header("x-client-version", CLIENT_VERSION)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let content_encoding = response
            .headers()
            .get("content-encoding")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let raw = response.bytes().await?.to_vec();
        let body = decode_body(&raw, &content_encoding);

        if status != 200 {
            anyhow::bail!("验证码token请求失败，状态码: {}", status);
        }

        let parsed: Value = serde_json::from_slice(&body)?;
        if let Some(url) = parsed.get("url").and_then(Value::as_str) {
            if !url.is_empty() {
                anyhow::bail!("需要验证: {}", url);
            }
        }

        let token = parsed
            .get("captcha_token")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if token.is_empty() {
            anyhow::bail!("未获取到验证码token");
        }
        Ok(token.to_string())
    }
}

#[async_trait]
impl LinkProbe for XunleiProbe {
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

/// 计算验证码签名
///
/// 对 client_id || client_version || package_name || device_id || timestamp
/// 连续九轮：每轮追加一个盐值后取MD5十六进制，最终加 "1." 前缀
fn captcha_sign() -> (String, String) {
    let timestamp = chrono::Utc::now().timestamp_millis().to_string();
    let mut acc = format!(
        "{}{}{}{}{}",
        CLIENT_ID, CLIENT_VERSION, PACKAGE_NAME, DEVICE_ID, timestamp
    );
    for salt in CAPTCHA_SALTS {
        let digest = Md5::digest(format!("{}{}", acc, salt).as_bytes());
        acc = format!("{:x}", digest);
    }
    (timestamp, format!("1.{}", acc))
}

/// 按Content-Encoding解码响应体
fn decode_body(raw: &[u8], content_encoding: &str) -> Vec<u8> {
    match content_encoding {
        "gzip" => {
            let mut decoder = GzDecoder::new(raw);
            let mut decoded = Vec::new();
            if decoder.read_to_end(&mut decoded).is_ok() {
                decoded
            } else {
                raw.to_vec()
            }
        }
        "deflate" => {
            let mut decoder = ZlibDecoder::new(raw);
            let mut decoded = Vec::new();
            if decoder.read_to_end(&mut decoded).is_ok() {
                decoded
            } else {
                raw.to_vec()
            }
        }
        _ => raw.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_captcha_sign_shape() {
        let (timestamp, sign) = captcha_sign();
        assert!(timestamp.parse::<i64>().is_ok());
        assert!(sign.starts_with("1."));
        // "1." + 32位十六进制
        assert_eq!(sign.len(), 34);
        assert!(sign[2..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_decode_gzip_body() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"{\"share_status\":\"OK\"}").unwrap();
        let compressed = encoder.finish().unwrap();
        let decoded = decode_body(&compressed, "gzip");
        assert_eq!(decoded, b"{\"share_status\":\"OK\"}");
    }

    #[test]
    fn test_decode_passthrough() {
        let raw = b"plain body";
        assert_eq!(decode_body(raw, ""), raw.to_vec());
    }

    #[test]
    fn test_share_id_extraction() {
        let caps = SHARE_ID.captures("https://pan.xunlei.com/s/VN_abc-123?pwd=ha2x").unwrap();
        assert_eq!(caps.get(1).unwrap().as_str(), "VN_abc-123");
    }
}
