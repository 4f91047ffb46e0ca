// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::link::CheckOutcome;
use crate::domain::models::platform::Platform;
use crate::probes::core::{elapsed_ms, ProbeCore};
use crate::probes::traits::LinkProbe;
use crate::utils::link_parser::normalize_baidu_url;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Instant;
use url::Url;

const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

/// 百度网盘探测器
///
/// 两步协议：
/// 1. 禁止重定向GET分享页。302且Location带surl说明分享可达；
///    200且无Location说明已过期；其余形态按历史经验视为百度
///    下发了挑战页，归类为被平台限流。
/// 2. 携带第一步Cookie向 share/verify 提交提取码，按errno分类；
///    errno=0 还必须返回 BDCLND Cookie 才算有效。
pub struct BaiduProbe {
    core: ProbeCore,
}

/// 第一步响应要素
struct Step1Result {
    status: u16,
    full_redirect_url: String,
    surl: String,
    cookies: Vec<String>,
}

/// 第二步响应要素
struct Step2Result {
    status: u16,
    body: String,
    bdclnd: String,
    json: Option<VerifyResponse>,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    #[serde(default)]
    errno: i64,
    #[serde(default)]
    err_msg: String,
}

impl BaiduProbe {
    pub fn new(core: ProbeCore) -> Self {
        Self { core }
    }

    async fn probe(&self, link: &str, start: Instant) -> CheckOutcome {
        let normalized = match normalize_baidu_url(link) {
            Some(url) => url,
            None => {
                return CheckOutcome::invalid(
                    "URL规范化失败: 未找到有效的百度网盘URL",
                    elapsed_ms(start),
                )
            }
        };

        let password = Url::parse(&normalized)
            .ok()
            .and_then(|url| {
                url.query_pairs()
                    .find(|(k, _)| k == "pwd")
                    .map(|(_, v)| v.into_owned())
            })
            .unwrap_or_default();

        let step1 = match self.step1_request(&normalized).await {
            Ok(result) => result,
            Err(e) => {
                return CheckOutcome::invalid(format!("第一步请求失败: {}", e), elapsed_ms(start))
            }
        };

        // 过期分享返回200且无重定向
        if step1.status == 200 && step1.full_redirect_url.is_empty() {
            return CheckOutcome::invalid("分享文件已过期", elapsed_ms(start));
        }

        if step1.status != 302 || step1.full_redirect_url.is_empty() || step1.surl.is_empty() {
            return if self.core.policy().challenge_as_rate_limited {
                CheckOutcome::rate_limited("第一步302失败", elapsed_ms(start))
            } else {
                CheckOutcome::invalid("第一步302失败", elapsed_ms(start))
            };
        }

        let step2 = match self.step2_request(&step1, &password).await {
            Ok(result) => result,
            Err(e) => {
                return CheckOutcome::invalid(format!("第二步请求失败: {}", e), elapsed_ms(start))
            }
        };

        if let Some(json) = &step2.json {
            match json.errno {
                -12 => {
                    return CheckOutcome::invalid(
                        format!("缺少提取码 (errno: {}, err_msg: {})", json.errno, json.err_msg),
                        elapsed_ms(start),
                    )
                }
                -9 => {
                    return CheckOutcome::invalid(
                        format!("提取码错误 (errno: {}, err_msg: {})", json.errno, json.err_msg),
                        elapsed_ms(start),
                    )
                }
                -62 => {
                    return CheckOutcome::rate_limited(
                        format!("请求接口受限 (errno: {}, err_msg: {})", json.errno, json.err_msg),
                        elapsed_ms(start),
                    )
                }
                0 => {}
                other => {
                    return CheckOutcome::invalid(
                        format!("第二步验证失败 (errno: {}, err_msg: {})", other, json.err_msg),
                        elapsed_ms(start),
                    )
                }
            }
        }

        // errno=0 也必须设置BDCLND Cookie，缺失视为被平台限流
        if step2.bdclnd.is_empty() {
            let reason = format!(
                "第二步响应未返回BDCLND Cookie (StatusCode: {}, Response: {})",
                step2.status, step2.body
            );
            return if self.core.policy().challenge_as_rate_limited {
                CheckOutcome::rate_limited(reason, elapsed_ms(start))
            } else {
                CheckOutcome::invalid(reason, elapsed_ms(start))
            };
        }

        CheckOutcome::valid(elapsed_ms(start))
    }

    /// 第一步：禁止重定向访问分享页
    async fn step1_request(&self, target_url: &str) -> Result<Step1Result, reqwest::Error> {
        // 每次探测使用独立客户端，禁用重定向跟随
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        let response = client
            .get(target_url)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
            )
            .header("Accept-Language", "en")
            .header("Connection", "keep-alive")
            .header("Upgrade-Insecure-Requests", "1")
            .header("User-Agent", DESKTOP_USER_AGENT)
            .send()
            .await?;

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let cookies = response
            .headers()
            .get_all("set-cookie")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|raw| raw.split(';').next())
            .map(|pair| pair.to_string())
            .collect();

        let (full_redirect_url, surl) = if location.is_empty() {
            (String::new(), String::new())
        } else {
            let full = Url::parse(target_url)
                .ok()
                .and_then(|base| base.join(&location).ok())
                .map(|url| url.to_string())
                .unwrap_or_else(|| location.clone());
            let surl = Url::parse(&full)
                .ok()
                .and_then(|url| {
                    url.query_pairs()
                        .find(|(k, _)| k == "surl")
                        .map(|(_, v)| v.into_owned())
                })
                .unwrap_or_default();
            (full, surl)
        };

        Ok(Step1Result {
            status,
            full_redirect_url,
            surl,
            cookies,
        })
    }

    /// 第二步：提交提取码验证
    async fn step2_request(
        &self,
        step1: &Step1Result,
        password: &str,
    ) -> Result<Step2Result, reqwest::Error> {
        let timestamp = chrono::Utc::now().timestamp_millis();
        let verify_url = format!(
            "https://pan.baidu.com/share/verify?t={}&surl={}&channel=chunlei&web=1&app_id=250528&clienttype=0",
            timestamp, step1.surl
        );

        let form = [("pwd", password), ("vcode", ""), ("vcode_str", "")];
        let cookie_header = step1.cookies.join("; ");

        let mut request = self
            .core
            .client()
            .post(&verify_url)
            .header("Accept", "application/json, text/javascript, */*; q=0.01")
            .header("Accept-Language", "en")
            .header("Origin", "https://pan.baidu.com")
            .header("Referer", &step1.full_redirect_url)
            .header("User-Agent", DESKTOP_USER_AGENT)
            .header("X-Requested-With", "XMLHttpRequest")
            .form(&form);

        if !cookie_header.is_empty() {
            request = request.header("Cookie", cookie_header);
        }

        let response = request.send().await?;

        let status = response.status().as_u16();
        let bdclnd = response
            .headers()
            .get_all("set-cookie")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|raw| raw.split(';').next())
            .filter_map(|pair| pair.split_once('='))
            .find(|(name, _)| name.trim() == "BDCLND")
            .map(|(_, value)| value.to_string())
            .unwrap_or_default();

        let body = response.text().await?;
        let json = serde_json::from_str::<VerifyResponse>(&body).ok();

        Ok(Step2Result {
            status,
            body,
            bdclnd,
            json,
        })
    }
}

#[async_trait]
impl LinkProbe for BaiduProbe {
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
