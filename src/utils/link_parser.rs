// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::link::LinkInfo;
use crate::domain::models::platform::Platform;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// 各平台链接匹配规则，按固定顺序尝试，首个命中者生效
static PLATFORM_MATCHERS: Lazy<Vec<(Platform, Regex)>> = Lazy::new(|| {
    vec![
        (
            Platform::Quark,
            Regex::new(r"(?i)(?:https?://)?(?:pan\.quark\.cn|quark\.cn|pan\.qoark\.cn)/s/[a-zA-Z0-9]+").unwrap(),
        ),
        (
            Platform::Uc,
            Regex::new(r"(?i)(?:https?://)?(?:drive\.uc\.cn|yun\.uc\.cn|uc\.cn)/s/[a-zA-Z0-9]+")
                .unwrap(),
        ),
        (
            Platform::Baidu,
            Regex::new(r"(?i)(?:https?://)?pan\.baidu\.com/s/[a-zA-Z0-9_-]+").unwrap(),
        ),
        (
            Platform::Tianyi,
            Regex::new(r"(?i)(?:https?://)?(?:cloud\.189\.cn|h5\.cloud\.189\.cn)/(?:t/[a-zA-Z0-9]+|web/share\?code=[a-zA-Z0-9]+|share\.html#/t/[a-zA-Z0-9]+)").unwrap(),
        ),
        (
            Platform::Pan123,
            Regex::new(r"(?i)(?:https?://)?(?:www\.)?(?:123pan\.com|123pan\.cn|123684\.com|123685\.com|123912\.com|123592\.com|123865\.com)/s/[a-zA-Z0-9-]+").unwrap(),
        ),
        (
            Platform::Pan115,
            Regex::new(r"(?i)(?:https?://)?(?:115\.com|115cdn\.com|anxia\.com)/s/[a-zA-Z0-9]+")
                .unwrap(),
        ),
        (
            Platform::Aliyun,
            Regex::new(r"(?i)(?:https?://)?(?:www\.aliyundrive\.com|aliyundrive\.com|www\.alipan\.com)/s/[a-zA-Z0-9]+").unwrap(),
        ),
        (
            Platform::Xunlei,
            Regex::new(r"(?i)(?:https?://)?pan\.xunlei\.com/s/[a-zA-Z0-9_-]+").unwrap(),
        ),
        (
            Platform::Cmcc,
            Regex::new(r"(?i)(?:https?://)?(?:yun\.139\.com/shareweb/#/w/i/|caiyun\.139\.com/m/i\?)[a-zA-Z0-9]+").unwrap(),
        ),
    ]
});

/// 天翼访问码匹配：（访问码：xyz9）或（访问码: xyz9）
static TIANYI_ACCESS_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"（访问码[：:]\s*([a-zA-Z0-9]+)）").unwrap());

/// 解析单条输入，识别平台并生成规范化链接
///
/// 在整段粘贴文本中定位首个命中的平台URL，从命中位置向后截取到
/// 第一个空白或非ASCII字符（"提取码"/"密码"/"（访问码" 等中文标记
/// 自然终止URL），再重建URL使查询参数正确编码。
/// 未命中任何平台时标记为 unknown。
pub fn parse_link(raw: &str) -> LinkInfo {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return LinkInfo {
            raw: raw.to_string(),
            canonical: String::new(),
            platform: Platform::Unknown,
        };
    }

    for (platform, matcher) in PLATFORM_MATCHERS.iter() {
        if let Some(m) = matcher.find(trimmed) {
            let url_part = extend_url(trimmed, m.start());
            return LinkInfo {
                raw: raw.to_string(),
                canonical: canonicalize_url(url_part),
                platform: *platform,
            };
        }
    }

    LinkInfo {
        raw: raw.to_string(),
        canonical: trimmed.to_string(),
        platform: Platform::Unknown,
    }
}

/// 批量解析，仅保留识别出平台的链接
pub fn parse_links(links: &[String]) -> Vec<LinkInfo> {
    links
        .iter()
        .map(|link| parse_link(link))
        .filter(|info| info.platform.is_checkable())
        .collect()
}

/// 从命中位置向后截取URL部分
///
/// 在第一个空白字符或非ASCII字符处终止
fn extend_url(text: &str, start: usize) -> &str {
    let bytes = text.as_bytes();
    let mut end = start;
    while end < bytes.len() {
        let b = bytes[end];
        if b.is_ascii_whitespace() || !b.is_ascii() {
            break;
        }
        end += 1;
    }
    &text[start..end]
}

/// 规范化URL
///
/// 补全 https:// 协议并重建URL，保证查询参数正确百分号编码
fn canonicalize_url(url_part: &str) -> String {
    let with_scheme = if url_part.len() >= 7
        && (url_part[..7].eq_ignore_ascii_case("http://")
            || (url_part.len() >= 8 && url_part[..8].eq_ignore_ascii_case("https://")))
    {
        url_part.to_string()
    } else {
        format!("https://{}", url_part)
    };

    match Url::parse(&with_scheme) {
        Ok(url) => {
            let mut serialized = url.to_string();
            // Url 对空路径追加的尾部斜杠不属于分享链接格式
            if url.path() == "/" && !with_scheme.contains("/?") && serialized.ends_with('/') {
                serialized.pop();
            }
            serialized
        }
        Err(_) => with_scheme,
    }
}

/// 从天翼链接中提取分享码和访问码
///
/// 分享码按优先级取自 `?code=` 查询参数、`/t/<code>` 路径
/// 或 `#/t/<code>` 锚点；访问码取自原始文本中的 （访问码：XXX）
pub fn extract_tianyi_code(link: &str) -> Option<(String, Option<String>)> {
    let url = Url::parse(link).ok()?;

    let mut code = url
        .query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.into_owned());

    if code.is_none() {
        if let Some(rest) = url.path().strip_prefix("/t/") {
            let value = rest.split('/').next().unwrap_or_default();
            if !value.is_empty() {
                code = Some(value.to_string());
            }
        }
    }

    if code.is_none() {
        if let Some(fragment) = url.fragment() {
            let stripped = fragment.strip_prefix("/t/").or_else(|| fragment.strip_prefix("#/t/"));
            if let Some(rest) = stripped {
                let value = rest.split('/').next().unwrap_or_default();
                if !value.is_empty() {
                    code = Some(value.to_string());
                }
            }
        }
    }

    let code = code?;
    let access_code = TIANYI_ACCESS_CODE
        .captures(link)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    Some((code, access_code))
}

/// 从115链接中提取分享码和提取码
///
/// 分享码取自路径最后一段；提取码取自 `?password=` 或锚点中的同名参数
pub fn extract_115_params(link: &str) -> Option<(String, String)> {
    let url = Url::parse(link).ok()?;

    let share_code = url
        .path()
        .trim_matches('/')
        .split('/')
        .next_back()
        .unwrap_or_default()
        .to_string();

    let mut receive_code = url
        .query_pairs()
        .find(|(k, _)| k == "password")
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default();

    if receive_code.is_empty() {
        if let Some(fragment) = url.fragment() {
            if fragment.contains("password=") {
                receive_code = fragment
                    .split('&')
                    .filter_map(|pair| pair.split_once('='))
                    .find(|(k, _)| *k == "password")
                    .map(|(_, v)| v.to_string())
                    .unwrap_or_default();
            }
        }
    }

    Some((share_code, receive_code))
}

/// 规范化百度网盘URL
///
/// 在整段粘贴中定位 `https://pan.baidu.com/s/` 起始位置，在首个空白
/// 或 "提取码"/"密码" 标记处终止，并重建URL确保查询参数正确编码。
/// `pwd` 查询参数若存在则作为提取码保留。
pub fn normalize_baidu_url(link: &str) -> Option<String> {
    let cleaned = link.trim();

    let start = cleaned
        .find("https://pan.baidu.com/s/")
        .or_else(|| cleaned.find("http://pan.baidu.com/s/"))?;

    let rest = &cleaned[start..];
    let mut end = rest.len();
    for (idx, ch) in rest.char_indices() {
        if ch.is_whitespace() {
            end = idx;
            break;
        }
        if rest[idx..].starts_with("提取码") || rest[idx..].starts_with("密码") {
            end = idx;
            break;
        }
    }

    let url_str = rest[..end].trim();
    let url = Url::parse(url_str).ok()?;
    Some(url.to_string())
}

#[cfg(test)]
#[path = "link_parser_test.rs"]
mod tests;
