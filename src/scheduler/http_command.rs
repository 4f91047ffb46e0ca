// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use thiserror::Error;

/// HTTP命令错误类型
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("failed to parse curl command: {0}")]
    Parse(String),
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// 解析后的HTTP请求配方
///
/// 定时任务存储的命令是curl风格的文本（Postman导出的长选项
/// 形式也接受），解析为方法、URL、请求头与请求体
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpCommand {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// 解析curl风格命令
pub fn parse_curl_command(input: &str) -> Result<HttpCommand, CommandError> {
    let merged = merge_continuations(input);
    let tokens = tokenize(&merged).map_err(CommandError::Parse)?;
    if tokens.is_empty() {
        return Err(CommandError::Parse("empty command".into()));
    }

    let mut method: Option<String> = None;
    let mut url: Option<String> = None;
    let mut headers: Vec<(String, String)> = Vec::new();
    let mut body: Option<String> = None;

    let mut iter = tokens.into_iter().peekable();
    // 首个词元允许是curl本身
    if iter.peek().map(String::as_str) == Some("curl") {
        iter.next();
    }

    while let Some(token) = iter.next() {
        match token.as_str() {
            "-X" | "--request" => {
                method = Some(
                    iter.next()
                        .ok_or_else(|| CommandError::Parse("missing method after -X".into()))?
                        .to_uppercase(),
                );
            }
            "-H" | "--header" => {
                let header = iter
                    .next()
                    .ok_or_else(|| CommandError::Parse("missing header after -H".into()))?;
                if let Some((name, value)) = header.split_once(':') {
                    headers.push((name.trim().to_string(), value.trim().to_string()));
                }
            }
            "-d" | "--data" | "--data-raw" | "--data-binary" | "--data-urlencode" => {
                body = Some(
                    iter.next()
                        .ok_or_else(|| CommandError::Parse("missing body after -d".into()))?,
                );
            }
            "-b" | "--cookie" => {
                let cookie = iter
                    .next()
                    .ok_or_else(|| CommandError::Parse("missing cookie after -b".into()))?;
                headers.push(("Cookie".to_string(), cookie));
            }
            "-u" | "--user" => {
                let credentials = iter
                    .next()
                    .ok_or_else(|| CommandError::Parse("missing credentials after -u".into()))?;
                headers.push((
                    "Authorization".to_string(),
                    format!("Basic {}", BASE64.encode(credentials)),
                ));
            }
            "-A" | "--user-agent" => {
                let agent = iter
                    .next()
                    .ok_or_else(|| CommandError::Parse("missing agent after -A".into()))?;
                headers.push(("User-Agent".to_string(), agent));
            }
            "--url" => {
                url = Some(
                    iter.next()
                        .ok_or_else(|| CommandError::Parse("missing url after --url".into()))?,
                );
            }
            // 与传输行为无关的常见开关直接忽略
            "-s" | "--silent" | "-L" | "--location" | "--compressed" | "-k" | "--insecure"
            | "-i" | "--include" | "-g" | "--globoff" => {}
            other if other.starts_with('-') => {
                // 未知开关：若带值则连值一起跳过
                if let Some(next) = iter.peek() {
                    if !next.starts_with('-') && url.is_some() {
                        iter.next();
                    }
                }
            }
            other => {
                if url.is_none() {
                    url = Some(other.to_string());
                }
            }
        }
    }

    let url = url.ok_or_else(|| CommandError::Parse("no URL found in command".into()))?;
    let method = method.unwrap_or_else(|| {
        if body.is_some() {
            "POST".to_string()
        } else {
            "GET".to_string()
        }
    });

    Ok(HttpCommand {
        method,
        url,
        headers,
        body,
    })
}

/// 执行HTTP命令，返回响应体文本
pub async fn execute(
    client: &reqwest::Client,
    command: &HttpCommand,
) -> Result<String, CommandError> {
    let method = reqwest::Method::from_bytes(command.method.as_bytes())
        .map_err(|e| CommandError::Parse(format!("invalid method: {}", e)))?;

    let mut request = client.request(method, &command.url);
    for (name, value) in &command.headers {
        request = request.header(name, value);
    }
    if let Some(body) = &command.body {
        request = request.body(body.clone());
    }

    let response = request.send().await?;
    Ok(response.text().await?)
}

/// 合并反斜杠续行
fn merge_continuations(input: &str) -> String {
    let mut merged = Vec::new();
    let mut current = String::new();

    for line in input.lines() {
        let trimmed = line.trim_end();
        let has_continuation = trimmed.ends_with('\\');
        let content = if has_continuation {
            trimmed[..trimmed.len() - 1].trim()
        } else {
            trimmed.trim()
        };

        if !content.is_empty() {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(content);
        }

        if !has_continuation && !current.is_empty() {
            merged.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        merged.push(current);
    }
    merged.join(" ")
}

/// 按shell引号规则切分词元
fn tokenize(input: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();
    let mut in_token = false;

    while let Some(ch) = chars.next() {
        match ch {
            '\'' => {
                in_token = true;
                for inner in chars.by_ref() {
                    if inner == '\'' {
                        break;
                    }
                    current.push(inner);
                }
            }
            '"' => {
                in_token = true;
                while let Some(inner) = chars.next() {
                    match inner {
                        '"' => break,
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                match escaped {
                                    'n' => current.push('\n'),
                                    't' => current.push('\t'),
                                    other => current.push(other),
                                }
                            }
                        }
                        other => current.push(other),
                    }
                }
            }
            '\\' => {
                if let Some(escaped) = chars.next() {
                    in_token = true;
                    current.push(escaped);
                }
            }
            c if c.is_whitespace() => {
                if in_token || !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            other => {
                in_token = true;
                current.push(other);
            }
        }
    }
    if in_token || !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_get() {
        let command = parse_curl_command("curl https://example.com/list.json").unwrap();
        assert_eq!(command.method, "GET");
        assert_eq!(command.url, "https://example.com/list.json");
        assert!(command.headers.is_empty());
        assert!(command.body.is_none());
    }

    #[test]
    fn test_parse_post_with_headers_and_body() {
        let command = parse_curl_command(
            r#"curl -X POST 'https://api.example.com/links' -H 'Content-Type: application/json' -d '{"page":1}'"#,
        )
        .unwrap();
        assert_eq!(command.method, "POST");
        assert_eq!(command.url, "https://api.example.com/links");
        assert_eq!(
            command.headers,
            vec![("Content-Type".to_string(), "application/json".to_string())]
        );
        assert_eq!(command.body.as_deref(), Some(r#"{"page":1}"#));
    }

    #[test]
    fn test_body_implies_post() {
        let command =
            parse_curl_command("curl https://api.example.com -d 'a=1'").unwrap();
        assert_eq!(command.method, "POST");
    }

    #[test]
    fn test_parse_postman_long_flags() {
        let command = parse_curl_command(
            "curl --request GET --url https://api.example.com/feed --header 'Accept: application/json'",
        )
        .unwrap();
        assert_eq!(command.method, "GET");
        assert_eq!(command.url, "https://api.example.com/feed");
        assert_eq!(
            command.headers,
            vec![("Accept".to_string(), "application/json".to_string())]
        );
    }

    #[test]
    fn test_parse_multiline_continuations() {
        let input = "curl https://api.example.com/feed \\\n  -H 'Accept: application/json' \\\n  --compressed";
        let command = parse_curl_command(input).unwrap();
        assert_eq!(command.url, "https://api.example.com/feed");
        assert_eq!(command.headers.len(), 1);
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(parse_curl_command("").is_err());
        assert!(parse_curl_command("curl -H 'X: y'").is_err());
    }

    #[test]
    fn test_tokenize_quoted_strings() {
        let tokens = tokenize(r#"curl -H "User-Agent: my agent" 'single quoted'"#).unwrap();
        assert_eq!(
            tokens,
            vec!["curl", "-H", "User-Agent: my agent", "single quoted"]
        );
    }
}
