// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use rquickjs::{Context, FromJs, Runtime, Value};
use thiserror::Error;
use tracing::debug;

/// JS运行时内存上限
const MAX_JS_MEMORY: usize = 32 * 1024 * 1024;

/// 转换错误类型
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("script execution failed: {0}")]
    Script(String),
    #[error("script did not return a valid string array")]
    InvalidResult,
    #[error("failed to parse raw data: not a valid JSON array and no valid lines found")]
    UnparsableRawData,
}

impl From<rquickjs::Error> for TransformError {
    fn from(e: rquickjs::Error) -> Self {
        TransformError::Script(e.to_string())
    }
}

/// 执行JavaScript转换脚本
///
/// 转换契约：脚本通过全局变量 `rawData`（字符串）拿到HTTP响应体，
/// 求值结果必须是字符串数组。为方便书写：
/// - 含顶层 `return` 的裸脚本被包进函数再调用，使 `return` 合法；
/// - 不含 `return` 的脚本在末尾追加 `; return result || urlArray || []`
///   以捞取惯用命名的局部变量；
/// - 求值前先尝试JSON抢救，容忍服务端在JSON前输出的包装文本。
pub fn transform_links(raw_data: &str, script: &str) -> Result<Vec<String>, TransformError> {
    let raw_data = extract_json(raw_data);
    let script = script.trim();

    // 无脚本或恒等脚本：直接尝试解析原始数据
    if script.is_empty() || script == "return rawData;" {
        if let Ok(list) = serde_json::from_str::<Vec<String>>(&raw_data) {
            if !list.is_empty() {
                return Ok(list);
            }
        }
        let lines: Vec<String> = raw_data
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with("curl:"))
            .map(str::to_string)
            .collect();
        if !lines.is_empty() {
            return Ok(lines);
        }
        return Err(TransformError::UnparsableRawData);
    }

    let wrapped = wrap_script(script);
    debug!("Evaluating transform script ({} bytes)", wrapped.len());

    let runtime = Runtime::new()?;
    runtime.set_memory_limit(MAX_JS_MEMORY);
    let context = Context::full(&runtime)?;

    context.with(|ctx| -> Result<Vec<String>, TransformError> {
        ctx.globals().set("rawData", raw_data.as_str())?;

        let value: Value = ctx.eval(wrapped.as_bytes()).map_err(|e| {
            let detail = match &e {
                rquickjs::Error::Exception => format!("{:?}", ctx.catch()),
                _ => e.to_string(),
            };
            TransformError::Script(detail)
        })?;

        // 1. 直接转换为字符串数组
        if let Ok(list) = Vec::<String>::from_js(&ctx, value.clone()) {
            if !list.is_empty() {
                return Ok(list);
            }
        }

        // 2. 回退：JSON.stringify后再解析，字符串化非字符串元素
        let json = ctx
            .json_stringify(value)?
            .ok_or(TransformError::InvalidResult)?
            .to_string()?;
        let parsed: serde_json::Value =
            serde_json::from_str(&json).map_err(|_| TransformError::InvalidResult)?;
        let items = parsed.as_array().ok_or(TransformError::InvalidResult)?;
        if items.is_empty() {
            return Err(TransformError::InvalidResult);
        }
        Ok(items
            .iter()
            .map(|item| match item {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect())
    })
}

/// 包装裸脚本使顶层return合法
fn wrap_script(script: &str) -> String {
    let trimmed = script.trim();
    let is_function_expression = trimmed.starts_with("(function")
        || trimmed.starts_with("(() =>")
        || trimmed.starts_with("(async function");
    if is_function_expression {
        return trimmed.to_string();
    }
    if trimmed.contains("return") {
        format!("(function() {{ {} }})()", trimmed)
    } else {
        // 捞取惯用命名的局部变量，未声明的名字不能直接读取
        format!(
            "(function() {{ {}; return (typeof result !== \"undefined\" && result) || (typeof urlArray !== \"undefined\" && urlArray) || []; }})()",
            trimmed
        )
    }
}

/// JSON抢救
///
/// 在响应体中定位第一个 `{` 或 `[`，用括号匹配截取完整JSON片段，
/// 并修复字符串值中的字面换行与制表符。未找到JSON时返回去除
/// 首尾空白的原文。
pub fn extract_json(output: &str) -> String {
    if output.is_empty() {
        return String::new();
    }

    let brace_idx = output.find('{');
    let bracket_idx = output.find('[');
    let (start, is_array) = match (brace_idx, bracket_idx) {
        (Some(b), Some(k)) if k < b => (k, true),
        (Some(b), _) => (b, false),
        (None, Some(k)) => (k, true),
        (None, None) => return output.trim().to_string(),
    };

    let json_part = &output[start..];
    let mut cleaned = match find_matching_brace(json_part, is_array) {
        Some(end) => json_part[..=end].to_string(),
        None => {
            // 找不到匹配括号时回退到最后一个闭合符
            let last = json_part
                .rfind('}')
                .into_iter()
                .chain(json_part.rfind(']'))
                .max();
            match last {
                Some(idx) => json_part[..=idx].to_string(),
                None => json_part.to_string(),
            }
        }
    };

    cleaned = cleaned.trim().replace("\r\n", "\n").replace('\r', "");
    cleaned = fix_unescaped_newlines(&cleaned);

    if serde_json::from_str::<serde_json::Value>(&cleaned).is_ok() {
        return cleaned;
    }

    // 末尾多余字符：从后向前找到首个可解析的闭合位置
    let trimmed = cleaned.trim_end();
    for (idx, ch) in trimmed.char_indices().rev() {
        if ch == '}' || ch == ']' {
            let candidate = &trimmed[..=idx];
            if serde_json::from_str::<serde_json::Value>(candidate).is_ok() {
                return candidate.to_string();
            }
        }
    }

    // 即使校验失败也返回截取结果，留给脚本自行处理
    cleaned
}

/// 找到匹配的闭合括号位置（跳过字符串与转义）
fn find_matching_brace(json_str: &str, is_array: bool) -> Option<usize> {
    let (open, close) = if is_array { (b'[', b']') } else { (b'{', b'}') };
    let bytes = json_str.as_bytes();

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (idx, &byte) in bytes.iter().enumerate() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match byte {
            b'\\' => escape_next = true,
            b'"' => in_string = !in_string,
            _ if in_string => {}
            _ if byte == open => depth += 1,
            _ if byte == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// 转义JSON字符串值内的字面换行符与制表符
fn fix_unescaped_newlines(json_str: &str) -> String {
    let mut result = String::with_capacity(json_str.len());
    let mut in_string = false;
    let mut escape_next = false;

    for ch in json_str.chars() {
        if escape_next {
            result.push(ch);
            escape_next = false;
            continue;
        }
        match ch {
            '\\' => {
                result.push(ch);
                escape_next = true;
            }
            '"' => {
                result.push(ch);
                in_string = !in_string;
            }
            '\n' if in_string => result.push_str("\\n"),
            '\t' if in_string => result.push_str("\\t"),
            '\r' if in_string => {}
            _ => result.push(ch),
        }
    }
    result
}

#[cfg(test)]
#[path = "transform_test.rs"]
mod tests;
