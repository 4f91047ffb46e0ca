use super::*;

#[test]
fn test_script_with_return_is_wrapped() {
    let raw = r#"{"items":["https://pan.quark.cn/s/a1","https://pan.quark.cn/s/a2"]}"#;
    let script = "var data = JSON.parse(rawData); return data.items;";
    let links = transform_links(raw, script).unwrap();
    assert_eq!(
        links,
        vec!["https://pan.quark.cn/s/a1", "https://pan.quark.cn/s/a2"]
    );
}

#[test]
fn test_script_without_return_uses_conventional_local() {
    let raw = r#"["https://pan.baidu.com/s/1abc"]"#;
    let script = "var result = JSON.parse(rawData)";
    let links = transform_links(raw, script).unwrap();
    assert_eq!(links, vec!["https://pan.baidu.com/s/1abc"]);
}

#[test]
fn test_url_array_local_is_picked_up() {
    let raw = "ignored";
    let script = r#"var urlArray = ["https://cloud.189.cn/t/qq11"]"#;
    let links = transform_links(raw, script).unwrap();
    assert_eq!(links, vec!["https://cloud.189.cn/t/qq11"]);
}

#[test]
fn test_function_expression_passthrough() {
    let raw = r#"["https://pan.xunlei.com/s/x1"]"#;
    let script = "(function() { return JSON.parse(rawData); })()";
    let links = transform_links(raw, script).unwrap();
    assert_eq!(links, vec!["https://pan.xunlei.com/s/x1"]);
}

#[test]
fn test_identity_script_parses_json_array() {
    let raw = r#"["quark-link-1"]"#;
    let links = transform_links(raw, "return rawData;").unwrap();
    assert_eq!(links, vec!["quark-link-1"]);
}

#[test]
fn test_identity_script_splits_lines() {
    let raw = "https://pan.quark.cn/s/a\nhttps://pan.quark.cn/s/b\n\n";
    let links = transform_links(raw, "").unwrap();
    assert_eq!(
        links,
        vec!["https://pan.quark.cn/s/a", "https://pan.quark.cn/s/b"]
    );
}

#[test]
fn test_broken_script_reports_error() {
    let result = transform_links("{}", "this is not javascript ((");
    assert!(matches!(result, Err(TransformError::Script(_))));
}

#[test]
fn test_non_array_result_rejected() {
    let result = transform_links("{}", "return 42;");
    assert!(matches!(result, Err(TransformError::InvalidResult)));
}

#[test]
fn test_extract_json_skips_wrapper_text() {
    let output = "warning: something\n{\"links\":[\"a\"]}\ntrailing garbage";
    assert_eq!(extract_json(output), "{\"links\":[\"a\"]}");
}

#[test]
fn test_extract_json_array() {
    let output = "prefix [\"a\",\"b\"] suffix";
    assert_eq!(extract_json(output), "[\"a\",\"b\"]");
}

#[test]
fn test_extract_json_repairs_literal_newlines() {
    let output = "{\"title\":\"line1\nline2\"}";
    let cleaned = extract_json(output);
    let parsed: serde_json::Value = serde_json::from_str(&cleaned).unwrap();
    assert_eq!(parsed["title"], "line1\nline2");
}

#[test]
fn test_extract_json_without_json_returns_trimmed() {
    assert_eq!(extract_json("  plain text  "), "plain text");
}

#[test]
fn test_extract_json_ignores_braces_inside_strings() {
    let output = "{\"a\":\"}\",\"b\":1} extra";
    assert_eq!(extract_json(output), "{\"a\":\"}\",\"b\":1}");
}

#[test]
fn test_transform_salvages_wrapped_json() {
    let raw = "HTTP warning text {\"urls\":[\"https://pan.quark.cn/s/w1\"]}";
    let script = "return JSON.parse(rawData).urls;";
    let links = transform_links(raw, script).unwrap();
    assert_eq!(links, vec!["https://pan.quark.cn/s/w1"]);
}
