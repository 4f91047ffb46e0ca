use super::*;

#[test]
fn test_parse_all_platforms() {
    let cases = [
        ("https://pan.quark.cn/s/a1b2c3d4", Platform::Quark),
        ("https://quark.cn/s/a1b2c3d4", Platform::Quark),
        ("https://drive.uc.cn/s/abc123", Platform::Uc),
        ("https://pan.baidu.com/s/1AAAAAAA", Platform::Baidu),
        ("https://cloud.189.cn/t/abcDEF", Platform::Tianyi),
        ("https://cloud.189.cn/web/share?code=abcDEF", Platform::Tianyi),
        ("https://h5.cloud.189.cn/share.html#/t/abcDEF", Platform::Tianyi),
        ("https://www.123pan.com/s/abc-def", Platform::Pan123),
        ("https://123865.com/s/abc-def", Platform::Pan123),
        ("https://115cdn.com/s/swz123?password=a1b2", Platform::Pan115),
        ("https://www.alipan.com/s/xyz987", Platform::Aliyun),
        ("https://pan.xunlei.com/s/VN_abc-123?pwd=ha2x", Platform::Xunlei),
        ("https://yun.139.com/shareweb/#/w/i/005CiA3gQ", Platform::Cmcc),
        ("https://caiyun.139.com/m/i?0F5CJUxcdemhy", Platform::Cmcc),
    ];

    for (input, expected) in cases {
        let info = parse_link(input);
        assert_eq!(info.platform, expected, "input: {}", input);
        assert!(
            info.canonical.starts_with("https://"),
            "canonical missing scheme: {}",
            info.canonical
        );
        // 规范化后的链接必须重新解析到同一平台
        let reparsed = parse_link(&info.canonical);
        assert_eq!(reparsed.platform, expected, "canonical: {}", info.canonical);
    }
}

#[test]
fn test_scheme_completion() {
    let info = parse_link("pan.quark.cn/s/a1b2c3d4");
    assert_eq!(info.platform, Platform::Quark);
    assert_eq!(info.canonical, "https://pan.quark.cn/s/a1b2c3d4");
}

#[test]
fn test_unknown_link() {
    let info = parse_link("https://example.com/s/whatever");
    assert_eq!(info.platform, Platform::Unknown);

    let empty = parse_link("   ");
    assert_eq!(empty.platform, Platform::Unknown);
}

#[test]
fn test_tianyi_access_code_suffix_excluded_from_canonical() {
    let info = parse_link("https://cloud.189.cn/t/abcDEF（访问码：xyz9）");
    assert_eq!(info.platform, Platform::Tianyi);
    assert_eq!(info.canonical, "https://cloud.189.cn/t/abcDEF");
}

#[test]
fn test_baidu_salvage_from_paste() {
    let paste = "看这里 https://pan.baidu.com/s/1AbC_dEf?pwd=1234 提取码1234";
    let info = parse_link(paste);
    assert_eq!(info.platform, Platform::Baidu);
    assert_eq!(info.canonical, "https://pan.baidu.com/s/1AbC_dEf?pwd=1234");
}

#[test]
fn test_normalize_baidu_url() {
    let url = normalize_baidu_url("链接 https://pan.baidu.com/s/1abc?pwd=9z8y密码: 9z8y").unwrap();
    assert_eq!(url, "https://pan.baidu.com/s/1abc?pwd=9z8y");

    assert!(normalize_baidu_url("https://example.com/s/1abc").is_none());
}

#[test]
fn test_extract_tianyi_code() {
    let (code, access) =
        extract_tianyi_code("https://cloud.189.cn/t/abcDEF（访问码：xyz9）").unwrap();
    assert_eq!(code, "abcDEF");
    assert_eq!(access.as_deref(), Some("xyz9"));

    let (code, access) = extract_tianyi_code("https://cloud.189.cn/web/share?code=QQvEbe").unwrap();
    assert_eq!(code, "QQvEbe");
    assert!(access.is_none());

    let (code, _) = extract_tianyi_code("https://h5.cloud.189.cn/share.html#/t/FbYvyi").unwrap();
    assert_eq!(code, "FbYvyi");
}

#[test]
fn test_extract_115_params() {
    let (share, receive) =
        extract_115_params("https://115cdn.com/s/swz6a3j3z2l?password=e9w0").unwrap();
    assert_eq!(share, "swz6a3j3z2l");
    assert_eq!(receive, "e9w0");

    let (share, receive) = extract_115_params("https://115.com/s/swz6a3j3z2l").unwrap();
    assert_eq!(share, "swz6a3j3z2l");
    assert!(receive.is_empty());
}

#[test]
fn test_parse_links_filters_unknown() {
    let links = vec![
        "https://pan.quark.cn/s/abc".to_string(),
        "https://unknown.example.com/x".to_string(),
    ];
    let infos = parse_links(&links);
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].platform, Platform::Quark);
}
