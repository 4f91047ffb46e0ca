// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 分享页关键词判定
//!
//! 夸克与UC走同一套页面扫描协议：失效关键词优先，其次有效关键词，
//! 二者皆无则无法判断

/// 失效关键词集合
const FAILURE_KEYWORDS: [&str; 6] = ["失效", "不存在", "违规", "删除", "已过期", "被取消"];

/// 有效关键词集合
const VALID_KEYWORDS: [&str; 2] = ["文件", "分享"];

/// 页面判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PageVerdict {
    /// 命中失效关键词
    Invalid,
    /// 命中有效关键词
    Valid,
    /// 无法判断
    Undecidable,
}

/// 扫描分享页正文并分类
pub(crate) fn classify_share_page(body: &str) -> PageVerdict {
    for keyword in FAILURE_KEYWORDS {
        if body.contains(keyword) {
            return PageVerdict::Invalid;
        }
    }
    for keyword in VALID_KEYWORDS {
        if body.contains(keyword) {
            return PageVerdict::Valid;
        }
    }
    PageVerdict::Undecidable
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_keyword_wins() {
        assert_eq!(
            classify_share_page("该分享已失效，文件无法访问"),
            PageVerdict::Invalid
        );
        assert_eq!(classify_share_page("链接不存在"), PageVerdict::Invalid);
    }

    #[test]
    fn test_valid_keywords() {
        assert_eq!(classify_share_page("为你分享了3个文件"), PageVerdict::Valid);
    }

    #[test]
    fn test_undecidable() {
        assert_eq!(classify_share_page("<html></html>"), PageVerdict::Undecidable);
    }
}
