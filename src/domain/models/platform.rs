// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 网盘平台类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// 夸克网盘
    Quark,
    /// UC网盘
    Uc,
    /// 百度网盘
    Baidu,
    /// 天翼云盘
    Tianyi,
    /// 123网盘
    Pan123,
    /// 115网盘
    Pan115,
    /// 阿里云盘
    Aliyun,
    /// 迅雷云盘
    Xunlei,
    /// 中国移动云盘
    Cmcc,
    /// 未知平台
    #[default]
    Unknown,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Platform::Quark => write!(f, "quark"),
            Platform::Uc => write!(f, "uc"),
            Platform::Baidu => write!(f, "baidu"),
            Platform::Tianyi => write!(f, "tianyi"),
            Platform::Pan123 => write!(f, "pan123"),
            Platform::Pan115 => write!(f, "pan115"),
            Platform::Aliyun => write!(f, "aliyun"),
            Platform::Xunlei => write!(f, "xunlei"),
            Platform::Cmcc => write!(f, "cmcc"),
            Platform::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for Platform {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quark" => Ok(Platform::Quark),
            "uc" => Ok(Platform::Uc),
            "baidu" => Ok(Platform::Baidu),
            "tianyi" => Ok(Platform::Tianyi),
            "pan123" => Ok(Platform::Pan123),
            "pan115" => Ok(Platform::Pan115),
            "aliyun" => Ok(Platform::Aliyun),
            "xunlei" => Ok(Platform::Xunlei),
            "cmcc" => Ok(Platform::Cmcc),
            "unknown" => Ok(Platform::Unknown),
            _ => Err(()),
        }
    }
}

impl Platform {
    /// 检查平台是否为已知的可检测平台
    pub fn is_checkable(&self) -> bool {
        !matches!(self, Platform::Unknown)
    }

    /// 返回所有支持检测的平台
    pub fn all() -> [Platform; 9] {
        [
            Platform::Quark,
            Platform::Uc,
            Platform::Baidu,
            Platform::Tianyi,
            Platform::Pan123,
            Platform::Pan115,
            Platform::Aliyun,
            Platform::Xunlei,
            Platform::Cmcc,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_roundtrip() {
        for platform in Platform::all() {
            let parsed: Platform = platform.to_string().parse().unwrap();
            assert_eq!(parsed, platform);
        }
    }

    #[test]
    fn test_unknown_platform() {
        assert!("foobar".parse::<Platform>().is_err());
        assert!(!Platform::Unknown.is_checkable());
        assert!(Platform::Quark.is_checkable());
    }
}
