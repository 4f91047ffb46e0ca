// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 探测器模块
///
/// 每个网盘平台一个协议状态机，共用频率闸门与策略开关
pub mod aliyun;
pub mod baidu;
pub mod cmcc;
pub mod cmcc_crypto;
pub mod core;
pub mod page_scan;
pub mod pan115;
pub mod pan123;
pub mod quark;
pub mod rate_gate;
pub mod tianyi;
pub mod traits;
pub mod uc;
pub mod xunlei;

pub use traits::{LinkProbe, ProbeRegistry};

use crate::domain::models::platform::Platform;
use crate::domain::models::setting::PlatformRateConfig;
use crate::probes::core::{ProbeCore, ProbePolicy};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// 构建全部九个平台的探测器注册表
///
/// 频率配置缺失的平台使用默认值。夸克、UC与123保留
/// 传输错误偏向有效的历史策略，百度保留挑战页归类为限流的策略。
pub fn build_registry(
    client: reqwest::Client,
    timeout: Duration,
    rate_configs: &HashMap<Platform, PlatformRateConfig>,
) -> ProbeRegistry {
    let config_for = |platform: Platform| -> PlatformRateConfig {
        rate_configs.get(&platform).copied().unwrap_or_default()
    };
    let lenient = ProbePolicy {
        treat_errors_as_valid: true,
        challenge_as_rate_limited: false,
    };
    let strict = ProbePolicy::default();
    let baidu_policy = ProbePolicy {
        treat_errors_as_valid: false,
        challenge_as_rate_limited: true,
    };

    let core = |platform: Platform, policy: ProbePolicy| {
        ProbeCore::new(platform, timeout, client.clone(), &config_for(platform), policy)
    };

    let mut registry = ProbeRegistry::new();
    registry.register(Arc::new(quark::QuarkProbe::new(core(
        Platform::Quark,
        lenient,
    ))));
    registry.register(Arc::new(uc::UcProbe::new(core(Platform::Uc, lenient))));
    registry.register(Arc::new(baidu::BaiduProbe::new(core(
        Platform::Baidu,
        baidu_policy,
    ))));
    registry.register(Arc::new(tianyi::TianyiProbe::new(core(
        Platform::Tianyi,
        strict,
    ))));
    registry.register(Arc::new(pan123::Pan123Probe::new(core(
        Platform::Pan123,
        lenient,
    ))));
    registry.register(Arc::new(pan115::Pan115Probe::new(core(
        Platform::Pan115,
        strict,
    ))));
    registry.register(Arc::new(aliyun::AliyunProbe::new(core(
        Platform::Aliyun,
        strict,
    ))));
    registry.register(Arc::new(xunlei::XunleiProbe::new(core(
        Platform::Xunlei,
        strict,
    ))));
    registry.register(Arc::new(cmcc::CmccProbe::new(core(
        Platform::Cmcc,
        strict,
    ))));
    registry
}
