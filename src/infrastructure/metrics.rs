// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

pub fn init_metrics() {
    let builder = PrometheusBuilder::new();
    let addr: SocketAddr = "0.0.0.0:9000".parse().expect("Invalid metrics address");

    // Start the exporter
    // Ignore error if address is already in use (for development/testing)
    if let Err(e) = builder.with_http_listener(addr).install() {
        tracing::warn!(
            "Failed to install Prometheus recorder: {}. This might happen if the port is already in use.",
            e
        );
    }

    info!("Metrics exporter listening on {}", addr);
}

/// 记录一次探测
pub fn record_probe(platform: &str, valid: bool, rate_limited: bool) {
    metrics::counter!("pancheck_probe_total", "platform" => platform.to_string()).increment(1);
    if valid {
        metrics::counter!("pancheck_probe_valid_total", "platform" => platform.to_string())
            .increment(1);
    }
    if rate_limited {
        metrics::counter!("pancheck_probe_rate_limited_total", "platform" => platform.to_string())
            .increment(1);
    }
}

/// 记录一次缓存命中
pub fn record_cache_hit(platform: &str) {
    metrics::counter!("pancheck_cache_hit_total", "platform" => platform.to_string()).increment(1);
}

/// 记录一次失效表短路
pub fn record_dead_link_short_circuit(platform: &str) {
    metrics::counter!("pancheck_dead_link_hit_total", "platform" => platform.to_string())
        .increment(1);
}
