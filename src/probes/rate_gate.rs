// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::setting::PlatformRateConfig;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// 平台频率闸门
///
/// 组合最小请求间隔与令牌桶两种限制，保护单个平台。
/// 间隔由互斥锁串行化，令牌桶有独立互斥锁；跨平台互不影响。
/// 调用方不得依赖严格的FIFO顺序，契约仅保证聚合速率不超过配置上限。
pub struct RateGate {
    /// 最小请求间隔
    request_delay: Duration,
    /// 上次请求时间，串行化间隔控制
    last_request: Mutex<Instant>,
    /// 令牌桶（max_requests_per_second=0 时不限制）
    bucket: Option<Mutex<TokenBucket>>,
}

/// 令牌桶，控制每秒请求数
struct TokenBucket {
    capacity: u32,
    tokens: u32,
    refill_interval: Duration,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(max_requests_per_second: u32) -> Self {
        let refill_interval = Duration::from_secs(1) / max_requests_per_second;
        Self {
            capacity: max_requests_per_second,
            tokens: max_requests_per_second,
            refill_interval,
            last_refill: Instant::now(),
        }
    }

    /// 尝试获取一个令牌，成功返回true
    fn try_take(&mut self) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill);
        let tokens_to_add = (elapsed.as_nanos() / self.refill_interval.as_nanos().max(1)) as u32;
        if tokens_to_add > 0 {
            self.tokens = (self.tokens + tokens_to_add).min(self.capacity);
            self.last_refill = now;
        }

        if self.tokens > 0 {
            self.tokens -= 1;
            return true;
        }
        false
    }
}

impl RateGate {
    /// 按平台频率配置创建闸门
    pub fn new(config: &PlatformRateConfig) -> Self {
        let bucket = if config.max_requests_per_second > 0 {
            Some(Mutex::new(TokenBucket::new(config.max_requests_per_second)))
        } else {
            None
        };
        Self {
            request_delay: Duration::from_millis(config.request_delay_ms),
            last_request: Mutex::new(Instant::now()),
            bucket,
        }
    }

    /// 获取一次请求许可
    ///
    /// 距上次请求不足最小间隔时阻塞补足；令牌耗尽时按补充间隔轮询等待
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;

        if !self.request_delay.is_zero() {
            let elapsed = last.elapsed();
            if elapsed < self.request_delay {
                tokio::time::sleep(self.request_delay - elapsed).await;
            }
        }

        if let Some(bucket) = &self.bucket {
            loop {
                let refill_interval = {
                    let mut bucket = bucket.lock().await;
                    if bucket.try_take() {
                        break;
                    }
                    bucket.refill_interval
                };
                tokio::time::sleep(refill_interval).await;
            }
        }

        *last = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(delay_ms: u64, max_rps: u32) -> PlatformRateConfig {
        PlatformRateConfig {
            concurrency: 5,
            request_delay_ms: delay_ms,
            max_requests_per_second: max_rps,
            cache_ttl_hours: 0,
        }
    }

    #[tokio::test]
    async fn test_unlimited_gate_does_not_block() {
        let gate = RateGate::new(&config(0, 0));
        let start = Instant::now();
        for _ in 0..10 {
            gate.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_min_delay_spacing() {
        let gate = RateGate::new(&config(60, 0));
        gate.acquire().await;
        let start = Instant::now();
        gate.acquire().await;
        // 第二次获取必须等满最小间隔
        assert!(start.elapsed() >= Duration::from_millis(55));
    }

    #[tokio::test]
    async fn test_token_bucket_caps_rate() {
        let gate = RateGate::new(&config(0, 5));
        let start = Instant::now();
        // 桶容量为5，前5次立即放行
        for _ in 0..5 {
            gate.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(100));

        // 第6次需要等待一个补充间隔（200ms）
        let before_sixth = Instant::now();
        gate.acquire().await;
        assert!(before_sixth.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_one_second_window_respects_cap() {
        let gate = RateGate::new(&config(0, 10));
        let start = Instant::now();
        let mut acquired_in_window = 0u32;
        loop {
            gate.acquire().await;
            if start.elapsed() >= Duration::from_secs(1) {
                break;
            }
            acquired_in_window += 1;
            if acquired_in_window > 30 {
                break;
            }
        }
        // 容量10 + 窗口内最多补充10个令牌
        assert!(acquired_in_window <= 20, "acquired {}", acquired_in_window);
    }
}
