use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

use super::bucket::BucketParameters;
use super::clock::{Clock, SystemClock, from_unix_seconds, unix_seconds};
use crate::config::DEFAULT_KEY_PREFIX;
use crate::storage::{BucketStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum LimiterError {
    #[error("key cannot be empty")]
    EmptyKey,
    #[error("limit must be positive")]
    NonPositiveLimit,
    #[error("window_seconds must be positive")]
    NonPositiveWindow,
    #[error("rate limit store failed: {0}")]
    Store(#[from] StoreError),
}

impl LimiterError {
    pub fn is_invalid_argument(&self) -> bool {
        !matches!(self, LimiterError::Store(_))
    }
}

/// 一次检查的结果，只在单个请求内存在
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: i32,
    /// 拒绝时才有意义
    pub retry_after_secs: i32,
    pub seconds_until_full: i64,
    pub reset_at: DateTime<Utc>,
}

/// 已持久化的桶状态，key 从未出现过时为零值
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BucketSnapshot {
    pub tokens: f64,
    pub last_refill: DateTime<Utc>,
}

pub fn validate(key: &str, limit: i32, window_seconds: i32) -> Result<(), LimiterError> {
    if key.is_empty() {
        return Err(LimiterError::EmptyKey);
    }
    if limit <= 0 {
        return Err(LimiterError::NonPositiveLimit);
    }
    if window_seconds <= 0 {
        return Err(LimiterError::NonPositiveWindow);
    }
    Ok(())
}

/// 令牌桶限流器。自身无可变状态，可以随意克隆并在并发请求间共享。
#[derive(Clone)]
pub struct TokenBucketLimiter {
    store: Arc<dyn BucketStore>,
    clock: Arc<dyn Clock>,
    key_prefix: Arc<str>,
}

impl TokenBucketLimiter {
    pub fn new(store: Arc<dyn BucketStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            key_prefix: Arc::from(DEFAULT_KEY_PREFIX),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Arc::from(prefix.into());
        self
    }

    /// 存储中实际使用的 key
    pub fn storage_key(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }

    pub async fn allow_request(
        &self,
        key: &str,
        limit: i32,
        window_seconds: i32,
    ) -> Result<RateLimitDecision, LimiterError> {
        validate(key, limit, window_seconds)?;

        let params = BucketParameters::for_limit(limit, window_seconds);
        let now = self.clock.now();

        // 存储已经提交后调用方即使取消，令牌也已消耗，这里不做补偿
        let reply = self
            .store
            .transition(&self.storage_key(key), &params, unix_seconds(now))
            .await?;

        debug!(
            key,
            allowed = reply.allowed,
            remaining = reply.remaining,
            "token bucket transition"
        );

        Ok(RateLimitDecision {
            allowed: reply.allowed,
            remaining: reply.remaining.max(0.0) as i32,
            retry_after_secs: i32::try_from(reply.retry_after_secs).unwrap_or(i32::MAX),
            seconds_until_full: reply.seconds_until_full,
            reset_at: now + Duration::seconds(reply.seconds_until_full),
        })
    }

    /// 只读诊断视图，`allow_request` 从不使用它
    pub async fn current_tokens(&self, key: &str) -> Result<BucketSnapshot, LimiterError> {
        let state = self.store.snapshot(&self.storage_key(key)).await?;

        Ok(state
            .map(|s| BucketSnapshot {
                tokens: s.tokens,
                last_refill: from_unix_seconds(s.last_refill),
            })
            .unwrap_or_default())
    }

    pub async fn reset(&self, key: &str) -> Result<(), LimiterError> {
        self.store.delete(&self.storage_key(key)).await?;
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), LimiterError> {
        self.store.ping().await?;
        Ok(())
    }
}
