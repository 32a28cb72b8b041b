//! 请求入口：校验参数、拼接命名空间 key、调用限流器并把错误归类。

pub mod model;

use tracing::{error, info, warn};

use crate::error::AppError;
use crate::ratelimiter::{BucketSnapshot, LimiterError, TokenBucketLimiter, validate};

pub use model::{CheckRateLimitRequest, CheckRateLimitResponse};

/// 有命名空间时为 `namespace:key`，否则原样使用 key
pub fn effective_key(namespace: Option<&str>, key: &str) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{ns}:{key}"),
        _ => key.to_string(),
    }
}

#[derive(Clone)]
pub struct RequestGateway {
    limiter: TokenBucketLimiter,
}

impl RequestGateway {
    pub fn new(limiter: TokenBucketLimiter) -> Self {
        Self { limiter }
    }

    pub async fn check_rate_limit(
        &self,
        request: CheckRateLimitRequest,
    ) -> Result<CheckRateLimitResponse, AppError> {
        // 先在入口拒绝，不访问存储
        validate(&request.key, request.limit, request.window_seconds)
            .map_err(|e| invalid_argument(&request.key, e))?;

        let key = effective_key(request.namespace.as_deref(), &request.key);

        let decision = self
            .limiter
            .allow_request(&key, request.limit, request.window_seconds)
            .await
            .map_err(|e| translate(&key, e))?;

        info!(
            key = %key,
            allowed = decision.allowed,
            remaining = decision.remaining,
            limit = request.limit,
            "Rate limit check"
        );

        Ok(CheckRateLimitResponse {
            allowed: decision.allowed,
            remaining: decision.remaining,
            limit: request.limit,
            reset_at: decision.reset_at,
            retry_after_seconds: (!decision.allowed).then_some(decision.retry_after_secs),
        })
    }

    pub async fn bucket_snapshot(&self, key: &str) -> Result<BucketSnapshot, AppError> {
        if key.is_empty() {
            return Err(invalid_argument(key, LimiterError::EmptyKey));
        }
        self.limiter
            .current_tokens(key)
            .await
            .map_err(|e| translate(key, e))
    }

    pub async fn reset_bucket(&self, key: &str) -> Result<(), AppError> {
        if key.is_empty() {
            return Err(invalid_argument(key, LimiterError::EmptyKey));
        }
        self.limiter.reset(key).await.map_err(|e| translate(key, e))?;
        info!(key, "Rate limit bucket reset");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.limiter.ping().await.map_err(|e| {
            error!("Rate limit store health check failed: {}", e);
            AppError::Unavailable
        })
    }
}

fn invalid_argument(key: &str, err: LimiterError) -> AppError {
    warn!(key, "Rejected rate limit request: {}", err);
    AppError::InvalidArgument(err.to_string())
}

fn translate(key: &str, err: LimiterError) -> AppError {
    if err.is_invalid_argument() {
        return invalid_argument(key, err);
    }
    error!(key, "Rate limit check error: {}", err);
    AppError::Internal
}
