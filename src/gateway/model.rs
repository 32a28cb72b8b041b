use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRateLimitRequest {
    pub key: String,
    pub limit: i32,
    pub window_seconds: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckRateLimitResponse {
    pub allowed: bool,
    pub remaining: i32,
    pub limit: i32,
    pub reset_at: DateTime<Utc>,
    /// 只在拒绝时返回
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<i32>,
}
