//! 共享状态存储。
//!
//! 桶状态只能通过 [`BucketStore::transition`] 这一原子步骤修改；
//! 不同进程里的调用方靠存储端对单个 key 的串行执行来保证一致。

mod memory;
mod redis_store;
mod scripts;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use scripts::TOKEN_BUCKET_SCRIPT;

use async_trait::async_trait;

use crate::ratelimiter::bucket::{BucketParameters, BucketState, TransitionReply};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("shared store unavailable: {0}")]
    Unavailable(#[from] redis::RedisError),
    #[error("connection pool closed")]
    PoolClosed,
    /// 脚本返回的形状与预期不符，说明编排层和脚本版本不匹配
    #[error("malformed transition reply: {0}")]
    MalformedReply(String),
}

#[async_trait]
pub trait BucketStore: Send + Sync {
    /// 以一个不可分割的步骤执行读取、补充、判定和条件写回。
    async fn transition(
        &self,
        key: &str,
        params: &BucketParameters,
        now: f64,
    ) -> Result<TransitionReply, StoreError>;

    /// 只读查看已持久化的状态，key 不存在时返回 `None`
    async fn snapshot(&self, key: &str) -> Result<Option<BucketState>, StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// 令牌数写入文本字段时使用的编码，解析后与原值完全一致
pub fn encode_number(value: f64) -> String {
    value.to_string()
}

pub fn decode_number(field: &str, raw: &str) -> Result<f64, StoreError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| StoreError::MalformedReply(format!("{field} is not a number: {raw:?}")))
}
