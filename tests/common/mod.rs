#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use ratelimit_service::ratelimiter::{
    BucketParameters, BucketState, ManualClock, TokenBucketLimiter, TransitionReply,
};
use ratelimit_service::storage::{BucketStore, MemoryStore, StoreError};

pub const T0: i64 = 1_700_000_000;

pub struct Fixture {
    pub limiter: TokenBucketLimiter,
    pub store: MemoryStore,
    pub clock: Arc<ManualClock>,
}

pub fn fixture() -> Fixture {
    let clock = Arc::new(ManualClock::at_unix(T0));
    let store = MemoryStore::new(clock.clone());
    let limiter = TokenBucketLimiter::new(Arc::new(store.clone())).with_clock(clock.clone());
    Fixture {
        limiter,
        store,
        clock,
    }
}

/// 模拟存储故障的替身
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Unreachable,
    Malformed,
}

pub struct FailingStore(pub Failure);

impl FailingStore {
    fn error(&self) -> StoreError {
        match self.0 {
            Failure::Unreachable => StoreError::Unavailable(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "connection refused",
            ))),
            Failure::Malformed => StoreError::MalformedReply("expected 4 elements, got 3".into()),
        }
    }
}

#[async_trait]
impl BucketStore for FailingStore {
    async fn transition(
        &self,
        _key: &str,
        _params: &BucketParameters,
        _now: f64,
    ) -> Result<TransitionReply, StoreError> {
        Err(self.error())
    }

    async fn snapshot(&self, _key: &str) -> Result<Option<BucketState>, StoreError> {
        Err(self.error())
    }

    async fn delete(&self, _key: &str) -> Result<(), StoreError> {
        Err(self.error())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(self.error())
    }
}
