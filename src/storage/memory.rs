use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::{BucketStore, StoreError, decode_number, encode_number};
use crate::ratelimiter::bucket::{BucketParameters, BucketState, TransitionReply};
use crate::ratelimiter::clock::{Clock, SystemClock, unix_seconds};

/// 进程内存储，用于测试和单机开发。
///
/// 整个读取-补充-判定-写回步骤在同一把锁内完成，字段以文本保存，
/// 与 Redis hash 的行为一致；过期时间按传入的 `now` 计算。
#[derive(Debug, Clone)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    clock: Arc<dyn Clock>,
    calls: Arc<AtomicUsize>,
}

#[derive(Debug, Clone)]
struct Entry {
    tokens: String,
    last_refill: String,
    expires_at: f64,
}

impl Entry {
    fn decode(&self) -> Result<BucketState, StoreError> {
        Ok(BucketState {
            tokens: decode_number("tokens", &self.tokens)?,
            last_refill: decode_number("last_refill", &self.last_refill)?,
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl MemoryStore {
    /// `clock` 只用于判断快照读取时条目是否过期
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            clock,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 已经发生的存储调用次数
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn live<'a>(
        entries: &'a mut HashMap<String, Entry>,
        key: &str,
        now: f64,
    ) -> Option<&'a Entry> {
        if entries.get(key).is_some_and(|e| e.expires_at <= now) {
            entries.remove(key);
        }
        entries.get(key)
    }
}

#[async_trait]
impl BucketStore for MemoryStore {
    async fn transition(
        &self,
        key: &str,
        params: &BucketParameters,
        now: f64,
    ) -> Result<TransitionReply, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut entries = self.lock();

        let stored = Self::live(&mut entries, key, now)
            .map(Entry::decode)
            .transpose()?;
        let step = BucketState::transition(stored, params, now);

        if let Some(state) = step.commit {
            entries.insert(
                key.to_string(),
                Entry {
                    tokens: encode_number(state.tokens),
                    last_refill: encode_number(state.last_refill),
                    expires_at: now + params.ttl_secs as f64,
                },
            );
        }

        Ok(step.reply)
    }

    async fn snapshot(&self, key: &str) -> Result<Option<BucketState>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = unix_seconds(self.clock.now());
        let mut entries = self.lock();
        Self::live(&mut entries, key, now)
            .map(Entry::decode)
            .transpose()
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.lock().remove(key);
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimiter::clock::{ManualClock, from_unix_seconds};

    const T0: f64 = 1_700_000_000.0;

    #[tokio::test]
    async fn denial_writes_nothing() {
        let store = MemoryStore::new(Arc::new(ManualClock::at_unix(T0 as i64)));
        let params = BucketParameters::for_limit(1, 10);

        assert!(store.transition("k", &params, T0).await.unwrap().allowed);
        let before = store.snapshot("k").await.unwrap();
        assert!(before.is_some());
        assert!(!store.transition("k", &params, T0 + 1.0).await.unwrap().allowed);

        let after = store.snapshot("k").await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn entry_expires_after_ttl() {
        let clock = Arc::new(ManualClock::at_unix(T0 as i64));
        let store = MemoryStore::new(clock.clone());
        let params = BucketParameters::for_limit(3, 5);

        store.transition("k", &params, T0).await.unwrap();
        assert!(store.snapshot("k").await.unwrap().is_some());

        clock.advance(chrono::Duration::seconds(10));
        assert_eq!(store.snapshot("k").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn text_encoding_does_not_drift() {
        let clock = Arc::new(ManualClock::at_unix(T0 as i64));
        let store = MemoryStore::new(clock.clone());
        let params = BucketParameters::for_limit(7, 3);
        let mut expected: Option<BucketState> = None;
        let mut now = T0;

        for i in 0..10_000u32 {
            now += f64::from(i % 7) * 0.071;
            store.transition("k", &params, now).await.unwrap();
            if let Some(next) = BucketState::transition(expected, &params, now).commit {
                expected = Some(next);
            }
        }

        clock.set(from_unix_seconds(now));
        let stored = store.snapshot("k").await.unwrap().unwrap();
        let expected = expected.unwrap();
        assert!((stored.tokens - expected.tokens).abs() <= 1e-6);
        assert!((stored.last_refill - expected.last_refill).abs() <= 1e-6);
    }
}
