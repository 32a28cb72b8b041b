use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Script, Value};
use tokio::sync::Semaphore;

use super::{BucketStore, StoreError, TOKEN_BUCKET_SCRIPT, decode_number};
use crate::config::Config;
use crate::ratelimiter::bucket::{BucketParameters, BucketState, TransitionReply};

/// Redis 存储。所有请求共享一条多路复用连接，
/// 同时在途的命令数由信号量限制，超出的请求排队等待。
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    in_flight: Arc<Semaphore>,
    script: Arc<Script>,
}

impl RedisStore {
    pub async fn connect(config: &Config) -> Result<Self, StoreError> {
        let client = redis::Client::open(config.redis_url.as_str())?;

        // 传输层重试只发生在连接建立阶段，已经执行过的脚本不会被重放
        let manager_config = ConnectionManagerConfig::new()
            .set_number_of_retries(config.redis_max_retries)
            .set_connection_timeout(config.dial_timeout())
            .set_response_timeout(config.read_timeout());

        let conn = tokio::time::timeout(
            config.dial_timeout(),
            ConnectionManager::new_with_config(client, manager_config),
        )
        .await
        .map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::IoError, "timed out connecting to Redis"))
        })??;

        let store = Self {
            conn,
            in_flight: Arc::new(Semaphore::new(config.redis_pool_size)),
            script: Arc::new(Script::new(TOKEN_BUCKET_SCRIPT)),
        };
        store.ping().await?;

        Ok(store)
    }

    async fn connection(
        &self,
    ) -> Result<(ConnectionManager, tokio::sync::SemaphorePermit<'_>), StoreError> {
        let permit = self
            .in_flight
            .acquire()
            .await
            .map_err(|_| StoreError::PoolClosed)?;
        Ok((self.conn.clone(), permit))
    }
}

#[async_trait]
impl BucketStore for RedisStore {
    async fn transition(
        &self,
        key: &str,
        params: &BucketParameters,
        now: f64,
    ) -> Result<TransitionReply, StoreError> {
        let (mut conn, _permit) = self.connection().await?;

        let reply: Value = self
            .script
            .key(key)
            .arg(params.capacity)
            .arg(params.refill_rate)
            .arg(now)
            .arg(params.cost)
            .arg(params.ttl_secs)
            .invoke_async(&mut conn)
            .await?;

        parse_reply(&reply)
    }

    async fn snapshot(&self, key: &str) -> Result<Option<BucketState>, StoreError> {
        let (mut conn, _permit) = self.connection().await?;
        let fields: HashMap<String, String> = conn.hgetall(key).await?;

        if fields.is_empty() {
            return Ok(None);
        }

        let tokens = match fields.get("tokens") {
            Some(raw) => decode_number("tokens", raw)?,
            None => 0.0,
        };
        let last_refill = match fields.get("last_refill") {
            Some(raw) => decode_number("last_refill", raw)?,
            None => 0.0,
        };

        Ok(Some(BucketState {
            tokens,
            last_refill,
        }))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let (mut conn, _permit) = self.connection().await?;
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let (mut conn, _permit) = self.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

/// 把脚本返回值解析成固定的四元组，其他任何形状都视为版本不匹配
pub(crate) fn parse_reply(reply: &Value) -> Result<TransitionReply, StoreError> {
    let items = match reply {
        Value::Array(items) => items,
        other => {
            return Err(StoreError::MalformedReply(format!(
                "expected an array, got {other:?}"
            )));
        }
    };

    let [allowed, remaining, retry_after, until_full] = items.as_slice() else {
        return Err(StoreError::MalformedReply(format!(
            "expected 4 elements, got {}",
            items.len()
        )));
    };

    let allowed = match integer("allowed", allowed)? {
        0 => false,
        1 => true,
        other => {
            return Err(StoreError::MalformedReply(format!(
                "allowed must be 0 or 1, got {other}"
            )));
        }
    };
    let remaining = match remaining {
        Value::BulkString(bytes) => decode_number("remaining", &String::from_utf8_lossy(bytes))?,
        Value::SimpleString(s) => decode_number("remaining", s)?,
        Value::Int(n) => *n as f64,
        other => {
            return Err(StoreError::MalformedReply(format!(
                "remaining has unexpected type {other:?}"
            )));
        }
    };

    Ok(TransitionReply {
        allowed,
        remaining,
        retry_after_secs: integer("retry_after", retry_after)?,
        seconds_until_full: integer("seconds_until_full", until_full)?,
    })
}

fn integer(field: &str, value: &Value) -> Result<i64, StoreError> {
    match value {
        Value::Int(n) => Ok(*n),
        other => Err(StoreError::MalformedReply(format!(
            "{field} must be an integer, got {other:?}"
        ))),
    }
}
