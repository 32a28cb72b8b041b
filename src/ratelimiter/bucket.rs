//! 令牌桶的状态转移。
//!
//! `BucketState::transition` 是读取-补充-判定-写回这一步的纯函数形式，
//! Redis 端的 Lua 脚本和 `MemoryStore` 都必须与它逐位一致。

/// 每次检查固定消耗的令牌数
pub const COST: f64 = 1.0;

/// 由一次请求推导出的桶参数，不持久化
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketParameters {
    pub capacity: f64,
    /// 每秒补充的令牌数
    pub refill_rate: f64,
    pub cost: f64,
    /// 成功写回后设置的过期时间（秒）
    pub ttl_secs: i64,
}

impl BucketParameters {
    /// 调用方必须先保证 `limit > 0` 且 `window_secs > 0`。
    pub fn for_limit(limit: i32, window_secs: i32) -> Self {
        Self {
            capacity: f64::from(limit),
            refill_rate: f64::from(limit) / f64::from(window_secs),
            cost: COST,
            ttl_secs: i64::from(window_secs) * 2,
        }
    }
}

/// 持久化在共享存储中的桶状态
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BucketState {
    pub tokens: f64,
    /// 上次补充时间，unix 秒
    pub last_refill: f64,
}

/// 原子步骤的返回值，固定四个字段
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionReply {
    pub allowed: bool,
    pub remaining: f64,
    pub retry_after_secs: i64,
    pub seconds_until_full: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub reply: TransitionReply,
    /// 只有放行时才写回
    pub commit: Option<BucketState>,
}

impl BucketState {
    pub fn transition(
        stored: Option<BucketState>,
        params: &BucketParameters,
        now: f64,
    ) -> Transition {
        let state = stored.unwrap_or(BucketState {
            tokens: params.capacity,
            last_refill: now,
        });

        // 时钟回拨时 elapsed 取 0，不会倒扣令牌
        let elapsed = (now - state.last_refill).max(0.0);
        let refilled = params
            .capacity
            .min(state.tokens + elapsed * params.refill_rate);

        if refilled >= params.cost {
            let tokens = refilled - params.cost;
            Transition {
                reply: TransitionReply {
                    allowed: true,
                    remaining: tokens,
                    retry_after_secs: 0,
                    seconds_until_full: ceil_secs(params.capacity - tokens, params.refill_rate),
                },
                commit: Some(BucketState {
                    tokens,
                    last_refill: now.max(state.last_refill),
                }),
            }
        } else {
            // 拒绝时 last_refill 保持原值，下次仍从原来的时间点累计补充
            Transition {
                reply: TransitionReply {
                    allowed: false,
                    remaining: refilled,
                    retry_after_secs: ceil_secs(params.cost - refilled, params.refill_rate),
                    seconds_until_full: ceil_secs(params.capacity - refilled, params.refill_rate),
                },
                commit: None,
            }
        }
    }
}

fn ceil_secs(tokens: f64, refill_rate: f64) -> i64 {
    (tokens / refill_rate).ceil() as i64
}
