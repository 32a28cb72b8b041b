//! 令牌桶限流：桶参数推导、状态转移和对存储的编排。

pub mod bucket;
pub mod clock;
mod token_bucket;

pub use bucket::{BucketParameters, BucketState, TransitionReply};
pub use clock::{Clock, ManualClock, SystemClock};
pub use token_bucket::{
    BucketSnapshot, LimiterError, RateLimitDecision, TokenBucketLimiter, validate,
};
