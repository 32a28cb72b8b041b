use std::sync::Arc;

use gateway::RequestGateway;
use ratelimiter::TokenBucketLimiter;

pub mod config;
pub mod error;
pub mod gateway;
pub mod ratelimiter;
pub mod routes;
pub mod storage;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<RequestGateway>,
}

impl AppState {
    pub fn new(limiter: TokenBucketLimiter) -> Self {
        Self {
            gateway: Arc::new(RequestGateway::new(limiter)),
        }
    }
}
