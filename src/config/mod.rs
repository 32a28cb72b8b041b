use std::env;
use std::time::Duration;

pub const DEFAULT_KEY_PREFIX: &str = "ratelimit:token_bucket";

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub redis_url: String,
    pub redis_max_retries: usize,
    pub redis_dial_timeout_secs: u64,
    pub redis_read_timeout_secs: u64,
    pub redis_pool_size: usize,
    pub key_prefix: String,
    pub server_host: String,
    pub server_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        Ok(Config {
            redis_url: env::var("REDIS_URL")?,
            redis_max_retries: parse_or("REDIS_MAX_RETRIES", 3),
            redis_dial_timeout_secs: parse_or("REDIS_DIAL_TIMEOUT_SECS", 5),
            redis_read_timeout_secs: parse_or("REDIS_READ_TIMEOUT_SECS", 3),
            // 连接池为 0 时没有任何请求能拿到连接
            redis_pool_size: parse_or::<usize>("REDIS_POOL_SIZE", 10).max(1),
            key_prefix: env::var("RATE_LIMIT_KEY_PREFIX")
                .unwrap_or_else(|_| DEFAULT_KEY_PREFIX.to_string()),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: parse_or("SERVER_PORT", 50051),
        })
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.redis_dial_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.redis_read_timeout_secs)
    }
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
