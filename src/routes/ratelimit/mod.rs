mod handler;

pub use handler::{check_rate_limit, get_bucket, health_check, reset_bucket};
