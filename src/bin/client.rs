use std::time::Duration;

use clap::Parser;
use ratelimit_service::gateway::{CheckRateLimitRequest, CheckRateLimitResponse};
use ratelimit_service::utils::ApiResponse;

/// 向限流服务发送一次检查请求
#[derive(Debug, Parser)]
#[command(name = "ratelimit-client")]
struct Args {
    /// Rate limit key
    #[arg(long, default_value = "user:123")]
    key: String,

    /// Request limit
    #[arg(long, default_value_t = 10)]
    limit: i32,

    /// Window in seconds
    #[arg(long, default_value_t = 60)]
    window: i32,

    /// Key namespace
    #[arg(long, default_value = "default")]
    namespace: String,

    /// Server address
    #[arg(long, default_value = "http://localhost:50051")]
    server: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to build HTTP client: {e}");
            std::process::exit(1);
        }
    };

    let request = CheckRateLimitRequest {
        key: args.key,
        limit: args.limit,
        window_seconds: args.window,
        namespace: Some(args.namespace),
    };

    let url = format!("{}/v1/ratelimit/check", args.server.trim_end_matches('/'));
    let result = async {
        client
            .post(&url)
            .json(&request)
            .send()
            .await?
            .json::<ApiResponse<CheckRateLimitResponse>>()
            .await
    }
    .await;

    let resp = match result {
        Ok(ApiResponse {
            resp_data: Some(resp),
            ..
        }) => resp,
        Ok(ApiResponse { code, msg, .. }) => {
            eprintln!("CheckRateLimit failed: [{code}] {msg}");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("CheckRateLimit failed: {e}");
            std::process::exit(1);
        }
    };

    println!("Rate Limit Check Result:");
    println!("  Allowed: {}", resp.allowed);
    println!("  Remaining: {}", resp.remaining);
    println!("  Limit: {}", resp.limit);
    println!("  Reset At: {}", resp.reset_at);
    if let Some(retry_after) = resp.retry_after_seconds {
        println!("  Retry After: {retry_after} seconds");
    }
}
