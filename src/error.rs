use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::utils::{error_codes, error_to_api_response};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// 调用方输入有误，不会触达存储
    InvalidArgument(String),
    /// 存储或脚本出错，细节只写日志，不返回给调用方
    Internal,
    /// 健康检查时存储不可达
    Unavailable,
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            AppError::Internal => f.write_str("rate limit check failed"),
            AppError::Unavailable => f.write_str("rate limit store unavailable"),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, error_codes::VALIDATION_ERROR),
            AppError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, error_codes::INTERNAL_ERROR),
            AppError::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                error_codes::STORE_UNAVAILABLE,
            ),
        };

        (status, error_to_api_response::<()>(code, self.to_string())).into_response()
    }
}
