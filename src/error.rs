use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::services::token::TokenError;

/// 外部に返す統一トークンエラーメッセージ
///
/// 失敗理由（改ざん・期限切れ・アカウント不在・未使用リスト不一致）を
/// 区別して返さない
pub const INVALID_OR_EXPIRED_TOKEN: &str = "Invalid or expired token";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("token verification failed")]
    Token(#[from] TokenError),

    #[error("account not found")]
    AccountNotFound,

    #[error("token not outstanding")]
    TokenNotOutstanding,

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            // トークン系の失敗は理由を問わず同一レスポンスに集約
            Self::Token(_) | Self::AccountNotFound | Self::TokenNotOutstanding => {
                (StatusCode::BAD_REQUEST, INVALID_OR_EXPIRED_TOKEN.to_string())
            }
            Self::Internal(e) => {
                tracing::error!(error = ?e, "内部エラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
