use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::services::PasswordResetService;
use crate::state::AppState;

/// リクエスト受付時の汎用メッセージ（アカウント存在有無によらず常に同一）
const RESET_REQUEST_ACK: &str = "If this email exists, a reset link has been sent";
/// リセット成功メッセージ
const RESET_SUCCESS: &str = "Password updated successfully";

// === リセットリクエスト ===

#[derive(Debug, Deserialize)]
pub struct ResetRequestRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ResetRequestResponse {
    pub message: String,
}

/// POST /api/password/reset-request
///
/// # Security
/// 常に200と同一ボディを返す（アカウント存在有無を漏洩しない）
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(request): Json<ResetRequestRequest>,
) -> Result<Json<ResetRequestResponse>, AppError> {
    // バリデーション（リクエストボディのみを見る - アカウント状態には触れない）
    validate_email(&request.email)?;

    let service = PasswordResetService::new(
        state.store.clone(),
        state.token_codec.clone(),
        state.email_service.clone(),
        state.config.clone(),
    );
    service.request_reset(&request.email).await?;

    Ok(Json(ResetRequestResponse {
        message: RESET_REQUEST_ACK.to_string(),
    }))
}

// === パスワードリセット実行 ===

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct ResetPasswordResponse {
    pub message: String,
}

/// POST /api/password/reset
///
/// # Security
/// - token, new_password はログに出力しない
/// - 失敗は単一の "Invalid or expired token" に集約される（error.rs）
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<ResetPasswordResponse>, AppError> {
    validate_reset_password_request(&request)?;

    let service = PasswordResetService::new(
        state.store.clone(),
        state.token_codec.clone(),
        state.email_service.clone(),
        state.config.clone(),
    );
    service
        .reset_password(&request.token, &request.new_password)
        .await?;

    Ok(Json(ResetPasswordResponse {
        message: RESET_SUCCESS.to_string(),
    }))
}

/// メールアドレスのバリデーション
fn validate_email(email: &str) -> Result<(), AppError> {
    if email.trim().is_empty() || !email.contains('@') {
        return Err(AppError::Validation(
            "A valid email address is required".to_string(),
        ));
    }
    Ok(())
}

/// リセットパスワードリクエストのバリデーション
fn validate_reset_password_request(request: &ResetPasswordRequest) -> Result<(), AppError> {
    if request.token.trim().is_empty() {
        return Err(AppError::Validation("Token is required".to_string()));
    }
    if request.new_password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}
