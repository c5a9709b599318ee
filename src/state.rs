use std::sync::Arc;

use secrecy::ExposeSecret;

use crate::config::Config;
use crate::repositories::AccountStore;
use crate::services::{EmailService, ResetTokenCodec};

/// アプリケーション共有状態
///
/// axum の State として全ハンドラーで共有される。
/// Clone は必須（axum が内部で clone するため）。
///
/// ストアは起動時に構築して注入する（モジュールレベルのシングルトンにしない）。
#[derive(Clone)]
pub struct AppState {
    /// アカウントストア（バックエンド差し替え可能）
    pub store: Arc<dyn AccountStore>,
    /// アプリケーション設定（Arc で共有）
    pub config: Arc<Config>,
    /// リセットトークン Codec
    pub token_codec: ResetTokenCodec,
    /// リセットリンク配送サービス
    pub email_service: EmailService,
}

impl AppState {
    /// 新しい AppState を作成
    pub fn new(store: Arc<dyn AccountStore>, config: Config) -> Self {
        let config = Arc::new(config);
        let token_codec = ResetTokenCodec::new(
            config.secret_key.expose_secret(),
            config.password_reset_salt.expose_secret(),
        );
        let email_service = EmailService::new(config.clone());

        Self {
            store,
            config,
            token_codec,
            email_service,
        }
    }
}
