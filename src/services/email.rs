use std::sync::Arc;

use crate::config::Config;
use crate::error::AppError;

/// リセットリンク配送サービス（開発環境: ログ出力スタブ）
///
/// コアの正しさはこのサービスに依存しない。本番では lettre による
/// SMTP 送信に差し替える。
#[derive(Clone)]
pub struct EmailService {
    config: Arc<Config>,
}

impl EmailService {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// パスワードリセットリンクを宛先に配送する
    ///
    /// 開発モードではメールを送信せず、リンクをログに出すだけ。
    pub async fn send_password_reset_email(
        &self,
        to: &str,
        reset_url: &str,
    ) -> Result<(), AppError> {
        let smtp_configured = self.config.smtp_host.is_some()
            && self.config.smtp_username.is_some()
            && self.config.smtp_password.is_some()
            && self.config.smtp_from_address.is_some();

        if !smtp_configured {
            tracing::info!(to = %to, reset_url = %reset_url, "リセットリンク配送（開発モード・送信なし）");
            return Ok(());
        }

        // TODO: email フィーチャー有効時に lettre の SmtpTransport で実送信する
        tracing::info!(to = %to, "リセットリンク配送（SMTP設定あり・送信は未実装）");
        Ok(())
    }
}
