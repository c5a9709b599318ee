use std::sync::Arc;

use time::{Duration, OffsetDateTime};

use crate::config::Config;
use crate::error::AppError;
use crate::repositories::AccountStore;
use crate::services::token::ResetTokenCodec;
use crate::services::{EmailService, auth::hash_password};

/// パスワードリセットオーケストレーター
///
/// リクエスト → 発行 → 記録 → 配送 → リデンプション → 全トークン無効化
/// の一連の流れを調停する。ストアには AccountStore トレイト経由でのみ触れる。
#[derive(Clone)]
pub struct PasswordResetService {
    store: Arc<dyn AccountStore>,
    token_codec: ResetTokenCodec,
    email_service: EmailService,
    config: Arc<Config>,
}

impl PasswordResetService {
    pub fn new(
        store: Arc<dyn AccountStore>,
        token_codec: ResetTokenCodec,
        email_service: EmailService,
        config: Arc<Config>,
    ) -> Self {
        Self {
            store,
            token_codec,
            email_service,
            config,
        }
    }

    /// パスワードリセットをリクエスト
    ///
    /// # Security
    /// - アカウントが存在しない場合も成功を返す（列挙攻撃対策）。
    ///   外部から観測できる結果は存在有無によらず同一。
    /// - トークン（平文）は配送スタブ以外でログに出力しない
    pub async fn request_reset(&self, email: &str) -> Result<(), AppError> {
        tracing::info!(email = %email, "パスワードリセットリクエスト");

        // アカウント不在でも汎用レスポンス（存在有無を漏洩しない）
        if self.store.find_by_email(email).await?.is_none() {
            tracing::info!(email = %email, "アカウント不在（汎用レスポンス返却）");
            return Ok(());
        }

        let token = self.token_codec.issue(email);

        // ストア側の有効期限。Codec 埋め込みの max_age とは独立したゲート
        let expires_at = OffsetDateTime::now_utc()
            + Duration::seconds(self.config.password_reset_token_ttl_secs);

        self.store.add_reset_token(email, &token, expires_at).await?;

        let reset_url = self.build_reset_url(&token);
        self.email_service
            .send_password_reset_email(email, &reset_url)
            .await?;

        tracing::info!(email = %email, "リセットリンク配送完了");

        Ok(())
    }

    /// トークンを検証してパスワードを更新
    ///
    /// 副作用の順序が重要: パスワード更新は、トークンが署名的に有効かつ
    /// ストア上で未使用・期限内と確認された後にのみ行う。未使用トークン
    /// リストは consume 時点でアトミックに全消去されるため、兄弟トークン
    /// による二重リデンプションは起きない。
    ///
    /// # Security
    /// - token / new_password はログに出力しない
    /// - 失敗理由は呼び出し側に区別して返さない（AppError 側で集約）
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AppError> {
        let max_age = Duration::seconds(self.config.password_reset_token_ttl_secs);

        let email = self.token_codec.verify(token, max_age).map_err(|e| {
            tracing::warn!(error = %e, "トークン検証失敗");
            AppError::from(e)
        })?;

        if self.store.find_by_email(&email).await?.is_none() {
            tracing::warn!("検証済みトークンに対応するアカウントが不在");
            return Err(AppError::AccountNotFound);
        }

        if !self.store.consume_matching_token(&email, token).await? {
            tracing::warn!("トークンが未使用リストに存在しないか期限切れ");
            return Err(AppError::TokenNotOutstanding);
        }

        let password_hash = hash_password(new_password)?;
        self.store.set_password(&email, &password_hash).await?;

        tracing::info!(email = %email, "パスワードリセット完了");

        Ok(())
    }

    /// リセットURLを構築
    fn build_reset_url(&self, token: &str) -> String {
        match &self.config.password_reset_url_base {
            Some(base) => format!("{}?token={}", base, token),
            None => format!("http://localhost:3000/password-reset?token={}", token),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::MemoryAccountStore;
    use crate::services::auth::verify_password;
    use crate::services::token::TokenError;
    use secrecy::SecretBox;

    const EMAIL: &str = "user@example.com";
    const SECRET: &str = "test-secret-key";
    const SALT: &str = "test-reset-salt";

    fn test_config() -> Config {
        Config {
            secret_key: SecretBox::new(Box::new(SECRET.to_string())),
            password_reset_salt: SecretBox::new(Box::new(SALT.to_string())),
            host: "127.0.0.1".to_string(),
            port: 0,
            password_reset_url_base: None,
            password_reset_token_ttl_secs: 3600,
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_from_address: None,
            seed_account_email: None,
            seed_account_password: None,
        }
    }

    async fn service_with_account() -> (PasswordResetService, Arc<MemoryAccountStore>) {
        let store = Arc::new(MemoryAccountStore::new());
        let hash = hash_password("current_password").unwrap();
        store.insert_account(EMAIL, &hash).await;
        (service(store.clone()), store)
    }

    fn service(store: Arc<MemoryAccountStore>) -> PasswordResetService {
        let config = Arc::new(test_config());
        PasswordResetService::new(
            store,
            ResetTokenCodec::new(SECRET, SALT),
            EmailService::new(config.clone()),
            config,
        )
    }

    async fn outstanding_tokens(store: &MemoryAccountStore) -> Vec<String> {
        store
            .find_by_email(EMAIL)
            .await
            .unwrap()
            .map(|a| a.reset_tokens.iter().map(|t| t.token.clone()).collect())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_request_reset_records_token() {
        let (service, store) = service_with_account().await;

        service.request_reset(EMAIL).await.unwrap();

        assert_eq!(outstanding_tokens(&store).await.len(), 1);
    }

    #[tokio::test]
    async fn test_request_reset_for_absent_account_records_nothing() {
        let store = Arc::new(MemoryAccountStore::new());
        let service = service(store.clone());

        // 存在しないメールでも成功として扱われ、トークンはどこにも記録されない
        service.request_reset("nobody@example.com").await.unwrap();

        let found = store.find_by_email("nobody@example.com").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_redeem_updates_password_and_clears_tokens() {
        let (service, store) = service_with_account().await;

        service.request_reset(EMAIL).await.unwrap();
        let token = outstanding_tokens(&store).await[0].clone();

        service.reset_password(&token, "NewPass1!").await.unwrap();

        let account = store.find_by_email(EMAIL).await.unwrap().unwrap();
        assert!(verify_password("NewPass1!", &account.password_hash).unwrap());
        assert!(!verify_password("current_password", &account.password_hash).unwrap());
        assert!(account.reset_tokens.is_empty());
    }

    #[tokio::test]
    async fn test_redeem_same_token_twice_fails() {
        let (service, store) = service_with_account().await;

        service.request_reset(EMAIL).await.unwrap();
        let token = outstanding_tokens(&store).await[0].clone();

        service.reset_password(&token, "NewPass1!").await.unwrap();

        let err = service.reset_password(&token, "Another1!").await.unwrap_err();
        assert!(matches!(err, AppError::TokenNotOutstanding));

        // パスワードは1回目の値のまま
        let account = store.find_by_email(EMAIL).await.unwrap().unwrap();
        assert!(verify_password("NewPass1!", &account.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_redeem_succeeds_at_most_once() {
        let (service, store) = service_with_account().await;

        service.request_reset(EMAIL).await.unwrap();
        let token = outstanding_tokens(&store).await[0].clone();

        // 同一トークンへの並行リデンプションは片方だけが成功する
        let (first, second) = tokio::join!(
            service.reset_password(&token, "NewPass1!"),
            service.reset_password(&token, "Another1!"),
        );
        assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);

        // パスワードは成功した側の値になっている
        let account = store.find_by_email(EMAIL).await.unwrap().unwrap();
        let winner = if first.is_ok() { "NewPass1!" } else { "Another1!" };
        assert!(verify_password(winner, &account.password_hash).unwrap());
        assert!(account.reset_tokens.is_empty());
    }

    #[tokio::test]
    async fn test_redeem_invalidates_sibling_tokens() {
        let (service, store) = service_with_account().await;

        service.request_reset(EMAIL).await.unwrap();
        service.request_reset(EMAIL).await.unwrap();
        let tokens = outstanding_tokens(&store).await;
        assert_eq!(tokens.len(), 2);

        service.reset_password(&tokens[0], "NewPass1!").await.unwrap();

        // 一度も使われていない兄弟トークンも無効
        let err = service.reset_password(&tokens[1], "Another1!").await.unwrap_err();
        assert!(matches!(err, AppError::TokenNotOutstanding));
    }

    #[tokio::test]
    async fn test_redeem_forged_token_fails() {
        let (service, _store) = service_with_account().await;

        let forged = ResetTokenCodec::new("other-secret", SALT).issue(EMAIL);

        let err = service.reset_password(&forged, "NewPass1!").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Token(TokenError::InvalidSignature)
        ));
    }

    #[tokio::test]
    async fn test_redeem_token_for_deleted_account_fails() {
        let store = Arc::new(MemoryAccountStore::new());
        let service = service(store);

        // 署名は正しいがストアにアカウントが存在しない
        let token = ResetTokenCodec::new(SECRET, SALT).issue("gone@example.com");

        let err = service.reset_password(&token, "NewPass1!").await.unwrap_err();
        assert!(matches!(err, AppError::AccountNotFound));
    }
}
