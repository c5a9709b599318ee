use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::models::{Account, ResetTokenRecord};
use crate::repositories::AccountStore;

/// インメモリのアカウントストア
///
/// 小規模前提でストア全体を単一の async Mutex で保護する。
/// 期限切れトークンはバックグラウンド掃除せず、次回のトークン追加時に
/// 遅延削除する（ストアが無制限に成長する場合は要再検討）。
pub struct MemoryAccountStore {
    accounts: Mutex<HashMap<String, Account>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
        }
    }

    /// アカウントを直接登録する（起動時シード・テスト用）
    pub async fn insert_account(&self, email: &str, password_hash: &str) {
        let mut accounts = self.accounts.lock().await;
        accounts.insert(email.to_string(), Account::new(email, password_hash));
    }
}

impl Default for MemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        let accounts = self.accounts.lock().await;
        Ok(accounts.get(email).cloned())
    }

    async fn add_reset_token(
        &self,
        email: &str,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), AppError> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts.get_mut(email).ok_or(AppError::AccountNotFound)?;

        // 期限切れレコードの遅延削除
        let now = OffsetDateTime::now_utc();
        account.reset_tokens.retain(|t| t.is_live(now));

        account.reset_tokens.push(ResetTokenRecord {
            token: token.to_string(),
            expires_at,
        });
        Ok(())
    }

    async fn consume_matching_token(&self, email: &str, token: &str) -> Result<bool, AppError> {
        let mut accounts = self.accounts.lock().await;
        let Some(account) = accounts.get_mut(email) else {
            return Ok(false);
        };

        // 照合と全消去をロック内で不可分に行う
        let now = OffsetDateTime::now_utc();
        let matched = account
            .reset_tokens
            .iter()
            .any(|t| t.token == token && t.is_live(now));

        if matched {
            account.reset_tokens.clear();
        }
        Ok(matched)
    }

    async fn set_password(&self, email: &str, new_hash: &str) -> Result<(), AppError> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts.get_mut(email).ok_or(AppError::AccountNotFound)?;
        account.password_hash = new_hash.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    const EMAIL: &str = "user@example.com";

    async fn store_with_account() -> MemoryAccountStore {
        let store = MemoryAccountStore::new();
        store.insert_account(EMAIL, "argon2-hash").await;
        store
    }

    fn future() -> OffsetDateTime {
        OffsetDateTime::now_utc() + Duration::seconds(3600)
    }

    #[tokio::test]
    async fn test_find_by_email_absent() {
        let store = MemoryAccountStore::new();
        let found = store.find_by_email(EMAIL).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_add_reset_token_to_absent_account() {
        let store = MemoryAccountStore::new();
        let result = store.add_reset_token(EMAIL, "tok", future()).await;
        assert!(matches!(result, Err(AppError::AccountNotFound)));
    }

    #[tokio::test]
    async fn test_consume_matching_token_clears_entire_list() {
        let store = store_with_account().await;
        store.add_reset_token(EMAIL, "tok-1", future()).await.unwrap();
        store.add_reset_token(EMAIL, "tok-2", future()).await.unwrap();

        assert!(store.consume_matching_token(EMAIL, "tok-1").await.unwrap());

        // 兄弟トークンも含めて全クリア
        let account = store.find_by_email(EMAIL).await.unwrap().unwrap();
        assert!(account.reset_tokens.is_empty());
        assert!(!store.consume_matching_token(EMAIL, "tok-2").await.unwrap());
    }

    #[tokio::test]
    async fn test_consume_unknown_token_does_not_mutate() {
        let store = store_with_account().await;
        store.add_reset_token(EMAIL, "tok-1", future()).await.unwrap();

        assert!(!store.consume_matching_token(EMAIL, "other").await.unwrap());

        let account = store.find_by_email(EMAIL).await.unwrap().unwrap();
        assert_eq!(account.reset_tokens.len(), 1);
    }

    #[tokio::test]
    async fn test_consume_expired_record_fails() {
        let store = store_with_account().await;
        let past = OffsetDateTime::now_utc() - Duration::seconds(1);
        store.add_reset_token(EMAIL, "tok-1", past).await.unwrap();

        assert!(!store.consume_matching_token(EMAIL, "tok-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_consume_for_absent_account_is_false() {
        let store = MemoryAccountStore::new();
        assert!(!store.consume_matching_token(EMAIL, "tok").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_records_evicted_on_add() {
        let store = store_with_account().await;
        let past = OffsetDateTime::now_utc() - Duration::seconds(1);
        store.add_reset_token(EMAIL, "stale", past).await.unwrap();
        store.add_reset_token(EMAIL, "fresh", future()).await.unwrap();

        let account = store.find_by_email(EMAIL).await.unwrap().unwrap();
        assert_eq!(account.reset_tokens.len(), 1);
        assert_eq!(account.reset_tokens[0].token, "fresh");
    }

    #[tokio::test]
    async fn test_set_password_updates_hash() {
        let store = store_with_account().await;
        store.set_password(EMAIL, "new-hash").await.unwrap();

        let account = store.find_by_email(EMAIL).await.unwrap().unwrap();
        assert_eq!(account.password_hash, "new-hash");
    }
}
