use serde::Serialize;

use crate::models::ResetTokenRecord;

/// アカウントレコード
///
/// password_hash は argon2id ハッシュのみ保持（平文は保存・ログ出力禁止）
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    #[serde(skip)]
    pub reset_tokens: Vec<ResetTokenRecord>,
}

impl Account {
    /// 新しいアカウントを作成（未使用トークンなし）
    pub fn new(email: &str, password_hash: &str) -> Self {
        Self {
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            reset_tokens: Vec::new(),
        }
    }
}
