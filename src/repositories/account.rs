use async_trait::async_trait;
use time::OffsetDateTime;

use crate::error::AppError;
use crate::models::Account;

/// アカウントストア抽象
///
/// オーケストレーターは本トレイト経由でのみアカウントに触れる。
/// 永続化バックエンド（RDB 等）への差し替えはこの境界で行う。
///
/// # Concurrency
/// 各操作はアカウント単位でアトミックであること。特に
/// `consume_matching_token` の照合→全消去は、同一アカウントへの
/// 並行リデンプションに対して不可分に観測されなければならない。
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// メールアドレスでアカウントを検索
    ///
    /// 返り値はその時点のスナップショット（呼び出し側は保持しない）
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError>;

    /// アカウントの未使用トークンリストにレコードを追加
    async fn add_reset_token(
        &self,
        email: &str,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), AppError>;

    /// トークンを消費する
    ///
    /// 完全一致するトークン文字列が存在し、かつ有効期限内である場合のみ
    /// true を返し、未使用トークンリスト全体をクリアする。
    /// それ以外は false を返し、一切変更しない。
    async fn consume_matching_token(&self, email: &str, token: &str) -> Result<bool, AppError>;

    /// アカウントのパスワードハッシュを更新
    ///
    /// # Note
    /// new_hash はログに出力しないこと
    async fn set_password(&self, email: &str, new_hash: &str) -> Result<(), AppError>;
}
