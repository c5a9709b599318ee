use serde::Serialize;
use time::OffsetDateTime;

/// 未使用パスワードリセットトークンレコード
///
/// アカウントの reset_tokens リストに存在し、かつ expires_at が未来である間のみ有効。
/// リセット成功時にリスト全体がクリアされる（全トークン無効化）。
#[derive(Debug, Clone, Serialize)]
pub struct ResetTokenRecord {
    #[serde(skip)]
    pub token: String,
    pub expires_at: OffsetDateTime,
}

impl ResetTokenRecord {
    /// レコードが現時点で有効期限内かどうか
    pub fn is_live(&self, now: OffsetDateTime) -> bool {
        self.expires_at > now
    }
}
