use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use time::{Duration, OffsetDateTime};

type HmacSha256 = Hmac<Sha256>;

/// トークンに埋め込む用途タグ
///
/// 署名対象に含まれるため、別用途のトークンをリセットに流用できない
const PURPOSE: &str = "password-reset";

/// トークン検証エラー
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,
}

/// パスワードリセットトークンの発行・検証
///
/// 形式: `b64(purpose).b64(email).b64(timestamp).b64(hmac)`
/// （各セグメントは Base64 URL-safe、パディングなし）
///
/// 署名キーはシークレットキーと用途ソルトから HMAC-SHA256 で導出する。
/// 異なる用途ソルトで発行されたトークンは署名検証で必ず失敗する。
#[derive(Clone)]
pub struct ResetTokenCodec {
    /// 導出済み署名キー（機密情報 - ログ出力禁止）
    signing_key: Vec<u8>,
}

impl ResetTokenCodec {
    /// シークレットキーと用途ソルトから Codec を作成
    pub fn new(secret_key: &str, purpose_salt: &str) -> Self {
        // 用途ソルトで署名キーを導出（itsdangerous と同様のキー分離）
        let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
            .expect("HMAC は任意長のキーを受け付ける");
        mac.update(purpose_salt.as_bytes());
        Self {
            signing_key: mac.finalize().into_bytes().to_vec(),
        }
    }

    /// アカウント識別子に対するトークンを発行
    ///
    /// 計算のみで副作用はない。発行時刻は秒精度の UNIX タイムスタンプ。
    pub fn issue(&self, email: &str) -> String {
        self.issue_at(email, OffsetDateTime::now_utc())
    }

    fn issue_at(&self, email: &str, issued_at: OffsetDateTime) -> String {
        let payload = format!(
            "{}.{}.{}",
            URL_SAFE_NO_PAD.encode(PURPOSE),
            URL_SAFE_NO_PAD.encode(email),
            URL_SAFE_NO_PAD.encode(issued_at.unix_timestamp().to_be_bytes()),
        );
        let tag = self.compute_tag(&payload);
        format!("{}.{}", payload, URL_SAFE_NO_PAD.encode(tag))
    }

    /// トークンを検証し、埋め込まれたアカウント識別子を返す
    ///
    /// # Errors
    /// - `Malformed`: 構造が解析できない
    /// - `InvalidSignature`: 署名不一致（改ざん・別キー・別用途）
    /// - `Expired`: 発行時刻 + max_age を経過
    pub fn verify(&self, token: &str, max_age: Duration) -> Result<String, TokenError> {
        let (payload, sig_b64) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
        let sig = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| TokenError::Malformed)?;

        // 署名検証を構造解析より先に行う（verify_slice は定数時間比較）
        let mut mac = HmacSha256::new_from_slice(&self.signing_key)
            .expect("HMAC は任意長のキーを受け付ける");
        mac.update(payload.as_bytes());
        mac.verify_slice(&sig)
            .map_err(|_| TokenError::InvalidSignature)?;

        let mut segments = payload.splitn(3, '.');
        let purpose = Self::decode_utf8(segments.next())?;
        let email = Self::decode_utf8(segments.next())?;
        let ts_bytes = URL_SAFE_NO_PAD
            .decode(segments.next().ok_or(TokenError::Malformed)?)
            .map_err(|_| TokenError::Malformed)?;

        // 署名は正しいが用途が異なる（同一ソルトで別用途に発行されたケース）
        if purpose != PURPOSE {
            return Err(TokenError::InvalidSignature);
        }

        let ts = i64::from_be_bytes(ts_bytes.try_into().map_err(|_| TokenError::Malformed)?);
        let issued_at =
            OffsetDateTime::from_unix_timestamp(ts).map_err(|_| TokenError::Malformed)?;

        if issued_at + max_age < OffsetDateTime::now_utc() {
            return Err(TokenError::Expired);
        }

        Ok(email)
    }

    fn compute_tag(&self, payload: &str) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(&self.signing_key)
            .expect("HMAC は任意長のキーを受け付ける");
        mac.update(payload.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    fn decode_utf8(segment: Option<&str>) -> Result<String, TokenError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(segment.ok_or(TokenError::Malformed)?)
            .map_err(|_| TokenError::Malformed)?;
        String::from_utf8(bytes).map_err(|_| TokenError::Malformed)
    }
}
