/// 認証セッション
///
/// Authenticator が発行する、有効期限付きの不透明な認証ハンドル。
/// 1回の実行の間だけ呼び出し元が所有し、ディスクには保存しない。
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;

/// セッションの取得経路
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOrigin {
    /// 保存済みリフレッシュトークンの再利用
    RefreshToken,
    /// 認可コードの交換（ブラウザ or CI）
    CodeExchange,
}

/// 認証状態
///
/// `Unauthenticated → Authenticating → Authenticated → Expired`
/// 交換に失敗した場合は `Authenticating → Unauthenticated` に戻る。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Expired,
}

#[derive(Clone)]
pub struct Session {
    access_token: String,
    expires_at: DateTime<Utc>,
    origin: SessionOrigin,
}

impl Session {
    pub fn new(access_token: String, expires_at: DateTime<Utc>, origin: SessionOrigin) -> Self {
        Self {
            access_token,
            expires_at,
            origin,
        }
    }

    /// `expires_in` から有効期限を計算して作成
    ///
    /// 期限ぎりぎりでの失敗を避けるため `margin` を差し引く。
    pub fn expiring_in(
        access_token: String,
        expires_in: Duration,
        margin: Duration,
        origin: SessionOrigin,
    ) -> Self {
        Self::new(access_token, Utc::now() + expires_in - margin, origin)
    }

    /// 現在時刻で有効か（ネットワークアクセスなし）
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && now < self.expires_at
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn origin(&self) -> SessionOrigin {
        self.origin
    }
}

// アクセストークンをログに出さない
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("origin", &self.origin)
            .finish()
    }
}
