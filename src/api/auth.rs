/// 認証マネージャー
///
/// `Credentials` を有効期限付きの `Session` に交換します。
/// まず保存済みのリフレッシュトークンを静かに試し、`invalid_grant` なら
/// 保存済みのものを削除して、実行環境に応じた認可コード交換（ブラウザ or CI）にフォールバックします。
/// 新しいリフレッシュトークンが発行されたら `TokenStore` に保存します。
///
/// 状態遷移: `Unauthenticated → Authenticating → Authenticated → Expired`
/// 交換に失敗した場合は `Authenticating → Unauthenticated` に戻り、その実行は失敗する。
use crate::api::error::{ClientError, InfraError};
use crate::config::token_store::{TokenStore, refresh_token_key};
use crate::config::{APP_CONFIG, Credentials, ExecutionContext};
use crate::domain::{AuthState, Session, SessionOrigin};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;

/// トークンエンドポイントから得たもの
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    /// Google は初回の交換時と、まれにローテーション時のみ返す
    pub refresh_token: Option<String>,
    pub expires_in: Option<Duration>,
}

/// OAuth2 サーバーとのやり取り
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OAuthFlow: Send + Sync {
    /// リフレッシュトークンを交換する
    ///
    /// `invalid_grant`（失効・取り消し）の場合は `Ok(None)`。
    async fn refresh(
        &self,
        credentials: &Credentials,
        refresh_token: &str,
    ) -> Result<Option<TokenGrant>, ClientError>;

    /// 認可コードを取得して交換する
    async fn exchange_code(
        &self,
        credentials: &Credentials,
        context: &ExecutionContext,
    ) -> Result<TokenGrant, ClientError>;
}

pub struct Authenticator {
    flow: Arc<dyn OAuthFlow>,
    store: Arc<dyn TokenStore>,
    context: ExecutionContext,
    state: AuthState,
    expires_at: Option<DateTime<Utc>>,
}

impl Authenticator {
    pub fn new(
        flow: Arc<dyn OAuthFlow>,
        store: Arc<dyn TokenStore>,
        context: ExecutionContext,
    ) -> Self {
        Self {
            flow,
            store,
            context,
            state: AuthState::Unauthenticated,
            expires_at: None,
        }
    }

    /// 現在の認証状態
    pub fn state(&self) -> AuthState {
        match (self.state, self.expires_at) {
            (AuthState::Authenticated, Some(expires_at)) if Utc::now() >= expires_at => {
                AuthState::Expired
            }
            (state, _) => state,
        }
    }

    /// セッションが有効か（ネットワークアクセスなし）
    pub fn is_valid(&self, session: &Session) -> bool {
        session.is_valid()
    }

    /// 認証情報をセッションに交換する
    ///
    /// # Errors
    /// - `MissingCredentials`: 必須フィールドが空（ネットワークアクセスなし）
    /// - `AuthenticationRejected`: 認可コード交換が拒否された、またはCIでコードがない
    /// - `Network` / `Timeout`: 認証中の通信失敗（再試行しない）
    pub async fn authenticate(&mut self, credentials: &Credentials) -> Result<Session, ClientError> {
        credentials.validate()?;
        self.transition(AuthState::Authenticating);

        for (refresh_token, stored) in self.refresh_candidates(credentials) {
            match self.flow.refresh(credentials, &refresh_token).await {
                Ok(Some(grant)) => {
                    return self.finish(
                        credentials,
                        grant,
                        SessionOrigin::RefreshToken,
                        Some(&refresh_token),
                    );
                }
                Ok(None) => {
                    tracing::info!(stored, "refresh token was rejected (invalid_grant)");
                    if stored {
                        self.discard(&credentials.client_id);
                    }
                }
                Err(e) => {
                    self.transition(AuthState::Unauthenticated);
                    return Err(e);
                }
            }
        }

        self.exchange(credentials).await
    }

    /// 保存済みトークンを使わずに認可コード交換を行う（`login` コマンド用）
    pub async fn login(&mut self, credentials: &Credentials) -> Result<Session, ClientError> {
        credentials.validate()?;
        self.transition(AuthState::Authenticating);
        self.exchange(credentials).await
    }

    /// 保存済みのリフレッシュトークンを削除する
    pub fn forget(&self, client_id: &str) -> Result<bool, crate::config::ConfigError> {
        self.store.remove(&refresh_token_key(client_id))
    }

    async fn exchange(&mut self, credentials: &Credentials) -> Result<Session, ClientError> {
        tracing::info!(ci = self.context.is_ci(), "falling back to authorization code exchange");
        match self.flow.exchange_code(credentials, &self.context).await {
            Ok(grant) => self.finish(credentials, grant, SessionOrigin::CodeExchange, None),
            Err(e) => {
                self.transition(AuthState::Unauthenticated);
                Err(e)
            }
        }
    }

    /// 試すリフレッシュトークン（保存済み → 認証情報、重複なし）
    ///
    /// 2つ目の値はストアから読んだものかどうか。
    fn refresh_candidates(&self, credentials: &Credentials) -> Vec<(String, bool)> {
        let stored = match self.store.get(&refresh_token_key(&credentials.client_id)) {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "could not read stored refresh token, ignoring it");
                None
            }
        };

        let mut candidates: Vec<(String, bool)> = Vec::new();
        let sources = [(stored, true), (credentials.refresh_token.clone(), false)];
        for (token, from_store) in sources {
            let Some(token) = token else { continue };
            if !token.is_empty() && !candidates.iter().any(|(seen, _)| *seen == token) {
                candidates.push((token, from_store));
            }
        }
        candidates
    }

    fn finish(
        &mut self,
        credentials: &Credentials,
        grant: TokenGrant,
        origin: SessionOrigin,
        used_refresh_token: Option<&str>,
    ) -> Result<Session, ClientError> {
        if grant.access_token.is_empty() {
            self.transition(AuthState::Unauthenticated);
            return Err(InfraError::authentication_rejected(
                "token endpoint returned an empty access token",
            )
            .into());
        }

        if let Some(new_token) = grant.refresh_token.as_deref() {
            if Some(new_token) != used_refresh_token {
                self.persist(&credentials.client_id, new_token);
            }
        }

        let margin = ChronoDuration::seconds(APP_CONFIG.oauth.expiry_margin_seconds);
        let session = match grant
            .expires_in
            .and_then(|d| ChronoDuration::from_std(d).ok())
        {
            Some(expires_in) => Session::expiring_in(grant.access_token, expires_in, margin, origin),
            None => Session::new(
                grant.access_token,
                Utc::now() + ChronoDuration::seconds(APP_CONFIG.oauth.default_lifetime_seconds),
                origin,
            ),
        };

        self.expires_at = Some(session.expires_at());
        self.transition(AuthState::Authenticated);
        tracing::debug!(?origin, expires_at = %session.expires_at(), "authenticated");

        Ok(session)
    }

    // 保存に失敗してもセッションはこの実行の間は使える
    fn persist(&self, client_id: &str, refresh_token: &str) {
        match self.store.put(&refresh_token_key(client_id), refresh_token) {
            Ok(()) => tracing::info!("saved refresh token"),
            Err(e) => tracing::warn!(error = %e, "failed to save refresh token"),
        }
    }

    /// 拒否された保存済みリフレッシュトークンを削除する
    fn discard(&self, client_id: &str) {
        match self.store.remove(&refresh_token_key(client_id)) {
            Ok(_) => tracing::info!("removed rejected refresh token from store"),
            Err(e) => tracing::warn!(error = %e, "failed to remove rejected refresh token"),
        }
    }

    fn transition(&mut self, to: AuthState) {
        tracing::debug!(from = ?self.state, to = ?to, "auth state");
        self.state = to;
    }
}
