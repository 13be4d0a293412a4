use crate::commands::result::{CommandResult, LoginResult};
use crate::commands::{authenticator, load_credentials, token_store};
use crate::config::TokenStore;
use crate::config::token_store::refresh_token_key;
use anyhow::{Context, Result};

/// ログインコマンドを実行する
///
/// 保存済みトークンの有無にかかわらず認可コード交換を行い、
/// 新しいリフレッシュトークンを保存する。
/// ローカルではブラウザを開き、CIでは `YOUTUBE_AUTH_CODE` を使う。
pub async fn execute() -> Result<CommandResult> {
    let credentials = load_credentials()?;
    let store = token_store()?;

    let key = refresh_token_key(&credentials.client_id);
    let was_logged_in = store
        .get(&key)
        .context("Failed to read saved refresh token")?
        .is_some();

    let mut authenticator = authenticator(store.clone())?;
    let session = authenticator
        .login(&credentials)
        .await
        .context("Authorization failed")?;

    if store.get(&key).ok().flatten().is_none() {
        tracing::warn!("Google did not return a refresh token; the next run will need to authorize again");
    }

    Ok(CommandResult::Login(LoginResult {
        was_logged_in,
        origin: session.origin(),
        expires_at: session.expires_at(),
        token_path: store.path().display().to_string(),
    }))
}
