use crate::commands::result::{CommandResult, LogoutResult};
use crate::commands::{authenticator, load_credentials, token_store};
use anyhow::{Context, Result};

/// ログアウトコマンドを実行する
///
/// 保存済みのリフレッシュトークンを削除する。トークンの失効（revoke）は行わない。
pub async fn execute() -> Result<CommandResult> {
    let credentials = load_credentials()?;
    let authenticator = authenticator(token_store()?)?;

    let was_logged_in = authenticator
        .forget(&credentials.client_id)
        .context("Failed to remove saved refresh token")?;

    Ok(CommandResult::Logout(LogoutResult { was_logged_in }))
}
