/// コマンド層
///
/// 各コマンドは設定・認証・API層を組み合わせ、`anyhow::Result<CommandResult>` を返す。
pub mod delete;
pub mod login;
pub mod logout;
pub mod result;
pub mod status;
pub mod update;
pub mod upload;

pub use result::CommandResult;

use crate::api::{
    ApiClient, Authenticator, GoogleOAuth, ProgressCallback, UploadClient, YouTubeVideoApi,
};
use crate::config::{
    APP_CONFIG, Credentials, ExecutionContext, FileTokenStore, MemoryTokenStore, TokenStore,
    UserConfig,
};
use crate::domain::Session;
use anyhow::{Context, Result};
use std::sync::Arc;

/// 環境変数（と client_secrets.json）から認証情報を読み込む
fn load_credentials() -> Result<Credentials> {
    Credentials::from_env().context("Failed to load YouTube credentials")
}

fn token_store() -> Result<Arc<FileTokenStore>> {
    Ok(Arc::new(
        FileTokenStore::default_location().context("Failed to locate the token file")?,
    ))
}

fn authenticator(store: Arc<dyn TokenStore>) -> Result<Authenticator> {
    let flow = GoogleOAuth::new().context("Failed to create OAuth client")?;
    Ok(Authenticator::new(
        Arc::new(flow),
        store,
        ExecutionContext::detect(),
    ))
}

/// 認証済みセッションとアップロードクライアントを用意する
async fn connect(
    user_config: &UserConfig,
    progress: Option<ProgressCallback>,
) -> Result<(Session, UploadClient)> {
    let credentials = load_credentials()?;
    let policy = user_config
        .retry_policy()
        .context("Invalid retry settings in config.toml")?;

    // CI ではトークンをディスクに残さない
    let store: Arc<dyn TokenStore> = if ExecutionContext::detect().is_ci() {
        Arc::new(MemoryTokenStore::new())
    } else {
        token_store()?
    };

    let mut authenticator = authenticator(store)?;
    let session = authenticator
        .authenticate(&credentials)
        .await
        .context("Authentication failed")?;
    tracing::debug!(
        state = ?authenticator.state(),
        valid = authenticator.is_valid(&session),
        origin = ?session.origin(),
        "session ready"
    );

    let api_client = ApiClient::production(credentials.api_key.clone())
        .context("Failed to create API client")?;
    let mut client = UploadClient::new(Arc::new(YouTubeVideoApi::new(api_client)), policy);
    if let Some(callback) = progress {
        client = client.with_progress(callback);
    }

    Ok((session, client))
}

fn watch_url(video_id: &str) -> String {
    format!("{}{}", APP_CONFIG.upload.watch_url_prefix, video_id)
}
