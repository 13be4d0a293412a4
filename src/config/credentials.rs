/// 認証情報の解決
///
/// 環境変数（`.env` 読み込み後）と Google の OAuth クライアントシークレットファイル
/// から `Credentials` を組み立てます。ここでは値の有無を検証しません。
/// 空チェックは認証直前に `Credentials::validate` で行います。
use crate::config::error::ConfigError;
use crate::domain::DomainError;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_API_KEY: &str = "YOUTUBE_API_KEY";
pub const ENV_CLIENT_ID: &str = "YOUTUBE_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "YOUTUBE_CLIENT_SECRET";
pub const ENV_REFRESH_TOKEN: &str = "YOUTUBE_REFRESH_TOKEN";
pub const ENV_CLIENT_SECRETS_FILE: &str = "YOUTUBE_CLIENT_SECRETS_FILE";
pub const ENV_AUTH_CODE: &str = "YOUTUBE_AUTH_CODE";
pub const ENV_REDIRECT_URI: &str = "YOUTUBE_REDIRECT_URI";

const DEFAULT_CLIENT_SECRETS_FILE: &str = "client_secrets.json";
const DEFAULT_CI_REDIRECT_URI: &str = "http://localhost";

/// YouTube API の認証情報
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: Option<String>,
}

impl Credentials {
    /// 必須フィールドが空でないことを確認する
    ///
    /// # Errors
    /// 最初に見つかった空のフィールド名を含む `DomainError::MissingCredentials`
    pub fn validate(&self) -> Result<(), DomainError> {
        let required = [
            ("api_key", &self.api_key),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(DomainError::missing_credentials(field));
            }
        }
        Ok(())
    }

    /// プロセス環境とクライアントシークレットファイルから解決する
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// 任意のルックアップ関数から解決する
    ///
    /// 優先順位: 環境変数 > クライアントシークレットファイル
    pub fn resolve<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut credentials = Self {
            api_key: var(ENV_API_KEY).unwrap_or_default(),
            client_id: var(ENV_CLIENT_ID).unwrap_or_default(),
            client_secret: var(ENV_CLIENT_SECRET).unwrap_or_default(),
            refresh_token: var(ENV_REFRESH_TOKEN),
        };

        if credentials.client_id.is_empty() || credentials.client_secret.is_empty() {
            let explicit = var(ENV_CLIENT_SECRETS_FILE);
            let path = PathBuf::from(
                explicit
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CLIENT_SECRETS_FILE.to_string()),
            );

            // 明示的に指定されたファイルが無いのは設定ミス
            if path.exists() || explicit.is_some() {
                let secrets = ClientSecrets::load(&path)?;
                if credentials.client_id.is_empty() {
                    credentials.client_id = secrets.client_id;
                }
                if credentials.client_secret.is_empty() {
                    credentials.client_secret = secrets.client_secret;
                }
            }
        }

        Ok(credentials)
    }
}

// シークレットをログに出さない
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &redact(&self.api_key))
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field(
                "refresh_token",
                &self.refresh_token.as_deref().map(redact),
            )
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() { "<empty>" } else { "<redacted>" }
}

/// Google Cloud Console からダウンロードするクライアントシークレット
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecretsSection>,
    web: Option<ClientSecretsSection>,
}

#[derive(Deserialize)]
struct ClientSecretsSection {
    client_id: String,
    client_secret: String,
}

impl ClientSecrets {
    /// `installed` または `web` セクションを読む
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::file_system(
                format!("Failed to read client secrets file: {}", path.display()),
                e,
            )
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let file: ClientSecretsFile = serde_json::from_str(content)
            .map_err(|e| ConfigError::client_secrets_error(path.display().to_string(), e))?;

        let section = file.installed.or(file.web).ok_or_else(|| {
            ConfigError::validation_error(format!(
                "{} has neither an 'installed' nor a 'web' section",
                path.display()
            ))
        })?;

        Ok(Self {
            client_id: section.client_id,
            client_secret: section.client_secret,
        })
    }
}

/// 実行環境
///
/// CI ではブラウザを開けないので、認可コードを環境変数から受け取る。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionContext {
    Local,
    Ci {
        auth_code: Option<String>,
        redirect_uri: String,
    },
}

impl ExecutionContext {
    pub fn detect() -> Self {
        Self::detect_with(|key| std::env::var(key).ok())
    }

    pub fn detect_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_set = |key: &str| lookup(key).is_some_and(|v| !v.is_empty() && v != "false");

        if !(is_set("CI") || is_set("GITHUB_ACTIONS")) {
            return Self::Local;
        }

        Self::Ci {
            auth_code: lookup(ENV_AUTH_CODE)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            redirect_uri: lookup(ENV_REDIRECT_URI)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_CI_REDIRECT_URI.to_string()),
        }
    }

    pub fn is_ci(&self) -> bool {
        matches!(self, Self::Ci { .. })
    }
}
