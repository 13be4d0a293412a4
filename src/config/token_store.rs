/// リフレッシュトークンの永続化
///
/// Authenticator に注入されるキー・バリューストア。
/// ファイル実装は `<config_dir>/tubeyeet/tokens.toml` に 0600 で保存する。
/// 「最新を読み、更新時に書く」前提で、複数プロセスからの同時書き込みは想定しない。
use crate::config::error::ConfigError;
use crate::config::permissions::write_secret_file;
use crate::config::user::UserConfig;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const TOKEN_FILE_NAME: &str = "tokens.toml";

pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError>;
    fn put(&self, key: &str, value: &str) -> Result<(), ConfigError>;

    /// 削除した場合に true
    fn remove(&self, key: &str) -> Result<bool, ConfigError>;
}

/// OAuthクライアントごとのリフレッシュトークンのキー
pub fn refresh_token_key(client_id: &str) -> String {
    format!("{}:refresh_token", client_id)
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TokenFile {
    #[serde(default)]
    tokens: BTreeMap<String, String>,
}

/// TOMLファイルに保存するトークンストア
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 設定ディレクトリ配下の既定の場所
    pub fn default_location() -> Result<Self, ConfigError> {
        Ok(Self::new(UserConfig::config_dir()?.join(TOKEN_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<TokenFile, ConfigError> {
        if !self.path.exists() {
            return Ok(TokenFile::default());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            ConfigError::file_system(
                format!("Failed to read token file: {}", self.path.display()),
                e,
            )
        })?;

        toml::from_str(&content).map_err(|e| {
            ConfigError::parse_error(
                format!("Failed to parse token file ({})", self.path.display()),
                e,
            )
        })
    }

    fn write(&self, file: &TokenFile) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(file)
            .map_err(|e| ConfigError::serialize_error("Failed to serialize token file", e))?;
        write_secret_file(&self.path, &content)
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        Ok(self.read()?.tokens.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut file = self.read()?;
        file.tokens.insert(key.to_string(), value.to_string());
        self.write(&file)
    }

    fn remove(&self, key: &str) -> Result<bool, ConfigError> {
        let mut file = self.read()?;
        if file.tokens.remove(key).is_none() {
            return Ok(false);
        }
        self.write(&file)?;
        Ok(true)
    }
}

/// プロセス内だけで保持するトークンストア
///
/// CI ではリフレッシュトークンを環境変数で渡すので、ディスクに書き残さない。
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        if let Ok(mut tokens) = store.tokens.lock() {
            tokens.insert(key.to_string(), value.to_string());
        }
        store
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        Ok(self
            .tokens
            .lock()
            .map_err(|_| ConfigError::validation_error("token store lock poisoned"))?
            .get(key)
            .cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.tokens
            .lock()
            .map_err(|_| ConfigError::validation_error("token store lock poisoned"))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, ConfigError> {
        Ok(self
            .tokens
            .lock()
            .map_err(|_| ConfigError::validation_error("token store lock poisoned"))?
            .remove(key)
            .is_some())
    }
}
