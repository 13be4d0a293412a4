/// 設定管理モジュール
///
/// このモジュールは2層の設定構造を提供します:
/// 1. AppConfig - ビルド時にコンパイル時定数として定義される静的設定（APP_CONFIG）
/// 2. UserConfig - 実行時に読み込まれる動的設定
///
/// 認証情報（環境変数・クライアントシークレット）とリフレッシュトークンの保存先は
/// それぞれ `credentials` と `token_store` が扱います。
///
/// # 使用例
///
/// ```rust,ignore
/// use crate::config::{APP_CONFIG, Credentials, UserConfig};
///
/// // AppConfig: グローバル定数として直接参照
/// let endpoint = APP_CONFIG.api.endpoint;
///
/// // UserConfig: load時に自動検証
/// let user_config = UserConfig::load()?;
/// let policy = user_config.retry_policy()?;
///
/// // Credentials: 環境変数 > client_secrets.json
/// let credentials = Credentials::from_env()?;
/// ```
pub mod app;
pub mod credentials;
pub mod error;
pub mod permissions;
pub mod token_store;
pub mod user;

pub use app::{APP_CONFIG, BYTES_PER_MB};
pub use credentials::{Credentials, ExecutionContext};
pub use error::ConfigError;
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use user::UserConfig;
