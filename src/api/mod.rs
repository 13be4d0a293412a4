/// YouTube API クライアント層
///
/// - `auth` / `oauth`: 認証情報をセッションに交換する
/// - `uploader`: 事前条件チェックと上限付き再試行を伴うアップロード・更新・取得・削除
/// - `video_api` / `client`: YouTube Data API v3 との1回分のやり取り
/// - `retry`: エラー分類と再試行ループ
pub mod auth;
pub mod client;
pub mod error;
pub mod oauth;
pub mod retry;
pub mod types;
pub mod uploader;
pub mod video_api;

pub use auth::Authenticator;
pub use client::ApiClient;
pub use oauth::GoogleOAuth;
pub use uploader::{ProgressCallback, UploadClient};
pub use video_api::YouTubeVideoApi;
