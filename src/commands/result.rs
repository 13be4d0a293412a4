/// コマンド実行結果を表す型
///
/// 各コマンドはこの型を返し、プレゼンテーション層で
/// 人間向けと機械向けの出力フォーマットを決定する。
use crate::domain::{PrivacyStatus, RemoteVideo, SessionOrigin, UploadStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// コマンド実行結果の統一型
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum CommandResult {
    Login(LoginResult),
    Logout(LogoutResult),
    Upload(UploadResult),
    Status(StatusResult),
    Update(UpdateResult),
    Delete(DeleteResult),
}

/// ログインコマンドの結果
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    /// 既にリフレッシュトークンが保存されていたか（上書き更新の場合true）
    pub was_logged_in: bool,
    pub origin: SessionOrigin,
    pub expires_at: DateTime<Utc>,
    /// トークンファイルのパス
    pub token_path: String,
}

/// ログアウトコマンドの結果
#[derive(Debug, Clone, Serialize)]
pub struct LogoutResult {
    pub was_logged_in: bool,
}

/// アップロードコマンドの結果
///
/// `--no-upload` の場合は `uploaded = false` で、動画ID等は `None`。
#[derive(Debug, Clone, Serialize)]
pub struct UploadResult {
    pub uploaded: bool,
    pub video_id: Option<String>,
    pub url: Option<String>,
    pub status: Option<UploadStatus>,
    pub title: String,
    pub privacy_status: PrivacyStatus,
    pub tags: Vec<String>,
    pub file_path: String,
    pub file_size: u64,
    pub file_format: String,
    /// explicit / render / latest
    pub source: String,
    /// 本日（UTC）のアップロード件数。履歴を読めなかった場合は None
    pub uploads_today: Option<usize>,
    /// `--thumbnail` 指定時のみ Some。設定に失敗した場合は false
    pub thumbnail_set: Option<bool>,
}

/// ステータスコマンドの結果
#[derive(Debug, Clone, Serialize)]
pub struct StatusResult {
    pub video: RemoteVideo,
    pub url: String,
}

/// 更新コマンドの結果
#[derive(Debug, Clone, Serialize)]
pub struct UpdateResult {
    pub video: RemoteVideo,
    pub url: String,
    /// 再取得した内容が指定した値と一致したか
    pub verified: bool,
    /// 一致しなかった項目
    pub mismatched_fields: Vec<String>,
}

/// 削除コマンドの結果
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResult {
    pub video_id: String,
    /// 確認プロンプトで中止された場合は false
    pub deleted: bool,
}
