/// アップロード結果とリモート動画の状態
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::domain::metadata::PrivacyStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Uploaded,
    Processing,
    Failed,
}

impl UploadStatus {
    /// YouTube の uploadStatus / processingStatus から状態を決める
    ///
    /// failed / rejected / deleted は失敗、処理中なら processing、それ以外は uploaded。
    pub fn from_remote(upload_status: Option<&str>, processing_status: Option<&str>) -> Self {
        match upload_status {
            Some("failed") | Some("rejected") | Some("deleted") => return Self::Failed,
            _ => {}
        }
        match processing_status {
            Some("failed") | Some("terminated") => Self::Failed,
            Some("processing") => Self::Processing,
            _ => Self::Uploaded,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Processing => "processing",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// アップロード成功時の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    pub remote_id: String,
    pub status: UploadStatus,
}

/// リモート側の動画の状態（videos.list の結果）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteVideo {
    pub id: String,
    pub title: String,
    pub description: String,
    pub tags: BTreeSet<String>,
    /// 未知の値は None
    pub privacy_status: Option<PrivacyStatus>,
    pub category_id: Option<String>,
    pub status: UploadStatus,
    pub failure_reason: Option<String>,
    /// 取得できなかった場合は None
    pub statistics: Option<VideoStatistics>,
}

/// 再生数などの統計
///
/// 高評価数・コメント数は投稿者が非公開にしていると取得できない。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VideoStatistics {
    pub view_count: u64,
    pub like_count: Option<u64>,
    pub comment_count: Option<u64>,
    pub favorite_count: u64,
}
