/// 動画APIの境界
///
/// `VideoApi` は UploadClient が使う1回分の操作（再試行なし）を定義する。
/// 本番実装 `YouTubeVideoApi` は resumable upload を使い、
/// 冪等キーごとにセッションURIを覚えておくことで、再試行時に2本目の動画を作らず
/// 受信済みオフセットから再開する。
use crate::api::client::{ApiClient, ChunkOutcome};
use crate::api::error::InfraError;
use crate::api::types::{VideoListResponse, VideoResource};
use crate::config::APP_CONFIG;
use crate::domain::{
    MediaArtifact, RemoteVideo, ThumbnailImage, UploadResult, UploadStatus, VideoMetadata,
    VideoStatistics,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::SeekFrom;
use std::sync::Mutex;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// 1回のアップロード試行に必要なもの
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertRequest {
    pub artifact: MediaArtifact,
    pub metadata: VideoMetadata,
    /// 論理的なアップロード1件につき1つ。再試行をまたいで同じ値を使う
    pub idempotency_key: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoApi: Send + Sync {
    async fn insert(
        &self,
        access_token: &str,
        request: &InsertRequest,
    ) -> Result<UploadResult, InfraError>;

    async fn update(
        &self,
        access_token: &str,
        remote_id: &str,
        metadata: &VideoMetadata,
    ) -> Result<(), InfraError>;

    async fn fetch(&self, access_token: &str, remote_id: &str) -> Result<RemoteVideo, InfraError>;

    async fn delete(&self, access_token: &str, remote_id: &str) -> Result<(), InfraError>;

    async fn set_thumbnail(
        &self,
        access_token: &str,
        remote_id: &str,
        thumbnail: &ThumbnailImage,
    ) -> Result<(), InfraError>;
}

/// YouTube Data API v3 実装
pub struct YouTubeVideoApi {
    client: ApiClient,
    chunk_size: u64,
    /// 冪等キー → resumable セッションURI
    sessions: Mutex<HashMap<String, String>>,
}

impl YouTubeVideoApi {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            chunk_size: APP_CONFIG.upload.chunk_size,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn remembered_session(&self, key: &str) -> Result<Option<String>, InfraError> {
        Ok(self.lock_sessions()?.get(key).cloned())
    }

    fn remember_session(&self, key: &str, session_uri: &str) -> Result<(), InfraError> {
        self.lock_sessions()?
            .insert(key.to_string(), session_uri.to_string());
        Ok(())
    }

    fn forget_session(&self, key: &str) -> Result<(), InfraError> {
        self.lock_sessions()?.remove(key);
        Ok(())
    }

    fn lock_sessions(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, InfraError> {
        self.sessions
            .lock()
            .map_err(|_| InfraError::Io(std::io::Error::other("upload session map poisoned")))
    }

    /// 既存セッションがあれば受信済みオフセットを確認し、なければ新規に開始する
    async fn open_session(
        &self,
        access_token: &str,
        request: &InsertRequest,
        total_bytes: u64,
    ) -> Result<(String, ChunkOutcome), InfraError> {
        let key = &request.idempotency_key;

        if let Some(session_uri) = self.remembered_session(key)? {
            match self
                .client
                .query_session_offset(&session_uri, access_token, total_bytes)
                .await?
            {
                ChunkOutcome::SessionExpired => {
                    tracing::info!(key = %key, "resumable session expired, starting a new one");
                    self.forget_session(key)?;
                }
                outcome => {
                    tracing::info!(key = %key, "resuming existing upload session");
                    return Ok((session_uri, outcome));
                }
            }
        }

        let body = VideoResource::for_insert(&request.metadata);
        let session_uri = self
            .client
            .start_resumable_session(
                access_token,
                &body,
                total_bytes,
                request.artifact.mime_type(),
            )
            .await?;
        self.remember_session(key, &session_uri)?;
        tracing::debug!(key = %key, "started resumable upload session");

        Ok((session_uri, ChunkOutcome::Incomplete { next_offset: 0 }))
    }

    async fn read_chunk(
        file: &mut tokio::fs::File,
        offset: u64,
        len: u64,
    ) -> Result<Vec<u8>, InfraError> {
        file.seek(SeekFrom::Start(offset)).await?;
        let mut buf = vec![0u8; len as usize];
        file.read_exact(&mut buf).await?;
        Ok(buf)
    }

    /// videos.list で1件取得する
    async fn fetch_resource(
        &self,
        access_token: &str,
        remote_id: &str,
        parts: &str,
    ) -> Result<VideoResource, InfraError> {
        let response: VideoListResponse = self
            .client
            .get_json(
                "/videos",
                access_token,
                &[("part", parts), ("id", remote_id)],
            )
            .await?;

        response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| InfraError::not_found(format!("video {}", remote_id)))
    }

    fn upload_result(video: VideoResource) -> Result<UploadResult, InfraError> {
        let remote_id = video
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| InfraError::api("/videos", "upload response had no video id", None))?;

        Ok(UploadResult {
            remote_id,
            status: remote_status(&video),
        })
    }
}

fn remote_status(video: &VideoResource) -> UploadStatus {
    UploadStatus::from_remote(
        video
            .status
            .as_ref()
            .and_then(|s| s.upload_status.as_deref()),
        video
            .processing_details
            .as_ref()
            .and_then(|p| p.processing_status.as_deref()),
    )
}

fn remote_video(video: VideoResource, requested_id: &str) -> RemoteVideo {
    let status = remote_status(&video);
    let snippet = video.snippet.unwrap_or_default();
    let status_part = video.status.unwrap_or_default();

    RemoteVideo {
        id: video.id.unwrap_or_else(|| requested_id.to_string()),
        title: snippet.title,
        description: snippet.description,
        tags: snippet.tags.into_iter().collect(),
        privacy_status: status_part
            .privacy_status
            .as_deref()
            .and_then(|p| p.parse().ok()),
        category_id: snippet.category_id,
        status,
        failure_reason: status_part.failure_reason.or(status_part.rejection_reason),
        statistics: video.statistics.map(VideoStatistics::from),
    }
}

#[async_trait]
impl VideoApi for YouTubeVideoApi {
    #[tracing::instrument(skip_all, fields(key = %request.idempotency_key))]
    async fn insert(
        &self,
        access_token: &str,
        request: &InsertRequest,
    ) -> Result<UploadResult, InfraError> {
        let path = request.artifact.local_path();
        let total_bytes = tokio::fs::metadata(path).await?.len();
        let mime_type = request.artifact.mime_type();

        let (session_uri, mut outcome) =
            self.open_session(access_token, request, total_bytes).await?;
        let mut file = tokio::fs::File::open(path).await?;
        let mut offset = 0;

        loop {
            match outcome {
                ChunkOutcome::Complete(video) => {
                    self.forget_session(&request.idempotency_key)?;
                    return Self::upload_result(video);
                }
                ChunkOutcome::SessionExpired => {
                    self.forget_session(&request.idempotency_key)?;
                    return Err(InfraError::network("upload session expired mid-transfer"));
                }
                ChunkOutcome::Incomplete { next_offset } => {
                    if next_offset < offset || next_offset > total_bytes {
                        return Err(InfraError::network(format!(
                            "upload session reported offset {} (expected {}..={})",
                            next_offset, offset, total_bytes
                        )));
                    }
                    offset = next_offset;
                }
            }

            let len = self.chunk_size.min(total_bytes - offset);
            let chunk = Self::read_chunk(&mut file, offset, len).await?;
            tracing::debug!(offset, len, total_bytes, "sending chunk");
            outcome = self
                .client
                .put_chunk(&session_uri, access_token, chunk, offset, total_bytes, mime_type)
                .await?;

            // 何も受理されなかった場合は再試行に任せる
            if let ChunkOutcome::Incomplete { next_offset } = outcome {
                if next_offset <= offset {
                    return Err(InfraError::network(format!(
                        "upload made no progress at offset {}",
                        offset
                    )));
                }
            }
        }
    }

    #[tracing::instrument(skip(self, access_token, metadata))]
    async fn update(
        &self,
        access_token: &str,
        remote_id: &str,
        metadata: &VideoMetadata,
    ) -> Result<(), InfraError> {
        // snippet / status は丸ごと置き換わるので、現在値を取得してから組み立てる
        let current = self
            .fetch_resource(access_token, remote_id, "snippet,status")
            .await?;
        let body = VideoResource::for_update(remote_id, current, metadata);
        let _: VideoResource = self
            .client
            .put_json("/videos", access_token, &[("part", "snippet,status")], &body)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, access_token))]
    async fn fetch(&self, access_token: &str, remote_id: &str) -> Result<RemoteVideo, InfraError> {
        let video = self
            .fetch_resource(
                access_token,
                remote_id,
                "snippet,status,processingDetails,statistics",
            )
            .await?;
        Ok(remote_video(video, remote_id))
    }

    #[tracing::instrument(skip(self, access_token))]
    async fn delete(&self, access_token: &str, remote_id: &str) -> Result<(), InfraError> {
        self.client
            .delete("/videos", access_token, &[("id", remote_id)])
            .await
    }

    #[tracing::instrument(skip(self, access_token, thumbnail))]
    async fn set_thumbnail(
        &self,
        access_token: &str,
        remote_id: &str,
        thumbnail: &ThumbnailImage,
    ) -> Result<(), InfraError> {
        let image = tokio::fs::read(thumbnail.local_path()).await?;
        self.client
            .set_thumbnail(access_token, remote_id, image, thumbnail.mime_type())
            .await
    }
}
