/// アップロードクライアント
///
/// `VideoApi` の上に事前条件チェックと上限付きの再試行を載せる。
/// 事前条件（セッション → メタデータ → アーティファクト）はネットワークに触れる前に
/// すべて確認され、違反は `DomainError` として返る。
use crate::api::error::ClientError;
use crate::api::retry::with_retry;
use crate::api::video_api::{InsertRequest, VideoApi};
use crate::domain::progress::{UploadPhase, UploadProgress};
use crate::domain::{
    DomainError, MediaArtifact, RemoteVideo, RetryPolicy, Session, ThumbnailImage, UploadResult,
    UploadStatus, VideoMetadata,
};
use std::sync::Arc;
use uuid::Uuid;

/// 進捗イベントを受け取るコールバック
pub type ProgressCallback = Arc<dyn Fn(UploadProgress) + Send + Sync>;

pub struct UploadClient {
    api: Arc<dyn VideoApi>,
    policy: RetryPolicy,
    progress: Option<ProgressCallback>,
}

impl UploadClient {
    pub fn new(api: Arc<dyn VideoApi>, policy: RetryPolicy) -> Self {
        Self {
            api,
            policy,
            progress: None,
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn report(&self, phase: UploadPhase) {
        if let Some(callback) = &self.progress {
            callback(UploadProgress::new(phase));
        }
    }

    /// 動画をアップロードする
    ///
    /// # Errors
    /// - `NotAuthenticated`: セッションが無効
    /// - `InvalidMetadata`: メタデータが無効
    /// - `ArtifactNotFound`: ファイルが消えた、または空になった
    /// - `InfraError`: 致命的なエラー、または `UploadExhausted`
    pub async fn upload(
        &self,
        session: &Session,
        artifact: &MediaArtifact,
        metadata: &VideoMetadata,
    ) -> Result<UploadResult, ClientError> {
        ensure_session(session, "upload")?;
        metadata.validate()?;
        artifact.verify()?;

        self.report(UploadPhase::ValidatingArtifact {
            file_name: artifact.file_name(),
            size_bytes: artifact.byte_size(),
        });

        let request = InsertRequest {
            artifact: artifact.clone(),
            metadata: metadata.clone(),
            idempotency_key: Uuid::new_v4().to_string(),
        };
        tracing::info!(
            file = %artifact.local_path().display(),
            key = %request.idempotency_key,
            "uploading video"
        );

        let report = |phase: UploadPhase| self.report(phase);
        let result = with_retry(&self.policy, "upload", &report, |_| {
            self.api.insert(session.access_token(), &request)
        })
        .await?;

        tracing::info!(remote_id = %result.remote_id, status = %result.status, "upload finished");
        self.report(UploadPhase::Completed {
            remote_id: result.remote_id.clone(),
        });

        Ok(result)
    }

    /// アップロード済み動画のメタデータを更新する
    pub async fn update_metadata(
        &self,
        session: &Session,
        remote_id: &str,
        metadata: &VideoMetadata,
    ) -> Result<(), ClientError> {
        ensure_session(session, "update metadata")?;
        ensure_remote_id(remote_id)?;
        if metadata.title().trim().is_empty() {
            return Err(DomainError::invalid_argument("title", "cannot be empty").into());
        }
        metadata.validate()?;

        with_retry(&self.policy, "update metadata", &no_report, |_| {
            self.api.update(session.access_token(), remote_id, metadata)
        })
        .await?;
        Ok(())
    }

    /// 処理状況を取得する（読み取りのみ）
    pub async fn get_status(
        &self,
        session: &Session,
        remote_id: &str,
    ) -> Result<UploadStatus, ClientError> {
        Ok(self.fetch(session, remote_id, "get status").await?.status)
    }

    /// リモートの動画情報を取得する
    pub async fn get_video(
        &self,
        session: &Session,
        remote_id: &str,
    ) -> Result<RemoteVideo, ClientError> {
        self.fetch(session, remote_id, "get video").await
    }

    /// 動画を削除する
    pub async fn delete(&self, session: &Session, remote_id: &str) -> Result<(), ClientError> {
        ensure_session(session, "delete")?;
        ensure_remote_id(remote_id)?;

        with_retry(&self.policy, "delete", &no_report, |_| {
            self.api.delete(session.access_token(), remote_id)
        })
        .await?;
        tracing::info!(remote_id, "video deleted");
        Ok(())
    }

    /// カスタムサムネイルを設定する
    ///
    /// 画像は送信前にもう一度検証する（消えていれば `ArtifactNotFound`）。
    pub async fn set_thumbnail(
        &self,
        session: &Session,
        remote_id: &str,
        thumbnail: &ThumbnailImage,
    ) -> Result<(), ClientError> {
        ensure_session(session, "set thumbnail")?;
        ensure_remote_id(remote_id)?;
        ThumbnailImage::from_path(thumbnail.local_path())?;

        with_retry(&self.policy, "set thumbnail", &no_report, |_| {
            self.api
                .set_thumbnail(session.access_token(), remote_id, thumbnail)
        })
        .await?;
        tracing::info!(remote_id, "thumbnail set");
        Ok(())
    }

    async fn fetch(
        &self,
        session: &Session,
        remote_id: &str,
        operation: &str,
    ) -> Result<RemoteVideo, ClientError> {
        ensure_session(session, operation)?;
        ensure_remote_id(remote_id)?;

        let video = with_retry(&self.policy, operation, &no_report, |_| {
            self.api.fetch(session.access_token(), remote_id)
        })
        .await?;
        Ok(video)
    }
}

fn no_report(_: UploadPhase) {}

fn ensure_session(session: &Session, operation: &str) -> Result<(), DomainError> {
    if session.is_valid() {
        Ok(())
    } else {
        Err(DomainError::not_authenticated(operation))
    }
}

fn ensure_remote_id(remote_id: &str) -> Result<(), DomainError> {
    if remote_id.trim().is_empty() {
        return Err(DomainError::invalid_argument("remote_id", "cannot be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::InfraError;
    use crate::api::video_api::MockVideoApi;
    use crate::domain::{PrivacyStatus, SessionOrigin};
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    fn session() -> Session {
        Session::new(
            "access".to_string(),
            Utc::now() + ChronoDuration::hours(1),
            SessionOrigin::RefreshToken,
        )
    }

    fn expired_session() -> Session {
        Session::new(
            "access".to_string(),
            Utc::now() - ChronoDuration::seconds(1),
            SessionOrigin::RefreshToken,
        )
    }

    fn metadata() -> VideoMetadata {
        VideoMetadata::new(
            "Daily short".to_string(),
            "description".to_string(),
            vec!["news".to_string(), "shorts".to_string()],
            PrivacyStatus::Private,
        )
        .unwrap()
    }

    fn artifact(dir: &TempDir) -> MediaArtifact {
        let path = dir.path().join("final.mp4");
        std::fs::write(&path, b"not really a video").unwrap();
        MediaArtifact::from_path(&path).unwrap()
    }

    fn thumbnail(dir: &TempDir) -> ThumbnailImage {
        let path = dir.path().join("cover.jpg");
        std::fs::write(&path, b"jpeg").unwrap();
        ThumbnailImage::from_path(&path).unwrap()
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO, Duration::ZERO).unwrap()
    }

    fn uploaded(id: &str) -> UploadResult {
        UploadResult {
            remote_id: id.to_string(),
            status: UploadStatus::Uploaded,
        }
    }

    #[tokio::test]
    async fn test_expired_session_blocks_every_operation() {
        let mut api = MockVideoApi::new();
        api.expect_insert().times(0);
        api.expect_update().times(0);
        api.expect_fetch().times(0);
        api.expect_delete().times(0);
        api.expect_set_thumbnail().times(0);
        let client = UploadClient::new(Arc::new(api), policy(3));

        let dir = TempDir::new().unwrap();
        let session = expired_session();
        let meta = metadata();
        let cover = thumbnail(&dir);

        let errors = vec![
            client.upload(&session, &artifact(&dir), &meta).await.err(),
            client.update_metadata(&session, "id", &meta).await.err(),
            client.get_status(&session, "id").await.err(),
            client.get_video(&session, "id").await.err(),
            client.delete(&session, "id").await.err(),
            client.set_thumbnail(&session, "id", &cover).await.err(),
        ];

        for err in errors {
            assert!(
                matches!(
                    err,
                    Some(ClientError::Domain(DomainError::NotAuthenticated { .. }))
                ),
                "{:?}",
                err
            );
        }
    }

    #[tokio::test]
    async fn test_missing_artifact_makes_no_api_call() {
        let mut api = MockVideoApi::new();
        api.expect_insert().times(0);
        let client = UploadClient::new(Arc::new(api), policy(3));

        let dir = TempDir::new().unwrap();
        let artifact = artifact(&dir);
        std::fs::remove_file(artifact.local_path()).unwrap();

        let result = client.upload(&session(), &artifact, &metadata()).await;
        assert!(matches!(
            result,
            Err(ClientError::Domain(DomainError::ArtifactNotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_retryable_twice_then_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let keys = Arc::new(Mutex::new(Vec::new()));

        let mut api = MockVideoApi::new();
        let counter = calls.clone();
        let seen = keys.clone();
        api.expect_insert().times(3).returning(move |_, request| {
            seen.lock().unwrap().push(request.idempotency_key.clone());
            match counter.fetch_add(1, Ordering::SeqCst) {
                0 => Err(InfraError::network("connection reset")),
                1 => Err(InfraError::from_status("videos", 503, "", None)),
                _ => Ok(uploaded("vid123")),
            }
        });

        let client = UploadClient::new(Arc::new(api), policy(3));
        let dir = TempDir::new().unwrap();

        let result = client
            .upload(&session(), &artifact(&dir), &metadata())
            .await
            .unwrap();

        assert_eq!(result.remote_id, "vid123");
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        // 再試行をまたいで同じ冪等キーを使う
        let keys = keys.lock().unwrap();
        assert_eq!(keys.len(), 3);
        assert!(keys.iter().all(|k| k == &keys[0]));
    }

    #[tokio::test]
    async fn test_each_logical_upload_gets_its_own_key() {
        let keys = Arc::new(Mutex::new(Vec::new()));
        let mut api = MockVideoApi::new();
        let seen = keys.clone();
        api.expect_insert().times(2).returning(move |_, request| {
            seen.lock().unwrap().push(request.idempotency_key.clone());
            Ok(uploaded("vid"))
        });

        let client = UploadClient::new(Arc::new(api), policy(3));
        let dir = TempDir::new().unwrap();
        let artifact = artifact(&dir);
        client.upload(&session(), &artifact, &metadata()).await.unwrap();
        client.upload(&session(), &artifact, &metadata()).await.unwrap();

        let keys = keys.lock().unwrap();
        assert_ne!(keys[0], keys[1]);
    }

    #[tokio::test]
    async fn test_retryable_every_attempt_exhausts() {
        let mut api = MockVideoApi::new();
        api.expect_insert()
            .times(3)
            .returning(|_, _| Err(InfraError::from_status("videos", 429, "", None)));

        let client = UploadClient::new(Arc::new(api), policy(3));
        let dir = TempDir::new().unwrap();

        let result = client
            .upload(&session(), &artifact(&dir), &metadata())
            .await;

        match result {
            Err(ClientError::Infra(InfraError::UploadExhausted { attempts, .. })) => {
                assert_eq!(attempts, 3)
            }
            other => panic!("Expected UploadExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fatal_first_attempt_fails_immediately() {
        let mut api = MockVideoApi::new();
        api.expect_insert().times(1).returning(|_, _| {
            Err(InfraError::from_status(
                "videos",
                403,
                r#"{"error":{"code":403,"message":"quota","errors":[{"reason":"quotaExceeded"}]}}"#,
                None,
            ))
        });

        let client = UploadClient::new(Arc::new(api), policy(4));
        let dir = TempDir::new().unwrap();

        let result = client
            .upload(&session(), &artifact(&dir), &metadata())
            .await;
        assert!(matches!(
            result,
            Err(ClientError::Infra(InfraError::DailyQuotaExceeded { .. }))
        ));
    }

    #[tokio::test]
    async fn test_progress_callback_sees_completion() {
        let mut api = MockVideoApi::new();
        api.expect_insert().returning(|_, _| Ok(uploaded("done")));

        let phases = Arc::new(Mutex::new(Vec::new()));
        let sink = phases.clone();
        let client = UploadClient::new(Arc::new(api), policy(2)).with_progress(Arc::new(
            move |progress: UploadProgress| sink.lock().unwrap().push(progress.phase),
        ));

        let dir = TempDir::new().unwrap();
        client
            .upload(&session(), &artifact(&dir), &metadata())
            .await
            .unwrap();

        let phases = phases.lock().unwrap();
        assert!(matches!(phases[0], UploadPhase::ValidatingArtifact { .. }));
        assert!(matches!(
            phases.last(),
            Some(UploadPhase::Completed { remote_id }) if remote_id == "done"
        ));
    }

    #[tokio::test]
    async fn test_empty_remote_id_is_invalid_argument() {
        let mut api = MockVideoApi::new();
        api.expect_update().times(0);
        api.expect_delete().times(0);
        let client = UploadClient::new(Arc::new(api), policy(3));

        let result = client.update_metadata(&session(), " ", &metadata()).await;
        assert!(matches!(
            result,
            Err(ClientError::Domain(DomainError::InvalidArgument { .. }))
        ));
        let result = client.delete(&session(), "").await;
        assert!(matches!(
            result,
            Err(ClientError::Domain(DomainError::InvalidArgument { .. }))
        ));
    }

    #[tokio::test]
    async fn test_get_status_retries_and_maps() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut api = MockVideoApi::new();
        api.expect_fetch().times(2).returning(move |_, id| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(InfraError::timeout("videos.list"));
            }
            Ok(RemoteVideo {
                id: id.to_string(),
                title: "t".to_string(),
                description: String::new(),
                tags: Default::default(),
                privacy_status: Some(PrivacyStatus::Private),
                category_id: None,
                status: UploadStatus::Processing,
                failure_reason: None,
                statistics: None,
            })
        });

        let client = UploadClient::new(Arc::new(api), policy(3));
        let status = client.get_status(&session(), "abc").await.unwrap();
        assert_eq!(status, UploadStatus::Processing);
    }

    #[tokio::test]
    async fn test_set_thumbnail_retries_transient_errors() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut api = MockVideoApi::new();
        api.expect_set_thumbnail()
            .times(2)
            .returning(move |_, id, _| {
                assert_eq!(id, "vid");
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(InfraError::from_status("thumbnails", 503, "", None))
                } else {
                    Ok(())
                }
            });

        let client = UploadClient::new(Arc::new(api), policy(3));
        let dir = TempDir::new().unwrap();

        client
            .set_thumbnail(&session(), "vid", &thumbnail(&dir))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_set_thumbnail_fatal_error_is_not_retried() {
        let mut api = MockVideoApi::new();
        api.expect_set_thumbnail()
            .times(1)
            .returning(|_, _, _| Err(InfraError::from_status("thumbnails", 403, "", None)));

        let client = UploadClient::new(Arc::new(api), policy(3));
        let dir = TempDir::new().unwrap();

        let result = client
            .set_thumbnail(&session(), "vid", &thumbnail(&dir))
            .await;
        assert!(matches!(result, Err(ClientError::Infra(_))));
    }

    #[tokio::test]
    async fn test_missing_thumbnail_makes_no_api_call() {
        let mut api = MockVideoApi::new();
        api.expect_set_thumbnail().times(0);
        let client = UploadClient::new(Arc::new(api), policy(3));

        let dir = TempDir::new().unwrap();
        let cover = thumbnail(&dir);
        std::fs::remove_file(cover.local_path()).unwrap();

        let result = client.set_thumbnail(&session(), "vid", &cover).await;
        assert!(matches!(
            result,
            Err(ClientError::Domain(DomainError::ArtifactNotFound { .. }))
        ));
    }

    /// update / fetch の往復を確認するための状態付きフェイク
    #[derive(Default)]
    struct FakeVideoApi {
        videos: Mutex<HashMap<String, RemoteVideo>>,
    }

    #[async_trait]
    impl VideoApi for FakeVideoApi {
        async fn insert(
            &self,
            _access_token: &str,
            _request: &InsertRequest,
        ) -> Result<UploadResult, InfraError> {
            unreachable!("not used")
        }

        async fn update(
            &self,
            _access_token: &str,
            remote_id: &str,
            metadata: &VideoMetadata,
        ) -> Result<(), InfraError> {
            let mut videos = self.videos.lock().unwrap();
            let video = videos
                .get_mut(remote_id)
                .ok_or_else(|| InfraError::not_found(remote_id))?;
            video.title = metadata.title().to_string();
            video.description = metadata.description().to_string();
            video.tags = metadata.tags().clone();
            video.privacy_status = Some(metadata.privacy_status());
            video.category_id = Some(metadata.category_id().to_string());
            Ok(())
        }

        async fn fetch(
            &self,
            _access_token: &str,
            remote_id: &str,
        ) -> Result<RemoteVideo, InfraError> {
            self.videos
                .lock()
                .unwrap()
                .get(remote_id)
                .cloned()
                .ok_or_else(|| InfraError::not_found(remote_id))
        }

        async fn delete(&self, _access_token: &str, remote_id: &str) -> Result<(), InfraError> {
            self.videos
                .lock()
                .unwrap()
                .remove(remote_id)
                .map(|_| ())
                .ok_or_else(|| InfraError::not_found(remote_id))
        }

        async fn set_thumbnail(
            &self,
            _access_token: &str,
            _remote_id: &str,
            _thumbnail: &ThumbnailImage,
        ) -> Result<(), InfraError> {
            unreachable!("not used")
        }
    }

    #[tokio::test]
    async fn test_update_then_get_is_stable() {
        let fake = FakeVideoApi::default();
        fake.videos.lock().unwrap().insert(
            "abc".to_string(),
            RemoteVideo {
                id: "abc".to_string(),
                title: "old".to_string(),
                description: String::new(),
                tags: Default::default(),
                privacy_status: Some(PrivacyStatus::Private),
                category_id: Some("22".to_string()),
                status: UploadStatus::Uploaded,
                failure_reason: None,
                statistics: None,
            },
        );
        let client = UploadClient::new(Arc::new(fake), policy(3));
        let session = session();
        let meta = VideoMetadata::new(
            "new title".to_string(),
            "new description".to_string(),
            vec!["b".to_string(), "a".to_string()],
            PrivacyStatus::Unlisted,
        )
        .unwrap();

        client.update_metadata(&session, "abc", &meta).await.unwrap();
        let first = client.get_video(&session, "abc").await.unwrap();
        client.update_metadata(&session, "abc", &meta).await.unwrap();
        let second = client.get_video(&session, "abc").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.title, "new title");
        assert_eq!(first.tags, *meta.tags());
        assert_eq!(first.privacy_status, Some(PrivacyStatus::Unlisted));

        client.delete(&session, "abc").await.unwrap();
        let gone = client.get_video(&session, "abc").await;
        assert!(matches!(
            gone,
            Err(ClientError::Infra(InfraError::NotFound { .. }))
        ));
    }
}
