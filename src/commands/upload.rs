use crate::api::ProgressCallback;
use crate::cli::{MetadataArgs, UploadArgs};
use crate::commands::result::{CommandResult, UploadResult};
use crate::commands::{connect, watch_url};
use crate::config::user::UploadDefaults;
use crate::config::{APP_CONFIG, UserConfig};
use crate::domain::metadata::split_tags;
use crate::domain::{DomainError, MediaArtifact, PrivacyStatus, ThumbnailImage, VideoMetadata};
use crate::history::{UploadHistory, UploadRecord};
use crate::pipeline::{self, ArtifactSource};
use crate::presentation;
use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// アップロードコマンドを実行する
///
/// 1. 動画を選ぶ（明示パス / 生成コマンド / 出力ディレクトリの未アップロードの最新）
/// 2. メタデータとサムネイルを検証する（CLI > config.toml の既定値）
/// 3. `--no-upload` ならここで終了
/// 4. 認証してアップロードし、履歴に記録する
/// 5. `--thumbnail` があれば設定する。失敗は警告に留める
///
/// # エラー
/// このレイヤーでは anyhow::Result を返し、
/// ドメイン層・インフラ層のエラーを集約する。
pub async fn execute(args: UploadArgs, machine_output: bool) -> Result<CommandResult> {
    let user_config = UserConfig::load()
        .context("Failed to load user configuration. Please check your config.toml file.")?;

    let output_dir = user_config.resolve_output_dir(args.output_dir.as_deref());
    let source = ArtifactSource::choose(
        args.video.as_deref(),
        &user_config.pipeline.render_command,
        &output_dir,
    );
    let history = UploadHistory::new(&output_dir);
    let artifact = pipeline::resolve(&source, &uploaded_paths(&history))
        .await
        .context("Failed to prepare the video")?;

    let metadata = build_metadata(&args.metadata, &user_config.upload, &artifact)
        .context("Invalid video metadata")?;
    let thumbnail = args
        .thumbnail
        .as_deref()
        .map(ThumbnailImage::from_path)
        .transpose()
        .context("Invalid thumbnail")?;

    let mut result = UploadResult {
        uploaded: false,
        video_id: None,
        url: None,
        status: None,
        title: metadata.title().to_string(),
        privacy_status: metadata.privacy_status(),
        tags: metadata.tags().iter().cloned().collect(),
        file_path: artifact.local_path().display().to_string(),
        file_size: artifact.byte_size(),
        file_format: artifact.extension().to_string(),
        source: source.kind().to_string(),
        uploads_today: None,
        thumbnail_set: None,
    };

    if args.no_upload {
        tracing::info!("--no-upload given, skipping upload");
        return Ok(CommandResult::Upload(result));
    }

    let progress: Option<ProgressCallback> = args.progress.then(|| {
        let callback: ProgressCallback = Arc::new(move |progress| {
            presentation::progress::report(&progress, machine_output);
        });
        callback
    });

    let (session, client) = connect(&user_config, progress).await?;
    let uploaded = client
        .upload(&session, &artifact, &metadata)
        .await
        .context("Failed to upload video")?;

    let url = watch_url(&uploaded.remote_id);
    let record = UploadRecord {
        video_id: uploaded.remote_id.clone(),
        title: result.title.clone(),
        url: url.clone(),
        privacy_status: result.privacy_status,
        status: uploaded.status,
        file_path: result.file_path.clone(),
        tags: result.tags.clone(),
        uploaded_at: Utc::now(),
    };
    result.uploads_today = record_upload(&history, &record);

    if let Some(thumbnail) = &thumbnail {
        match client
            .set_thumbnail(&session, &uploaded.remote_id, thumbnail)
            .await
        {
            Ok(()) => result.thumbnail_set = Some(true),
            Err(e) => {
                tracing::warn!(
                    video_id = %uploaded.remote_id,
                    error = %e,
                    "video uploaded but setting the thumbnail failed"
                );
                result.thumbnail_set = Some(false);
            }
        }
    }

    result.uploaded = true;
    result.video_id = Some(uploaded.remote_id);
    result.url = Some(url);
    result.status = Some(uploaded.status);

    Ok(CommandResult::Upload(result))
}

/// 履歴に記録済みのファイルパス
///
/// 履歴が読めない場合は警告して空集合を返す。
fn uploaded_paths(history: &UploadHistory) -> HashSet<PathBuf> {
    match history.load() {
        Ok(records) => records
            .into_iter()
            .map(|record| PathBuf::from(record.file_path))
            .collect(),
        Err(e) => {
            tracing::warn!(error = %format!("{:#}", e), "failed to read upload history");
            HashSet::new()
        }
    }
}

/// 履歴に記録し、本日の件数を返す
///
/// 動画自体はアップロード済みなので、記録の失敗はコマンドを失敗させない。
fn record_upload(history: &UploadHistory, record: &UploadRecord) -> Option<usize> {
    if let Err(e) = history.append(record) {
        tracing::warn!(error = %format!("{:#}", e), "failed to record upload history");
        return None;
    }

    match history.uploads_on_day_of(record.uploaded_at) {
        Ok(count) => {
            let budget = APP_CONFIG.upload.daily_upload_budget;
            if count >= budget {
                tracing::warn!(
                    uploads_today = count,
                    budget,
                    "daily upload budget reached; further uploads today may be rejected by YouTube"
                );
            }
            Some(count)
        }
        Err(e) => {
            tracing::warn!(error = %format!("{:#}", e), "failed to count today's uploads");
            None
        }
    }
}

/// CLI引数と config.toml の既定値からメタデータを組み立てる
///
/// - タイトル未指定時はファイル名から作る
/// - タグは既定タグ + `--tags`
/// - 公開設定は `--privacy` > config.toml
fn build_metadata(
    args: &MetadataArgs,
    defaults: &UploadDefaults,
    artifact: &MediaArtifact,
) -> Result<VideoMetadata, DomainError> {
    let title = match &args.title {
        Some(title) => title.clone(),
        None => title_from_file(artifact.local_path()),
    };

    let privacy_status = match &args.privacy {
        Some(raw) => raw.parse::<PrivacyStatus>()?,
        None => defaults.privacy_status,
    };

    let mut tags = defaults.default_tags.clone();
    if let Some(raw) = &args.tags {
        tags.extend(split_tags(raw));
    }

    VideoMetadata::with_category(
        title,
        args.description.clone().unwrap_or_default(),
        tags,
        privacy_status,
        defaults.category_id.clone(),
    )
}

/// `my_first-short.mp4` → `my first short`
fn title_from_file(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().replace(['_', '-'], " "))
        .map(|title| title.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}
