use crate::cli::MetadataArgs;
use crate::commands::result::{CommandResult, UpdateResult};
use crate::commands::{connect, watch_url};
use crate::config::UserConfig;
use crate::config::user::UploadDefaults;
use crate::domain::metadata::split_tags;
use crate::domain::{DomainError, PrivacyStatus, RemoteVideo, VideoMetadata};
use anyhow::{Context, Result};

/// 更新コマンドを実行する
///
/// 現在の内容を取得し、指定された項目だけを差し替えて更新する。
/// 更新後にもう一度取得し、指定した値が反映されているか確認する。
pub async fn execute(video_id: &str, args: MetadataArgs) -> Result<CommandResult> {
    if args.title.is_none()
        && args.description.is_none()
        && args.tags.is_none()
        && args.privacy.is_none()
    {
        return Err(DomainError::invalid_argument(
            "metadata",
            "specify at least one of --title, --description, --tags, --privacy",
        )
        .into());
    }

    let user_config = UserConfig::load()
        .context("Failed to load user configuration. Please check your config.toml file.")?;

    let (session, client) = connect(&user_config, None).await?;

    let current = client
        .get_video(&session, video_id)
        .await
        .with_context(|| format!("Failed to fetch video {}", video_id))?;
    let metadata =
        merge_metadata(&args, &current, &user_config.upload).context("Invalid video metadata")?;

    client
        .update_metadata(&session, video_id, &metadata)
        .await
        .with_context(|| format!("Failed to update video {}", video_id))?;

    let video = client
        .get_video(&session, video_id)
        .await
        .with_context(|| format!("Failed to re-fetch video {}", video_id))?;

    let mismatched_fields = mismatches(&metadata, &video);
    for field in &mismatched_fields {
        tracing::warn!(video_id, field = %field, "updated value was not reflected");
    }

    Ok(CommandResult::Update(UpdateResult {
        url: watch_url(&video.id),
        verified: mismatched_fields.is_empty(),
        mismatched_fields,
        video,
    }))
}

/// 指定された項目だけを現在の内容に上書きする
fn merge_metadata(
    args: &MetadataArgs,
    current: &RemoteVideo,
    defaults: &UploadDefaults,
) -> Result<VideoMetadata, DomainError> {
    let privacy_status = match &args.privacy {
        Some(raw) => raw.parse::<PrivacyStatus>()?,
        None => current.privacy_status.unwrap_or(defaults.privacy_status),
    };
    let tags = match &args.tags {
        Some(raw) => split_tags(raw),
        None => current.tags.iter().cloned().collect(),
    };

    VideoMetadata::with_category(
        args.title.clone().unwrap_or_else(|| current.title.clone()),
        args.description
            .clone()
            .unwrap_or_else(|| current.description.clone()),
        tags,
        privacy_status,
        current
            .category_id
            .clone()
            .unwrap_or_else(|| defaults.category_id.clone()),
    )
}

/// 再取得した内容と期待値が異なる項目
fn mismatches(expected: &VideoMetadata, actual: &RemoteVideo) -> Vec<String> {
    let mut fields = Vec::new();
    if expected.title() != actual.title {
        fields.push("title".to_string());
    }
    if expected.description() != actual.description {
        fields.push("description".to_string());
    }
    if expected.tags() != &actual.tags {
        fields.push("tags".to_string());
    }
    if Some(expected.privacy_status()) != actual.privacy_status {
        fields.push("privacy_status".to_string());
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UploadStatus;

    fn remote() -> RemoteVideo {
        RemoteVideo {
            id: "vid".to_string(),
            title: "Old title".to_string(),
            description: "Old description".to_string(),
            tags: ["a".to_string(), "b".to_string()].into_iter().collect(),
            privacy_status: Some(PrivacyStatus::Unlisted),
            category_id: Some("24".to_string()),
            status: UploadStatus::Processing,
            failure_reason: None,
            statistics: None,
        }
    }

    #[test]
    fn test_merge_keeps_unspecified_fields() {
        let args = MetadataArgs {
            title: Some("New title".to_string()),
            ..MetadataArgs::default()
        };

        let metadata = merge_metadata(&args, &remote(), &UploadDefaults::default()).unwrap();

        assert_eq!(metadata.title(), "New title");
        assert_eq!(metadata.description(), "Old description");
        assert_eq!(metadata.privacy_status(), PrivacyStatus::Unlisted);
        assert_eq!(metadata.category_id(), "24");
        assert_eq!(metadata.tags().len(), 2);
    }

    #[test]
    fn test_merge_replaces_tags_and_privacy() {
        let args = MetadataArgs {
            tags: Some("x, y".to_string()),
            privacy: Some("public".to_string()),
            ..MetadataArgs::default()
        };

        let metadata = merge_metadata(&args, &remote(), &UploadDefaults::default()).unwrap();

        assert_eq!(
            metadata.tags().iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["x", "y"]
        );
        assert_eq!(metadata.privacy_status(), PrivacyStatus::Public);
    }

    #[test]
    fn test_merge_rejects_empty_title() {
        let args = MetadataArgs {
            title: Some(String::new()),
            ..MetadataArgs::default()
        };

        let err = merge_metadata(&args, &remote(), &UploadDefaults::default()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidMetadata { .. }));
    }

    #[test]
    fn test_mismatches_detects_unreflected_fields() {
        let current = remote();
        let same = merge_metadata(&MetadataArgs::default(), &current, &UploadDefaults::default())
            .unwrap();
        assert!(mismatches(&same, &current).is_empty());

        let mut stale = current.clone();
        stale.title = "Something else".to_string();
        stale.privacy_status = None;
        assert_eq!(mismatches(&same, &stale), vec!["title", "privacy_status"]);
    }

    #[tokio::test]
    async fn test_execute_without_changes_is_invalid_argument() {
        let err = execute("vid", MetadataArgs::default()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DomainError>(),
            Some(DomainError::InvalidArgument { .. })
        ));
    }
}
