/// API通信用の型定義
///
/// YouTube Data API v3 のリクエスト・レスポンスをシリアライズするための構造体を定義します。
/// フィールド名は API に合わせて camelCase に変換します。
use crate::domain::{VideoMetadata, VideoStatistics};
use serde::{Deserialize, Deserializer, Serialize};

/// videos リソースの snippet 部分
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_language: Option<String>,
}

/// videos リソースの status 部分
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatusPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_status: Option<String>,

    /// uploaded / processed / failed / rejected / deleted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_declared_made_for_kids: Option<bool>,

    /// 予約公開日時（RFC 3339）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embeddable: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_stats_viewable: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains_synthetic_media: Option<bool>,
}

impl VideoStatusPart {
    /// videos.update に送れる項目だけを残す
    ///
    /// 読み取り専用の uploadStatus などは落とし、
    /// 送らなかった書き込み可能項目が既定値に戻らないよう現在値を引き継ぐ。
    fn writable(self) -> Self {
        Self {
            privacy_status: self.privacy_status,
            self_declared_made_for_kids: self.self_declared_made_for_kids,
            publish_at: self.publish_at,
            license: self.license,
            embeddable: self.embeddable,
            public_stats_viewable: self.public_stats_viewable,
            contains_synthetic_media: self.contains_synthetic_media,
            ..Self::default()
        }
    }
}

/// videos リソースの processingDetails 部分
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingDetails {
    /// processing / succeeded / failed / terminated
    #[serde(default)]
    pub processing_status: Option<String>,
}

/// videos リソース
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<VideoSnippet>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<VideoStatusPart>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_details: Option<ProcessingDetails>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<StatisticsPart>,
}

impl VideoResource {
    /// videos.insert のリクエストボディを作る
    pub fn for_insert(metadata: &VideoMetadata) -> Self {
        Self {
            snippet: Some(snippet_from(metadata, None)),
            status: Some(VideoStatusPart {
                privacy_status: Some(metadata.privacy_status().as_str().to_string()),
                self_declared_made_for_kids: Some(false),
                ..VideoStatusPart::default()
            }),
            ..Self::default()
        }
    }

    /// videos.update のリクエストボディを作る
    ///
    /// `current` は part=snippet,status で取得した現在の動画。
    /// snippet と status は丸ごと置き換えられるため、メタデータで指定しない
    /// 書き込み可能項目（子ども向け申告、予約公開、ライセンスなど）は現在値をそのまま送る。
    pub fn for_update(remote_id: &str, current: VideoResource, metadata: &VideoMetadata) -> Self {
        let default_language = current.snippet.and_then(|s| s.default_language);
        let status = current.status.unwrap_or_default().writable();

        Self {
            id: Some(remote_id.to_string()),
            snippet: Some(snippet_from(metadata, default_language)),
            status: Some(VideoStatusPart {
                privacy_status: Some(metadata.privacy_status().as_str().to_string()),
                ..status
            }),
            ..Self::default()
        }
    }
}

fn snippet_from(metadata: &VideoMetadata, default_language: Option<String>) -> VideoSnippet {
    VideoSnippet {
        title: metadata.title().to_string(),
        description: metadata.description().to_string(),
        tags: metadata.tags().iter().cloned().collect(),
        category_id: Some(metadata.category_id().to_string()),
        default_language,
    }
}

/// videos リソースの statistics 部分
///
/// API は件数を文字列で返す。非公開にされた件数は欠落する。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsPart {
    #[serde(default, deserialize_with = "count")]
    pub view_count: Option<u64>,

    #[serde(default, deserialize_with = "count")]
    pub like_count: Option<u64>,

    #[serde(default, deserialize_with = "count")]
    pub comment_count: Option<u64>,

    #[serde(default, deserialize_with = "count")]
    pub favorite_count: Option<u64>,
}

impl From<StatisticsPart> for VideoStatistics {
    fn from(part: StatisticsPart) -> Self {
        Self {
            view_count: part.view_count.unwrap_or(0),
            like_count: part.like_count,
            comment_count: part.comment_count,
            favorite_count: part.favorite_count.unwrap_or(0),
        }
    }
}

fn count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Text(String),
        Number(u64),
    }

    match Option::<Count>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Count::Number(n)) => Ok(Some(n)),
        Some(Count::Text(text)) => text.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// thumbnails.set のレスポンス
#[derive(Debug, Clone, Deserialize)]
pub struct ThumbnailSetResponse {
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
}

/// videos.list のレスポンス
#[derive(Debug, Clone, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<VideoResource>,
}

/// Google API のエラーレスポンス
///
/// ```json
/// {"error": {"code": 403, "message": "...", "errors": [{"reason": "quotaExceeded"}]}}
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleErrorEnvelope {
    pub error: GoogleErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleErrorBody {
    #[serde(default)]
    pub code: Option<u16>,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub errors: Vec<GoogleErrorItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleErrorItem {
    #[serde(default)]
    pub reason: String,

    #[serde(default)]
    pub domain: Option<String>,
}

impl GoogleErrorEnvelope {
    /// JSONでない本文（HTMLのエラーページなど）は None
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }

    pub fn message(&self) -> &str {
        &self.error.message
    }

    pub fn reasons(&self) -> impl Iterator<Item = &str> {
        self.error.errors.iter().map(|e| e.reason.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PrivacyStatus;

    #[test]
    fn test_video_resource_deserialization() {
        let json = r#"{
            "kind": "youtube#video",
            "id": "dQw4w9WgXcQ",
            "snippet": {
                "title": "Hello",
                "description": "World",
                "tags": ["a", "b"],
                "categoryId": "22",
                "channelId": "UC123"
            },
            "status": {"uploadStatus": "processed", "privacyStatus": "unlisted"},
            "processingDetails": {"processingStatus": "succeeded"}
        }"#;

        let video: VideoResource = serde_json::from_str(json).expect("Failed to parse");

        assert_eq!(video.id.as_deref(), Some("dQw4w9WgXcQ"));
        let snippet = video.snippet.unwrap();
        assert_eq!(snippet.tags, vec!["a", "b"]);
        assert_eq!(snippet.category_id.as_deref(), Some("22"));
        let status = video.status.unwrap();
        assert_eq!(status.upload_status.as_deref(), Some("processed"));
        assert_eq!(status.privacy_status.as_deref(), Some("unlisted"));
    }

    #[test]
    fn test_request_body_uses_camel_case() {
        let metadata = VideoMetadata::new(
            "Title".to_string(),
            "Desc".to_string(),
            vec!["x".to_string()],
            PrivacyStatus::Public,
        )
        .unwrap();

        let json = serde_json::to_value(VideoResource::for_insert(&metadata)).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["snippet"]["categoryId"], "22");
        assert_eq!(json["status"]["privacyStatus"], "public");
        assert_eq!(json["status"]["selfDeclaredMadeForKids"], false);
        assert!(json.get("processingDetails").is_none());
        assert!(json.get("statistics").is_none());
    }

    #[test]
    fn test_update_body_keeps_unchanged_status_fields() {
        let current: VideoResource = serde_json::from_str(
            r#"{
                "id": "abc",
                "snippet": {"title": "Old", "categoryId": "24", "defaultLanguage": "ja",
                            "channelId": "UC123"},
                "status": {
                    "uploadStatus": "processed",
                    "privacyStatus": "private",
                    "selfDeclaredMadeForKids": true,
                    "madeForKids": true,
                    "publishAt": "2030-01-01T00:00:00Z",
                    "license": "creativeCommon",
                    "embeddable": false
                }
            }"#,
        )
        .unwrap();
        let metadata = VideoMetadata::new(
            "New".to_string(),
            String::new(),
            Vec::new(),
            PrivacyStatus::Private,
        )
        .unwrap();

        let json =
            serde_json::to_value(VideoResource::for_update("abc", current, &metadata)).unwrap();

        assert_eq!(json["id"], "abc");
        assert_eq!(json["snippet"]["title"], "New");
        assert_eq!(json["snippet"]["defaultLanguage"], "ja");
        assert!(json["snippet"].get("channelId").is_none());

        let status = &json["status"];
        assert_eq!(status["privacyStatus"], "private");
        assert_eq!(status["selfDeclaredMadeForKids"], true);
        assert_eq!(status["publishAt"], "2030-01-01T00:00:00Z");
        assert_eq!(status["license"], "creativeCommon");
        assert_eq!(status["embeddable"], false);
        assert!(status.get("uploadStatus").is_none());
        assert!(status.get("madeForKids").is_none());
    }

    #[test]
    fn test_update_body_without_made_for_kids_does_not_declare_it() {
        let metadata = VideoMetadata::new(
            "T".to_string(),
            String::new(),
            Vec::new(),
            PrivacyStatus::Unlisted,
        )
        .unwrap();

        let json = serde_json::to_value(VideoResource::for_update(
            "abc",
            VideoResource::default(),
            &metadata,
        ))
        .unwrap();

        assert_eq!(json["status"]["privacyStatus"], "unlisted");
        assert!(json["status"].get("selfDeclaredMadeForKids").is_none());
    }

    #[test]
    fn test_statistics_counts_are_strings() {
        let video: VideoResource = serde_json::from_str(
            r#"{"id": "abc", "statistics": {"viewCount": "1234", "favoriteCount": "0",
                "commentCount": "5"}}"#,
        )
        .unwrap();

        let stats = VideoStatistics::from(video.statistics.unwrap());
        assert_eq!(stats.view_count, 1234);
        assert_eq!(stats.like_count, None);
        assert_eq!(stats.comment_count, Some(5));
        assert_eq!(stats.favorite_count, 0);
    }

    #[test]
    fn test_error_envelope() {
        let body = r#"{"error":{"code":403,"message":"quota","errors":[{"reason":"quotaExceeded","domain":"youtube.quota"}]}}"#;
        let envelope = GoogleErrorEnvelope::parse(body).unwrap();
        assert_eq!(envelope.message(), "quota");
        assert_eq!(envelope.reasons().collect::<Vec<_>>(), vec!["quotaExceeded"]);

        assert!(GoogleErrorEnvelope::parse("<html></html>").is_none());
    }
}
