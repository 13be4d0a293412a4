/// 動画メタデータ
///
/// タイトル・説明・タグ・公開設定・カテゴリを保持する。
/// 検証は構築時に行われ、構築済みの `VideoMetadata` は常に有効である。
use crate::domain::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// タイトルの最大文字数
pub const MAX_TITLE_CHARS: usize = 100;

/// 説明文の最大バイト数
pub const MAX_DESCRIPTION_BYTES: usize = 5000;

/// タグ合計の最大文字数
pub const MAX_TAGS_CHARS: usize = 500;

/// 既定カテゴリ (People & Blogs)
pub const DEFAULT_CATEGORY_ID: &str = "22";

/// 公開設定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyStatus {
    #[default]
    Private,
    Public,
    Unlisted,
}

impl PrivacyStatus {
    pub const ALL: [PrivacyStatus; 3] = [Self::Private, Self::Public, Self::Unlisted];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Public => "public",
            Self::Unlisted => "unlisted",
        }
    }
}

impl fmt::Display for PrivacyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrivacyStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                let allowed: Vec<&str> = Self::ALL.iter().map(|status| status.as_str()).collect();
                DomainError::invalid_metadata(format!(
                    "privacy_status '{}' is not one of: {}",
                    s,
                    allowed.join(", ")
                ))
            })
    }
}

/// 動画メタデータ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoMetadata {
    title: String,
    description: String,
    tags: BTreeSet<String>,
    privacy_status: PrivacyStatus,
    category_id: String,
}

impl VideoMetadata {
    /// 検証済みのメタデータを作成
    ///
    /// # Errors
    /// - タイトルが空、100文字超、または `<` `>` を含む
    /// - 説明文が5000バイト超
    /// - タグ合計が500文字超、または空のタグを含む
    /// - カテゴリIDが数値でない
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        tags: impl IntoIterator<Item = String>,
        privacy_status: PrivacyStatus,
    ) -> Result<Self, DomainError> {
        Self::with_category(
            title,
            description,
            tags,
            privacy_status,
            DEFAULT_CATEGORY_ID,
        )
    }

    /// カテゴリIDを指定して作成
    pub fn with_category(
        title: impl Into<String>,
        description: impl Into<String>,
        tags: impl IntoIterator<Item = String>,
        privacy_status: PrivacyStatus,
        category_id: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let metadata = Self {
            title: title.into().trim().to_string(),
            description: description.into(),
            tags: tags
                .into_iter()
                .map(|tag| tag.trim().to_string())
                .collect(),
            privacy_status,
            category_id: category_id.into(),
        };
        metadata.validate()?;
        Ok(metadata)
    }

    /// 公開設定を文字列から解釈して作成
    ///
    /// 列挙値以外の公開設定は `InvalidMetadata` になる。
    pub fn parse(
        title: impl Into<String>,
        description: impl Into<String>,
        tags: impl IntoIterator<Item = String>,
        privacy_status: &str,
    ) -> Result<Self, DomainError> {
        let privacy_status = privacy_status.parse::<PrivacyStatus>()?;
        Self::new(title, description, tags, privacy_status)
    }

    /// 不変条件を検証
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::invalid_metadata("title must not be empty"));
        }
        if self.title.chars().count() > MAX_TITLE_CHARS {
            return Err(DomainError::invalid_metadata(format!(
                "title exceeds {} characters",
                MAX_TITLE_CHARS
            )));
        }
        if self.title.contains('<') || self.title.contains('>') {
            return Err(DomainError::invalid_metadata(
                "title must not contain '<' or '>'",
            ));
        }
        if self.description.len() > MAX_DESCRIPTION_BYTES {
            return Err(DomainError::invalid_metadata(format!(
                "description exceeds {} bytes",
                MAX_DESCRIPTION_BYTES
            )));
        }
        if self.tags.iter().any(|tag| tag.is_empty()) {
            return Err(DomainError::invalid_metadata("tags must not be empty strings"));
        }
        let tags_chars: usize = self.tags.iter().map(|tag| tag.chars().count()).sum();
        if tags_chars > MAX_TAGS_CHARS {
            return Err(DomainError::invalid_metadata(format!(
                "tags exceed {} characters in total",
                MAX_TAGS_CHARS
            )));
        }
        if self.category_id.is_empty() || !self.category_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainError::invalid_metadata(format!(
                "category_id '{}' must be numeric",
                self.category_id
            )));
        }
        Ok(())
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn privacy_status(&self) -> PrivacyStatus {
        self.privacy_status
    }

    pub fn category_id(&self) -> &str {
        &self.category_id
    }
}

/// カンマ区切りのタグ文字列を分割する
///
/// 空要素は捨てる。`"a, b,,c"` → `{"a", "b", "c"}`
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}
