/// ドメインサービス: アップロード対象ファイル（アーティファクト）
///
/// パイプラインが生成した動画ファイルを表し、アップロード前の事前条件を検証する。
///
/// 設定値（最大ファイルサイズ、サポート形式）はAPP_CONFIGから取得します。
use crate::config::APP_CONFIG;
use crate::domain::error::DomainError;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// アップロード対象の動画ファイル
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaArtifact {
    local_path: PathBuf,
    byte_size: u64,
    extension: String,
}

impl MediaArtifact {
    /// パスを検証してアーティファクトを作成する
    ///
    /// # エラー
    /// - ファイルが存在しない / 読み込めない
    /// - ディレクトリが指定された
    /// - ファイルが空
    /// - サポートされていない形式
    /// - ファイルサイズが制限を超過
    ///
    /// いずれも `DomainError::ArtifactNotFound`（理由付き）または
    /// `DomainError::InvalidArgument` として返す。
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let (byte_size, extension) = inspect(path, &VIDEO_RULES)?;

        Ok(Self {
            local_path: path.to_path_buf(),
            byte_size,
            extension,
        })
    }

    /// アップロード直前の再検証
    ///
    /// 構築後にファイルが削除・切り詰められていないことを確認する。
    pub fn verify(&self) -> Result<(), DomainError> {
        let (size, _) = inspect(&self.local_path, &VIDEO_RULES)?;
        if size != self.byte_size {
            tracing::debug!(
                path = %self.local_path.display(),
                expected = self.byte_size,
                actual = size,
                "artifact size changed since validation"
            );
        }
        Ok(())
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// アップロード時の Content-Type
    pub fn mime_type(&self) -> &'static str {
        match self.extension.as_str() {
            "mp4" => "video/mp4",
            "mov" => "video/quicktime",
            "webm" => "video/webm",
            "mkv" => "video/x-matroska",
            "avi" => "video/x-msvideo",
            "flv" => "video/x-flv",
            "3gp" => "video/3gpp",
            "mpeg" | "mpg" => "video/mpeg",
            "wmv" => "video/x-ms-wmv",
            _ => "video/*",
        }
    }

    pub fn file_name(&self) -> String {
        self.local_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.local_path.display().to_string())
    }
}

/// カスタムサムネイル画像（JPEG / PNG、2MB以下）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThumbnailImage {
    local_path: PathBuf,
    byte_size: u64,
    extension: String,
}

impl ThumbnailImage {
    /// # エラー
    /// 動画と同じく、存在しない・空なら `ArtifactNotFound`、
    /// 形式・サイズ違反なら `InvalidArgument`（名前は `thumbnail`）。
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let (byte_size, extension) = inspect(path, &THUMBNAIL_RULES)?;

        Ok(Self {
            local_path: path.to_path_buf(),
            byte_size,
            extension,
        })
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    pub fn mime_type(&self) -> &'static str {
        match self.extension.as_str() {
            "png" => "image/png",
            _ => "image/jpeg",
        }
    }
}

/// ファイル種別ごとの検証ルール
struct FileRules {
    name: &'static str,
    max_size: u64,
    formats: &'static [&'static str],
}

const VIDEO_RULES: FileRules = FileRules {
    name: "artifact",
    max_size: APP_CONFIG.upload.max_file_size,
    formats: APP_CONFIG.upload.supported_formats,
};

const THUMBNAIL_RULES: FileRules = FileRules {
    name: "thumbnail",
    max_size: APP_CONFIG.upload.max_thumbnail_size,
    formats: APP_CONFIG.upload.thumbnail_formats,
};

/// サポートされている動画拡張子か
pub fn is_supported_video(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            APP_CONFIG
                .upload
                .supported_formats
                .contains(&ext.to_lowercase().as_str())
        })
        .unwrap_or(false)
}

fn inspect(path: &Path, rules: &FileRules) -> Result<(u64, String), DomainError> {
    let display = path.display().to_string();

    // メタデータ取得失敗は「存在しない/読めない」として扱う
    let metadata = std::fs::metadata(path)
        .map_err(|e| DomainError::artifact_not_found(&display, e.to_string()))?;

    if metadata.is_dir() {
        return Err(DomainError::artifact_not_found(
            &display,
            "is a directory, not a file",
        ));
    }

    let size = metadata.len();
    if size == 0 {
        return Err(DomainError::artifact_not_found(&display, "file is empty"));
    }

    // 読み取り権限の確認
    std::fs::File::open(path)
        .map_err(|e| DomainError::artifact_not_found(&display, format!("not readable: {}", e)))?;

    if size > rules.max_size {
        return Err(DomainError::invalid_argument(
            rules.name,
            format!("is {} bytes (maximum allowed: {} bytes)", size, rules.max_size),
        ));
    }

    let supported_formats = rules.formats;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
        .ok_or_else(|| {
            DomainError::invalid_argument(
                rules.name,
                format!(
                    "has no extension (expected one of: {})",
                    supported_formats.join(", ")
                ),
            )
        })?;

    if !supported_formats.contains(&extension.as_str()) {
        return Err(DomainError::invalid_argument(
            rules.name,
            format!(
                "format '{}' is not supported (expected one of: {})",
                extension,
                supported_formats.join(", ")
            ),
        ));
    }

    Ok((size, extension))
}
