/// ドメイン層
///
/// 外部API・ファイル形式に依存しない型と事前条件を定義する。
pub mod artifact;
pub mod error;
pub mod formatter;
pub mod metadata;
pub mod progress;
pub mod retry;
pub mod session;
pub mod video;

pub use artifact::{MediaArtifact, ThumbnailImage};
pub use error::DomainError;
pub use metadata::{PrivacyStatus, VideoMetadata};
pub use retry::RetryPolicy;
pub use session::{AuthState, Session, SessionOrigin};
pub use video::{RemoteVideo, UploadResult, UploadStatus, VideoStatistics};
