/// HTTPクライアント
///
/// YouTube Data API v3 との通信を担当するHTTPクライアント。
/// タイムアウト、エラー分類、Bearer認証と `key` クエリパラメータの付与を含みます。
/// resumable upload（セッションURI + Content-Range 付きのチャンクPUT）もここで扱います。
use crate::api::error::InfraError;
use crate::api::types::{ThumbnailSetResponse, VideoResource};
use crate::config::APP_CONFIG;
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, LOCATION, RANGE, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// APIクライアントの結果型
type ApiResult<T> = Result<T, InfraError>;

/// チャンク送信・オフセット照会の結果
#[derive(Debug)]
pub enum ChunkOutcome {
    /// 全バイトを受信済み。作成された動画リソースが返る
    Complete(VideoResource),

    /// 308 Resume Incomplete。次に送るべきオフセット
    Incomplete { next_offset: u64 },

    /// セッションURIが無効（404 / 410）。新しいセッションが必要
    SessionExpired,
}

/// APIクライアント
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    upload_base_url: String,
    api_key: String,
}

impl ApiClient {
    /// 新しいAPIクライアントを作成
    ///
    /// # Arguments
    /// * `base_url` - Data API のベースURL
    /// * `upload_base_url` - アップロード用のベースURL
    /// * `api_key` - すべてのリクエストに `key` として付与するAPIキー
    pub fn new(base_url: String, upload_base_url: String, api_key: String) -> ApiResult<Self> {
        let timeout = Duration::from_secs(APP_CONFIG.api.timeout_seconds);

        let client = Client::builder()
            .timeout(timeout)
            // resumable upload の 308 をリダイレクトとして追わない
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| InfraError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            upload_base_url,
            api_key,
        })
    }

    /// デフォルトのプロダクション環境クライアントを作成
    pub fn production(api_key: String) -> ApiResult<Self> {
        Self::new(
            APP_CONFIG.api.endpoint.to_string(),
            APP_CONFIG.api.upload_endpoint.to_string(),
            api_key,
        )
    }

    /// GETリクエストを送信し、JSONを返す
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        access_token: &str,
        query: &[(&str, &str)],
    ) -> ApiResult<T> {
        let url = self.build_url(endpoint);
        let request = self.authorize(self.client.get(&url), access_token).query(query);

        let response = Self::send_with_error_handling(request, endpoint, "GET").await?;
        let response = Self::check_response(response, endpoint).await?;
        Self::parse_json(response).await
    }

    /// PUTリクエスト（JSONボディ）を送信し、JSONを返す
    pub async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        access_token: &str,
        query: &[(&str, &str)],
        body: &B,
    ) -> ApiResult<T> {
        let url = self.build_url(endpoint);
        let request = self
            .authorize(self.client.put(&url), access_token)
            .query(query)
            .json(body);

        let response = Self::send_with_error_handling(request, endpoint, "PUT").await?;
        let response = Self::check_response(response, endpoint).await?;
        Self::parse_json(response).await
    }

    /// DELETEリクエストを送信
    pub async fn delete(
        &self,
        endpoint: &str,
        access_token: &str,
        query: &[(&str, &str)],
    ) -> ApiResult<()> {
        let url = self.build_url(endpoint);
        let request = self
            .authorize(self.client.delete(&url), access_token)
            .query(query);

        let response = Self::send_with_error_handling(request, endpoint, "DELETE").await?;
        Self::check_response(response, endpoint).await?;
        Ok(())
    }

    /// resumable upload セッションを開始し、セッションURIを返す
    ///
    /// # Arguments
    /// * `body` - snippet / status を含む動画リソース
    /// * `total_bytes` - アップロードするファイルの総バイト数
    /// * `mime_type` - 動画のContent-Type
    pub async fn start_resumable_session(
        &self,
        access_token: &str,
        body: &VideoResource,
        total_bytes: u64,
        mime_type: &str,
    ) -> ApiResult<String> {
        let endpoint = "/videos";
        let url = format!("{}{}", self.upload_base_url, endpoint);
        let request = self
            .authorize(self.client.post(&url), access_token)
            .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
            .header("X-Upload-Content-Length", total_bytes.to_string())
            .header("X-Upload-Content-Type", mime_type)
            .json(body);

        let response = Self::send_with_error_handling(request, endpoint, "POST").await?;
        let response = Self::check_response(response, endpoint).await?;

        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                InfraError::api(endpoint, "resumable session response had no Location header", None)
            })
    }

    /// チャンクを送信する
    ///
    /// `Content-Range: bytes {offset}-{offset+len-1}/{total}`
    pub async fn put_chunk(
        &self,
        session_uri: &str,
        access_token: &str,
        chunk: Vec<u8>,
        offset: u64,
        total_bytes: u64,
        mime_type: &str,
    ) -> ApiResult<ChunkOutcome> {
        let len = chunk.len() as u64;
        let range = format!("bytes {}-{}/{}", offset, offset + len.saturating_sub(1), total_bytes);
        let request = self
            .session_put(session_uri, access_token)
            .timeout(Duration::from_secs(APP_CONFIG.upload.attempt_timeout_seconds))
            .header(CONTENT_TYPE, mime_type)
            .header(CONTENT_LENGTH, len)
            .header(CONTENT_RANGE, range)
            .body(chunk);

        let response = Self::send_with_error_handling(request, "upload session", "PUT").await?;
        Self::chunk_outcome(response).await
    }

    /// セッションが受信済みのオフセットを問い合わせる
    ///
    /// 空ボディに `Content-Range: bytes */{total}` を付けて送る。
    pub async fn query_session_offset(
        &self,
        session_uri: &str,
        access_token: &str,
        total_bytes: u64,
    ) -> ApiResult<ChunkOutcome> {
        let request = self
            .session_put(session_uri, access_token)
            .header(CONTENT_LENGTH, 0)
            .header(CONTENT_RANGE, format!("bytes */{}", total_bytes));

        let response = Self::send_with_error_handling(request, "upload session", "PUT").await?;
        Self::chunk_outcome(response).await
    }

    /// セッションURIへのPUT
    ///
    /// セッションURIにはAPIキーが含まれないため Bearer トークンだけを付ける。
    fn session_put(&self, session_uri: &str, access_token: &str) -> RequestBuilder {
        self.client.put(session_uri).bearer_auth(access_token)
    }

    /// カスタムサムネイルを設定する（thumbnails.set、uploadType=media）
    pub async fn set_thumbnail(
        &self,
        access_token: &str,
        video_id: &str,
        image: Vec<u8>,
        mime_type: &str,
    ) -> ApiResult<()> {
        let endpoint = "/thumbnails/set";
        let url = format!("{}{}", self.upload_base_url, endpoint);
        let request = self
            .authorize(self.client.post(&url), access_token)
            .query(&[("videoId", video_id), ("uploadType", "media")])
            .header(CONTENT_TYPE, mime_type)
            .header(CONTENT_LENGTH, image.len() as u64)
            .body(image);

        let response = Self::send_with_error_handling(request, endpoint, "POST").await?;
        let response = Self::check_response(response, endpoint).await?;
        let body: ThumbnailSetResponse = Self::parse_json(response).await?;
        tracing::debug!(video_id, sizes = body.items.len(), "thumbnail set");
        Ok(())
    }

    async fn chunk_outcome(response: Response) -> ApiResult<ChunkOutcome> {
        match response.status() {
            StatusCode::PERMANENT_REDIRECT => Ok(ChunkOutcome::Incomplete {
                next_offset: parse_range_end(response.headers().get(RANGE))
                    .map(|end| end + 1)
                    .unwrap_or(0),
            }),
            StatusCode::NOT_FOUND | StatusCode::GONE => Ok(ChunkOutcome::SessionExpired),
            _ => {
                let response = Self::check_response(response, "upload session").await?;
                Ok(ChunkOutcome::Complete(Self::parse_json(response).await?))
            }
        }
    }

    /// URLを構築
    fn build_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Bearerトークンと APIキーを付与したリクエストを構築
    fn authorize(&self, request: RequestBuilder, access_token: &str) -> RequestBuilder {
        request
            .bearer_auth(access_token)
            .query(&[("key", self.api_key.as_str())])
    }

    /// リクエストを送信し、エラーハンドリングを行う
    async fn send_with_error_handling(
        request: RequestBuilder,
        endpoint: &str,
        method: &str,
    ) -> ApiResult<Response> {
        request.send().await.map_err(|e| {
            if e.is_timeout() {
                InfraError::timeout(format!("{} {}", method, endpoint))
            } else if e.is_connect() {
                InfraError::network(format!("Connection failed for {} {}: {}", method, endpoint, e))
            } else {
                InfraError::network(format!("Request failed for {} {}: {}", method, endpoint, e))
            }
        })
    }

    /// レスポンスをチェックして分類済みのエラーを返す
    ///
    /// # Arguments
    /// * `response` - HTTPレスポンス
    /// * `endpoint` - エンドポイント名（エラーメッセージ用）
    pub async fn check_response(response: Response, endpoint: &str) -> ApiResult<Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let retry_after = parse_retry_after(response.headers().get(RETRY_AFTER));
        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());

        tracing::debug!(endpoint, status = status.as_u16(), "API returned an error");
        Err(InfraError::from_status(
            endpoint,
            status.as_u16(),
            &error_body,
            retry_after,
        ))
    }

    /// JSONレスポンスをデシリアライズ
    pub async fn parse_json<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        response
            .json()
            .await
            .map_err(|e| InfraError::network(format!("Failed to parse JSON response: {}", e)))
    }
}

/// `Retry-After: <秒数>` を読む（HTTP-date 形式は無視）
fn parse_retry_after(value: Option<&reqwest::header::HeaderValue>) -> Option<Duration> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// `Range: bytes=0-12345` の終端を読む
fn parse_range_end(value: Option<&reqwest::header::HeaderValue>) -> Option<u64> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().strip_prefix("bytes="))
        .and_then(|v| v.split('-').nth(1))
        .and_then(|end| end.trim().parse::<u64>().ok())
}
