/// Google OAuth 2.0 の実装
///
/// - リフレッシュトークンの交換（`invalid_grant` は `None`）
/// - ローカル: PKCE + ループバックのリダイレクトサーバー + ブラウザ
/// - CI: `YOUTUBE_AUTH_CODE` の認可コードを非対話で交換
///
/// 認証中のタイムアウト・通信失敗は再試行せず、そのまま返す。
use crate::api::auth::{OAuthFlow, TokenGrant};
use crate::api::error::{ClientError, InfraError};
use crate::config::{APP_CONFIG, Credentials, ExecutionContext};
use crate::domain::DomainError;
use async_trait::async_trait;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::service::service_fn;
use hyper::{Request, Response, body};
use oauth2::basic::{BasicClient, BasicErrorResponse, BasicErrorResponseType, BasicTokenResponse};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    RedirectUrl, RefreshToken, RequestTokenError, Scope, TokenResponse, TokenUrl,
};
use std::future::Future;
use std::time::Duration;

const OAUTH_DONE_HTML: &str = "<!doctype html><html><body>\
<p>tubeyeet is authorized. You can close this tab and return to the terminal.</p>\
</body></html>";

pub struct GoogleOAuth {
    http: reqwest::Client,
}

impl GoogleOAuth {
    pub fn new() -> Result<Self, InfraError> {
        let http = reqwest::ClientBuilder::new()
            // SSRF対策としてリダイレクトを追わない
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(APP_CONFIG.oauth.timeout_seconds))
            .build()
            .map_err(|e| InfraError::network(format!("Failed to create OAuth HTTP client: {}", e)))?;
        Ok(Self { http })
    }

    async fn exchange_local(&self, credentials: &Credentials) -> Result<TokenGrant, ClientError> {
        let csrf = CsrfToken::new_random();
        let (redirect_url, eventually_authorization_code) = setup_redirect(csrf.clone()).await?;

        let client = BasicClient::new(ClientId::new(credentials.client_id.clone()))
            .set_client_secret(ClientSecret::new(credentials.client_secret.clone()))
            .set_auth_uri(auth_url()?)
            .set_token_uri(token_url()?)
            .set_redirect_uri(redirect_url);

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (authorize_url, _csrf_token) = client
            // CSRFトークンはこの1回の交換でしか使わない
            .authorize_url(move || csrf)
            .add_scopes(
                APP_CONFIG
                    .oauth
                    .scopes
                    .iter()
                    .map(|scope| Scope::new(scope.to_string())),
            )
            // リフレッシュトークンを必ず発行させる
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(pkce_challenge)
            .url();

        tracing::info!("asking user to follow the OAuth flow in the browser");
        eprintln!("Open this URL to authorize tubeyeet:\n\n  {}\n", authorize_url);
        if let Err(e) = webbrowser::open(authorize_url.as_str()) {
            tracing::warn!(error = %e, "could not open the browser, use the printed URL");
        }

        let wait = Duration::from_secs(APP_CONFIG.oauth.authorization_timeout_seconds);
        let authorization_code = tokio::time::timeout(wait, eventually_authorization_code)
            .await
            .map_err(|_| InfraError::timeout("waiting for browser authorization"))??;

        let token = with_token_timeout(
            client
                .exchange_code(authorization_code)
                .set_pkce_verifier(pkce_verifier)
                .request_async(&self.http),
        )
        .await?
        .map_err(token_error)?;

        Ok(grant_from(&token))
    }

    async fn exchange_ci(
        &self,
        credentials: &Credentials,
        auth_code: &str,
        redirect_uri: &str,
    ) -> Result<TokenGrant, ClientError> {
        let redirect_url = RedirectUrl::new(redirect_uri.to_string()).map_err(|e| {
            DomainError::invalid_argument("YOUTUBE_REDIRECT_URI", e.to_string())
        })?;

        let client = BasicClient::new(ClientId::new(credentials.client_id.clone()))
            .set_client_secret(ClientSecret::new(credentials.client_secret.clone()))
            .set_token_uri(token_url()?)
            .set_redirect_uri(redirect_url);

        tracing::info!("exchanging authorization code from the environment");
        let token = with_token_timeout(
            client
                .exchange_code(AuthorizationCode::new(auth_code.to_string()))
                .request_async(&self.http),
        )
        .await?
        .map_err(token_error)?;

        Ok(grant_from(&token))
    }
}

#[async_trait]
impl OAuthFlow for GoogleOAuth {
    #[tracing::instrument(skip_all)]
    async fn refresh(
        &self,
        credentials: &Credentials,
        refresh_token: &str,
    ) -> Result<Option<TokenGrant>, ClientError> {
        tracing::debug!("attempting to refresh OAuth token");

        let client = BasicClient::new(ClientId::new(credentials.client_id.clone()))
            .set_client_secret(ClientSecret::new(credentials.client_secret.clone()))
            .set_token_uri(token_url()?);

        let refresh_token = RefreshToken::new(refresh_token.to_string());
        let result = with_token_timeout(
            client
                .exchange_refresh_token(&refresh_token)
                .request_async(&self.http),
        )
        .await?;

        match result {
            Ok(token) => {
                tracing::debug!("successfully refreshed OAuth token");
                Ok(Some(grant_from(&token)))
            }
            Err(RequestTokenError::ServerResponse(ref sr))
                if matches!(sr.error(), BasicErrorResponseType::InvalidGrant) =>
            {
                tracing::warn!("OAuth refresh token considered invalid grant");
                Ok(None)
            }
            Err(e) => Err(token_error(e).into()),
        }
    }

    #[tracing::instrument(skip_all, fields(ci = context.is_ci()))]
    async fn exchange_code(
        &self,
        credentials: &Credentials,
        context: &ExecutionContext,
    ) -> Result<TokenGrant, ClientError> {
        match context {
            ExecutionContext::Local => self.exchange_local(credentials).await,
            ExecutionContext::Ci {
                auth_code: Some(code),
                redirect_uri,
            } => self.exchange_ci(credentials, code, redirect_uri).await,
            ExecutionContext::Ci {
                auth_code: None, ..
            } => Err(InfraError::authentication_rejected(
                "no usable refresh token and no browser in CI; \
                 set YOUTUBE_REFRESH_TOKEN or YOUTUBE_AUTH_CODE",
            )
            .into()),
        }
    }
}

fn auth_url() -> Result<AuthUrl, InfraError> {
    AuthUrl::new(APP_CONFIG.oauth.auth_url.to_string()).map_err(|e| {
        InfraError::api(
            APP_CONFIG.oauth.auth_url,
            format!("invalid authorization endpoint: {}", e),
            None,
        )
    })
}

fn token_url() -> Result<TokenUrl, InfraError> {
    TokenUrl::new(APP_CONFIG.oauth.token_url.to_string()).map_err(|e| {
        InfraError::api(
            APP_CONFIG.oauth.token_url,
            format!("invalid token endpoint: {}", e),
            None,
        )
    })
}

async fn with_token_timeout<F: Future>(request: F) -> Result<F::Output, InfraError> {
    tokio::time::timeout(
        Duration::from_secs(APP_CONFIG.oauth.timeout_seconds),
        request,
    )
    .await
    .map_err(|_| InfraError::timeout("OAuth token request"))
}

fn grant_from(token: &BasicTokenResponse) -> TokenGrant {
    TokenGrant {
        access_token: token.access_token().secret().clone(),
        refresh_token: token.refresh_token().map(|t| t.secret().clone()),
        expires_in: token.expires_in(),
    }
}

fn token_error<RE>(e: RequestTokenError<RE, BasicErrorResponse>) -> InfraError
where
    RE: std::error::Error + 'static,
{
    match e {
        RequestTokenError::ServerResponse(sr) => {
            let message = match sr.error_description() {
                Some(description) => format!("{}: {}", sr.error().as_ref(), description),
                None => sr.error().as_ref().to_string(),
            };
            InfraError::authentication_rejected(message)
        }
        RequestTokenError::Request(e) => InfraError::network(format!("token request failed: {}", e)),
        RequestTokenError::Parse(e, _) => InfraError::api(
            APP_CONFIG.oauth.token_url,
            format!("unexpected token response: {}", e),
            None,
        ),
        RequestTokenError::Other(message) => {
            InfraError::api(APP_CONFIG.oauth.token_url, message, None)
        }
    }
}

/// 認可コードを受け取るループバックサーバーを立てる
///
/// `127.0.0.1` のランダムなポートで1接続だけ受け付け、`state` が CSRF トークンと
/// 一致することを確認してから `code` を返す。
async fn setup_redirect(
    csrf: CsrfToken,
) -> Result<
    (
        RedirectUrl,
        impl Future<Output = Result<AuthorizationCode, InfraError>>,
    ),
    InfraError,
> {
    let socket = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = socket.local_addr()?;
    let url = RedirectUrl::new(format!("http://{}:{}", addr.ip(), addr.port()))
        .map_err(|e| InfraError::network(format!("invalid redirect url: {}", e)))?;

    let (tx, rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let _ = tx.send(serve_redirect(socket, csrf).await);
    });

    Ok((url, async move {
        rx.await
            .map_err(|_| InfraError::network("redirect server stopped prematurely"))?
    }))
}

/// 1接続を処理し、検証済みの認可コードを返す
async fn serve_redirect(
    socket: tokio::net::TcpListener,
    csrf: CsrfToken,
) -> Result<AuthorizationCode, InfraError> {
    let (conn, _) = socket.accept().await?;
    let conn = hyper_util::rt::TokioIo::new(conn);
    let (got, mut gotten) = tokio::sync::mpsc::channel(1);
    let service = service_fn(move |req: Request<body::Incoming>| {
        let csrf = csrf.clone();
        let got = got.clone();
        async move {
            let mut presented_state = None;
            let mut presented_code = None;
            for (k, v) in form_urlencoded::parse(req.uri().query().unwrap_or("").as_bytes()) {
                match &*k {
                    "state" => presented_state = Some(v),
                    "code" => presented_code = Some(v),
                    _ => {}
                }
            }
            if presented_state.as_deref() != Some(csrf.secret().as_str()) {
                return Err("invalid csrf token");
            }
            let Some(code) = presented_code else {
                return Err("no authorization code found");
            };
            let _ = got.send(AuthorizationCode::new(code.into_owned())).await;
            Ok(Response::new(Full::<Bytes>::from(OAUTH_DONE_HTML)))
        }
    });
    let mut serve =
        std::pin::pin!(hyper::server::conn::http1::Builder::new().serve_connection(conn, service));

    tokio::select! {
        exit = &mut serve => match exit {
            Err(e) => Err(InfraError::network(format!("redirect server got a bad request: {}", e))),
            Ok(()) => Err(InfraError::network("redirect server exited before receiving a code")),
        },
        code = gotten.recv() => {
            // 応答を書き終えてから閉じる
            serve.as_mut().graceful_shutdown();
            if let Err(e) = serve.as_mut().await {
                tracing::debug!(error = %e, "redirect server closed with an error");
            }
            code.ok_or_else(|| InfraError::network("redirect server dropped the authorization code"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_from_token_response() {
        let token: BasicTokenResponse = serde_json::from_str(
            r#"{"access_token":"ya29.a0","token_type":"bearer","expires_in":3599,"refresh_token":"1//0g"}"#,
        )
        .unwrap();

        let grant = grant_from(&token);
        assert_eq!(grant.access_token, "ya29.a0");
        assert_eq!(grant.refresh_token.as_deref(), Some("1//0g"));
        assert_eq!(grant.expires_in, Some(Duration::from_secs(3599)));
    }

    #[test]
    fn test_token_error_mapping() {
        let err: RequestTokenError<std::io::Error, BasicErrorResponse> =
            RequestTokenError::Other("boom".to_string());
        assert!(matches!(token_error(err), InfraError::Api { .. }));

        let err: RequestTokenError<std::io::Error, BasicErrorResponse> =
            RequestTokenError::Request(std::io::Error::other("refused"));
        assert!(matches!(token_error(err), InfraError::Network { .. }));

        let response: BasicErrorResponse =
            serde_json::from_str(r#"{"error":"invalid_client","error_description":"bad secret"}"#)
                .unwrap();
        let err: RequestTokenError<std::io::Error, BasicErrorResponse> =
            RequestTokenError::ServerResponse(response);
        match token_error(err) {
            InfraError::AuthenticationRejected { message } => {
                assert_eq!(message, "invalid_client: bad secret")
            }
            other => panic!("Expected AuthenticationRejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ci_without_code_is_rejected_without_network() {
        let oauth = GoogleOAuth::new().unwrap();
        let credentials = Credentials {
            api_key: "key".to_string(),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            refresh_token: None,
        };
        let context = ExecutionContext::Ci {
            auth_code: None,
            redirect_uri: "http://localhost".to_string(),
        };

        let result = oauth.exchange_code(&credentials, &context).await;
        assert!(matches!(
            result,
            Err(ClientError::Infra(InfraError::AuthenticationRejected { .. }))
        ));
    }

    #[tokio::test]
    async fn test_redirect_server_checks_csrf() {
        let csrf = CsrfToken::new("expected-state".to_string());
        let (url, code) = setup_redirect(csrf).await.unwrap();

        let callback = format!("{}/?state=expected-state&code=4%2Fabc", url.as_str().trim_end_matches('/'));
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        let response = client.get(callback).send().await.unwrap();
        assert!(response.status().is_success());

        let code = code.await.unwrap();
        assert_eq!(code.secret(), "4/abc");
    }
}
