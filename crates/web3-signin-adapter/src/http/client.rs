/*
[INPUT]:  Service URL, public API key, timeouts and credentials
[OUTPUT]: Sessions and user records from the hosted auth REST API
[POS]:    HTTP layer - reqwest implementation of AuthService
[UPDATE]: When auth endpoints or error body formats change
*/

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::auth::AuthService;
use crate::config::SigninConfig;
use crate::error::{Result, ServiceError, SigninError};
use crate::http::SessionSlot;
use crate::types::{Session, UserProfile, Web3Credentials};

const AUTH_PREFIX: &str = "auth/v1/";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Error body shapes the auth API answers with
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    error_description: Option<String>,
    error_code: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

impl ApiErrorBody {
    fn into_service_error(self, status: StatusCode) -> ServiceError {
        let code = self.error_code.or_else(|| self.error.clone());
        let message = self
            .error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            });

        let err = ServiceError::new(message).with_status(status.as_u16());
        match code {
            Some(code) => err.with_code(code),
            None => err,
        }
    }
}

/// Client for a hosted auth service speaking the GoTrue REST dialect
#[derive(Debug)]
pub struct HttpAuthService {
    http_client: Client,
    base_url: Url,
    api_key: String,
    session: SessionSlot,
    /// One token refresh at a time; a refresh token is single-use
    refresh_lock: Mutex<()>,
}

impl HttpAuthService {
    /// Create a client with default timeouts
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        Self::with_config(ClientConfig::default(), base_url, api_key)
    }

    pub fn with_config(config: ClientConfig, base_url: &str, api_key: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(SigninError::Config("auth service API key is empty".to_string()));
        }

        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| SigninError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: normalize_base_url(base_url)?,
            api_key: api_key.trim().to_string(),
            session: SessionSlot::new(),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Build a client from the service section of the sign-in config
    pub fn from_config(config: &SigninConfig) -> Result<Self> {
        let base_url = config.service_url()?;
        Self::with_config(config.client_config(), base_url.as_str(), config.api_key()?)
    }

    /// Seed the client with a session obtained earlier
    pub fn with_session(self, session: Session) -> Self {
        self.session.set(session);
        self
    }

    pub fn session_slot(&self) -> &SessionSlot {
        &self.session
    }

    fn auth_url(&self, endpoint: &str) -> std::result::Result<Url, url::ParseError> {
        self.base_url.join(AUTH_PREFIX)?.join(endpoint)
    }

    fn auth_request(
        &self,
        method: Method,
        endpoint: &str,
        access_token: Option<&str>,
    ) -> std::result::Result<RequestBuilder, ServiceError> {
        let url = self
            .auth_url(endpoint)
            .map_err(|e| ServiceError::new(format!("invalid endpoint {endpoint}: {e}")))?;
        let bearer = access_token.unwrap_or(&self.api_key);
        Ok(self
            .http_client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(bearer))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> std::result::Result<T, ServiceError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }
        Err(decode_error(response).await)
    }

    async fn send_empty(&self, builder: RequestBuilder) -> std::result::Result<(), ServiceError> {
        let response = builder.send().await?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(decode_error(response).await)
    }

    /// POST /auth/v1/token?grant_type=refresh_token
    async fn refresh_session(&self, refresh_token: &str) -> std::result::Result<Session, ServiceError> {
        let builder = self
            .auth_request(Method::POST, "token?grant_type=refresh_token", None)?
            .json(&serde_json::json!({ "refresh_token": refresh_token }));
        let session: Session = self.send_json(builder).await?;
        self.session.set(session.clone());
        debug!("session refreshed");
        Ok(session)
    }
}

fn normalize_base_url(base_url: &str) -> Result<Url> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(SigninError::Config("auth service URL is empty".to_string()));
    }
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Ok(Url::parse(&with_slash)?)
}

async fn decode_error(response: reqwest::Response) -> ServiceError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let parsed: ApiErrorBody = serde_json::from_str(&body).unwrap_or_else(|_| ApiErrorBody {
        message: (!body.trim().is_empty()).then(|| body.trim().to_string()),
        ..ApiErrorBody::default()
    });
    parsed.into_service_error(status)
}

fn is_dead_refresh(err: &ServiceError) -> bool {
    err.is_no_session()
        || err.status == Some(400)
        || matches!(
            err.code.as_deref(),
            Some("refresh_token_not_found" | "refresh_token_already_used" | "invalid_grant")
        )
}

#[async_trait]
impl AuthService for HttpAuthService {
    async fn get_session(&self) -> std::result::Result<Option<Session>, ServiceError> {
        let Some(session) = self.session.session() else {
            return Ok(None);
        };
        if !self.session.is_expired() {
            return Ok(Some(session));
        }

        let _refreshing = self.refresh_lock.lock().await;
        // another caller may have refreshed while we waited
        match self.session.session() {
            Some(session) if !self.session.is_expired() => return Ok(Some(session)),
            Some(_) => {}
            None => return Ok(None),
        }

        let Some(refresh_token) = self.session.refresh_token() else {
            self.session.clear();
            return Ok(None);
        };
        match self.refresh_session(&refresh_token).await {
            Ok(session) => Ok(Some(session)),
            Err(err) if is_dead_refresh(&err) => {
                if self.session.refresh_token().as_deref() == Some(refresh_token.as_str()) {
                    debug!(error = %err, "refresh token rejected, dropping session");
                    self.session.clear();
                    return Ok(None);
                }
                Ok(self.session.session())
            }
            Err(err) => Err(err),
        }
    }

    /// GET /auth/v1/user
    async fn get_user(&self) -> std::result::Result<Option<UserProfile>, ServiceError> {
        let token = self.session.access_token().ok_or_else(ServiceError::no_session)?;
        let builder = self.auth_request(Method::GET, "user", Some(&token))?;
        match self.send_json::<UserProfile>(builder).await {
            Ok(user) => Ok(Some(user)),
            Err(err) if err.status == Some(404) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// POST /auth/v1/token?grant_type=web3
    async fn sign_in_with_web3(
        &self,
        credentials: Web3Credentials,
    ) -> std::result::Result<Session, ServiceError> {
        let chain = credentials.chain;
        let builder = self
            .auth_request(Method::POST, "token?grant_type=web3", None)?
            .json(&credentials);
        let session: Session = self.send_json(builder).await?;
        self.session.set(session.clone());
        info!(%chain, "web3 sign-in accepted");
        Ok(session)
    }

    /// POST /auth/v1/logout
    async fn sign_out(&self) -> std::result::Result<(), ServiceError> {
        let Some(token) = self.session.access_token() else {
            debug!("sign-out without a session");
            return Ok(());
        };
        let builder = self.auth_request(Method::POST, "logout", Some(&token))?;
        match self.send_empty(builder).await {
            Ok(()) => {}
            Err(err) if err.is_no_session() || err.status == Some(404) => {
                warn!(error = %err, "session already gone on the service");
            }
            Err(err) => return Err(err),
        }
        self.session.clear();
        info!("signed out");
        Ok(())
    }
}
