use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use stash_types::api::{
    CreateLinkRequest, ErrorResponse, LoginRequest, LoginResponse, RegisterRequest, ReorderRequest,
};
use stash_types::models::{Link, LinkId};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("not logged in")]
    NotLoggedIn,

    #[error("session expired, please log in again")]
    SessionExpired,

    #[error("{message} ({status})")]
    Api { status: StatusCode, message: String },

    #[error("{0}")]
    Invalid(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("token store: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Thin wrapper over the REST API. Link calls need a token.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    // -- Auth --

    pub async fn register(&self, email: &str, password: &str) -> Result<()> {
        let body = RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let resp = self.http.post(self.endpoint("/api/register")).json(&body).send().await?;
        check(resp, false).await?;
        Ok(())
    }

    /// Returns the access token; the caller decides where to keep it.
    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let resp = self.http.post(self.endpoint("/api/login")).json(&body).send().await?;
        let login: LoginResponse = json(check(resp, false).await?).await?;
        Ok(login.access_token)
    }

    // -- Links --

    pub async fn list_links(&self, tag: Option<&str>) -> Result<Vec<Link>> {
        let mut req = self.authed(self.http.get(self.endpoint("/api/links")))?;
        if let Some(tag) = tag {
            req = req.query(&[("tag", tag)]);
        }
        json(check(req.send().await?, true).await?).await
    }

    pub async fn tags(&self) -> Result<Vec<String>> {
        let req = self.authed(self.http.get(self.endpoint("/api/links/tags")))?;
        json(check(req.send().await?, true).await?).await
    }

    pub async fn create_link(&self, url: &str, tags: &[String]) -> Result<Link> {
        let body = CreateLinkRequest {
            url: url.to_string(),
            tags: tags.to_vec(),
        };
        let req = self.authed(self.http.post(self.endpoint("/api/links")))?.json(&body);
        json(check(req.send().await?, true).await?).await
    }

    pub async fn delete_link(&self, id: LinkId) -> Result<()> {
        let req = self.authed(self.http.delete(self.endpoint(&format!("/api/links/{id}"))))?;
        check(req.send().await?, true).await?;
        Ok(())
    }

    pub async fn reorder_links(&self, ids: &[LinkId]) -> Result<()> {
        let body = ReorderRequest {
            ordered_link_ids: ids.to_vec(),
        };
        let req = self.authed(self.http.put(self.endpoint("/api/links/reorder")))?.json(&body);
        check(req.send().await?, true).await?;
        Ok(())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.token.as_deref().ok_or(ClientError::NotLoggedIn)?;
        Ok(req.bearer_auth(token))
    }
}

/// Map non-2xx answers to errors. On authenticated calls 401/403 mean the
/// token is gone or stale.
async fn check(resp: Response, authed: bool) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if authed && matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return Err(ClientError::SessionExpired);
    }

    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&text)
        .map(|e| e.error)
        .unwrap_or_else(|_| {
            if text.trim().is_empty() {
                status.canonical_reason().unwrap_or("Request failed").to_string()
            } else {
                text
            }
        });
    debug!(%status, %message, "API error");
    Err(ClientError::Api { status, message })
}

async fn json<T: DeserializeOwned>(resp: Response) -> Result<T> {
    Ok(resp.json().await?)
}
