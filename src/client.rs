//! Tenant API client
//!
//! [`TenantApi`] is the seam the synchronizer talks to. [`PrismaCloudClient`]
//! implements it over HTTP; tests substitute an in-memory tenant.

use crate::error::{Error, Result};
use crate::model::Tenant;
use crate::secret::Secret;
use async_trait::async_trait;
use reqwest::{header, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Header carrying the session token
pub const AUTH_HEADER: &str = "x-redlock-auth";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Role as known to a tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRole {
    pub id: String,
    pub name: String,
}

/// User as returned by the tenant's user listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteUser {
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub role_ids: Vec<String>,
    #[serde(default)]
    pub default_role_id: Option<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(default, rename = "ssoBypassAllowed")]
    pub sso_bypass_allowed: Option<bool>,
}

/// Body for user create and update calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub enabled: bool,
    pub role_ids: Vec<String>,
    pub default_role_id: String,
    pub time_zone: String,
    /// Local password login is only allowed for non-SSO users
    #[serde(rename = "ssoBypassAllowed")]
    pub sso_bypass_allowed: bool,
}

/// Administrative API of one tenant
#[async_trait]
pub trait TenantApi: Send + Sync {
    /// Exchange the tenant's API key for a session token
    async fn login(&mut self) -> Result<()>;

    /// Roles defined in the tenant
    async fn list_roles(&self) -> Result<Vec<RemoteRole>>;

    /// All user accounts in the tenant
    async fn list_users(&self) -> Result<Vec<RemoteUser>>;

    async fn create_user(&self, user: &UserPayload) -> Result<()>;

    /// Replace attributes and role bindings of an existing user
    async fn update_user(&self, user: &UserPayload) -> Result<()>;
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: Option<String>,
}

/// HTTP client for one tenant
pub struct PrismaCloudClient {
    base_url: Url,
    access_key: String,
    secret_key: Secret,
    token: Option<String>,
    http: reqwest::Client,
}

impl PrismaCloudClient {
    pub fn new(
        base_url: &str,
        access_key: impl Into<String>,
        secret_key: Secret,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .ok()
            .filter(|u| !u.cannot_be_a_base())
            .ok_or_else(|| Error::config(format!("invalid tenant API URL '{}'", base_url)))?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("tenant-user-sync/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            base_url,
            access_key: access_key.into(),
            secret_key,
            token: None,
            http,
        })
    }

    pub fn for_tenant(tenant: &Tenant, timeout: Duration) -> Result<Self> {
        Self::new(
            tenant.base_url(),
            tenant.access_key.clone(),
            tenant.secret_key.clone(),
            timeout,
        )
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Append path segments to the base URL, percent-encoding each one
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<reqwest::Response> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| Error::Authentication("no session token, login first".into()))?;

        let url = self.url(segments);
        tracing::debug!("{} {}", method, url.path());
        let mut req = self
            .http
            .request(method, url)
            .header(AUTH_HEADER, token);
        if let Some(body) = body {
            req = req.json(body);
        }

        check_status(req.send().await?).await
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let resp = self.request::<()>(Method::GET, segments, None).await?;
        Ok(resp.json().await?)
    }
}

/// Map non-2xx responses into the error taxonomy
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        status.canonical_reason().unwrap_or("no response body").to_string()
    } else {
        body.chars().take(512).collect()
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Authentication(format!(
            "tenant rejected credentials ({}): {}",
            status.as_u16(),
            message
        ))),
        _ => Err(Error::RemoteApi {
            status: status.as_u16(),
            message,
        }),
    }
}

#[async_trait]
impl TenantApi for PrismaCloudClient {
    async fn login(&mut self) -> Result<()> {
        let payload = LoginRequest {
            username: &self.access_key,
            password: self.secret_key.expose(),
        };

        let resp = self
            .http
            .post(self.url(&["login"]))
            .json(&payload)
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let token = resp
            .json::<LoginResponse>()
            .await?
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Authentication("login response carried no token".into()))?;

        self.token = Some(token);
        Ok(())
    }

    async fn list_roles(&self) -> Result<Vec<RemoteRole>> {
        self.get(&["user", "role", "name"]).await
    }

    async fn list_users(&self) -> Result<Vec<RemoteUser>> {
        self.get(&["v3", "user"]).await
    }

    async fn create_user(&self, user: &UserPayload) -> Result<()> {
        self.request(Method::POST, &["v3", "user"], Some(user)).await?;
        Ok(())
    }

    async fn update_user(&self, user: &UserPayload) -> Result<()> {
        self.request(Method::PUT, &["v2", "user", user.email.as_str()], Some(user))
            .await?;
        Ok(())
    }
}
