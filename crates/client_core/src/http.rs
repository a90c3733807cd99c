//! HTTP client for the SSIS REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{DashboardStats, User},
    error::ApiError,
    protocol::{LoginRequest, SessionResponse, SignupRequest},
};
use tracing::{debug, warn};
use url::Url;

use crate::{
    error::{ClientError, ValidationError},
    list_adapter::{normalize_list, PageResult},
    query_state::{ListSource, QueryState},
    resource::{Draft, RequestBody, Resource},
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Cloning is cheap and clones share the connection pool and the session
/// cookie jar.
#[derive(Debug, Clone)]
pub struct SsisClient {
    http: Client,
    api_root: Url,
}

impl SsisClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            api_root: api_root(base_url)?,
        })
    }

    pub fn api_root(&self) -> &Url {
        &self.api_root
    }

    pub async fn fetch_page<E: Resource>(
        &self,
        query: &QueryState,
    ) -> Result<PageResult<E>, ClientError> {
        let url = self.url(&[E::PATH, ""])?;
        let request = self.http.get(url.clone()).query(&query.to_query_pairs());
        let response = self.send(Method::GET, &url, request).await?;
        normalize_list(read_json(response).await?)
    }

    /// Every record without paging, as used to fill option lists.
    pub async fn fetch_all<E: Resource>(&self) -> Result<Vec<E>, ClientError> {
        let url = self.url(&[E::PATH, ""])?;
        let response = self.send(Method::GET, &url, self.http.get(url.clone())).await?;
        let page: PageResult<E> = normalize_list(read_json(response).await?)?;
        Ok(page.items)
    }

    pub async fn get<E: Resource>(&self, key: &str) -> Result<E, ClientError> {
        let url = self.url(&[E::PATH, key])?;
        let response = self.send(Method::GET, &url, self.http.get(url.clone())).await?;
        read_json(response).await
    }

    pub async fn create<E: Resource>(&self, draft: E::Draft) -> Result<(), ClientError> {
        draft.validate()?;
        let url = self.url(&[E::PATH, ""])?;
        let request = with_body(self.http.post(url.clone()), draft.into_body()?);
        self.send(Method::POST, &url, request).await?;
        Ok(())
    }

    pub async fn update<E: Resource>(
        &self,
        original_key: &str,
        draft: E::Draft,
    ) -> Result<(), ClientError> {
        draft.validate()?;
        let url = self.url(&[E::PATH, original_key])?;
        let request = with_body(self.http.put(url.clone()), draft.into_body()?);
        self.send(Method::PUT, &url, request).await?;
        Ok(())
    }

    pub async fn delete<E: Resource>(&self, key: &str) -> Result<(), ClientError> {
        let url = self.url(&[E::PATH, key])?;
        self.send(Method::DELETE, &url, self.http.delete(url.clone()))
            .await?;
        Ok(())
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Option<User>, ClientError> {
        let url = self.url(&["auth", "login"])?;
        let request = self.http.post(url.clone()).json(&LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        });
        let response = self.send(Method::POST, &url, request).await?;
        let body: SessionResponse = read_json(response).await?;
        Ok(body.user)
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        let url = self.url(&["auth", "logout"])?;
        self.send(Method::POST, &url, self.http.post(url.clone()))
            .await?;
        Ok(())
    }

    pub async fn signup(&self, username: &str, email: &str, password: &str) -> Result<(), ClientError> {
        let url = self.url(&["auth", "signup"])?;
        let request = self.http.post(url.clone()).json(&SignupRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        });
        self.send(Method::POST, &url, request).await?;
        Ok(())
    }

    /// The signed-in user, or `None` when the session is anonymous.
    pub async fn me(&self) -> Result<Option<User>, ClientError> {
        let url = self.url(&["auth", "me"])?;
        match self.send(Method::GET, &url, self.http.get(url.clone())).await {
            Ok(response) => {
                let body: SessionResponse = read_json(response).await?;
                Ok(body.user.filter(|_| body.success))
            }
            Err(err) if err.is_unauthorized() => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn stats(&self) -> Result<DashboardStats, ClientError> {
        let url = self.url(&["stats", ""])?;
        let response = self.send(Method::GET, &url, self.http.get(url.clone())).await?;
        read_json(response).await
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.api_root.clone();
        url.path_segments_mut()
            .map_err(|_| invalid_base_url(self.api_root.as_str()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: &Url,
        request: RequestBuilder,
    ) -> Result<Response, ClientError> {
        debug!(%method, path = url.path(), "api request");
        let response = request.send().await.map_err(|err| {
            warn!(%method, path = url.path(), error = %err, "api request failed");
            ClientError::Network(err)
        })?;

        let status = response.status();
        debug!(%method, path = url.path(), status = status.as_u16(), "api response");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = ApiError::from_response(status.as_u16(), &body);
        debug!(status = status.as_u16(), message = %error.message, "api error response");
        Err(ClientError::server(status.as_u16(), error))
    }
}

#[async_trait]
impl<E: Resource> ListSource<E> for SsisClient {
    async fn fetch_page(&self, query: &QueryState) -> Result<PageResult<E>, ClientError> {
        SsisClient::fetch_page::<E>(self, query).await
    }
}

fn api_root(base_url: &str) -> Result<Url, ClientError> {
    let mut url = Url::parse(base_url.trim()).map_err(|_| invalid_base_url(base_url))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(invalid_base_url(base_url).into());
    }
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| invalid_base_url(base_url))?
        .pop_if_empty()
        .push("api");
    Ok(url)
}

fn invalid_base_url(base_url: &str) -> ValidationError {
    ValidationError::single("api_url", format!("'{base_url}' is not an http(s) URL"))
}

fn with_body(request: RequestBuilder, body: RequestBody) -> RequestBuilder {
    match body {
        RequestBody::Json(value) => request.json(&value),
        RequestBody::Multipart(form) => request.multipart(form),
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let bytes = response.bytes().await.map_err(ClientError::Network)?;
    serde_json::from_slice(&bytes).map_err(ClientError::from)
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
