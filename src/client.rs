use std::sync::Arc;

use reqwest::blocking::{Body, Client, Request, RequestBuilder, Response};
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
pub use crate::config::CredentialsMode;

const USER_AGENT: &str = concat!("invflask-client/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("cannot resolve {path:?} against the base URL: {source}")]
    InvalidUrl {
        path: String,
        #[source]
        source: url::ParseError,
    },
}

/// HTTP client bound to one [`ClientConfig`].
///
/// Every request is resolved against the configured base URL and starts out
/// with the configured default headers. When credentials are enabled the
/// client keeps a cookie jar, so cookies set by any origin are replayed on
/// later requests to that origin.
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ClientConfig,
    client: Client,
    cookies: Option<Arc<Jar>>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let mut builder = Client::builder().user_agent(USER_AGENT);

        let cookies = if config.sends_credentials() {
            let jar = Arc::new(Jar::default());
            builder = builder.cookie_provider(Arc::clone(&jar));
            Some(jar)
        } else {
            None
        };

        let client = builder.build().map_err(ClientError::Build)?;
        debug!(
            base_url = %config.base_url(),
            credentials = %config.credentials_mode(),
            "built API client"
        );

        Ok(Self {
            config,
            client,
            cookies,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &Url {
        self.config.base_url()
    }

    pub fn default_headers(&self) -> &HeaderMap {
        self.config.default_headers()
    }

    pub fn credentials(&self) -> CredentialsMode {
        self.config.credentials_mode()
    }

    /// Cookie jar shared by every request, present only when credentials are sent.
    pub fn cookies(&self) -> Option<&Arc<Jar>> {
        self.cookies.as_ref()
    }

    /// Prefix `path` with the base URL, keeping any path the base carries.
    ///
    /// `/users` and `users` both land under the base; an absolute URL is used
    /// as given.
    pub fn url(&self, path: &str) -> Result<Url, ClientError> {
        let resolved = if path.contains("://") {
            Url::parse(path)
        } else {
            let base = self.config.base_url().as_str().trim_end_matches('/');
            Url::parse(&format!("{}/{}", base, path.trim_start_matches('/')))
        };
        resolved.map_err(|source| ClientError::InvalidUrl {
            path: path.to_string(),
            source,
        })
    }

    pub fn request(&self, method: Method, path: &str) -> Result<ApiRequestBuilder<'_>, ClientError> {
        let url = self.url(path)?;
        let inner = self
            .client
            .request(method, url)
            .headers(self.config.default_headers().clone());
        Ok(ApiRequestBuilder {
            client: self,
            inner,
            credentials: self.credentials(),
        })
    }

    pub fn get(&self, path: &str) -> Result<ApiRequestBuilder<'_>, ClientError> {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> Result<ApiRequestBuilder<'_>, ClientError> {
        self.request(Method::POST, path)
    }

    pub fn put(&self, path: &str) -> Result<ApiRequestBuilder<'_>, ClientError> {
        self.request(Method::PUT, path)
    }

    pub fn patch(&self, path: &str) -> Result<ApiRequestBuilder<'_>, ClientError> {
        self.request(Method::PATCH, path)
    }

    pub fn delete(&self, path: &str) -> Result<ApiRequestBuilder<'_>, ClientError> {
        self.request(Method::DELETE, path)
    }
}

/// A request in progress, already carrying the client's default headers.
pub struct ApiRequestBuilder<'a> {
    client: &'a ApiClient,
    inner: RequestBuilder,
    credentials: CredentialsMode,
}

impl<'a> ApiRequestBuilder<'a> {
    /// Set a header, replacing any default with the same name.
    pub fn header(self, name: HeaderName, value: HeaderValue) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(name, value);
        Self {
            inner: self.inner.headers(headers),
            ..self
        }
    }

    pub fn query<T: Serialize + ?Sized>(self, query: &T) -> Self {
        Self {
            inner: self.inner.query(query),
            ..self
        }
    }

    pub fn json<T: Serialize + ?Sized>(self, payload: &T) -> Self {
        Self {
            inner: self.inner.json(payload),
            ..self
        }
    }

    pub fn body(self, body: impl Into<Body>) -> Self {
        Self {
            inner: self.inner.body(body),
            ..self
        }
    }

    /// Finish the request without sending it.
    pub fn build(self) -> Result<PreparedRequest<'a>, ClientError> {
        let request = self.inner.build()?;
        Ok(PreparedRequest {
            client: self.client,
            request,
            credentials: self.credentials,
        })
    }

    pub fn send(self) -> Result<Response, ClientError> {
        self.build()?.send()
    }
}

/// A fully built request that can be inspected before it goes on the wire.
///
/// It stays tied to the client that built it, so it is sent with that
/// client's cookie jar and the credentials mode it reports.
#[derive(Debug)]
pub struct PreparedRequest<'a> {
    client: &'a ApiClient,
    request: Request,
    credentials: CredentialsMode,
}

impl<'a> PreparedRequest<'a> {
    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn url(&self) -> &Url {
        self.request.url()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    pub fn credentials(&self) -> CredentialsMode {
        self.credentials
    }

    pub fn send(self) -> Result<Response, ClientError> {
        debug!(
            method = %self.request.method(),
            url = %self.request.url(),
            credentials = %self.credentials,
            "sending request"
        );
        let response = self.client.client.execute(self.request)?;
        debug!(status = response.status().as_u16(), "received response");
        Ok(response)
    }
}
