//! HTTP transport to the bailiff service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, Proxy};
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::query::SearchQuery;
use crate::proxy::ProxyEndpoint;

/// Browser user agents the site accepts without extra scrutiny.
pub const BROWSER_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (X11; Linux x86_64; rv:133.0) Gecko/20100101 Firefox/133.0",
];

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("no session bound; reset_session must be called first")]
    NoSession,

    /// Anything a non-HTTP transport wants to report.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// 5xx answer from the site.
    pub fn is_server_error(&self) -> bool {
        match self {
            Self::Http(e) => e.status().is_some_and(|s| s.is_server_error()),
            _ => false,
        }
    }
}

/// What the protocol client needs from the network.
#[async_trait]
pub trait SiteTransport: Send + Sync {
    /// Bind a fresh session (new cookie jar) to `proxy`.
    async fn reset_session(&mut self, proxy: &ProxyEndpoint) -> Result<(), TransportError>;

    /// GET the search endpoint and return the raw body.
    async fn search(&self, query: &SearchQuery) -> Result<String, TransportError>;

    /// GET the captcha refresh endpoint and return the raw body.
    async fn fetch_challenge(&self) -> Result<String, TransportError>;

    /// Cookies currently held for the site.
    fn cookies(&self) -> Vec<(String, String)>;
}

/// Connection settings for `ReqwestTransport`.
#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub base_url: Url,
    pub connect_timeout: Duration,
    pub timeout: Duration,
    /// Fixed user agent; a browser one is picked per session when unset.
    pub user_agent: Option<String>,
}

struct BoundClient {
    client: Client,
    jar: Arc<Jar>,
}

/// `reqwest` transport with one client and cookie jar per session.
pub struct ReqwestTransport {
    settings: TransportSettings,
    bound: Option<BoundClient>,
}

impl ReqwestTransport {
    pub fn new(settings: TransportSettings) -> Self {
        Self {
            settings,
            bound: None,
        }
    }

    fn client(&self) -> Result<&Client, TransportError> {
        self.bound
            .as_ref()
            .map(|b| &b.client)
            .ok_or(TransportError::NoSession)
    }

    fn user_agent(&self) -> String {
        match &self.settings.user_agent {
            Some(ua) => ua.clone(),
            None => BROWSER_USER_AGENTS
                .choose(&mut rand::rng())
                .copied()
                .unwrap_or(BROWSER_USER_AGENTS[0])
                .to_string(),
        }
    }

    async fn get(&self, url: Url, query: Option<&SearchQuery>) -> Result<String, TransportError> {
        let mut request = self.client()?.get(url);
        if let Some(query) = query {
            request = request.query(query.pairs());
        }
        let response = request.send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl SiteTransport for ReqwestTransport {
    async fn reset_session(&mut self, proxy: &ProxyEndpoint) -> Result<(), TransportError> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .user_agent(self.user_agent())
            .proxy(Proxy::all(proxy.to_string())?)
            .cookie_provider(jar.clone())
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.timeout)
            .gzip(true)
            .brotli(true)
            .build()?;

        debug!("New HTTP session via {}", proxy.address());
        self.bound = Some(BoundClient { client, jar });
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> Result<String, TransportError> {
        let url = self.settings.base_url.join("ajax_search")?;
        self.get(url, Some(query)).await
    }

    async fn fetch_challenge(&self) -> Result<String, TransportError> {
        let url = self.settings.base_url.join("refresh_visual_captcha/")?;
        self.get(url, None).await
    }

    fn cookies(&self) -> Vec<(String, String)> {
        let Some(bound) = &self.bound else {
            return Vec::new();
        };
        bound
            .jar
            .cookies(&self.settings.base_url)
            .and_then(|header| header.to_str().ok().map(parse_cookie_header))
            .unwrap_or_default()
    }
}

/// Split a `Cookie:` header value into name/value pairs.
fn parse_cookie_header(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}
