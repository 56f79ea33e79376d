//! HTTP(S) transport using reqwest.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, COOKIE, SET_COOKIE, USER_AGENT};
use reqwest::{Certificate, Client, Url};

use super::{CookieSet, RawResponse, Transport};
use crate::error::TransportError;

/// User-Agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = "Yggdra EPP Gateway/1.0";

/// HTTP transport configuration.
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Gateway endpoint; every command is POSTed to this URL
    pub url: Url,
    /// User-Agent header
    pub user_agent: String,
    /// Whole-request timeout
    pub request_timeout: Duration,
    /// TCP + TLS connect timeout
    pub connect_timeout: Duration,
    /// Extra trusted root certificate (PEM)
    pub ca_file: Option<PathBuf>,
}

impl HttpTransportConfig {
    /// Defaults for `url`.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(15),
            ca_file: None,
        }
    }

    /// Set the User-Agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set request and connect timeouts.
    pub fn with_timeouts(mut self, request: Duration, connect: Duration) -> Self {
        self.request_timeout = request;
        self.connect_timeout = connect;
        self
    }

    /// Trust an extra CA certificate.
    pub fn with_ca_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_file = Some(path.into());
        self
    }
}

/// EPP over HTTP POST.
///
/// The reqwest client (and its connection pool) exists between
/// [`Transport::connect`] and [`Transport::disconnect`]; posting while
/// disconnected connects first.
#[derive(Debug)]
pub struct HttpTransport {
    config: HttpTransportConfig,
    client: Option<Client>,
}

impl HttpTransport {
    /// Create a disconnected transport.
    pub fn new(config: HttpTransportConfig) -> Self {
        Self {
            config,
            client: None,
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    /// Whether a client is currently held.
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    fn build_client(&self) -> Result<Client, TransportError> {
        let mut builder = Client::builder()
            .timeout(self.config.request_timeout)
            .connect_timeout(self.config.connect_timeout);

        if let Some(path) = &self.config.ca_file {
            let pem = std::fs::read(path).map_err(|e| {
                TransportError::Client(format!("Failed to read CA file {}: {e}", path.display()))
            })?;
            let cert = Certificate::from_pem(&pem)
                .map_err(|e| TransportError::Client(format!("Invalid CA certificate: {e}")))?;
            builder = builder.add_root_certificate(cert);
        }

        builder
            .build()
            .map_err(|e| TransportError::Client(format!("Failed to create HTTP client: {e}")))
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.config.request_timeout)
        } else {
            err.into()
        }
    }
}

impl Transport for HttpTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        if self.client.is_none() {
            self.client = Some(self.build_client()?);
            tracing::debug!("HTTP transport connected to {}", self.config.url);
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.client.take().is_some() {
            tracing::debug!("HTTP transport disconnected");
        }
    }

    fn post<'a>(
        &'a mut self,
        body: String,
        cookies: &'a CookieSet,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + Send + 'a>> {
        Box::pin(async move {
            self.connect()?;
            let client = self
                .client
                .as_ref()
                .ok_or_else(|| TransportError::ConnectionLost("not connected".to_string()))?;

            let mut request = client
                .post(self.config.url.clone())
                .header(USER_AGENT, &self.config.user_agent)
                .header(CONTENT_TYPE, "text/xml; charset=UTF-8")
                .body(body);
            if let Some(cookie) = cookies.header_value() {
                request = request.header(COOKIE, cookie);
            }

            let response = request.send().await.map_err(|e| self.classify(e))?;
            let status = response.status();
            if !status.is_success() {
                return Err(TransportError::HttpStatus(status.as_u16()));
            }

            let set_cookie: Vec<String> = response
                .headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .map(str::to_string)
                .collect();
            let body = response.text().await.map_err(|e| self.classify(e))?;

            Ok(RawResponse {
                body,
                set_cookie: (!set_cookie.is_empty())
                    .then(|| CookieSet::from_set_cookie(set_cookie.iter().map(String::as_str))),
            })
        })
    }

    fn name(&self) -> &'static str {
        "HTTP"
    }
}
