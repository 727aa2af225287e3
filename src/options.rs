use std::{fmt, time::Duration};

use tracing::Dispatch;

/// Host and port used when no server address is configured.
pub const DEFAULT_ENDPOINT: &str = "127.0.0.1:4200";

/// Schema searched for unqualified table names unless configured otherwise.
pub const DEFAULT_SCHEMA: &str = "doc";

/// Per-request HTTP transport tuning.
///
/// Client-level options act as defaults; options passed to a single call
/// are merged on top of them with [`HttpOptions::merge`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HttpOptions {
    /// Timeout for establishing the TCP connection.
    pub open_timeout: Option<Duration>,
    /// Timeout for the whole request until the response body is read.
    pub read_timeout: Option<Duration>,
}

impl HttpOptions {
    /// Options without any value set, useful as a per-call override base.
    pub fn none() -> Self {
        Self {
            open_timeout: None,
            read_timeout: None,
        }
    }

    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = Some(timeout);
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Returns `self` with every value set in `overrides` replaced.
    pub fn merge(&self, overrides: &HttpOptions) -> HttpOptions {
        HttpOptions {
            open_timeout: overrides.open_timeout.or(self.open_timeout),
            read_timeout: overrides.read_timeout.or(self.read_timeout),
        }
    }
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            open_timeout: None,
            read_timeout: Some(Duration::from_secs(3600)),
        }
    }
}

/// Connection configuration of a [`crate::CrateDbClient`].
#[derive(Clone)]
pub struct ClientConfig {
    /// `host:port` or full base URL of the server.
    pub endpoint: String,
    /// Value of the `Default-Schema` header; `None` omits the header.
    pub schema: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub http: HttpOptions,
    /// Dispatcher receiving the client's log events instead of the global
    /// subscriber.
    pub dispatch: Option<Dispatch>,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("schema", &self.schema)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("http", &self.http)
            .field("dispatch", &self.dispatch.is_some())
            .finish()
    }
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Builds a configuration from a server list.
    ///
    /// Only the first address is used; an empty list falls back to
    /// [`DEFAULT_ENDPOINT`].
    pub fn from_servers<I, S>(servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match servers.into_iter().next() {
            Some(endpoint) => Self::new(endpoint),
            None => Self::default(),
        }
    }

    /// Base URL requests are sent to, without trailing slash.
    pub fn base_url(&self) -> String {
        let endpoint = self.endpoint.trim().trim_end_matches('/');
        if endpoint.contains("://") {
            endpoint.to_owned()
        } else {
            format!("http://{endpoint}")
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            schema: Some(DEFAULT_SCHEMA.to_owned()),
            username: None,
            password: None,
            http: HttpOptions::default(),
            dispatch: None,
        }
    }
}
