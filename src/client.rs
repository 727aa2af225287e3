use std::{borrow::Cow, fmt, time::Duration};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use reqwest::{
    header::{self, HeaderMap, HeaderValue},
    redirect::Policy,
    Method, StatusCode,
};
use sha1::{Digest, Sha1};
use tracing::Dispatch;

use crate::{
    decode::{build_sql_request, decode_result_set},
    options::DEFAULT_SCHEMA,
    ClientConfig, CrateDbError, HttpOptions, Params, Result, ResultSet, Value,
};

const SQL_PATH: &str = "/_sql";
const BLOB_SCHEMA: &str = "blob";

const DEFAULT_SCHEMA_HEADER: &str = "default-schema";
// Read by servers that predate basic authentication.
const USER_HEADER: &str = "x-user";

/// Formats the HTTP path addressing a blob.
///
/// Example: `("my_blobs", "f9ba95...")` → `"/_blobs/my_blobs/f9ba95..."`
pub fn blob_path(table: &str, digest: &str) -> String {
    format!("/_blobs/{table}/{digest}")
}

/// Computes the SHA-1 hex digest blob tables use as content address.
pub fn blob_digest(data: impl AsRef<[u8]>) -> String {
    hex::encode(Sha1::digest(data.as_ref()))
}

#[derive(Clone)]
/// HTTP client for the CrateDB `/_sql` and `/_blobs` endpoints.
///
/// Only a single server is addressed; there is no fail-over between
/// several endpoints.
pub struct CrateDbClient {
    http: reqwest::Client,
    base_url: String,
    config: ClientConfig,
}

impl fmt::Debug for CrateDbClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrateDbClient")
            .field("base_url", &self.base_url)
            .field("schema", &self.config.schema)
            .field("username", &self.config.username)
            .field(
                "password",
                &self.config.password.as_ref().map(|_| "<redacted>"),
            )
            .field("http", &self.config.http)
            .finish()
    }
}

impl Default for CrateDbClient {
    fn default() -> Self {
        Self::with_http(default_http(), ClientConfig::default())
    }
}

impl CrateDbClient {
    /// Creates a client for a single `host:port` or base URL with default
    /// options (schema `doc`, no credentials, one hour read timeout).
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_http(default_http(), ClientConfig::new(endpoint))
    }

    /// Creates a client for the first address of `servers`.
    ///
    /// An empty list addresses `127.0.0.1:4200`.
    pub fn from_servers<I, S>(servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_http(default_http(), ClientConfig::from_servers(servers))
    }

    /// Creates a client from a full configuration.
    ///
    /// Fails only if the underlying HTTP client cannot be initialised.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let http = build_http(config.http.open_timeout)?;
        Ok(Self::with_http(http, config))
    }

    fn with_http(http: reqwest::Client, config: ClientConfig) -> Self {
        Self {
            http,
            base_url: config.base_url(),
            config,
        }
    }

    /// Sets the schema sent as `Default-Schema`.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.config.schema = Some(schema.into());
        self
    }

    /// Enables basic authentication.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: Option<String>,
    ) -> Self {
        self.config.username = Some(username.into());
        self.config.password = password;
        self
    }

    /// Routes log events to `dispatch` instead of the global subscriber.
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.config.dispatch = Some(dispatch);
        self
    }

    /// Replaces the client-level HTTP options.
    pub fn with_http_options(mut self, options: HttpOptions) -> Result<Self> {
        if options.open_timeout != self.config.http.open_timeout {
            self.http = build_http(options.open_timeout)?;
        }
        self.config.http = options;
        Ok(self)
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    pub fn http_options(&self) -> &HttpOptions {
        &self.config.http
    }

    pub fn schema(&self) -> Option<&str> {
        self.config.schema.as_deref()
    }

    pub fn set_schema(&mut self, schema: impl Into<String>) {
        self.config.schema = Some(schema.into());
    }

    /// Stops sending `Default-Schema`; the server then uses its own default.
    pub fn clear_schema(&mut self) {
        self.config.schema = None;
    }

    pub fn username(&self) -> Option<&str> {
        self.config.username.as_deref()
    }

    pub fn set_username(&mut self, username: impl Into<String>) {
        self.config.username = Some(username.into());
    }

    pub fn password(&self) -> Option<&str> {
        self.config.password.as_deref()
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.config.password = Some(password.into());
    }

    /// Removes username and password; requests are sent unauthenticated.
    pub fn clear_credentials(&mut self) {
        self.config.username = None;
        self.config.password = None;
    }

    /// Executes a statement with the client's HTTP options.
    ///
    /// Any 2xx response is parsed into a [`ResultSet`]; every other status,
    /// including redirects, fails with [`CrateDbError::Query`] carrying the
    /// raw body.
    pub async fn execute<P: Into<Params>>(&self, sql: &str, params: P) -> Result<ResultSet> {
        self.execute_with(sql, params, &HttpOptions::none()).await
    }

    /// Executes a statement with per-request HTTP options merged over the
    /// client's options.
    pub async fn execute_with<P: Into<Params>>(
        &self,
        sql: &str,
        params: P,
        options: &HttpOptions,
    ) -> Result<ResultSet> {
        let payload = build_sql_request(sql, params.into())?;
        let body = serde_json::to_vec(&payload)
            .map_err(|err| CrateDbError::Encode(format!("invalid sql request: {err}")))?;

        self.log(|| tracing::debug!(stmt = sql, "executing sql statement"));
        let response = self
            .send(Method::POST, SQL_PATH, Some(body.into()), options)
            .await?;

        let status = response.status();
        let body = response.text().await.map_err(CrateDbError::Transport)?;
        self.log(|| tracing::debug!(status = status.as_u16(), %body, "sql response"));

        if !status.is_success() {
            self.log(|| tracing::info!(status = status.as_u16(), %body, "sql request failed"));
            return Err(CrateDbError::Query {
                status: status.as_u16(),
                body,
            });
        }

        match decode_result_set(&body) {
            Ok(result) => Ok(result),
            Err(err) => {
                self.log(|| tracing::info!(%body, "{err}"));
                Err(err)
            }
        }
    }

    /// Inserts one record.
    ///
    /// Column names are double-quoted in attribute order; values are always
    /// sent as `$n` bind parameters.
    pub async fn insert<I, K, V>(&self, table_name: &str, attributes: I) -> Result<ResultSet>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let (stmt, values) = insert_statement(table_name, attributes);
        self.execute(&stmt, Params::Positional(values)).await
    }

    /// Forces a table refresh.
    ///
    /// Reads that do not go through the primary key only see rows written
    /// since the last refresh (periodic, 1000 ms by default).
    pub async fn refresh_table(&self, table_name: &str) -> Result<ResultSet> {
        self.execute(&format!("refresh table {table_name}"), ())
            .await
    }

    /// Returns the `information_schema.columns` rows of a table in the
    /// configured schema.
    pub async fn table_structure(&self, table_name: &str) -> Result<ResultSet> {
        self.execute(
            "select * from information_schema.columns where table_schema = ? AND table_name = ?",
            Params::positional([self.schema_or_default(), table_name]),
        )
        .await
    }

    /// Lists the tables of the configured schema.
    pub async fn show_tables(&self) -> Result<ResultSet> {
        self.tables_in(self.schema_or_default()).await
    }

    /// Names of the tables in the configured schema.
    pub async fn tables(&self) -> Result<Vec<String>> {
        table_names(&self.show_tables().await?)
    }

    /// Names of the blob tables.
    pub async fn blob_tables(&self) -> Result<Vec<String>> {
        table_names(&self.tables_in(BLOB_SCHEMA).await?)
    }

    async fn tables_in(&self, schema: &str) -> Result<ResultSet> {
        self.execute(
            "select table_name from information_schema.tables where table_schema = ?",
            Params::positional([schema]),
        )
        .await
    }

    /// Creates a table from ordered `(column, definition)` pairs.
    ///
    /// ```no_run
    /// # async fn run(db: cratedb_http::CrateDbClient) -> cratedb_http::Result<()> {
    /// db.create_table("posts", [("id", "string primary key"), ("views", "integer")])
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create_table<I, K, D>(&self, table_name: &str, columns: I) -> Result<ResultSet>
    where
        I: IntoIterator<Item = (K, D)>,
        K: AsRef<str>,
        D: AsRef<str>,
    {
        self.execute(&create_table_statement(table_name, columns), ())
            .await
    }

    /// Creates a blob table with the given shard and replica counts.
    pub async fn create_blob_table(
        &self,
        name: &str,
        shard_count: u32,
        replicas: u32,
    ) -> Result<ResultSet> {
        self.execute(
            &format!(
                r#"CREATE BLOB TABLE "{name}" CLUSTERED INTO ? SHARDS WITH (number_of_replicas=?)"#
            ),
            Params::positional([shard_count, replicas]),
        )
        .await
    }

    /// Creates a blob table with 5 shards and no replicas.
    pub async fn create_blob_table_default(&self, name: &str) -> Result<ResultSet> {
        self.create_blob_table(name, 5, 0).await
    }

    /// Drops a regular table, or a blob table when `blob` is set.
    pub async fn drop_table(&self, table_name: &str, blob: bool) -> Result<ResultSet> {
        self.execute(&drop_table_statement(table_name, blob), ())
            .await
    }

    /// Uploads a blob under its digest.
    ///
    /// Returns `Ok(true)` on `201 Created` and `Ok(false)` for any other
    /// status, redirects included; only transport failures are errors.
    pub async fn blob_put(
        &self,
        table: &str,
        digest: &str,
        data: impl Into<reqwest::Body>,
    ) -> Result<bool> {
        let path = blob_path(table, digest);
        self.log(|| tracing::debug!("BLOB PUT {path}"));
        let response = self
            .send(Method::PUT, &path, Some(data.into()), &HttpOptions::none())
            .await?;

        if response.status() == StatusCode::CREATED {
            return Ok(true);
        }
        self.log_rejected(response).await?;
        Ok(false)
    }

    /// Downloads a blob.
    ///
    /// Returns the raw body on `200 OK` and `Ok(None)` for any other status,
    /// redirects included.
    pub async fn blob_get(&self, table: &str, digest: &str) -> Result<Option<Bytes>> {
        let path = blob_path(table, digest);
        self.log(|| tracing::debug!("BLOB GET {path}"));
        let response = self
            .send(Method::GET, &path, None, &HttpOptions::none())
            .await?;

        if response.status() == StatusCode::OK {
            let data = response.bytes().await.map_err(CrateDbError::Transport)?;
            return Ok(Some(data));
        }
        self.log_rejected(response).await?;
        Ok(None)
    }

    /// Deletes a blob.
    ///
    /// Returns `Ok(true)` on `200 OK` and `Ok(false)` for any other status,
    /// redirects included.
    pub async fn blob_delete(&self, table: &str, digest: &str) -> Result<bool> {
        let path = blob_path(table, digest);
        self.log(|| tracing::debug!("BLOB DELETE {path}"));
        let response = self
            .send(Method::DELETE, &path, None, &HttpOptions::none())
            .await?;

        if response.status() == StatusCode::OK {
            return Ok(true);
        }
        self.log_rejected(response).await?;
        Ok(false)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<reqwest::Body>,
        overrides: &HttpOptions,
    ) -> Result<reqwest::Response> {
        let options = self.config.http.merge(overrides);
        let http = self.http_for(&options)?;

        let mut request = http
            .request(method, format!("{}{path}", self.base_url))
            .headers(self.headers()?);
        if let Some(timeout) = options.read_timeout {
            request = request.timeout(timeout);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        request.send().await.map_err(CrateDbError::Transport)
    }

    // The connect timeout is fixed per reqwest::Client, so a differing
    // per-request open timeout needs a dedicated client.
    fn http_for(&self, options: &HttpOptions) -> Result<Cow<'_, reqwest::Client>> {
        if options.open_timeout == self.config.http.open_timeout {
            Ok(Cow::Borrowed(&self.http))
        } else {
            build_http(options.open_timeout).map(Cow::Owned)
        }
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(schema) = &self.config.schema {
            headers.insert(DEFAULT_SCHEMA_HEADER, header_value(schema)?);
        }
        if let Some(username) = &self.config.username {
            let authorization =
                basic_authorization(username, self.config.password.as_deref());
            headers.insert(header::AUTHORIZATION, header_value(&authorization)?);
            headers.insert(USER_HEADER, header_value(username)?);
        }

        Ok(headers)
    }

    async fn log_rejected(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();
        let body = response.text().await.map_err(CrateDbError::Transport)?;
        self.log(|| tracing::info!("Response {}: {}", status.as_u16(), body));
        Ok(())
    }

    fn log(&self, emit: impl FnOnce()) {
        match &self.config.dispatch {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, emit),
            None => emit(),
        }
    }

    fn schema_or_default(&self) -> &str {
        self.config.schema.as_deref().unwrap_or(DEFAULT_SCHEMA)
    }
}

// Redirects are never followed: a 3xx is a failed request like any other
// non-success status.
fn build_http(open_timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().redirect(Policy::none());
    if let Some(timeout) = open_timeout {
        builder = builder.connect_timeout(timeout);
    }
    builder.build().map_err(CrateDbError::Transport)
}

fn default_http() -> reqwest::Client {
    // Panics under the same condition as `reqwest::Client::new`.
    build_http(None).expect("TLS backend cannot be initialized")
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|err| CrateDbError::Encode(format!("invalid header value '{value}': {err}")))
}

fn basic_authorization(username: &str, password: Option<&str>) -> String {
    let credentials = format!("{username}:{}", password.unwrap_or_default());
    format!("Basic {}", STANDARD.encode(credentials))
}

fn insert_statement<I, K, V>(table_name: &str, attributes: I) -> (String, Vec<Value>)
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<Value>,
{
    let (identifiers, values): (Vec<String>, Vec<Value>) = attributes
        .into_iter()
        .map(|(column, value)| (format!(r#""{}""#, column.as_ref()), value.into()))
        .unzip();
    let binds = (1..=values.len())
        .map(|i| format!("${i}"))
        .collect::<Vec<_>>()
        .join(", ");

    let stmt = format!(
        r#"INSERT INTO "{table_name}" ({}) VALUES ({binds})"#,
        identifiers.join(", ")
    );
    (stmt, values)
}

fn create_table_statement<I, K, D>(table_name: &str, columns: I) -> String
where
    I: IntoIterator<Item = (K, D)>,
    K: AsRef<str>,
    D: AsRef<str>,
{
    let columns = columns
        .into_iter()
        .map(|(name, definition)| format!("{} {}", name.as_ref(), definition.as_ref()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(r#"CREATE TABLE "{table_name}" ({columns})"#)
}

fn drop_table_statement(table_name: &str, blob: bool) -> String {
    let kind = if blob { "BLOB TABLE" } else { "TABLE" };
    format!(r#"DROP {kind} "{table_name}""#)
}

fn table_names(result: &ResultSet) -> Result<Vec<String>> {
    result
        .iter()
        .map(|row| match row.first() {
            Some(Value::Text(name)) => Ok(name.clone()),
            other => Err(CrateDbError::MalformedResult(format!(
                "expected table name, got {other:?}"
            ))),
        })
        .collect()
}
