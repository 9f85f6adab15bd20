use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    Method, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

#[cfg(not(target_arch = "wasm32"))]
use tokio::time::sleep;

use crate::{
    wire::server_message, ApiError, ApiRequest, ClientOptions, HealthStatus, HostList,
    MemoryTokenStore, Result, TokenStore,
};

#[derive(Clone)]
/// HTTP client with per-host retry, multi-host fallback and bearer-token
/// injection.
///
/// Clones share the host list, the token store and the connection pool.
pub struct ApiClient {
    http: reqwest::Client,
    hosts: HostList,
    tokens: Arc<dyn TokenStore>,
    options: ClientOptions,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("hosts", &self.hosts)
            .field("tokens", &"<token store>")
            .field("options", &self.options)
            .finish()
    }
}

impl ApiClient {
    /// Creates a client over `hosts` with an in-memory token store.
    pub fn new(hosts: HostList) -> Self {
        Self {
            http: reqwest::Client::new(),
            hosts,
            tokens: Arc::new(MemoryTokenStore::new()),
            options: ClientOptions::default(),
        }
    }

    /// Creates a client from the environment.
    ///
    /// Reads `ESTATE_API_HOSTS` (comma-separated base URLs) and the optional
    /// overrides documented on [`ClientOptions::from_env`].
    ///
    /// **Not available on `wasm32` targets.**
    ///
    /// # Example
    ///
    /// ```no_run
    /// use estate_client::ApiClient;
    ///
    /// let api = ApiClient::from_env().expect("missing ESTATE_API_HOSTS");
    /// ```
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Result<Self> {
        let hosts = HostList::from_env()?;
        let options = ClientOptions::from_env()?;
        Ok(Self::new(hosts).with_options(options))
    }

    /// Applies client options such as timeouts and retry budget.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    /// Replaces the token store.
    pub fn with_token_store(self, store: impl TokenStore + 'static) -> Self {
        self.with_shared_token_store(Arc::new(store))
    }

    /// Replaces the token store with one shared with other owners.
    pub fn with_shared_token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.tokens = store;
        self
    }

    /// Replaces the underlying `reqwest` client.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn hosts(&self) -> &HostList {
        &self.hosts
    }

    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// Base URL every call starts from.
    pub fn current_host(&self) -> &str {
        self.hosts.current()
    }

    /// Moves to the next configured host (wrapping) and returns it.
    pub fn switch_to_next_host(&self) -> &str {
        let host = self.hosts.advance();
        #[cfg(feature = "tracing")]
        tracing::info!(host, "switched API host");
        host
    }

    /// Makes the host at `index` current. Returns `false` if out of range.
    pub fn select_host(&self, index: usize) -> bool {
        self.hosts.select(index)
    }

    /// Sends a body-less request.
    pub async fn call(&self, method: Method, endpoint: &str) -> Result<JsonValue> {
        self.send(ApiRequest::new(method, endpoint)).await
    }

    /// Sends `request` and deserializes the JSON response into `T`.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let value = self.send(request).await?;
        serde_json::from_value(value)
            .map_err(|err| ApiError::MalformedResponse(format!("unexpected response shape: {err}")))
    }

    /// Sends `request`, retrying on the current host and then falling back
    /// to the other configured hosts.
    ///
    /// The current host gets up to [`ClientOptions::max_attempts`] attempts.
    /// Every other host gets one attempt, in list order; the first one that
    /// succeeds becomes the current host.
    pub async fn send(&self, request: ApiRequest) -> Result<JsonValue> {
        let token = self.resolve_token();
        let headers = self.build_headers(token.as_deref(), &request.headers)?;
        let timeout = request
            .timeout
            .unwrap_or(Duration::from_millis(self.options.timeout_ms));

        let primary = self.hosts.current_index();
        let mut last_error = match self
            .send_with_retry(
                self.hosts.host(primary),
                &request,
                &headers,
                timeout,
                self.options.max_attempts,
            )
            .await
        {
            Ok(body) => return Ok(body),
            Err(err) if err.aborts_call() => return Err(err),
            Err(err) => err,
        };
        let mut hosts_tried = 1;

        for index in self.hosts.fallback_order(primary) {
            let host = self.hosts.host(index);
            hosts_tried += 1;

            #[cfg(feature = "tracing")]
            tracing::warn!(host, error = %last_error, "falling back to alternate API host");

            match self
                .send_with_retry(host, &request, &headers, timeout, 1)
                .await
            {
                Ok(body) => {
                    self.hosts.select(index);
                    #[cfg(feature = "tracing")]
                    tracing::info!(host, "promoted fallback API host");
                    return Ok(body);
                }
                Err(err) if err.aborts_call() => return Err(err),
                Err(err) => last_error = err,
            }
        }

        Err(ApiError::AllHostsExhausted {
            hosts_tried,
            last_message: last_error.to_string(),
            last_error: Some(Box::new(last_error)),
        })
    }

    /// Checks the current host. Never fails: every problem becomes an
    /// unhealthy or unreachable [`HealthStatus`].
    pub async fn health_check(&self) -> HealthStatus {
        let timeout = Duration::from_millis(self.options.health_timeout_ms);
        self.check_host(self.hosts.current(), timeout).await.0
    }

    /// Health-checks every configured host in order and makes the first healthy one
    /// current. Returns its base URL.
    pub async fn discover_host(&self) -> Result<String> {
        let timeout = Duration::from_millis(self.options.discovery_timeout_ms);
        let mut last_message = String::new();
        let mut last_error = None;

        for index in 0..self.hosts.len() {
            let host = self.hosts.host(index);
            let (status, cause) = self.check_host(host, timeout).await;
            if status.is_healthy() {
                self.hosts.select(index);
                #[cfg(feature = "tracing")]
                tracing::info!(host, "discovered healthy API host");
                return Ok(host.to_owned());
            }
            last_message = status.error().unwrap_or_default().to_owned();
            last_error = cause.map(Box::new);
        }

        Err(ApiError::AllHostsExhausted {
            hosts_tried: self.hosts.len(),
            last_message,
            last_error,
        })
    }

    async fn send_with_retry(
        &self,
        host: &str,
        request: &ApiRequest,
        headers: &HeaderMap,
        timeout: Duration,
        max_attempts: usize,
    ) -> Result<JsonValue> {
        let max_attempts = max_attempts.max(1);
        let mut attempt = 1usize;
        loop {
            match self.send_once(host, request, headers, timeout).await {
                Ok(body) => return Ok(body),
                Err(err) => {
                    if err.is_retryable() && attempt < max_attempts {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(host, attempt, max_attempts, error = %err, "API attempt failed");
                        self.wait_before_retry(attempt).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }

    async fn send_once(
        &self,
        host: &str,
        request: &ApiRequest,
        headers: &HeaderMap,
        timeout: Duration,
    ) -> Result<JsonValue> {
        let url = request.url(host);

        // On WASM, reqwest uses AbortController for timeout; the `.timeout()`
        // method is available on both targets.
        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .headers(headers.clone())
            .timeout(timeout);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| transport_error(err, timeout))?;
        let status = response.status();
        let body = read_json_body(response, &url, timeout).await?;

        if status.is_success() {
            return Ok(body);
        }
        Err(self.classify_status(status, &request.endpoint, &body))
    }

    fn classify_status(&self, status: StatusCode, endpoint: &str, body: &JsonValue) -> ApiError {
        let message = server_message(body);
        match status {
            StatusCode::UNAUTHORIZED => {
                self.clear_token();
                ApiError::Authentication(
                    message.unwrap_or_else(|| "invalid or expired token".to_owned()),
                )
            }
            StatusCode::NOT_FOUND => ApiError::NotFound {
                endpoint: endpoint.to_owned(),
            },
            StatusCode::INTERNAL_SERVER_ERROR => {
                ApiError::ServerInternal(message.unwrap_or_else(|| "HTTP 500".to_owned()))
            }
            other => ApiError::Http {
                status: other.as_u16(),
                message: message.unwrap_or_else(|| format!("HTTP {}", other.as_u16())),
            },
        }
    }

    /// Health check against `host`. The second value is the underlying
    /// failure for anything but a healthy answer.
    async fn check_host(&self, host: &str, timeout: Duration) -> (HealthStatus, Option<ApiError>) {
        let unreachable_status = |err: ApiError| {
            (
                HealthStatus::Unreachable {
                    host: host.to_owned(),
                    error: err.to_string(),
                },
                Some(err),
            )
        };

        let headers = match self.build_headers(None, &[]) {
            Ok(headers) => headers,
            Err(err) => return unreachable_status(err),
        };
        let request = ApiRequest::get(self.options.health_path.as_str());
        let url = request.url(host);
        let response = self
            .http
            .get(&url)
            .headers(headers)
            .timeout(timeout)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(err) => return unreachable_status(transport_error(err, timeout)),
        };

        let status = response.status();
        let unhealthy_status = |err: ApiError| {
            (
                HealthStatus::Unhealthy {
                    host: host.to_owned(),
                    status: status.as_u16(),
                    error: err.to_string(),
                },
                Some(err),
            )
        };

        match read_json_body(response, &url, timeout).await {
            Ok(payload) if status.is_success() => (
                HealthStatus::Healthy {
                    host: host.to_owned(),
                    status: status.as_u16(),
                    payload,
                },
                None,
            ),
            Ok(payload) => unhealthy_status(ApiError::Http {
                status: status.as_u16(),
                message: server_message(&payload)
                    .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
            }),
            Err(err @ ApiError::MalformedResponse(_)) => unhealthy_status(err),
            Err(err) => unreachable_status(err),
        }
    }

    fn build_headers(&self, token: Option<&str>, overrides: &[(String, String)]) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_str(&self.options.user_agent)
                .map_err(|err| ApiError::Config(format!("invalid user agent: {err}")))?,
        );

        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|err| ApiError::Encode(format!("invalid auth token: {err}")))?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }

        for (name, value) in overrides {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| ApiError::Encode(format!("invalid header name '{name}': {err}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|err| ApiError::Encode(format!("invalid value for header '{name}': {err}")))?;
            headers.insert(name, value);
        }

        Ok(headers)
    }

    /// Best-effort token lookup; an unreadable store counts as signed out.
    fn resolve_token(&self) -> Option<String> {
        match self.tokens.load_token() {
            Ok(token) => token,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_err, "ignoring unreadable auth token");
                None
            }
        }
    }

    fn clear_token(&self) {
        #[cfg(feature = "tracing")]
        tracing::warn!("authentication rejected; removing stored user record");

        if let Err(_err) = self.tokens.remove_user() {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_err, "failed to remove stored user record");
        }
    }

    /// Waits `attempt * retry_backoff_ms` before the next retry attempt.
    async fn wait_before_retry(&self, attempt: usize) {
        let delay = self.options.backoff_for_attempt(attempt);

        #[cfg(feature = "tracing")]
        tracing::debug!("retrying API request after {} ms", delay.as_millis());

        sleep(delay).await;
    }
}

/// `setTimeout`-backed sleep for `wasm32`, where tokio timers do not exist.
///
/// Looks `setTimeout` up on the JS global object so it works in windows,
/// workers and edge runtimes alike. Without one the wait resolves at once.
#[cfg(target_arch = "wasm32")]
async fn sleep(delay: Duration) {
    use wasm_bindgen::{JsCast, JsValue};

    let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        let global = js_sys::global();
        let set_timeout = js_sys::Reflect::get(&global, &JsValue::from_str("setTimeout"))
            .ok()
            .and_then(|value| value.dyn_into::<js_sys::Function>().ok());
        let scheduled = set_timeout
            .map(|set_timeout| set_timeout.call2(&global, &resolve, &JsValue::from(millis)).is_ok())
            .unwrap_or(false);
        if !scheduled {
            let _ = resolve.call0(&JsValue::UNDEFINED);
        }
    });
    let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
}

fn transport_error(err: reqwest::Error, timeout: Duration) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    } else {
        ApiError::Transport(err)
    }
}

/// Reads the body as JSON. HTML pages and unparseable bodies are
/// [`ApiError::MalformedResponse`]; an empty body is `{}`.
async fn read_json_body(response: Response, url: &str, timeout: Duration) -> Result<JsonValue> {
    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.to_ascii_lowercase().contains("text/html"));
    if is_html {
        return Err(ApiError::MalformedResponse(format!(
            "{url} returned an HTML page instead of JSON"
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|err| transport_error(err, timeout))?;
    parse_json_body(&body, url)
}

fn parse_json_body(body: &str, url: &str) -> Result<JsonValue> {
    if body.trim().is_empty() {
        return Ok(JsonValue::Object(Default::default()));
    }
    serde_json::from_str(body).map_err(|err| {
        ApiError::MalformedResponse(format!("invalid JSON from {url}: {err}"))
    })
}

#[cfg(test)]
mod tests {
    use reqwest::header;
    use serde_json::json;

    use super::{parse_json_body, ApiClient};
    use crate::{ApiError, HostList, MemoryTokenStore};

    fn client() -> ApiClient {
        ApiClient::new(HostList::new(["http://a", "http://b"]).expect("valid hosts"))
    }

    #[test]
    fn empty_body_parses_as_object() {
        assert_eq!(parse_json_body("  ", "u").expect("must parse"), json!({}));
    }

    #[test]
    fn invalid_body_is_malformed() {
        let err = parse_json_body("<!DOCTYPE html>", "u").expect_err("must fail");
        assert!(matches!(err, ApiError::MalformedResponse(_)));
    }

    #[test]
    fn headers_include_defaults_and_bearer() {
        let headers = client()
            .build_headers(Some("abc"), &[])
            .expect("headers must build");
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(headers[header::ACCEPT], "application/json");
        assert_eq!(headers[header::AUTHORIZATION], "Bearer abc");
        assert!(headers[header::AUTHORIZATION].is_sensitive());
        assert!(headers.contains_key(header::USER_AGENT));
    }

    #[test]
    fn headers_omit_bearer_without_token() {
        let headers = client().build_headers(None, &[]).expect("headers must build");
        assert!(!headers.contains_key(header::AUTHORIZATION));
    }

    #[test]
    fn caller_overrides_win_case_insensitively() {
        let overrides = vec![
            ("content-type".to_owned(), "text/plain".to_owned()),
            ("X-Listing-Source".to_owned(), "mobile".to_owned()),
        ];
        let headers = client()
            .build_headers(Some("abc"), &overrides)
            .expect("headers must build");
        assert_eq!(headers[header::CONTENT_TYPE], "text/plain");
        assert_eq!(headers["x-listing-source"], "mobile");
        assert_eq!(headers.get_all(header::CONTENT_TYPE).iter().count(), 1);
    }

    #[test]
    fn invalid_override_is_encode_error() {
        let overrides = vec![("bad header".to_owned(), "x".to_owned())];
        let err = client()
            .build_headers(None, &overrides)
            .expect_err("must reject header name");
        assert!(matches!(err, ApiError::Encode(_)));
    }

    #[test]
    fn unreadable_token_store_counts_as_signed_out() {
        let api = client().with_token_store(MemoryTokenStore::with_user("{not json"));
        assert_eq!(api.resolve_token(), None);
    }

    #[test]
    fn debug_hides_token_store() {
        let api = client().with_token_store(MemoryTokenStore::with_user(r#"{"token":"secret"}"#));
        let debug = format!("{api:?}");
        assert!(debug.contains("<token store>"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn switch_and_select_move_current_host() {
        let api = client();
        assert_eq!(api.current_host(), "http://a");
        assert_eq!(api.switch_to_next_host(), "http://b");
        assert!(api.select_host(0));
        assert_eq!(api.current_host(), "http://a");
        assert!(!api.select_host(5));
    }
}
