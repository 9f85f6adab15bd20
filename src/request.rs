use std::time::Duration;

use reqwest::Method;
use serde::Serialize;

use crate::{ApiError, Result};

/// One logical API call: method, endpoint, and optional body, query,
/// header overrides and timeout.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Endpoint path appended to the base host, e.g. `/listing/get`.
    pub endpoint: String,
    /// JSON body.
    pub body: Option<serde_json::Value>,
    /// Query-string pairs, sent in insertion order.
    pub query: Vec<(String, String)>,
    /// Header overrides; these replace defaults with the same name.
    pub headers: Vec<(String, String)>,
    /// Per-attempt timeout replacing [`ClientOptions::timeout_ms`](crate::ClientOptions::timeout_ms).
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            body: None,
            query: Vec::new(),
            headers: Vec::new(),
            timeout: None,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::POST, endpoint)
    }

    pub fn put(endpoint: impl Into<String>) -> Self {
        Self::new(Method::PUT, endpoint)
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::DELETE, endpoint)
    }

    /// Sets a JSON body.
    #[must_use]
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serializes `body` as the JSON body.
    pub fn json_from<T: Serialize>(self, body: &T) -> Result<Self> {
        let value =
            serde_json::to_value(body).map_err(|err| ApiError::Encode(err.to_string()))?;
        Ok(self.json(value))
    }

    /// Appends a query-string pair.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Appends every field of `query` as a query-string pair, using its
    /// serde field names. `None` fields are skipped; nested arrays or
    /// objects are rejected.
    pub fn query_from<T: Serialize>(mut self, query: &T) -> Result<Self> {
        let value =
            serde_json::to_value(query).map_err(|err| ApiError::Encode(err.to_string()))?;
        let serde_json::Value::Object(fields) = value else {
            return Err(ApiError::Encode(
                "query parameters must serialize to an object".to_owned(),
            ));
        };

        for (key, value) in fields {
            let value = match value {
                serde_json::Value::Null => continue,
                serde_json::Value::String(text) => text,
                serde_json::Value::Bool(flag) => flag.to_string(),
                serde_json::Value::Number(number) => number.to_string(),
                serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                    return Err(ApiError::Encode(format!(
                        "query parameter '{key}' must be a scalar"
                    )))
                }
            };
            self.query.push((key, value));
        }
        Ok(self)
    }

    /// Adds a header override.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Overrides the per-attempt timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Full URL of this request against `base`.
    pub(crate) fn url(&self, base: &str) -> String {
        let base = base.trim_end_matches('/');
        let endpoint = self.endpoint.trim_start_matches('/');
        format!("{base}/{endpoint}")
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::Method;
    use serde_json::json;

    use super::ApiRequest;

    #[test]
    fn builder_collects_parts() {
        let request = ApiRequest::post("/listing/create")
            .json(json!({"name": "Loft"}))
            .query("draft", "true")
            .header("X-Trace", "1")
            .timeout(Duration::from_secs(2));

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.endpoint, "/listing/create");
        assert_eq!(request.body, Some(json!({"name": "Loft"})));
        assert_eq!(request.query, vec![("draft".to_owned(), "true".to_owned())]);
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.timeout, Some(Duration::from_secs(2)));
    }

    #[test]
    fn query_from_uses_serde_names_and_skips_none() {
        #[derive(serde::Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Filters {
            search_term: Option<String>,
            offer: Option<bool>,
            start_index: Option<u32>,
        }

        let request = ApiRequest::get("/listing/get")
            .query_from(&Filters {
                search_term: Some("loft".to_owned()),
                offer: None,
                start_index: Some(9),
            })
            .expect("scalar filters must encode");

        assert_eq!(
            request.query,
            vec![
                ("searchTerm".to_owned(), "loft".to_owned()),
                ("startIndex".to_owned(), "9".to_owned()),
            ]
        );
    }

    #[test]
    fn query_from_rejects_nested_values() {
        let err = ApiRequest::get("/listing/get")
            .query_from(&json!({"tags": ["a", "b"]}))
            .expect_err("arrays are not query scalars");
        assert!(matches!(err, crate::ApiError::Encode(_)));

        let err = ApiRequest::get("/listing/get")
            .query_from(&"loft")
            .expect_err("a bare string is not a query object");
        assert!(matches!(err, crate::ApiError::Encode(_)));
    }

    #[test]
    fn url_joins_without_double_slash() {
        let request = ApiRequest::get("/listing/get");
        assert_eq!(
            request.url("http://host:3000/api/"),
            "http://host:3000/api/listing/get"
        );
        assert_eq!(
            ApiRequest::get("auth/signout").url("http://host"),
            "http://host/auth/signout"
        );
    }
}
