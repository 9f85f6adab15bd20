use serde::{Deserialize, Serialize};

/// Outcome of [`ApiClient::health_check`](crate::ApiClient::health_check).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum HealthStatus {
    /// The host answered with a success status.
    Healthy {
        host: String,
        status: u16,
        payload: serde_json::Value,
    },
    /// The host answered, but not with a success status.
    Unhealthy {
        host: String,
        status: u16,
        error: String,
    },
    /// The request never got an answer (transport error or timeout).
    Unreachable { host: String, error: String },
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy { .. })
    }

    pub fn host(&self) -> &str {
        match self {
            Self::Healthy { host, .. }
            | Self::Unhealthy { host, .. }
            | Self::Unreachable { host, .. } => host,
        }
    }

    /// Error description for unhealthy and unreachable hosts.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Healthy { .. } => None,
            Self::Unhealthy { error, .. } | Self::Unreachable { error, .. } => Some(error),
        }
    }
}

/// Filters accepted by `/listing/get`. Unset fields are not sent; the
/// serde field names are the query-string keys.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingQuery {
    pub search_term: Option<String>,
    /// `rent`, `sale` or `all`.
    #[serde(rename = "type")]
    pub listing_type: Option<String>,
    pub offer: Option<bool>,
    pub parking: Option<bool>,
    pub furnished: Option<bool>,
    /// Field to sort by, e.g. `createdAt` or `regularPrice`.
    pub sort: Option<String>,
    /// `asc` or `desc`.
    pub order: Option<String>,
    pub limit: Option<u32>,
    pub start_index: Option<u32>,
}

impl ListingQuery {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search_term = Some(term.into());
        self
    }

    #[must_use]
    pub fn listing_type(mut self, kind: impl Into<String>) -> Self {
        self.listing_type = Some(kind.into());
        self
    }

    #[must_use]
    pub fn offer(mut self, offer: bool) -> Self {
        self.offer = Some(offer);
        self
    }

    #[must_use]
    pub fn sort(mut self, field: impl Into<String>, order: impl Into<String>) -> Self {
        self.sort = Some(field.into());
        self.order = Some(order.into());
        self
    }

    #[must_use]
    pub fn page(mut self, start_index: u32, limit: u32) -> Self {
        self.start_index = Some(start_index);
        self.limit = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{HealthStatus, ListingQuery};

    #[test]
    fn empty_query_serializes_without_fields() {
        let value = serde_json::to_value(ListingQuery::new()).expect("must serialize");
        assert_eq!(value, json!({}));
    }

    #[test]
    fn query_uses_backend_field_names() {
        let query = ListingQuery::new()
            .search("loft")
            .listing_type("rent")
            .offer(true)
            .sort("regularPrice", "asc")
            .page(9, 9);

        let value = serde_json::to_value(&query).expect("must serialize");
        assert_eq!(
            value,
            json!({
                "searchTerm": "loft",
                "type": "rent",
                "offer": true,
                "sort": "regularPrice",
                "order": "asc",
                "limit": 9,
                "startIndex": 9
            })
        );

        let back: ListingQuery = serde_json::from_value(value).expect("must deserialize");
        assert_eq!(back, query);
    }

    #[test]
    fn health_status_accessors() {
        let healthy = HealthStatus::Healthy {
            host: "h".to_owned(),
            status: 200,
            payload: json!({"ok": true}),
        };
        assert!(healthy.is_healthy());
        assert_eq!(healthy.error(), None);

        let down = HealthStatus::Unreachable {
            host: "h".to_owned(),
            error: "connection refused".to_owned(),
        };
        assert!(!down.is_healthy());
        assert_eq!(down.host(), "h");
        assert_eq!(down.error(), Some("connection refused"));
    }

    #[test]
    fn health_status_serializes_with_state_tag() {
        let value = serde_json::to_value(HealthStatus::Unhealthy {
            host: "h".to_owned(),
            status: 503,
            error: "HTTP 503".to_owned(),
        })
        .expect("must serialize");
        assert_eq!(value["state"], "unhealthy");
        assert_eq!(value["status"], 503);
    }
}
