use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Base address of a backend service, e.g. `http://orders:5001`.
///
/// The base URL is the endpoint's identity. Trailing slashes are stripped so
/// that paths can be appended with `join`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceEndpoint(String);

impl ServiceEndpoint {
    /// Creates an endpoint from a base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self(base_url.trim().trim_end_matches('/').to_string())
    }

    /// Parses a comma-separated list of base URLs, skipping empty entries.
    ///
    /// Order is preserved; it is the order health reports are returned in.
    pub fn parse_list(list: &str) -> Vec<Self> {
        list.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(Self::new)
            .collect()
    }

    /// Returns the base URL.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the base URL with `path` appended.
    pub fn join(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.0, path)
        } else {
            format!("{}/{}", self.0, path)
        }
    }
}

impl std::fmt::Display for ServiceEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ServiceEndpoint {
    fn from(base_url: &str) -> Self {
        Self::new(base_url)
    }
}

impl From<String> for ServiceEndpoint {
    fn from(base_url: String) -> Self {
        Self::new(base_url)
    }
}

/// An order as committed by the orders service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: u64,
    pub product: String,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}
