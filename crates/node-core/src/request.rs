//! The ready-to-dispatch request shape produced by the routing resolver.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::NodeError;

/// HTTP method of a request template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully-resolved HTTP request.
///
/// Built fresh for every node execution and never mutated afterwards: the
/// credential injector and redaction produce new copies. Query parameters and
/// headers keep insertion order, so two descriptors built from the same inputs
/// are identical field for field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestDescriptor {
    method: HttpMethod,
    url: String,
    query: IndexMap<String, String>,
    headers: IndexMap<String, String>,
}

impl RequestDescriptor {
    pub(crate) fn new(
        method: HttpMethod,
        url: String,
        query: IndexMap<String, String>,
        headers: IndexMap<String, String>,
    ) -> Self {
        Self {
            method,
            url,
            query,
            headers,
        }
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Base URL joined with the resolved path, without the query string.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Path component of [`Self::url`] (e.g. `/planetary/apod`).
    pub fn path(&self) -> &str {
        let after_scheme = self
            .url
            .split_once("://")
            .map_or(self.url.as_str(), |(_, rest)| rest);
        after_scheme.find('/').map_or("/", |i| &after_scheme[i..])
    }

    pub fn query(&self) -> &IndexMap<String, String> {
        &self.query
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn headers(&self) -> &IndexMap<String, String> {
        &self.headers
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a copy with `name` set to `value`.
    ///
    /// Any existing parameter with that name is removed first, so the new
    /// entry is present exactly once and comes last.
    #[must_use]
    pub fn with_query_param(&self, name: &str, value: &str) -> Self {
        let mut next = self.clone();
        next.query.shift_remove(name);
        next.query.insert(name.to_owned(), value.to_owned());
        next
    }

    /// Returns a copy with the value of `name` masked, for display.
    #[must_use]
    pub fn redacted(&self, name: &str) -> Self {
        let mut next = self.clone();
        if let Some(value) = next.query.get_mut(name) {
            *value = "***".to_owned();
        }
        next
    }

    /// Assembles the final URL including the encoded query string.
    pub fn to_url(&self) -> Result<Url, NodeError> {
        let mut url = Url::parse(&self.url).map_err(|e| NodeError::ConfigurationError {
            message: format!("invalid request URL '{}': {e}", self.url),
        })?;
        if !self.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(self.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }
}

impl std::fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_url() {
            Ok(url) => write!(f, "{} {}", self.method, url),
            Err(_) => write!(f, "{} {}", self.method, self.url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> RequestDescriptor {
        let mut query = IndexMap::new();
        query.insert("api_key".to_owned(), "stale".to_owned());
        query.insert("date".to_owned(), "2024-01-02".to_owned());
        RequestDescriptor::new(
            HttpMethod::Get,
            "https://api.nasa.gov/planetary/apod".to_owned(),
            query,
            IndexMap::new(),
        )
    }

    #[test]
    fn test_with_query_param_replaces_and_moves_to_end() {
        let original = descriptor();
        let updated = original.with_query_param("api_key", "fresh");

        let keys: Vec<&str> = updated.query().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["date", "api_key"]);
        assert_eq!(updated.query_param("api_key"), Some("fresh"));
        // The original is untouched.
        assert_eq!(original.query_param("api_key"), Some("stale"));
    }

    #[test]
    fn test_path_and_url() {
        let d = descriptor();
        assert_eq!(d.path(), "/planetary/apod");
        assert_eq!(
            d.to_url().unwrap().as_str(),
            "https://api.nasa.gov/planetary/apod?api_key=stale&date=2024-01-02"
        );
    }

    #[test]
    fn test_redacted_masks_only_named_param() {
        let d = descriptor().redacted("api_key");
        assert_eq!(d.query_param("api_key"), Some("***"));
        assert_eq!(d.query_param("date"), Some("2024-01-02"));
        assert!(!d.to_string().contains("stale"));
    }
}
