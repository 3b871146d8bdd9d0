//! Core data model.
//!
//! A work item is one request the crawler still has to make: a target URL,
//! how to fetch it, and which handler should see the response. The queue
//! treats it as opaque; only the codec looks inside.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Work Item
// ---------------------------------------------------------------------------

/// A unit of crawl work flowing through the frontier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Target resource.
    pub url: String,

    /// HTTP method, upper-case (e.g. "GET").
    pub method: String,

    pub headers: BTreeMap<String, String>,

    /// Request body, if any.
    pub body: Option<Vec<u8>>,

    /// Ordering weight. Higher = more urgent. Only the priority queue reads it.
    pub priority: i32,

    /// Name of the handler that should process the response.
    /// Opaque to the frontier.
    pub callback: Option<String>,

    /// Name of the handler to invoke if the fetch fails.
    pub errback: Option<String>,

    #[serde(default)]
    pub cookies: BTreeMap<String, String>,

    /// Free-form metadata carried alongside the request.
    #[serde(default)]
    pub meta: serde_json::Map<String, serde_json::Value>,

    /// Character encoding of the body.
    pub encoding: String,

    /// Skip the membership filter when submitting this item.
    #[serde(default)]
    pub dont_filter: bool,

    #[serde(default)]
    pub flags: Vec<String>,
}

impl WorkItem {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            headers: BTreeMap::new(),
            body: None,
            priority: 0,
            callback: None,
            errback: None,
            cookies: BTreeMap::new(),
            meta: serde_json::Map::new(),
            encoding: "utf-8".to_string(),
            dont_filter: false,
            flags: Vec::new(),
        }
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into().to_ascii_uppercase();
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn callback(mut self, callback: impl Into<String>) -> Self {
        self.callback = Some(callback.into());
        self
    }

    pub fn errback(mut self, errback: impl Into<String>) -> Self {
        self.errback = Some(errback.into());
        self
    }

    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    pub fn dont_filter(mut self, dont_filter: bool) -> Self {
        self.dont_filter = dont_filter;
        self
    }

    pub fn flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    /// Dedup identity of this item: its normalized URL.
    ///
    /// Scheme and host are lower-cased, default ports dropped and the
    /// fragment removed. A URL that does not parse is used verbatim.
    pub fn fingerprint(&self) -> String {
        normalize_url(&self.url)
    }
}

/// Normalize a URL for dedup purposes. See [`WorkItem::fingerprint`].
pub fn normalize_url(raw: &str) -> String {
    match url::Url::parse(raw.trim()) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.into()
        }
        Err(_) => raw.to_string(),
    }
}
