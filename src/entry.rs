//! Cache payload types.
//!
//! A [`CachedResponse`] is the immutable body+headers pair stored behind a
//! cache key. [`CacheValue`] wraps it together with the key so that an
//! ordering node ([`crate::list::OrderedKeyStore`]) can recover the map key
//! it corresponds to when it is evicted or busted — the map holds
//! `key -> NodeId`, and the list holds `NodeId -> CacheValue`, so eviction at
//! the LRU end needs the key back out of the node to remove the map entry.

use std::collections::HashMap;

/// Case-insensitive header name/value pairs plus the response body.
///
/// Immutable once constructed: the cache never mutates a stored payload,
/// only the ordering position of the node that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl CachedResponse {
    /// Builds a response from a header iterator and a body. Header names are
    /// lowercased so lookups are case-insensitive.
    pub fn new<I>(headers: I, body: Vec<u8>) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let headers = headers
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();
        CachedResponse { headers, body }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Byte cost of this entry under byte-budget capacity: body length plus
    /// the length of every header name and value.
    pub fn byte_size(&self) -> u64 {
        let headers_size: usize = self
            .headers
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum();
        (self.body.len() + headers_size) as u64
    }
}

/// A cache entry as stored in the ordering list: the key it was inserted
/// under, alongside its payload. Needed because eviction walks the list by
/// position, not by key.
#[derive(Debug, Clone)]
pub struct CacheValue {
    pub key: String,
    pub response: CachedResponse,
}

impl CacheValue {
    pub fn new(key: String, response: CachedResponse) -> Self {
        CacheValue { key, response }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let resp = CachedResponse::new(
            vec![("Content-Type".to_string(), "application/json".to_string())],
            b"{}".to_vec(),
        );
        assert_eq!(resp.header("content-type"), Some("application/json"));
        assert_eq!(resp.header("CONTENT-TYPE"), Some("application/json"));
    }

    #[test]
    fn byte_size_counts_body_and_headers() {
        let resp = CachedResponse::new(
            vec![("x".to_string(), "yz".to_string())],
            b"abc".to_vec(),
        );
        // "x" (1) + "yz" (2) + body "abc" (3) = 6
        assert_eq!(resp.byte_size(), 6);
    }

    #[test]
    fn empty_response_has_zero_size() {
        let resp = CachedResponse::new(Vec::new(), Vec::new());
        assert_eq!(resp.byte_size(), 0);
    }
}
