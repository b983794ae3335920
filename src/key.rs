//! Key Builder (C4): the canonical cache key is `METHOD":"REQUEST_TARGET`.

/// Builds a cache key from an uppercase method name and the request target
/// (path plus raw query, exactly as received). Keys are byte-identical
/// across the cache and config-level bust/cache patterns, so a pattern can
/// anchor on `^GET:/posts` to target only `GET` entries under `/posts`.
pub fn build_key(method: &str, request_target: &str) -> String {
    format!("{}:{}", method.to_ascii_uppercase(), request_target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uppercases_method() {
        assert_eq!(build_key("get", "/posts"), "GET:/posts");
    }

    #[test]
    fn preserves_query_string() {
        assert_eq!(
            build_key("GET", "/posts?page=2"),
            "GET:/posts?page=2"
        );
    }

    #[test]
    fn distinct_methods_are_distinct_keys() {
        assert_ne!(build_key("GET", "/posts"), build_key("HEAD", "/posts"));
    }
}
