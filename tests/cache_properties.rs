//! Property-based tests over arbitrary sequences of cache operations,
//! checking the invariants every operation must preserve regardless of
//! history.

use std::collections::HashSet;

use cachegate::cache::Cache;
use cachegate::capacity::Capacity;
use cachegate::entry::CachedResponse;
use proptest::prelude::*;

const KEYS: &[&str] = &["GET:/a", "GET:/b", "GET:/c", "GET:/d"];

#[derive(Debug, Clone)]
enum Op {
    Set(usize),
    Get(usize),
    Bust(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..KEYS.len()).prop_map(Op::Set),
        (0..KEYS.len()).prop_map(Op::Get),
        (0..KEYS.len()).prop_map(Op::Bust),
    ]
}

proptest! {
    /// size() always equals the number of currently-live keys, and never
    /// exceeds capacity in entry mode — invariants 5 and 6.
    #[test]
    fn size_matches_key_count_and_respects_capacity(ops in prop::collection::vec(op_strategy(), 0..200)) {
        let cache = Cache::new(Capacity::Entries(2)).unwrap();
        for op in ops {
            match op {
                Op::Set(i) => cache.set(KEYS[i].to_string(), CachedResponse::new(Vec::new(), vec![i as u8])),
                Op::Get(i) => { cache.get(KEYS[i]); }
                Op::Bust(i) => cache.bust([KEYS[i]]),
            }
            let size = cache.size();
            prop_assert_eq!(size, cache.keys().len() as u64);
            prop_assert!(size <= 2);
        }
    }

    /// A busted key is absent until set again; busting never touches other keys.
    #[test]
    fn bust_removes_only_named_keys(ops in prop::collection::vec(op_strategy(), 0..100), bust_idx in 0..KEYS.len()) {
        let cache = Cache::new(Capacity::Entries(KEYS.len() as u64)).unwrap();
        for op in ops {
            match op {
                Op::Set(i) => cache.set(KEYS[i].to_string(), CachedResponse::new(Vec::new(), vec![i as u8])),
                Op::Get(i) => { cache.get(KEYS[i]); }
                Op::Bust(i) => cache.bust([KEYS[i]]),
            }
        }
        let before: HashSet<String> = cache.keys().into_iter().collect();
        cache.bust([KEYS[bust_idx]]);
        prop_assert!(cache.get(KEYS[bust_idx]).is_none());
        let after: HashSet<String> = cache.keys().into_iter().collect();
        let mut expected = before;
        expected.remove(KEYS[bust_idx]);
        prop_assert_eq!(after, expected);
    }
}

#[test]
fn set_then_immediate_get_returns_value_and_promotes() {
    let cache = Cache::new(Capacity::Entries(3)).unwrap();
    cache.set("GET:/a".to_string(), CachedResponse::new(Vec::new(), b"a".to_vec()));
    let got = cache.get("GET:/a").unwrap();
    assert_eq!(got.body(), b"a");
}

#[test]
fn match_empty_pattern_equals_current_key_set() {
    let cache = Cache::new(Capacity::Entries(5)).unwrap();
    cache.set("GET:/a".to_string(), CachedResponse::new(Vec::new(), Vec::new()));
    cache.set("GET:/b".to_string(), CachedResponse::new(Vec::new(), Vec::new()));
    let keys: HashSet<String> = cache.keys().into_iter().collect();
    let matched = cache.match_keys(&[], &[]);
    assert_eq!(matched, keys);
}

#[test]
fn match_is_idempotent_without_mutation() {
    let cache = Cache::new(Capacity::Entries(5)).unwrap();
    cache.set("GET:/posts".to_string(), CachedResponse::new(Vec::new(), Vec::new()));
    let patterns = vec!["^GET:/posts$".to_string()];
    let first = cache.match_keys(&patterns, &[]);
    let second = cache.match_keys(&patterns, &[]);
    assert_eq!(first, second);
}

#[test]
fn hydration_is_idempotent() {
    let templates = vec!["^GET:/posts/:id$".to_string(), "^GET:/posts$".to_string()];
    let params = vec![("id".to_string(), "42".to_string())];
    let once = cachegate::pattern::hydrate(&templates, &params);
    let twice = cachegate::pattern::hydrate(&once, &params);
    assert_eq!(once, twice);
}
