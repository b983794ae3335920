//! Pattern Matcher (C3): route-parameter hydration and regex-based key
//! matching, grounded on the source's `hydrateParams`/`Match` pair.

use std::collections::HashSet;

use regex::Regex;
use tracing::warn;

/// Replaces every literal `:name` occurrence in `template` with its value
/// from `params`, for each `(name, value)` pair. Non-literal regex
/// sub-expressions that happen to start with `:` are left untouched because
/// no parameter name is empty, so `:[a-zA-Z]+` never matches a `:name` run.
fn hydrate_one(template: &str, params: &[(String, String)]) -> String {
    let mut out = template.to_string();
    for (name, value) in params {
        let marker = format!(":{name}");
        out = out.replace(&marker, value);
    }
    out
}

/// Hydrates every template in `templates` against `params`. Returns a fresh
/// `Vec`; the input is never mutated.
pub fn hydrate(templates: &[String], params: &[(String, String)]) -> Vec<String> {
    templates.iter().map(|t| hydrate_one(t, params)).collect()
}

/// Computes the set of `keys` matched by at least one of `patterns` (after
/// hydration). An empty `patterns` list is the "match everything"
/// convention; a pattern that hydrates to the empty string is skipped, not
/// treated as universal — only an originally empty list is universal.
/// Templates that fail to compile as regexes are skipped with a warning.
pub fn match_keys<'k>(
    patterns: &[String],
    params: &[(String, String)],
    keys: impl IntoIterator<Item = &'k str>,
) -> HashSet<String> {
    let keys: Vec<&str> = keys.into_iter().collect();

    if patterns.is_empty() {
        return keys.iter().map(|k| k.to_string()).collect();
    }

    let hydrated = hydrate(patterns, params);
    let mut compiled = Vec::with_capacity(hydrated.len());
    for template in &hydrated {
        if template.is_empty() {
            continue;
        }
        match Regex::new(template) {
            Ok(re) => compiled.push(re),
            Err(err) => warn!(pattern = %template, error = %err, "invalid bust/match pattern, skipping"),
        }
    }

    let mut matched = HashSet::new();
    for key in keys {
        if compiled.iter().any(|re| re.is_match(key)) {
            matched.insert(key.to_string());
        }
    }
    matched
}
