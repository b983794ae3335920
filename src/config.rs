//! Configuration Loader (A1): JSON5 file plus CLI-flag merge, producing a
//! validated [`Config`]. Grounded on the source's `internal/config/config.go`
//! and `validate.go` — same required fields, same route-pattern regex, same
//! trailing-slash stripping on `apiUrl`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use crate::capacity::Capacity;
use crate::cli::Cli;
use crate::error::ConfigError;

const METHODS: &[&str] = &["GET", "HEAD", "POST", "PUT", "DELETE", "PATCH", "TRACE", "CONNECT", "OPTIONS"];
const ROUTE_PATTERN: &str = r"^/[\w\-\._~:/?#\[\]@!\$&'\(\)\*\+,;=.]+$|^\*$";

/// Raw, unvalidated deserialization target for the JSON5 config file. Every
/// field is optional here; CLI flags and defaults fill the gaps, and
/// `Config::validate` enforces required-field rules afterward.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub capacity: Option<u64>,
    #[serde(rename = "capacityUnit")]
    pub capacity_unit: Option<String>,
    pub hostname: Option<String>,
    pub port: Option<u16>,
    #[serde(rename = "apiUrl")]
    pub api_url: Option<String>,
    #[serde(rename = "logFilePath")]
    pub log_file_path: Option<String>,
    pub cache: Option<HashMap<String, Vec<String>>>,
    pub bust: Option<HashMap<String, HashMap<String, Vec<String>>>>,
}

/// A bust route's hydratable regex templates.
pub type BustRoutes = HashMap<String, HashMap<String, Vec<String>>>;

/// The validated, immutable configuration the pipeline runs from.
#[derive(Debug, Clone)]
pub struct Config {
    pub capacity: Capacity,
    pub hostname: String,
    pub port: u16,
    pub api_url: String,
    pub log_file_path: Option<PathBuf>,
    pub cache_routes: HashMap<String, Vec<String>>,
    pub bust_routes: BustRoutes,
}

impl RawConfig {
    fn from_file(path: &Path) -> Result<RawConfig, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        json5::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// CLI flags take precedence over any value already present.
    fn merge_cli(mut self, cli: &Cli) -> RawConfig {
        if let Some(v) = cli.capacity {
            self.capacity = Some(v);
        }
        if let Some(v) = &cli.capacity_unit {
            self.capacity_unit = Some(v.clone());
        }
        if let Some(v) = &cli.hostname {
            self.hostname = Some(v.clone());
        }
        if let Some(v) = cli.port {
            self.port = Some(v);
        }
        if let Some(v) = &cli.api_url {
            self.api_url = Some(v.clone());
        }
        if let Some(v) = &cli.logfile {
            self.log_file_path = Some(v.clone());
        }
        if !cli.cache_get.is_empty() {
            self.cache
                .get_or_insert_with(HashMap::new)
                .entry("GET".to_string())
                .or_default()
                .extend(cli.cache_get.clone());
        }
        if !cli.cache_head.is_empty() {
            self.cache
                .get_or_insert_with(HashMap::new)
                .entry("HEAD".to_string())
                .or_default()
                .extend(cli.cache_head.clone());
        }
        for (method, entries) in &cli.bust() {
            let method_map = self.bust.get_or_insert_with(HashMap::new).entry(method.clone()).or_default();
            for (route, patterns) in entries {
                method_map.entry(route.clone()).or_default().extend(patterns.clone());
            }
        }
        self
    }
}

impl Config {
    /// Loads and validates configuration: JSON5 file (if `--config` given)
    /// merged with CLI overrides, then validated into a [`Config`].
    pub fn load(cli: &Cli) -> Result<Config, ConfigError> {
        let raw = match &cli.config {
            Some(path) => RawConfig::from_file(path)?,
            None => RawConfig::default(),
        };
        let raw = raw.merge_cli(cli);
        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> Result<Config, ConfigError> {
        let capacity_value = raw
            .capacity
            .ok_or_else(|| ConfigError::InvalidConfig("missing required field: capacity".to_string()))?;
        let capacity = Capacity::parse(capacity_value, raw.capacity_unit.as_deref().unwrap_or(""))?;

        let api_url = raw
            .api_url
            .ok_or_else(|| ConfigError::InvalidConfig("missing required field: apiUrl".to_string()))?;
        let api_url = api_url.trim_end_matches('/').to_string();

        let hostname = raw.hostname.unwrap_or_else(|| "localhost".to_string());
        let port = raw.port.unwrap_or(8080);

        let mut cache_routes = raw.cache.unwrap_or_default();
        sanitize_methods(&mut cache_routes, &["GET", "HEAD"]);
        if cache_routes.values().all(|routes| routes.is_empty()) {
            return Err(ConfigError::InvalidConfig(
                "at least one of cache.GET or cache.HEAD must be set".to_string(),
            ));
        }

        let mut bust_routes = raw.bust.unwrap_or_default();
        sanitize_bust_methods(&mut bust_routes);

        let route_re = Regex::new(ROUTE_PATTERN).expect("static route pattern is valid");
        for routes in cache_routes.values() {
            for route in routes {
                validate_route(&route_re, route)?;
            }
        }
        for method_routes in bust_routes.values() {
            for route in method_routes.keys() {
                validate_route(&route_re, route)?;
            }
        }

        let log_file_path = raw
            .log_file_path
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        Ok(Config {
            capacity,
            hostname,
            port,
            api_url,
            log_file_path,
            cache_routes,
            bust_routes,
        })
    }
}

fn validate_route(route_re: &Regex, route: &str) -> Result<(), ConfigError> {
    if route_re.is_match(route) {
        Ok(())
    } else {
        Err(ConfigError::InvalidRoute {
            route: route.to_string(),
            reason: "must start with '/' or be exactly '*'".to_string(),
        })
    }
}

fn sanitize_methods(map: &mut HashMap<String, Vec<String>>, allowed: &[&str]) {
    map.retain(|method, _| {
        let ok = allowed.contains(&method.to_ascii_uppercase().as_str());
        if !ok {
            warn!(method = %method, "dropping invalid cache method key");
        }
        ok
    });
}

fn sanitize_bust_methods(map: &mut BustRoutes) {
    map.retain(|method, _| {
        let ok = METHODS.contains(&method.to_ascii_uppercase().as_str());
        if !ok {
            warn!(method = %method, "dropping invalid bust method key");
        }
        ok
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn base_cli(extra: &[&str]) -> Cli {
        let mut args = vec!["cachegate", "--capacity", "100", "--api-url", "http://origin.test", "--cache:GET", "/posts"];
        args.extend_from_slice(extra);
        Cli::parse_from(args)
    }

    #[test]
    fn minimal_valid_config_loads() {
        let cli = base_cli(&[]);
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.capacity, Capacity::Entries(100));
        assert_eq!(config.api_url, "http://origin.test");
        assert_eq!(config.hostname, "localhost");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn missing_capacity_is_rejected() {
        let cli = Cli::parse_from(["cachegate", "--api-url", "http://origin.test", "--cache:GET", "/posts"]);
        assert!(Config::load(&cli).is_err());
    }

    #[test]
    fn missing_cache_routes_is_rejected() {
        let cli = Cli::parse_from(["cachegate", "--capacity", "10", "--api-url", "http://origin.test"]);
        assert!(Config::load(&cli).is_err());
    }

    #[test]
    fn trailing_slash_stripped_from_api_url() {
        let cli = Cli::parse_from([
            "cachegate",
            "--capacity",
            "10",
            "--api-url",
            "http://origin.test/",
            "--cache:GET",
            "/posts",
        ]);
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.api_url, "http://origin.test");
    }

    #[test]
    fn invalid_route_pattern_is_rejected() {
        let cli = Cli::parse_from([
            "cachegate",
            "--capacity",
            "10",
            "--api-url",
            "http://origin.test",
            "--cache:GET",
            "not-a-route",
        ]);
        assert!(Config::load(&cli).is_err());
    }
}
