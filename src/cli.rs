//! Command-Line Interface (A2): flag schema mirroring the config file, used
//! both standalone and as an override layer on top of a loaded JSON5 file.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Parser;

/// `cache:route=>pattern1||pattern2` syntax for a single `--bust:<METHOD>`
/// occurrence, parsed eagerly so bad flag syntax fails before any network
/// activity rather than silently producing an empty bust route.
fn parse_bust_entry(raw: &str) -> Result<(String, Vec<String>), String> {
    let (route, patterns) = raw
        .split_once("=>")
        .ok_or_else(|| format!("expected ROUTE=>PATTERN1||PATTERN2, got {raw:?}"))?;
    if route.is_empty() {
        return Err(format!("empty route in bust entry {raw:?}"));
    }
    let patterns = patterns.split("||").map(str::to_string).collect();
    Ok((route.to_string(), patterns))
}

#[derive(Debug, Parser)]
#[command(name = "cachegate", about = "Reverse-proxy LRU caching service")]
pub struct Cli {
    /// Path to a JSON5 config file. CLI flags override anything it sets.
    #[arg(long, env = "CACHEGATE_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "CACHEGATE_CAPACITY")]
    pub capacity: Option<u64>,

    #[arg(long = "capacity-unit", env = "CACHEGATE_CAPACITY_UNIT")]
    pub capacity_unit: Option<String>,

    #[arg(long, env = "CACHEGATE_HOSTNAME")]
    pub hostname: Option<String>,

    #[arg(long, env = "CACHEGATE_PORT")]
    pub port: Option<u16>,

    #[arg(long = "api-url", env = "CACHEGATE_API_URL")]
    pub api_url: Option<String>,

    #[arg(long, env = "CACHEGATE_LOGFILE")]
    pub logfile: Option<String>,

    /// May be repeated: `--cache:GET /posts --cache:GET /posts/:id`.
    #[arg(long = "cache:GET")]
    pub cache_get: Vec<String>,

    #[arg(long = "cache:HEAD")]
    pub cache_head: Vec<String>,

    /// `--bust:POST '/posts/:id=>^GET:/posts/:id$||^GET:/posts$'`, repeatable
    /// per method. Parsed here so a malformed entry is a clap usage error.
    /// One flag per method in config.rs's `METHODS` list, so every bust route
    /// expressible in the JSON5 file has a CLI equivalent.
    #[arg(long = "bust:GET", value_parser = parse_bust_entry)]
    pub bust_get: Vec<(String, Vec<String>)>,

    #[arg(long = "bust:HEAD", value_parser = parse_bust_entry)]
    pub bust_head: Vec<(String, Vec<String>)>,

    #[arg(long = "bust:POST", value_parser = parse_bust_entry)]
    pub bust_post: Vec<(String, Vec<String>)>,

    #[arg(long = "bust:PUT", value_parser = parse_bust_entry)]
    pub bust_put: Vec<(String, Vec<String>)>,

    #[arg(long = "bust:DELETE", value_parser = parse_bust_entry)]
    pub bust_delete: Vec<(String, Vec<String>)>,

    #[arg(long = "bust:PATCH", value_parser = parse_bust_entry)]
    pub bust_patch: Vec<(String, Vec<String>)>,

    #[arg(long = "bust:TRACE", value_parser = parse_bust_entry)]
    pub bust_trace: Vec<(String, Vec<String>)>,

    #[arg(long = "bust:CONNECT", value_parser = parse_bust_entry)]
    pub bust_connect: Vec<(String, Vec<String>)>,

    #[arg(long = "bust:OPTIONS", value_parser = parse_bust_entry)]
    pub bust_options: Vec<(String, Vec<String>)>,
}

impl Cli {
    /// Collects the per-method `--bust:*` flags into the same
    /// `method -> route -> patterns` shape the config file uses.
    pub fn bust(&self) -> HashMap<String, HashMap<String, Vec<String>>> {
        let mut out = HashMap::new();
        for (method, entries) in [
            ("GET", &self.bust_get),
            ("HEAD", &self.bust_head),
            ("POST", &self.bust_post),
            ("PUT", &self.bust_put),
            ("DELETE", &self.bust_delete),
            ("PATCH", &self.bust_patch),
            ("TRACE", &self.bust_trace),
            ("CONNECT", &self.bust_connect),
            ("OPTIONS", &self.bust_options),
        ] {
            if entries.is_empty() {
                continue;
            }
            let method_map: &mut HashMap<String, Vec<String>> =
                out.entry(method.to_string()).or_default();
            for (route, patterns) in entries {
                method_map.entry(route.clone()).or_default().extend(patterns.clone());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parses_minimal_flags() {
        let cli = Cli::parse_from([
            "cachegate",
            "--capacity",
            "100",
            "--api-url",
            "http://origin.test",
            "--cache:GET",
            "/posts",
        ]);
        assert_eq!(cli.capacity, Some(100));
        assert_eq!(cli.cache_get, vec!["/posts".to_string()]);
    }

    #[test]
    fn repeated_cache_flags_accumulate() {
        let cli = Cli::parse_from([
            "cachegate",
            "--capacity",
            "1",
            "--api-url",
            "http://origin.test",
            "--cache:GET",
            "/posts",
            "--cache:GET",
            "/posts/:id",
        ]);
        assert_eq!(cli.cache_get, vec!["/posts".to_string(), "/posts/:id".to_string()]);
    }

    #[test]
    fn bust_entry_parses_route_and_patterns() {
        let cli = Cli::parse_from([
            "cachegate",
            "--capacity",
            "1",
            "--api-url",
            "http://origin.test",
            "--bust:POST",
            "/posts=>^GET:/posts$||^GET:/posts/.*$",
        ]);
        let bust = cli.bust();
        let posts = &bust["POST"]["/posts"];
        assert_eq!(posts, &vec!["^GET:/posts$".to_string(), "^GET:/posts/.*$".to_string()]);
    }

    #[test]
    fn non_mutating_bust_methods_have_cli_flags() {
        let cli = Cli::parse_from([
            "cachegate",
            "--capacity",
            "1",
            "--api-url",
            "http://origin.test",
            "--bust:GET",
            "/posts=>^GET:/posts$",
            "--bust:OPTIONS",
            "/posts=>^GET:/posts$",
        ]);
        let bust = cli.bust();
        assert_eq!(bust["GET"]["/posts"], vec!["^GET:/posts$".to_string()]);
        assert_eq!(bust["OPTIONS"]["/posts"], vec!["^GET:/posts$".to_string()]);
    }

    #[test]
    fn malformed_bust_entry_is_rejected() {
        let result = Cli::try_parse_from([
            "cachegate",
            "--capacity",
            "1",
            "--api-url",
            "http://origin.test",
            "--bust:POST",
            "no-arrow-here",
        ]);
        assert!(result.is_err());
    }
}
