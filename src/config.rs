use std::env;
use std::time::Duration;

use log::warn;

use crate::blockchain::{DEFAULT_DIFFICULTY, DIFF_MAX, DIFF_MIN};

/// Runtime settings, read from the environment (a `.env` file is loaded
/// first by `main`).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub difficulty: u32,
    /// Upper bound for a single peer's answer during conflict resolution.
    pub peer_timeout: Duration,
    /// Peers registered at startup (`PEERS`, comma separated).
    pub peers: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            difficulty: DEFAULT_DIFFICULTY,
            peer_timeout: Duration::from_millis(5000),
            peers: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let host = get("HOST").unwrap_or(defaults.host);
        let port = get("PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.port);

        let difficulty = match get("DIFFICULTY").map(|v| v.parse::<u32>()) {
            Some(Ok(d)) if (DIFF_MIN..=DIFF_MAX).contains(&d) => d,
            Some(_) => {
                warn!(
                    "DIFFICULTY must be an integer in {DIFF_MIN}..={DIFF_MAX}; using {}",
                    defaults.difficulty
                );
                defaults.difficulty
            }
            None => defaults.difficulty,
        };

        let peer_timeout = get("PEER_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.peer_timeout);

        let peers = get("PEERS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            host,
            port,
            difficulty,
            peer_timeout,
            peers,
        }
    }
}
