// Environment-backed settings for the console binary
//
// Everything funnels into an explicit EngineConfig here; nothing below the
// composition root reads the environment.

use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use lanekeeper_core::config::{EngineConfig, DEFAULT_TOKEN_TTL_MS};
use lanekeeper_core::domain::Lane;

pub const DEFAULT_DB_PATH: &str = "lanekeeper.db";

pub struct Settings {
    pub db_path: String,
    pub engine: EngineConfig,
}

impl Settings {
    /// Read settings from LANEKEEPER_* environment variables
    ///
    /// - `LANEKEEPER_DB_PATH`: SQLite database path (default `lanekeeper.db`)
    /// - `LANEKEEPER_OPERATORS`: comma-separated operator external ids
    /// - `LANEKEEPER_LANES`: comma-separated `id:title` pairs
    ///   (default `1:Lane 1,2:Lane 2`)
    /// - `LANEKEEPER_TOKEN_TTL_MS`: confirmation-token lifetime (default 15 min)
    pub fn from_env() -> Result<Self> {
        let db_path =
            std::env::var("LANEKEEPER_DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());

        let operators: HashSet<String> = std::env::var("LANEKEEPER_OPERATORS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let lanes = match std::env::var("LANEKEEPER_LANES") {
            Ok(raw) => parse_lanes(&raw)?,
            Err(_) => EngineConfig::default().lanes,
        };

        let token_ttl_ms = match std::env::var("LANEKEEPER_TOKEN_TTL_MS") {
            Ok(raw) => raw
                .parse::<i64>()
                .context("LANEKEEPER_TOKEN_TTL_MS must be an integer")?,
            Err(_) => DEFAULT_TOKEN_TTL_MS,
        };

        Ok(Self {
            db_path,
            engine: EngineConfig::new(lanes, operators, token_ttl_ms),
        })
    }
}

fn parse_lanes(raw: &str) -> Result<Vec<Lane>> {
    let mut lanes = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let Some((id, title)) = entry.split_once(':') else {
            bail!("lane entry '{entry}' is not of the form id:title");
        };
        let id = id
            .trim()
            .parse::<i64>()
            .with_context(|| format!("lane id in '{entry}' is not an integer"))?;
        let title = title.trim();
        if title.is_empty() {
            bail!("lane entry '{entry}' has an empty title");
        }
        lanes.push(Lane::new(id, title));
    }
    if lanes.is_empty() {
        bail!("LANEKEEPER_LANES is set but contains no lanes");
    }
    Ok(lanes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lanes() {
        let lanes = parse_lanes("1:Lane 1, 2:South Wall").unwrap();
        assert_eq!(lanes.len(), 2);
        assert_eq!(lanes[0], Lane::new(1, "Lane 1"));
        assert_eq!(lanes[1], Lane::new(2, "South Wall"));
    }

    #[test]
    fn test_parse_lanes_rejects_garbage() {
        assert!(parse_lanes("no-colon").is_err());
        assert!(parse_lanes("x:Lane").is_err());
        assert!(parse_lanes("1:").is_err());
        assert!(parse_lanes("  ,  ").is_err());
    }
}
