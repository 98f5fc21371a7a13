// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DATABASE: &str = "CMIP_REPLICA_DB";
pub const ENV_OFFSET_FILE: &str = "CMIP_REPLICA_OFFSET_FILE";
pub const ENV_SEARCH_URL: &str = "CMIP_REPLICA_SEARCH_URL";
pub const ENV_LOG_FILE: &str = "CMIP_REPLICA_LOG_FILE";
pub const ENV_LOG_LEVEL: &str = "CMIP_REPLICA_LOG_LEVEL";
pub const ENV_RETRY_DELAY_SECS: &str = "CMIP_REPLICA_RETRY_DELAY_SECS";

pub const DEFAULT_DATABASE: &str = "/var/lib/synda/sdt/sdt.db";
pub const DEFAULT_OFFSET_FILE: &str = "/p/css03/scratch/publishing/CMIP6_Nretracted";
pub const DEFAULT_SEARCH_URL: &str = "https://esgf-node.llnl.gov/esg-search/search";
pub const DEFAULT_LOG_FILE: &str = "/p/css03/scratch/logs/cmip-replica.log";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_RETRY_DELAY_SECS: u64 = 600;

/// Process-wide settings. Command-line flags override what is resolved here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaConfig {
    pub database: PathBuf,
    pub offset_file: PathBuf,
    pub search_url: String,
    pub log_file: PathBuf,
    pub log_level: String,
    pub retry_delay: Duration,
}

impl Default for ReplicaConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            offset_file: PathBuf::from(DEFAULT_OFFSET_FILE),
            search_url: DEFAULT_SEARCH_URL.to_string(),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
        }
    }
}

impl ReplicaConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolves every setting through `lookup`; blank values count as unset.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();
        Self {
            database: get(ENV_DATABASE).map_or(defaults.database, PathBuf::from),
            offset_file: get(ENV_OFFSET_FILE).map_or(defaults.offset_file, PathBuf::from),
            search_url: get(ENV_SEARCH_URL).unwrap_or(defaults.search_url),
            log_file: get(ENV_LOG_FILE).map_or(defaults.log_file, PathBuf::from),
            log_level: get(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            retry_delay: get(ENV_RETRY_DELAY_SECS)
                .and_then(|v| v.parse::<u64>().ok())
                .map_or(defaults.retry_delay, Duration::from_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn blank_and_unparsable_values_fall_back_to_defaults() {
        let env = BTreeMap::from([
            (ENV_DATABASE, "  /tmp/sdt.db "),
            (ENV_SEARCH_URL, "   "),
            (ENV_RETRY_DELAY_SECS, "soon"),
        ]);
        let cfg = ReplicaConfig::from_lookup(|k| env.get(k).map(ToString::to_string));
        assert_eq!(cfg.database, PathBuf::from("/tmp/sdt.db"));
        assert_eq!(cfg.search_url, DEFAULT_SEARCH_URL);
        assert_eq!(cfg.retry_delay, Duration::from_secs(600));
    }

    #[test]
    fn retry_delay_is_read_in_seconds() {
        let cfg = ReplicaConfig::from_lookup(|k| {
            (k == ENV_RETRY_DELAY_SECS).then(|| "0".to_string())
        });
        assert_eq!(cfg.retry_delay, Duration::ZERO);
    }
}
