use std::net::SocketAddr;

use crate::grouping::GroupConfig;
use crate::similarity::MatchConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Jaccard threshold for the same-base-product matcher, in (0, 1].
    pub similarity_threshold: f64,
    /// Minimum variants a group needs for the batch path to persist it.
    pub group_min_variants: usize,
    /// Concurrent group upserts during a rebuild run.
    pub job_max_concurrent_writes: usize,
    /// 6-field cron expression for the nightly group rebuild.
    pub group_rebuild_schedule: String,
    /// 6-field cron expression for the nightly unit-price refresh.
    pub unit_price_refresh_schedule: String,
}

impl AppConfig {
    /// Matcher tunables derived from this configuration.
    #[must_use]
    pub fn match_config(&self) -> MatchConfig {
        MatchConfig {
            similarity_threshold: self.similarity_threshold,
        }
    }

    /// Grouping-engine tunables derived from this configuration.
    #[must_use]
    pub fn group_config(&self) -> GroupConfig {
        GroupConfig {
            match_config: self.match_config(),
            min_persist_variants: self.group_min_variants,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &"[redacted]")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("similarity_threshold", &self.similarity_threshold)
            .field("group_min_variants", &self.group_min_variants)
            .field("job_max_concurrent_writes", &self.job_max_concurrent_writes)
            .field("group_rebuild_schedule", &self.group_rebuild_schedule)
            .field(
                "unit_price_refresh_schedule",
                &self.unit_price_refresh_schedule,
            )
            .finish()
    }
}
