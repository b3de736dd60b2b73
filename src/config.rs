//! Configuration structures for the extraction pipeline
//!
//! The binaries build these from command-line arguments; library users construct them
//! directly. Nothing here is global: every component receives its configuration at
//! construction time.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Public Wikidata query service.
pub const DEFAULT_ENDPOINT_URL: &str = "https://query.wikidata.org/sparql";

/// Environment variable holding the `User-Agent` sent to the endpoint.
pub const USER_AGENT_ENV: &str = "USER_AGENT";

const FALLBACK_USER_AGENT: &str = concat!("causeway/", env!("CARGO_PKG_VERSION"));

/// Remote SPARQL endpoint settings
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub url: String,
    pub user_agent: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ENDPOINT_URL.to_string(),
            user_agent: FALLBACK_USER_AGENT.to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}

impl EndpointConfig {
    /// Defaults, with the user agent taken from `USER_AGENT` (a `.env` file is honoured).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();
        if let Ok(agent) = std::env::var(USER_AGENT_ENV) {
            if !agent.trim().is_empty() {
                config.user_agent = agent;
            }
        }
        config
    }
}

/// Where a run should pick up from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePoint {
    /// A specific checkpoint tag
    Tag(u64),
    /// The highest tag found in the checkpoint directory
    Latest,
}

impl FromStr for ResumePoint {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("latest") {
            return Ok(ResumePoint::Latest);
        }
        s.parse::<u64>()
            .map(ResumePoint::Tag)
            .map_err(|_| format!("Expected a checkpoint tag or 'latest', got '{}'", s))
    }
}

/// Pagination, checkpointing and output settings for one extraction run
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Rows requested per query (`LIMIT`)
    pub batch_size: u64,
    /// Write a checkpoint each time the progress count crosses a multiple of this value
    pub checkpoint_frequency: Option<u64>,
    /// Stop once this many valid records have been merged
    pub max_results: Option<u64>,
    pub resume: Option<ResumePoint>,
    /// Final node/edge tables are written here when set
    pub output_dir: Option<PathBuf>,
    /// Checkpoints (periodic and emergency) are written here when set
    pub checkpoint_dir: Option<PathBuf>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            batch_size: 10_000,
            checkpoint_frequency: None,
            max_results: None,
            resume: None,
            output_dir: None,
            checkpoint_dir: None,
        }
    }
}

impl ExtractionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be greater than zero".to_string()));
        }
        if self.checkpoint_frequency == Some(0) {
            return Err(Error::Config(
                "checkpoint_frequency must be greater than zero (omit it to disable)".to_string(),
            ));
        }
        if self.checkpoint_frequency.is_some() && self.checkpoint_dir.is_none() {
            return Err(Error::Config(
                "checkpoint_frequency is set but no checkpoint directory was given".to_string(),
            ));
        }
        if self.resume.is_some() && self.checkpoint_dir.is_none() {
            return Err(Error::Config(
                "resuming requires a checkpoint directory".to_string(),
            ));
        }
        Ok(())
    }
}
