use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

pub const DEFAULT_DATA_DIR: &str = "./ctxt-data";
pub const DEFAULT_KEYGEN_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_WORKER_THREADS: usize = 2;

/// Default `RUST_LOG` filter.
pub const DEFAULT_LOG_FILTER: &str = "ctxt=info,ctxt_crypto=info,ctxt_store=info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub keygen_timeout: Duration,
    pub worker_threads: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key/value source. Unset keys take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir = lookup("CTXT_DATA_DIR")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_DIR.into());

        let keygen_timeout_secs = match lookup("CTXT_KEYGEN_TIMEOUT_SECS") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .with_context(|| format!("CTXT_KEYGEN_TIMEOUT_SECS={v:?} is not a number of seconds"))?,
            None => DEFAULT_KEYGEN_TIMEOUT_SECS,
        };

        let worker_threads = match lookup("CTXT_WORKER_THREADS") {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .with_context(|| format!("CTXT_WORKER_THREADS={v:?} is not a count"))?,
            None => DEFAULT_WORKER_THREADS,
        };
        if worker_threads == 0 {
            bail!("CTXT_WORKER_THREADS must be at least 1");
        }

        Ok(Self {
            data_dir: PathBuf::from(data_dir),
            keygen_timeout: Duration::from_secs(keygen_timeout_secs),
            worker_threads,
        })
    }
}
