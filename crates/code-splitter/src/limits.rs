use crate::error::{Result, SplitterError};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

const MAX_SPLITTER_WORKERS: usize = 32;

static SPLITTER_WORKER_LIMIT: OnceLock<usize> = OnceLock::new();

/// Wall-clock deadline for one file's AST pipeline
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    #[must_use]
    pub fn after(limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            limit: Some(limit),
        }
    }

    /// A deadline that never expires
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            started: Instant::now(),
            limit: None,
        }
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time left before expiry; `None` when unbounded
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.limit
            .map(|limit| limit.saturating_sub(self.started.elapsed()))
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining().is_some_and(|left| left.is_zero())
    }

    /// Fail with `Timeout` once the deadline has passed
    pub fn check(&self, stage: &'static str) -> Result<()> {
        if self.is_expired() {
            Err(SplitterError::Timeout { stage })
        } else {
            Ok(())
        }
    }
}

fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn parse_worker_count(raw: Option<&str>, default_value: usize) -> usize {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default_value)
        .clamp(1, MAX_SPLITTER_WORKERS)
}

fn worker_count_from_env() -> usize {
    let raw = std::env::var("CONTEXT_SPLITTER_WORKERS").ok();
    parse_worker_count(raw.as_deref(), default_worker_count())
}

/// Worker threads used by batch splitting (`CONTEXT_SPLITTER_WORKERS`, read once)
pub fn splitter_worker_limit() -> usize {
    *SPLITTER_WORKER_LIMIT.get_or_init(worker_count_from_env)
}
