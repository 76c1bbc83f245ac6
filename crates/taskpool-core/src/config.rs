//! Scheduler configuration.

use std::env;

use crate::error::{Result, SchedulerError};

/// Environment variable read by [`SchedulerConfig::from_env`].
pub const MAX_WORKERS_ENV: &str = "TASKPOOL_MAX_WORKERS";

/// What `run()` reports when a task's callable panics.
///
/// Either way the panic is caught, the task is recorded as
/// [`TaskStatus::Panicked`](crate::TaskStatus::Panicked) and its worker keeps
/// draining the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanicPolicy {
    /// The run succeeds; panicked tasks are only visible in the results.
    #[default]
    Isolate,
    /// The run drains, then returns [`SchedulerError::TaskPanicked`] for the
    /// first task that panicked.
    FailRun,
}

/// Settings for a [`TaskScheduler`](crate::TaskScheduler).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Workers started per run, at least 1.
    pub max_workers: usize,
    /// How panicking tasks affect the result of `run()`.
    pub panic_policy: PanicPolicy,
    /// Prefix for worker tracing spans, suffixed with the worker index.
    pub worker_name_prefix: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            panic_policy: PanicPolicy::default(),
            worker_name_prefix: "taskpool-worker".to_string(),
        }
    }
}

impl SchedulerConfig {
    /// Builder starting from the defaults.
    pub fn builder() -> SchedulerConfigBuilder {
        SchedulerConfigBuilder::new()
    }

    /// Defaults, with `max_workers` taken from `TASKPOOL_MAX_WORKERS` when set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(MAX_WORKERS_ENV) {
            config.max_workers = raw.trim().parse().map_err(|_| {
                SchedulerError::config(format!("{MAX_WORKERS_ENV} is not a number: {raw:?}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Rejects settings a run cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(SchedulerError::config("max_workers must be >= 1"));
        }

        Ok(())
    }
}

/// Builder for [`SchedulerConfig`]; `build()` validates.
#[derive(Debug, Default)]
pub struct SchedulerConfigBuilder {
    config: SchedulerConfig,
}

impl SchedulerConfigBuilder {
    /// Starts from [`SchedulerConfig::default`].
    pub fn new() -> Self {
        Self {
            config: SchedulerConfig::default(),
        }
    }

    /// Sets the worker count.
    pub fn max_workers(mut self, n: usize) -> Self {
        self.config.max_workers = n;
        self
    }

    /// Sets the panic policy.
    pub fn panic_policy(mut self, policy: PanicPolicy) -> Self {
        self.config.panic_policy = policy;
        self
    }

    /// Sets the prefix used in worker span names.
    pub fn worker_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.worker_name_prefix = prefix.into();
        self
    }

    /// Validates and returns the config.
    pub fn build(self) -> Result<SchedulerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
