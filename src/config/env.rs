//! Environment lookup, injected so configuration stays testable.

use std::env;

/// Source of environment variables.
#[cfg_attr(test, mockall::automock)]
pub trait Environment: Send + Sync {
    fn var(&self, key: &str) -> Result<String, env::VarError>;
}

/// Reads the real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    #[tracing::instrument(skip(self))]
    fn var(&self, key: &str) -> Result<String, env::VarError> {
        env::var(key)
    }
}
