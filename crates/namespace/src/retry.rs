use crate::error::{ErrorKind, NamespaceError};
use loft_domain::config::EngineConfig;
use std::time::Duration;
use tracing::warn;

/// Bounded retry of optimistic-concurrency losses, with jittered exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. `0` surfaces the first conflict.
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for RetryPolicy {
    fn from(config: &EngineConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_backoff: Duration::from_millis(config.base_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }
}

impl RetryPolicy {
    /// Upper bound of the delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let factor = 1_u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_backoff.saturating_mul(factor).min(self.max_backoff)
    }

    /// Delay before retry number `attempt`, drawn from the upper half of its ceiling
    /// so that racing writers spread out.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let ceiling = self.ceiling(attempt);
        let floor = ceiling / 2;
        if ceiling <= floor {
            return ceiling;
        }
        rand::random_range(floor..=ceiling)
    }

    /// Runs `op` until it returns anything but a version conflict.
    ///
    /// The closure receives the 1-based attempt number and must re-read the index on
    /// each call. Exhaustion is reported as [`NamespaceError::Unavailable`].
    pub(crate) async fn run<T, F, Fut>(
        &self,
        operation: &'static str,
        mut op: F,
    ) -> Result<T, NamespaceError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, NamespaceError>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Err(err) if err.kind() == ErrorKind::VersionConflict => {
                    if attempt > self.max_retries {
                        warn!(operation, attempts = attempt, "Retries exhausted");
                        return Err(NamespaceError::unavailable(format!(
                            "{operation} kept conflicting after {attempt} attempts"
                        )));
                    }
                    let delay = self.backoff(attempt);
                    warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis(),
                        "Version conflict, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
                outcome => return outcome,
            }
        }
    }
}
