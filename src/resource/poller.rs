//! Operation Poller
//!
//! Waits for a submitted operation to leave its family's pending set,
//! re-fetching its status according to a [`PollPolicy`].

use crate::error::{LumeError, Result};
use crate::operation::{Operation, OperationFamily};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Default delay before the first status fetch
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Upper bound for the delay between two fetches once backoff kicks in
pub const DEFAULT_MAX_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default bound on a whole poll sequence
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(300);

/// Timing rules for a poll sequence
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Delay before the first fetch
    pub interval: Duration,
    /// Factor applied to the delay after every fetch (values below 1.0 act as 1.0)
    pub backoff: f64,
    /// Cap on the delay between fetches
    pub max_interval: Duration,
    /// Bound on the whole sequence; `None` polls until the operation settles
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            backoff: 1.5,
            max_interval: DEFAULT_MAX_POLL_INTERVAL,
            timeout: Some(DEFAULT_POLL_TIMEOUT),
        }
    }
}

impl PollPolicy {
    /// Back-to-back fetches with no delay and no deadline
    pub fn busy() -> Self {
        Self {
            interval: Duration::ZERO,
            backoff: 1.0,
            max_interval: Duration::ZERO,
            timeout: None,
        }
    }

    /// Fixed delay between fetches
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            backoff: 1.0,
            max_interval: interval,
            timeout: Some(DEFAULT_POLL_TIMEOUT),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn next_delay(&self, current: Duration) -> Duration {
        let factor = if self.backoff.is_finite() && self.backoff > 1.0 {
            self.backoff
        } else {
            1.0
        };
        Duration::try_from_secs_f64(current.as_secs_f64() * factor)
            .unwrap_or(Duration::MAX)
            .min(self.max_interval.max(self.interval))
    }
}

/// Drives status fetches for one operation at a time
#[derive(Debug, Clone, Default)]
pub struct Poller {
    policy: PollPolicy,
}

impl Poller {
    pub fn new(policy: PollPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Poll until `submitted` reaches a terminal status
    ///
    /// With `immediate` set the submitted handle is returned as-is and no
    /// fetch happens. Otherwise `fetch_status` is called with the operation id
    /// for as long as the latest status is pending for `family`. Fetch errors
    /// are returned unchanged; nothing is retried.
    pub async fn poll_until_terminal<F, Fut>(
        &self,
        submitted: Operation,
        family: OperationFamily,
        immediate: bool,
        mut fetch_status: F,
    ) -> Result<Operation>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<Operation>>,
    {
        if immediate {
            tracing::debug!(
                "Returning {} operation {} without waiting (status: {})",
                family.as_str(),
                submitted.id,
                submitted.status
            );
            return Ok(submitted);
        }

        // A timeout too large to represent as an instant leaves the sequence unbounded
        let deadline = self
            .policy
            .timeout
            .and_then(|t| Instant::now().checked_add(t));
        let mut current = submitted;
        let mut delay = self.policy.interval;
        let mut fetches: u32 = 0;

        while family.is_pending(&current.status) {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(self.timeout_error(current, None));
                }
            }

            if delay.is_zero() {
                // Let other tasks run between back-to-back fetches
                tokio::task::yield_now().await;
            } else {
                match deadline {
                    Some(deadline)
                        if deadline.saturating_duration_since(Instant::now()) <= delay =>
                    {
                        tokio::time::sleep_until(deadline).await;
                        return Err(self.timeout_error(current, None));
                    },
                    _ => tokio::time::sleep(delay).await,
                }
                delay = self.policy.next_delay(delay);
            }

            fetches += 1;
            tracing::debug!(
                "Polling {} operation {} (fetch #{}, last status: {})",
                family.as_str(),
                current.id,
                fetches,
                current.status
            );

            let fetch = fetch_status(current.id.clone());
            current = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, fetch).await {
                    Ok(fetched) => fetched?,
                    Err(elapsed) => return Err(self.timeout_error(current, Some(elapsed))),
                },
                None => fetch.await?,
            };
        }

        if !current.status.is_known() {
            tracing::warn!(
                "Unknown status '{}' for {} operation {}, treating it as terminal",
                current.status,
                family.as_str(),
                current.id
            );
        }

        tracing::info!(
            "{} operation {} settled with status '{}' after {} fetch(es)",
            family.as_str(),
            current.id,
            current.status,
            fetches
        );

        Ok(current)
    }

    fn timeout_error(
        &self,
        current: Operation,
        source: Option<tokio::time::error::Elapsed>,
    ) -> LumeError {
        tracing::warn!(
            "Operation {} still '{}' when the poll deadline passed",
            current.id,
            current.status
        );
        LumeError::Timeout {
            id: current.id,
            after: self.policy.timeout.unwrap_or_default(),
            last_status: current.status,
            source,
        }
    }
}
