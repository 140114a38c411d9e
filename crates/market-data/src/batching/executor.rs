//! Sequential batch execution.
//!
//! All batches of one logical call share the broker's per-credential rate limit, so they
//! run strictly one after another with a fixed pause in between. A rate-limit response
//! is a stop: the executor waits once so the next logical call starts on a cooler budget,
//! then fails the call.

use std::future::Future;
use std::time::Duration;

use log::{debug, warn};

use crate::errors::GatewayError;

/// Default pause between two batches of the same call.
const DEFAULT_INTER_BATCH_DELAY: Duration = Duration::from_secs(1);

/// Default wait after a rate-limit response.
const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(1);

/// Pacing for multi-batch calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchPolicy {
    /// Pause between consecutive batches (never after the last one).
    pub inter_batch_delay: Duration,
    /// Wait applied once when a batch is rate limited, before failing the call.
    pub rate_limit_wait: Duration,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            inter_batch_delay: DEFAULT_INTER_BATCH_DELAY,
            rate_limit_wait: DEFAULT_RATE_LIMIT_WAIT,
        }
    }
}

impl BatchPolicy {
    /// No pauses at all.
    pub fn immediate() -> Self {
        Self {
            inter_batch_delay: Duration::ZERO,
            rate_limit_wait: Duration::ZERO,
        }
    }
}

/// Result of one batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchOutcome<T> {
    /// The batch returned data.
    Data(T),
    /// The broker legitimately had nothing for this batch.
    Empty,
}

/// Runs `call` for each batch in order and collects the non-empty results.
///
/// Empty batches are logged and skipped. The first error aborts the remaining batches
/// and is returned unchanged; results gathered so far are discarded.
pub async fn run_sequential<B, T, F, Fut>(
    broker: &str,
    batches: Vec<B>,
    policy: &BatchPolicy,
    mut call: F,
) -> Result<Vec<T>, GatewayError>
where
    F: FnMut(B) -> Fut,
    Fut: Future<Output = Result<BatchOutcome<T>, GatewayError>>,
{
    let total = batches.len();
    let mut results = Vec::with_capacity(total);

    for (index, batch) in batches.into_iter().enumerate() {
        if index > 0 && !policy.inter_batch_delay.is_zero() {
            tokio::time::sleep(policy.inter_batch_delay).await;
        }

        match call(batch).await {
            Ok(BatchOutcome::Data(data)) => results.push(data),
            Ok(BatchOutcome::Empty) => {
                warn!("{}: batch {}/{} returned no data", broker, index + 1, total);
            }
            Err(GatewayError::RateLimited { broker: limited }) => {
                warn!(
                    "{}: rate limited on batch {}/{}, waiting {:?} before giving up",
                    limited,
                    index + 1,
                    total,
                    policy.rate_limit_wait
                );
                tokio::time::sleep(policy.rate_limit_wait).await;
                return Err(GatewayError::RateLimited { broker: limited });
            }
            Err(e) => {
                debug!("{}: batch {}/{} failed: {}", broker, index + 1, total, e);
                return Err(e);
            }
        }
    }

    Ok(results)
}
