//! Bounded-concurrency fan-out over many URLs.
//!
//! Every input URL produces exactly one [`BatchOutcome`] at its input
//! position. A failing, timed-out or panicking item never affects its
//! siblings; only batch-level validation fails the whole call.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use stealth_fetch_core::{Error, truncate};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::fetch::FetchResult;

/// Maximum URLs accepted in one batch.
pub const MAX_BATCH_URLS: usize = 50;

/// Maximum concurrent fetches in one batch.
pub const MAX_BATCH_CONCURRENCY: usize = 20;

/// Batch execution parameters.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Maximum in-flight fetches (default: 5, range 1..=20)
    pub max_concurrency: usize,
    /// Pause after acquiring a slot and before fetching (default: none)
    pub delay: Duration,
    /// Per-item deadline; `None` leaves timing to the fetcher
    pub timeout: Option<Duration>,
    /// Character cap applied to each successful item's text (default: 10000)
    pub max_chars_per_url: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self { max_concurrency: 5, delay: Duration::ZERO, timeout: None, max_chars_per_url: 10_000 }
    }
}

/// Result of one batch item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BatchOutcome {
    Ok { url: String, status_code: u16, final_url: String, text: String },
    Error { url: String, error: String },
}

impl BatchOutcome {
    pub fn url(&self) -> &str {
        match self {
            BatchOutcome::Ok { url, .. } | BatchOutcome::Error { url, .. } => url,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, BatchOutcome::Ok { .. })
    }

    fn failed(url: String, err: &Error) -> Self {
        BatchOutcome::Error { url, error: err.message().to_string() }
    }
}

/// Run `fetch` once per URL with at most `max_concurrency` in flight.
///
/// Each task acquires a semaphore permit, sleeps `delay`, then calls `fetch`
/// under the optional per-item timeout. The permit is dropped on every exit
/// path. Results come back in input order. Dropping the returned future
/// aborts in-flight tasks.
///
/// # Errors
///
/// `InvalidInput` when `urls` is empty or longer than [`MAX_BATCH_URLS`], or
/// when `max_concurrency` is outside `1..=MAX_BATCH_CONCURRENCY`. Nothing is
/// fetched in that case.
pub async fn execute_batch<F, Fut>(
    urls: Vec<String>, options: &BatchOptions, fetch: F,
) -> Result<Vec<BatchOutcome>, Error>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<FetchResult, Error>> + Send + 'static,
{
    if urls.is_empty() || urls.len() > MAX_BATCH_URLS {
        return Err(Error::InvalidInput(format!(
            "urls must contain between 1 and {MAX_BATCH_URLS} items, got {}",
            urls.len()
        )));
    }
    if !(1..=MAX_BATCH_CONCURRENCY).contains(&options.max_concurrency) {
        return Err(Error::InvalidInput(format!(
            "max_concurrency must be between 1 and {MAX_BATCH_CONCURRENCY}, got {}",
            options.max_concurrency
        )));
    }

    tracing::info!(
        count = urls.len(),
        max_concurrency = options.max_concurrency,
        delay_ms = options.delay.as_millis() as u64,
        "dispatching batch"
    );

    let semaphore = Arc::new(Semaphore::new(options.max_concurrency));
    let fetch = Arc::new(fetch);
    let mut join_set = JoinSet::new();
    let mut positions = HashMap::with_capacity(urls.len());
    let mut slots: Vec<Option<BatchOutcome>> = vec![None; urls.len()];

    for (index, url) in urls.iter().cloned().enumerate() {
        let semaphore = semaphore.clone();
        let fetch = fetch.clone();
        let delay = options.delay;
        let timeout = options.timeout;
        let max_chars = options.max_chars_per_url;

        let handle = join_set.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return (index, BatchOutcome::failed(url, &Error::Internal("batch was cancelled".into()))),
            };

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let result = match timeout {
                Some(limit) => tokio::time::timeout(limit, fetch(url.clone()))
                    .await
                    .unwrap_or_else(|_| Err(Error::timeout())),
                None => fetch(url.clone()).await,
            };

            let outcome = match result {
                Ok(res) => BatchOutcome::Ok {
                    url,
                    status_code: res.status_code,
                    final_url: res.final_url,
                    text: truncate(&res.text, max_chars),
                },
                Err(e) => {
                    tracing::debug!(%url, error = %e, "batch item failed");
                    BatchOutcome::failed(url, &e)
                }
            };
            (index, outcome)
        });
        positions.insert(handle.id(), index);
    }

    while let Some(joined) = join_set.join_next_with_id().await {
        match joined {
            Ok((_, (index, outcome))) => slots[index] = Some(outcome),
            Err(join_err) => {
                if let Some(&index) = positions.get(&join_err.id()) {
                    tracing::warn!(url = %urls[index], "batch task panicked");
                    slots[index] = Some(BatchOutcome::failed(
                        urls[index].clone(),
                        &Error::Internal(format!("Unexpected internal error: {join_err}")),
                    ));
                }
            }
        }
    }

    let outcomes: Vec<BatchOutcome> = slots
        .into_iter()
        .zip(urls)
        .map(|(slot, url)| {
            slot.unwrap_or_else(|| BatchOutcome::failed(url, &Error::Internal("task produced no result".into())))
        })
        .collect();

    let succeeded = outcomes.iter().filter(|o| o.is_ok()).count();
    tracing::info!(total = outcomes.len(), succeeded, failed = outcomes.len() - succeeded, "batch complete");

    Ok(outcomes)
}
