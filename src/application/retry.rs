//! Exponential backoff for transient source failures.
//!
//! The driver owns the source mutably, so instead of wrapping the call in a
//! closure it loops itself and hands every failure to a [`Backoff`]:
//!
//! ```ignore
//! let mut backoff = Backoff::new(&config.retry);
//! let page = loop {
//!     match source.fetch_page(before, limit).await {
//!         Ok(page) => break page,
//!         Err(e) => backoff.wait_after(e).await?,
//!     }
//! };
//! ```

use std::time::Duration;

use rand::Rng;

use crate::domain::{AppError, Result, RetryConfig};

/// Retry state for one operation.
#[derive(Debug)]
pub struct Backoff<'a> {
    config: &'a RetryConfig,
    attempt: u32,
    delay: Duration,
}

impl<'a> Backoff<'a> {
    /// Fresh state: no retries spent, delay at `initial_delay`.
    #[must_use]
    pub const fn new(config: &'a RetryConfig) -> Self {
        Self {
            config,
            attempt: 0,
            delay: config.initial_delay(),
        }
    }

    /// Retries spent so far.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Decide what to do after `err`.
    ///
    /// Sleeps and returns `Ok(())` when the caller should try again. Delays grow
    /// by `backoff_multiplier` up to `max_delay`, with optional jitter.
    ///
    /// # Errors
    /// Returns `err` itself when it is not retryable, or `RetriesExhausted` once
    /// the retry budget is spent.
    pub async fn wait_after(&mut self, err: AppError) -> Result<()> {
        if !err.is_retryable() {
            return Err(err);
        }

        if self.attempt >= self.config.max_attempts {
            tracing::error!(error = %err, attempts = self.attempt + 1, "Retry budget exhausted");
            return Err(AppError::RetriesExhausted {
                attempts: self.attempt + 1,
                message: err.to_string(),
            });
        }

        self.attempt += 1;

        tracing::warn!(
            error = %err,
            attempt = self.attempt,
            max_attempts = self.config.max_attempts,
            delay_ms = self.delay.as_millis(),
            "Fetch failed, backing off"
        );

        let wait = if self.config.jitter {
            add_jitter(self.delay)
        } else {
            self.delay
        };
        tokio::time::sleep(wait).await;

        let next = self.delay.as_secs_f64() * self.config.backoff_multiplier;
        self.delay = Duration::try_from_secs_f64(next)
            .unwrap_or(Duration::MAX)
            .min(self.config.max_delay());

        Ok(())
    }
}

/// Stretch a delay by a random factor between 1 and 2.
fn add_jitter(delay: Duration) -> Duration {
    let factor: f64 = rand::thread_rng().gen_range(0.0..=1.0);
    Duration::try_from_secs_f64(delay.as_secs_f64() * (1.0 + factor)).unwrap_or(delay)
}
