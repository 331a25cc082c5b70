use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::AppraisalError;
use crate::AppraisalResult;

/// Exponential backoff for calls to external services.
///
/// The delay after failed attempt `n` is
/// `base_backoff_ms * backoff_multiplier^(n-1)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
    pub backoff_multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 1000,
            backoff_multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after `attempt` (1-based) has failed.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = u64::from(self.backoff_multiplier).saturating_pow(exponent);
        Duration::from_millis(self.base_backoff_ms.saturating_mul(factor))
    }

    /// Run `operation` until it succeeds or the attempts run out.
    ///
    /// `operation` receives the 1-based attempt number; `sleep` is called
    /// between attempts with the backoff delay.
    pub fn run<T, E, F, S>(&self, mut operation: F, mut sleep: S) -> AppraisalResult<T>
    where
        E: fmt::Display,
        F: FnMut(u32) -> Result<T, E>,
        S: FnMut(Duration),
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match operation(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= attempts => {
                    return Err(AppraisalError::RetryExhausted {
                        attempts,
                        last_error: e.to_string(),
                    });
                }
                Err(e) => {
                    let delay = self.delay_after(attempt);
                    warn!("attempt {attempt}/{attempts} failed: {e}; retrying in {delay:?}");
                    sleep(delay);
                }
            }
        }
    }

    /// [`RetryPolicy::run`] with `std::thread::sleep` between attempts.
    pub fn run_blocking<T, E, F>(&self, operation: F) -> AppraisalResult<T>
    where
        E: fmt::Display,
        F: FnMut(u32) -> Result<T, E>,
    {
        self.run(operation, std::thread::sleep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_grow_exponentially() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_after(3), Duration::from_millis(4000));
    }

    #[test]
    fn test_succeeds_after_transient_failures() {
        let policy = RetryPolicy::default();
        let mut slept = Vec::new();
        let result = policy.run(
            |attempt| {
                if attempt < 3 {
                    Err(format!("timeout on attempt {attempt}"))
                } else {
                    Ok(attempt)
                }
            },
            |d| slept.push(d),
        );
        assert_eq!(result.unwrap(), 3);
        assert_eq!(
            slept,
            vec![Duration::from_millis(1000), Duration::from_millis(2000)]
        );
    }

    #[test]
    fn test_exhausted_attempts_report_last_error() {
        let policy = RetryPolicy {
            max_attempts: 2,
            base_backoff_ms: 0,
            backoff_multiplier: 2,
        };
        let result: AppraisalResult<()> =
            policy.run(|attempt| Err(format!("failure {attempt}")), |_| {});
        match result {
            Err(AppraisalError::RetryExhausted {
                attempts,
                last_error,
            }) => {
                assert_eq!(attempts, 2);
                assert_eq!(last_error, "failure 2");
            }
            other => panic!("Expected RetryExhausted, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        let mut calls = 0;
        let _ = policy.run(
            |_| {
                calls += 1;
                Err::<(), _>("down")
            },
            |_| {},
        );
        assert_eq!(calls, 1);
    }
}
