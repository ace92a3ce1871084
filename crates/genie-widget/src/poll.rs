//! Bounded fixed-interval polling.
//!
//! [`await_condition`] is the generic loop: call, and while the result is
//! [`Check::Pending`], sleep `interval` and call again, at most
//! `max_attempts` times. An error from the check ends the loop at once.
//! [`poll_message`] applies it to a Genie message.
//!
//! Sleeping goes through `tokio::time`, so tests drive it with a paused clock.

use std::future::Future;
use std::time::Duration;

use genie_types::{GenieMessage, MessageStatus};
use tracing::debug;

use crate::api::GenieApi;
use crate::error::ApiError;

/// Poll cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between two consecutive checks.
    pub interval: Duration,
    /// Upper bound on checks; `0` behaves like `1`.
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            max_attempts: 30,
        }
    }
}

impl PollConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// Result of one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check<T> {
    Pending,
    Ready(T),
}

/// How [`await_condition`] ended when no check failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AwaitOutcome<T> {
    Ready { value: T, attempts: u32 },
    TimedOut { attempts: u32 },
}

/// Run `check` until it is ready, errors, or the attempt budget is spent.
///
/// `check` receives the 1-based attempt number. There is no sleep before the
/// first check nor after the last one.
pub async fn await_condition<T, E, F, Fut>(
    config: &PollConfig,
    mut check: F,
) -> Result<AwaitOutcome<T>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Check<T>, E>>,
{
    let max_attempts = config.max_attempts.max(1);
    for attempt in 1..=max_attempts {
        if let Check::Ready(value) = check(attempt).await? {
            return Ok(AwaitOutcome::Ready {
                value,
                attempts: attempt,
            });
        }
        if attempt < max_attempts {
            tokio::time::sleep(config.interval).await;
        }
    }
    Ok(AwaitOutcome::TimedOut {
        attempts: max_attempts,
    })
}

// ── Genie messages ────────────────────────────────────────────────────────────

/// Terminal state of a polled message.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Completed(GenieMessage),
    Failed(GenieMessage),
    /// The budget ran out before a terminal status was seen.
    TimedOut { attempts: u32 },
}

/// Poll `message_id` until it is `COMPLETED` or `FAILED`.
///
/// A failed poll call (transport, non-2xx, undecodable body) is returned as
/// the error without spending the remaining attempts.
pub async fn poll_message<A>(
    api: &A,
    conversation_id: &str,
    message_id: &str,
    config: &PollConfig,
) -> Result<PollOutcome, ApiError>
where
    A: GenieApi + ?Sized,
{
    let outcome = await_condition(config, |attempt| async move {
        let message = api.poll_status(conversation_id, message_id).await?;
        debug!(attempt, status = ?message.status, "polled message");
        Ok::<_, ApiError>(match message.status {
            Some(status) if status.is_terminal() => Check::Ready(message),
            _ => Check::Pending,
        })
    })
    .await?;

    Ok(match outcome {
        AwaitOutcome::Ready { value, .. } if value.status == Some(MessageStatus::Completed) => {
            PollOutcome::Completed(value)
        }
        AwaitOutcome::Ready { value, .. } => PollOutcome::Failed(value),
        AwaitOutcome::TimedOut { attempts } => PollOutcome::TimedOut { attempts },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedApi;
    use std::cell::Cell;
    use tokio::time::Instant;

    fn fast() -> PollConfig {
        PollConfig::default()
            .with_interval(Duration::from_millis(250))
            .with_max_attempts(5)
    }

    #[test]
    fn default_cadence_is_one_second_thirty_attempts() {
        let cfg = PollConfig::default();
        assert_eq!(cfg.interval, Duration::from_secs(1));
        assert_eq!(cfg.max_attempts, 30);
    }

    #[tokio::test(start_paused = true)]
    async fn ready_after_k_pending_calls_spaced_by_interval() {
        let cfg = fast();
        let calls = Cell::new(0u32);
        let start = Instant::now();
        let mut stamps = Vec::new();

        let outcome: Result<_, ()> = await_condition(&cfg, |attempt| {
            calls.set(calls.get() + 1);
            stamps.push(start.elapsed());
            async move {
                Ok(if attempt == 4 {
                    Check::Ready("done")
                } else {
                    Check::Pending
                })
            }
        })
        .await;

        assert_eq!(
            outcome,
            Ok(AwaitOutcome::Ready {
                value: "done",
                attempts: 4
            })
        );
        assert_eq!(calls.get(), 4);
        let expected: Vec<_> = (0..4).map(|i| Duration::from_millis(250 * i)).collect();
        assert_eq!(stamps, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn never_ready_times_out_after_max_attempts() {
        let cfg = fast();
        let calls = Cell::new(0u32);
        let start = Instant::now();

        let outcome: Result<AwaitOutcome<()>, ()> = await_condition(&cfg, |_| {
            calls.set(calls.get() + 1);
            async { Ok(Check::Pending) }
        })
        .await;

        assert_eq!(outcome, Ok(AwaitOutcome::TimedOut { attempts: 5 }));
        assert_eq!(calls.get(), 5);
        // Four gaps between five calls; no trailing sleep.
        assert_eq!(start.elapsed(), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn error_stops_the_loop_immediately() {
        let cfg = fast();
        let calls = Cell::new(0u32);

        let outcome: Result<AwaitOutcome<()>, &str> = await_condition(&cfg, |attempt| {
            calls.set(calls.get() + 1);
            async move {
                if attempt == 2 {
                    Err("boom")
                } else {
                    Ok(Check::Pending)
                }
            }
        })
        .await;

        assert_eq!(outcome, Err("boom"));
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_still_checks_once() {
        let cfg = fast().with_max_attempts(0);
        let calls = Cell::new(0u32);
        let outcome: Result<AwaitOutcome<()>, ()> = await_condition(&cfg, |_| {
            calls.set(calls.get() + 1);
            async { Ok(Check::Pending) }
        })
        .await;
        assert_eq!(outcome, Ok(AwaitOutcome::TimedOut { attempts: 1 }));
        assert_eq!(calls.get(), 1);
    }

    // ── poll_message ─────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn pending_then_completed_fires_once() {
        let api = ScriptedApi::new().with_statuses(&["PENDING", "EXECUTING_QUERY", "PENDING", "COMPLETED"]);
        let start = Instant::now();

        let outcome = poll_message(&api, "conv-1", "msg-1", &fast()).await.unwrap();

        assert!(matches!(outcome, PollOutcome::Completed(ref m) if m.message_id() == Some("msg-1")));
        assert_eq!(api.poll_calls(), 4);
        assert_eq!(start.elapsed(), Duration::from_millis(750));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_status_is_terminal() {
        let api = ScriptedApi::new().with_statuses(&["PENDING", "FAILED"]);
        let outcome = poll_message(&api, "conv-1", "msg-1", &fast()).await.unwrap();
        assert!(matches!(outcome, PollOutcome::Failed(_)));
        assert_eq!(api.poll_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn never_terminal_times_out() {
        let api = ScriptedApi::new().with_statuses(&["PENDING"; 5]);
        let outcome = poll_message(&api, "conv-1", "msg-1", &fast()).await.unwrap();
        assert_eq!(outcome, PollOutcome::TimedOut { attempts: 5 });
        assert_eq!(api.poll_calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_aborts_without_spending_budget() {
        let api = ScriptedApi::new()
            .with_statuses(&["PENDING"])
            .with_poll_error_at(2, ApiError::Transport("connection reset".into()));
        let err = poll_message(&api, "conv-1", "msg-1", &fast()).await.unwrap_err();
        assert_eq!(err, ApiError::Transport("connection reset".into()));
        assert_eq!(api.poll_calls(), 2);
    }
}
