use std::time::Duration;

/// How a failed attempt should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The request timed out: wait `delay`, then retry.
    Timeout,
    /// Anything else: retry straight away.
    Other,
}

/// Bounded retry with a fixed delay after timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn classify(error: &reqwest::Error) -> FailureKind {
        if error.is_timeout() {
            FailureKind::Timeout
        } else {
            FailureKind::Other
        }
    }

    /// Pause before the next attempt, or `None` when `attempt` (1-based)
    /// was the last one.
    pub fn next_delay(&self, attempt: usize, kind: FailureKind) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        match kind {
            FailureKind::Timeout => Some(self.delay),
            FailureKind::Other => Some(Duration::ZERO),
        }
    }
}
