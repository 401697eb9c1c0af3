use crate::config::RetryPolicy;
use std::time::Duration;

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// Wait `delay`, then run attempt number `attempt` (zero-based).
    Retry { attempt: u32, delay: Duration },
    GiveUp,
}

/// Attempt counter for the terminal's retry policy.
///
/// Pure bookkeeping: it never touches the network or sleeps, so the policy
/// can be checked in isolation. The first attempt also carries a one-off
/// handshake grace: a handshake failure there is retried once without
/// spending the retry budget.
#[derive(Debug, Clone)]
pub struct RetrySchedule {
    policy: RetryPolicy,
    attempt: u32,
    handshake_grace: bool,
}

impl RetrySchedule {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempt: 0,
            handshake_grace: true,
        }
    }

    /// Zero-based index of the current attempt.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Attempts started so far, including the current one.
    pub fn attempts_made(&self) -> u32 {
        self.attempt + 1
    }

    /// Consumes the handshake grace. Only the first attempt has one.
    pub fn take_handshake_grace(&mut self) -> bool {
        let granted = self.attempt == 0 && self.handshake_grace;
        self.handshake_grace = false;
        granted
    }

    /// Records a failure of the current attempt.
    pub fn on_failure(&mut self) -> NextStep {
        if self.attempt >= self.policy.max_retries {
            return NextStep::GiveUp;
        }
        let delay = self.policy.delay_for_attempt(self.attempt);
        self.attempt += 1;
        NextStep::Retry {
            attempt: self.attempt,
            delay,
        }
    }
}
