//! WiFi join supervision
//!
//! The supervisor holds no radio handle. The WiFi task reports what happened
//! (attempt started, attempt failed, joined, link lost) and gets back how long
//! to wait before trying again, or the instruction to give up, at which point
//! the firmware restarts the chip.

/// Retry policy for joining the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinPolicy {
    /// Wait after the first failed attempt.
    pub initial_backoff_ms: u64,
    /// Upper bound for the doubling wait.
    pub max_backoff_ms: u64,
    /// Failed attempts tolerated before giving up.
    pub max_attempts: u32,
}

impl JoinPolicy {
    pub const DEFAULT: Self = Self {
        initial_backoff_ms: 1_000,
        max_backoff_ms: 30_000,
        max_attempts: 20,
    };

    /// Wait after the `attempt`-th consecutive failure (1-based).
    pub fn backoff_for(&self, attempt: u32) -> u64 {
        let factor = 1u64
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u64::MAX);
        self.initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms)
    }
}

impl Default for JoinPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinState {
    /// Not associated and not currently trying.
    Down,
    /// Attempt number `attempt` (1-based) is in progress.
    Joining { attempt: u32 },
    /// Associated with an address configured.
    Up,
    /// Attempts exhausted. Only a restart leaves this state.
    GaveUp,
}

impl JoinState {
    pub const fn is_up(self) -> bool {
        matches!(self, Self::Up)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinDecision {
    RetryAfter(u64),
    GiveUp,
}

/// Bounded exponential backoff state machine for the network join.
#[derive(Debug, Clone)]
pub struct JoinSupervisor {
    policy: JoinPolicy,
    state: JoinState,
    failures: u32,
}

impl JoinSupervisor {
    pub const fn new(policy: JoinPolicy) -> Self {
        Self {
            policy,
            state: JoinState::Down,
            failures: 0,
        }
    }

    pub const fn state(&self) -> JoinState {
        self.state
    }

    pub const fn policy(&self) -> &JoinPolicy {
        &self.policy
    }

    /// Consecutive failed attempts since the last successful join.
    pub const fn failures(&self) -> u32 {
        self.failures
    }

    /// Start the next attempt and return its 1-based number.
    pub fn begin_attempt(&mut self) -> u32 {
        let attempt = self.failures + 1;
        self.state = JoinState::Joining { attempt };
        attempt
    }

    pub fn attempt_failed(&mut self) -> JoinDecision {
        self.failures = self.failures.saturating_add(1);
        if self.failures >= self.policy.max_attempts {
            self.state = JoinState::GaveUp;
            return JoinDecision::GiveUp;
        }
        self.state = JoinState::Down;
        JoinDecision::RetryAfter(self.policy.backoff_for(self.failures))
    }

    pub fn joined(&mut self) {
        self.failures = 0;
        self.state = JoinState::Up;
    }

    /// The link dropped after a successful join. The next attempt starts a
    /// fresh backoff sequence.
    pub fn link_lost(&mut self) {
        self.failures = 0;
        self.state = JoinState::Down;
    }
}
