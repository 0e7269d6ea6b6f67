//! Sign counter guard
//!
//! Authenticators that keep a signature counter must report a strictly larger
//! value on every use. A counter that fails to advance means two copies of the
//! same private key are in circulation.

use std::str::FromStr;

/// Outcome of comparing a reported counter against the stored one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterDecision {
    /// Persist this value as the new stored counter
    Accept(u64),
    RejectRegression,
}

/// How to treat authenticators that never increment their counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CounterPolicy {
    /// A stored and reported counter of zero is accepted: the authenticator
    /// does not implement counters.
    #[default]
    Lenient,
    /// Every login must advance the counter.
    Strict,
}

impl CounterPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lenient => "lenient",
            Self::Strict => "strict",
        }
    }
}

impl FromStr for CounterPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown counter policy '{}'", other)),
        }
    }
}

impl std::fmt::Display for CounterPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pure decision function over (stored, reported) counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignCounterGuard {
    policy: CounterPolicy,
}

impl SignCounterGuard {
    pub fn new(policy: CounterPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> CounterPolicy {
        self.policy
    }

    pub fn decide(&self, stored: u64, reported: u64) -> CounterDecision {
        match self.policy {
            CounterPolicy::Lenient => decide(stored, reported),
            CounterPolicy::Strict if reported > stored => CounterDecision::Accept(reported),
            CounterPolicy::Strict => CounterDecision::RejectRegression,
        }
    }
}

/// Lenient decision: `0,0` passes, otherwise the counter must strictly grow.
pub fn decide(stored: u64, reported: u64) -> CounterDecision {
    if stored == 0 && reported == 0 {
        CounterDecision::Accept(0)
    } else if reported > stored {
        CounterDecision::Accept(reported)
    } else {
        CounterDecision::RejectRegression
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_counter_exemption() {
        assert_eq!(decide(0, 0), CounterDecision::Accept(0));
    }

    #[test]
    fn test_increase_accepted() {
        assert_eq!(decide(0, 1), CounterDecision::Accept(1));
        assert_eq!(decide(5, 6), CounterDecision::Accept(6));
        assert_eq!(decide(5, u64::MAX), CounterDecision::Accept(u64::MAX));
    }

    #[test]
    fn test_regression_rejected() {
        assert_eq!(decide(5, 5), CounterDecision::RejectRegression);
        assert_eq!(decide(5, 3), CounterDecision::RejectRegression);
        // Counter went back to zero after having been used
        assert_eq!(decide(5, 0), CounterDecision::RejectRegression);
    }

    #[test]
    fn test_accept_is_monotonic() {
        for stored in [0u64, 1, 7, 1 << 32, u64::MAX - 1] {
            for reported in [0u64, 1, 7, 8, 1 << 32, u64::MAX] {
                if let CounterDecision::Accept(next) = decide(stored, reported) {
                    assert!(next >= stored);
                }
            }
        }
    }

    #[test]
    fn test_strict_policy_has_no_exemption() {
        let guard = SignCounterGuard::new(CounterPolicy::Strict);
        assert_eq!(guard.decide(0, 0), CounterDecision::RejectRegression);
        assert_eq!(guard.decide(0, 1), CounterDecision::Accept(1));
        assert_eq!(guard.decide(4, 4), CounterDecision::RejectRegression);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("strict".parse::<CounterPolicy>(), Ok(CounterPolicy::Strict));
        assert_eq!(" Lenient ".parse::<CounterPolicy>(), Ok(CounterPolicy::Lenient));
        assert!("sometimes".parse::<CounterPolicy>().is_err());
        assert_eq!(SignCounterGuard::default().policy(), CounterPolicy::Lenient);
    }
}
