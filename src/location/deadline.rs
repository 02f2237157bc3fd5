//! Absolute deadlines passed from the caller down to each provider call.

use std::time::{Duration, Instant};

// Stand-in for "no limit" when `now + timeout` would overflow `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// A point in time after which work should stop.
///
/// Derived deadlines only ever shrink: use [`Deadline::min`] or
/// [`Deadline::clamp_to`] to build a child from a parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn at(instant: Instant) -> Self {
        Self(instant)
    }

    /// Deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        let now = Instant::now();
        let instant = now
            .checked_add(timeout)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);
        Self(instant)
    }

    pub fn instant(self) -> Instant {
        self.0
    }

    /// This deadline or `now + timeout`, whichever comes first.
    pub fn clamp_to(self, timeout: Duration) -> Self {
        self.min(Self::after(timeout))
    }

    /// Time left, or `None` once the deadline has passed.
    pub fn remaining(self) -> Option<Duration> {
        self.0
            .checked_duration_since(Instant::now())
            .filter(|left| !left.is_zero())
    }

    pub fn is_expired(self) -> bool {
        self.remaining().is_none()
    }
}

impl From<Instant> for Deadline {
    fn from(instant: Instant) -> Self {
        Self(instant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_never_extends() {
        let parent = Deadline::after(Duration::from_millis(200));
        let child = parent.clamp_to(Duration::from_secs(5));
        assert_eq!(child, parent);
    }

    #[test]
    fn test_clamp_shrinks() {
        let parent = Deadline::after(Duration::from_secs(5));
        let child = parent.clamp_to(Duration::from_millis(100));
        assert!(child < parent);
        assert!(child.remaining().unwrap() <= Duration::from_millis(100));
    }

    #[test]
    fn test_expired() {
        let past = Deadline::at(Instant::now() - Duration::from_millis(5));
        assert!(past.is_expired());
        assert_eq!(past.remaining(), None);
        assert!(!Deadline::after(Duration::from_secs(1)).is_expired());
    }

    #[test]
    fn test_huge_timeout_does_not_panic() {
        let d = Deadline::after(Duration::MAX);
        assert!(!d.is_expired());
    }
}
