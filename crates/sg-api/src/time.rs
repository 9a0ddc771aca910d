//! Time primitives
//!
//! Sessions are valid over a wall-clock range; state values carry the
//! time they last changed so subscribers can detect staleness.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Wall-clock instant, UTC
pub type Timestamp = DateTime<Utc>;

/// Current wall-clock time
#[inline]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Half-open validity window of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: Timestamp,
    pub to: Timestamp,
}

impl TimeRange {
    pub fn new(from: Timestamp, to: Timestamp) -> Self {
        Self { from, to }
    }

    /// Length of the range; negative when malformed
    #[inline]
    pub fn duration(&self) -> Duration {
        self.to - self.from
    }

    /// A range is well-formed when it ends after it starts
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.to > self.from
    }

    #[inline]
    pub fn contains(&self, ts: Timestamp) -> bool {
        ts >= self.from && ts < self.to
    }

    #[inline]
    pub fn intersects(&self, other: &TimeRange) -> bool {
        self.from < other.to && other.from < self.to
    }
}

/// Value paired with the time it was last set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timestamped<T> {
    value: T,
    timestamp: Timestamp,
}

impl<T> Timestamped<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            timestamp: now(),
        }
    }

    #[inline]
    pub fn value(&self) -> &T {
        &self.value
    }

    #[inline]
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Replace the value, refreshing the timestamp
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.timestamp = now();
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T: Default> Default for Timestamped<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> From<T> for Timestamped<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_validity() {
        let from = now();
        let to = from + Duration::minutes(30);

        let range = TimeRange::new(from, to);
        assert!(range.is_valid());
        assert_eq!(range.duration(), Duration::minutes(30));
        assert!(range.contains(from));
        assert!(!range.contains(to));

        assert!(!TimeRange::new(to, from).is_valid());
    }

    #[test]
    fn test_timestamped_set_refreshes() {
        let mut state = Timestamped::new(1);
        let before = state.timestamp();

        state.set(2);
        assert_eq!(*state.value(), 2);
        assert!(state.timestamp() >= before);
    }
}
