//! Scan debouncing.
//!
//! A QR code held in front of the camera is decoded many times per second.
//! [`BarcodeDebouncer`] lets the first detection through and suppresses every
//! further detection until [`ScanDebounceInterval`] has elapsed since the last
//! *accepted* one.
//!
//! The interval is passed to every [`BarcodeDebouncer::should_accept`] call
//! instead of being stored in the debouncer, so a new setting applies to the
//! very next scan.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Minimum time between two accepted scans, in whole milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanDebounceInterval(u64);

impl ScanDebounceInterval {
    /// Interval used when nothing valid has been configured.
    pub const DEFAULT: ScanDebounceInterval = ScanDebounceInterval(900);

    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    pub fn as_millis(self) -> u64 {
        self.0
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_millis(self.0)
    }

    /// Parses a user- or storage-supplied value.
    ///
    /// Surrounding whitespace is ignored.  Anything that is not a non-negative
    /// decimal integer yields `None`, and callers keep their previous value.
    pub fn parse(raw: &str) -> Option<Self> {
        raw.trim().parse::<u64>().ok().map(Self)
    }
}

impl Default for ScanDebounceInterval {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for ScanDebounceInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Remembers the last accepted scan and gates new ones.
#[derive(Debug, Default, Clone)]
pub struct BarcodeDebouncer {
    last_accepted: Option<Instant>,
}

impl BarcodeDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` and records `now` when at least `interval` has passed
    /// since the last accepted scan (or no scan was accepted yet).  Otherwise
    /// returns `false` and leaves the remembered timestamp untouched.
    pub fn should_accept(&mut self, now: Instant, interval: ScanDebounceInterval) -> bool {
        if let Some(last) = self.last_accepted {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < interval.as_duration() {
                trace!("scan suppressed: {elapsed:?} < {}ms", interval.as_millis());
                return false;
            }
        }
        self.last_accepted = Some(now);
        true
    }

    /// Timestamp of the last accepted scan, if any.
    pub fn last_accepted(&self) -> Option<Instant> {
        self.last_accepted
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_first_scan_is_always_accepted() {
        // Arrange
        let mut debouncer = BarcodeDebouncer::new();

        // Act / Assert
        assert!(debouncer.should_accept(Instant::now(), ScanDebounceInterval::DEFAULT));
    }

    #[test]
    fn test_scan_inside_interval_is_rejected() {
        // Arrange
        let mut debouncer = BarcodeDebouncer::new();
        let t0 = Instant::now();
        let interval = ScanDebounceInterval::from_millis(900);

        // Act
        let first = debouncer.should_accept(t0, interval);
        let second = debouncer.should_accept(t0 + ms(899), interval);

        // Assert
        assert!(first);
        assert!(!second);
    }

    #[test]
    fn test_scan_exactly_at_interval_is_accepted() {
        let mut debouncer = BarcodeDebouncer::new();
        let t0 = Instant::now();
        let interval = ScanDebounceInterval::from_millis(900);

        assert!(debouncer.should_accept(t0, interval));
        assert!(debouncer.should_accept(t0 + ms(900), interval));
    }

    #[test]
    fn test_rejected_scan_does_not_move_the_window() {
        // Arrange: accept at t0, reject at t0+500
        let mut debouncer = BarcodeDebouncer::new();
        let t0 = Instant::now();
        let interval = ScanDebounceInterval::from_millis(900);
        debouncer.should_accept(t0, interval);
        debouncer.should_accept(t0 + ms(500), interval);

        // Act: t0+900 is measured from t0, not from the rejected scan
        let accepted = debouncer.should_accept(t0 + ms(900), interval);

        // Assert
        assert!(accepted);
        assert_eq!(debouncer.last_accepted(), Some(t0 + ms(900)));
    }

    #[test]
    fn test_changed_interval_applies_to_next_call() {
        let mut debouncer = BarcodeDebouncer::new();
        let t0 = Instant::now();
        debouncer.should_accept(t0, ScanDebounceInterval::from_millis(900));

        // Shrinking the interval lets a scan through that the old value blocked.
        assert!(debouncer.should_accept(t0 + ms(200), ScanDebounceInterval::from_millis(100)));
    }

    #[test]
    fn test_zero_interval_accepts_every_scan() {
        let mut debouncer = BarcodeDebouncer::new();
        let t0 = Instant::now();
        let zero = ScanDebounceInterval::from_millis(0);
        assert!(debouncer.should_accept(t0, zero));
        assert!(debouncer.should_accept(t0, zero));
    }

    #[test]
    fn test_parse_accepts_decimal_integer() {
        assert_eq!(
            ScanDebounceInterval::parse(" 1500 "),
            Some(ScanDebounceInterval::from_millis(1500))
        );
    }

    #[test]
    fn test_parse_rejects_non_numeric_and_negative() {
        assert_eq!(ScanDebounceInterval::parse("fast"), None);
        assert_eq!(ScanDebounceInterval::parse("-5"), None);
        assert_eq!(ScanDebounceInterval::parse(""), None);
        assert_eq!(ScanDebounceInterval::parse("1.5"), None);
    }

    #[test]
    fn test_default_is_900ms() {
        assert_eq!(ScanDebounceInterval::default().as_millis(), 900);
        assert_eq!(ScanDebounceInterval::default().to_string(), "900");
    }
}
