//! Progress of the long-running SD card fill.

use crate::error::{Error, Result};

/// Progress value reported while nothing runs.
pub const PROGRESS_IDLE: i8 = -1;

/// Tracks a single long-running operation driven by the transport.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    percent: Option<u8>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.percent.is_some()
    }

    /// `-1` when idle, otherwise `0..=100`.
    pub fn value(&self) -> i8 {
        self.percent.map(|p| p as i8).unwrap_or(PROGRESS_IDLE)
    }

    /// Begin an operation at 0%.
    pub fn start(&mut self) -> Result<()> {
        if self.is_busy() {
            return Err(Error::Busy);
        }
        self.percent = Some(0);
        Ok(())
    }

    /// Record progress. Reaching 100% completes the operation.
    ///
    /// Returns whether the operation completed.
    pub fn report(&mut self, percent: u8) -> Result<bool> {
        if percent > 100 {
            return Err(Error::InvalidArgument(format!(
                "Progress {} exceeds 100",
                percent
            )));
        }
        let current = self.percent.ok_or_else(|| {
            Error::InvalidArgument("No long-running operation in progress".to_string())
        })?;
        if percent < current {
            return Err(Error::InvalidArgument(format!(
                "Progress {} is below current {}",
                percent, current
            )));
        }
        if percent == 100 {
            self.percent = None;
            return Ok(true);
        }
        self.percent = Some(percent);
        Ok(false)
    }

    /// Drop the running operation. Returns whether one was running.
    pub fn abort(&mut self) -> bool {
        self.percent.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_value() {
        assert_eq!(ProgressTracker::new().value(), -1);
    }

    #[test]
    fn test_run_to_completion() {
        let mut tracker = ProgressTracker::new();
        tracker.start().unwrap();
        assert_eq!(tracker.value(), 0);

        assert!(!tracker.report(40).unwrap());
        assert_eq!(tracker.value(), 40);

        assert!(tracker.report(100).unwrap());
        assert_eq!(tracker.value(), -1);
        assert!(!tracker.is_busy());
    }

    #[test]
    fn test_start_while_busy() {
        let mut tracker = ProgressTracker::new();
        tracker.start().unwrap();
        assert!(matches!(tracker.start(), Err(Error::Busy)));
    }

    #[test]
    fn test_report_rules() {
        let mut tracker = ProgressTracker::new();
        assert!(tracker.report(10).is_err());

        tracker.start().unwrap();
        tracker.report(50).unwrap();
        assert!(tracker.report(20).is_err());
        assert!(tracker.report(101).is_err());
        assert_eq!(tracker.value(), 50);
    }

    #[test]
    fn test_abort() {
        let mut tracker = ProgressTracker::new();
        assert!(!tracker.abort());
        tracker.start().unwrap();
        assert!(tracker.abort());
        assert_eq!(tracker.value(), -1);
    }
}
