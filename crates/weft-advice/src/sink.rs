//! Trace output for builtin advice.

use crate::AdviceKind;
use std::fmt;
use std::time::Duration;
use tracing::info;

/// One line emitted by a builtin advice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceLine {
    /// Emitting binding.
    pub advice_id: String,
    /// Kind of the emitting binding.
    pub kind: AdviceKind,
    /// Short signature of the intercepted call (`AccountDao.findAccounts(..)`).
    pub call_site: String,
    /// What happened.
    pub message: String,
    /// Measured duration, for timing advice.
    pub elapsed: Option<Duration>,
}

impl fmt::Display for TraceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.call_site, self.message)?;
        if let Some(elapsed) = self.elapsed {
            write!(f, " ({} ms)", elapsed.as_millis())?;
        }
        Ok(())
    }
}

/// Destination for [`TraceLine`]s.
pub trait TraceSink: Send + Sync {
    /// Records one line.
    fn emit(&self, line: TraceLine);
}

/// Forwards lines to `tracing` at INFO level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn emit(&self, line: TraceLine) {
        info!(
            advice = %line.advice_id,
            kind = %line.kind,
            call_site = %line.call_site,
            elapsed_ms = line.elapsed.map(millis),
            "{}",
            line.message
        );
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    use super::*;
    use parking_lot::Mutex;

    /// Records every line for later assertions.
    #[derive(Debug, Default)]
    pub struct CapturingSink {
        lines: Mutex<Vec<TraceLine>>,
    }

    impl CapturingSink {
        /// Creates an empty sink.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Snapshot of recorded lines.
        #[must_use]
        pub fn lines(&self) -> Vec<TraceLine> {
            self.lines.lock().clone()
        }

        /// Returns `true` if any rendered line contains `needle`.
        #[must_use]
        pub fn contains(&self, needle: &str) -> bool {
            self.lines
                .lock()
                .iter()
                .any(|l| l.to_string().contains(needle))
        }
    }

    impl TraceSink for CapturingSink {
        fn emit(&self, line: TraceLine) {
            self.lines.lock().push(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::CapturingSink;
    use super::*;

    fn line(elapsed: Option<Duration>) -> TraceLine {
        TraceLine {
            advice_id: "time".into(),
            kind: AdviceKind::Around,
            call_site: "TrafficFortuneService.getFortune()".into(),
            message: "finished".into(),
            elapsed,
        }
    }

    #[test]
    fn millis_saturates() {
        assert_eq!(millis(Duration::from_millis(1500)), 1500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn display_without_elapsed() {
        assert_eq!(
            line(None).to_string(),
            "[around] TrafficFortuneService.getFortune(): finished"
        );
    }

    #[test]
    fn display_with_elapsed() {
        assert_eq!(
            line(Some(Duration::from_millis(1003))).to_string(),
            "[around] TrafficFortuneService.getFortune(): finished (1003 ms)"
        );
    }

    #[test]
    fn capturing_sink_records() {
        let sink = CapturingSink::new();
        sink.emit(line(None));
        assert_eq!(sink.lines().len(), 1);
        assert!(sink.contains("getFortune"));
        assert!(!sink.contains("findAccounts"));
    }

    #[test]
    fn tracing_sink_does_not_panic_without_subscriber() {
        TracingSink.emit(line(Some(Duration::from_millis(1))));
    }
}
