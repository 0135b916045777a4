// file: src/utils/telemetry.rs
// description: timing of reconciliation operations
// reference: https://docs.rs/tracing

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Logs how long an engine operation took once it finishes.
pub struct OperationTimer {
    operation: &'static str,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &'static str) -> Self {
        debug!("Starting {}", operation);
        Self {
            operation,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn checkpoint(&self, message: &str) {
        debug!(
            "[{}] {} at {:.3}s",
            self.operation,
            message,
            self.elapsed().as_secs_f64()
        );
    }

    pub fn warn_if_slow(&self, threshold: Duration) {
        let elapsed = self.elapsed();
        if elapsed > threshold {
            warn!(
                "Slow {}: took {:.2}s (threshold {:.2}s)",
                self.operation,
                elapsed.as_secs_f64(),
                threshold.as_secs_f64()
            );
        }
    }

    pub fn finish(self) -> Duration {
        let elapsed = self.elapsed();
        debug!("Completed {} in {:.3}s", self.operation, elapsed.as_secs_f64());
        elapsed
    }

    /// Finish and report how many records the operation handled.
    pub fn finish_with_count(self, count: usize) -> Duration {
        let elapsed = self.elapsed();
        info!(
            "Completed {}: {} books in {:.3}s",
            self.operation,
            count,
            elapsed.as_secs_f64()
        );
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_timer() {
        let timer = OperationTimer::new("compare versions");
        std::thread::sleep(Duration::from_millis(5));
        timer.checkpoint("parsed");
        let elapsed = timer.finish_with_count(2);
        assert!(elapsed >= Duration::from_millis(5));
    }
}
