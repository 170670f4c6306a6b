use std::time::{Duration, Instant};
use serde::{Deserialize, Serialize};
use tracing::debug;
use super::eta::{estimate_remaining, eta_suffix, DEFAULT_ETA_CEILING};
use super::stage::Stage;

/// What gets displayed for an upload: a bar value and one line of text
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusLine {
    pub percent: f64,
    pub message: String,
}

impl StatusLine {
    pub fn new(percent: f64, message: impl Into<String>) -> Self {
        Self {
            percent,
            message: message.into(),
        }
    }
}

/// Turns one progress feed into status lines.
///
/// Implementations own their clock and never look at another estimator's.
pub trait ProgressEstimator {
    type Sample;

    fn advance(&mut self, sample: Self::Sample, now: Instant) -> StatusLine;
}

/// `uploadProgress` payload from the push channel
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct StageSample {
    pub stage: Stage,
    pub percent: f64,
}

impl StageSample {
    pub fn new(stage: Stage, percent: f64) -> Self {
        Self { stage, percent }
    }
}

/// Byte counters of the outgoing request body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSample {
    pub bytes_sent: u64,
    pub bytes_total: u64,
}

impl TransferSample {
    pub fn new(bytes_sent: u64, bytes_total: u64) -> Self {
        Self { bytes_sent, bytes_total }
    }

    /// Whole percent, 0 when the total is unknown.
    pub fn percent(&self) -> f64 {
        if self.bytes_total == 0 {
            return 0.0;
        }

        (self.bytes_sent as f64 * 100.0 / self.bytes_total as f64).round()
    }
}

/// Origin of the elapsed-time measurement for the current stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageClock {
    pub stage: Option<Stage>,
    pub started_at: Option<Instant>,
}

impl StageClock {
    /// Restarts the clock only when `stage` differs from the last seen one.
    pub fn reduce(self, stage: Stage, now: Instant) -> Self {
        if self.stage == Some(stage) {
            return self;
        }

        Self {
            stage: Some(stage),
            started_at: Some(now),
        }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        self.started_at
            .map(|started_at| now.saturating_duration_since(started_at))
            .unwrap_or_default()
    }
}

/// Estimator for server-side processing stages
#[derive(Debug, Clone)]
pub struct StageEstimator {
    clock: StageClock,
    ceiling: Option<Duration>,
}

impl Default for StageEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_ETA_CEILING)
    }
}

impl StageEstimator {
    pub fn new(ceiling: Duration) -> Self {
        Self {
            clock: StageClock::default(),
            ceiling: Some(ceiling),
        }
    }

    pub fn clock(&self) -> StageClock {
        self.clock
    }

    pub fn reset(&mut self) {
        self.clock = StageClock::default();
    }
}

impl ProgressEstimator for StageEstimator {
    type Sample = StageSample;

    fn advance(&mut self, sample: StageSample, now: Instant) -> StatusLine {
        let previous = self.clock.stage;
        self.clock = self.clock.reduce(sample.stage, now);
        if previous != Some(sample.stage) {
            debug!(stage = %sample.stage, "stage changed, clock reset");
        }

        let remaining = estimate_remaining(sample.percent, self.clock.elapsed(now));
        let eta = eta_suffix(remaining, self.ceiling);

        StatusLine::new(sample.percent, sample.stage.status_message(sample.percent, &eta))
    }
}

/// Estimator for the client -> server body transfer. Single phase, no ceiling.
#[derive(Debug, Clone, Default)]
pub struct TransferEstimator {
    started_at: Option<Instant>,
}

impl TransferEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, now: Instant) {
        self.started_at = Some(now);
    }
}

impl ProgressEstimator for TransferEstimator {
    type Sample = TransferSample;

    fn advance(&mut self, sample: TransferSample, now: Instant) -> StatusLine {
        let started_at = *self.started_at.get_or_insert(now);
        let percent = sample.percent();

        if percent > 0.0 && percent < 100.0 {
            let remaining = estimate_remaining(percent, now.saturating_duration_since(started_at));
            let eta = eta_suffix(remaining, None);
            StatusLine::new(percent, Stage::Sending.status_message(percent, &eta))
        } else {
            StatusLine::new(percent, "Waiting for server...")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_clock_only_resets_on_stage_change() {
        let t0 = Instant::now();
        let clock = StageClock::default().reduce(Stage::CloudUpload, t0);
        assert_eq!(clock.started_at, Some(t0));

        let same = clock.reduce(Stage::CloudUpload, t0 + secs(5));
        assert_eq!(same.started_at, Some(t0));
        assert_eq!(same.elapsed(t0 + secs(7)), secs(7));

        let next = same.reduce(Stage::Processing, t0 + secs(9));
        assert_eq!(next.stage, Some(Stage::Processing));
        assert_eq!(next.started_at, Some(t0 + secs(9)));
    }

    #[test]
    fn test_stage_eta_shown_under_ceiling() {
        let t0 = Instant::now();
        let mut estimator = StageEstimator::default();
        estimator.advance(StageSample::new(Stage::CloudUpload, 1.0), t0);

        let line = estimator.advance(StageSample::new(Stage::CloudUpload, 50.0), t0 + secs(10));
        assert_eq!(line.percent, 50.0);
        assert_eq!(line.message, "Uploading to Cloud... 50% • 10s left");
    }

    #[test]
    fn test_stage_eta_suppressed_over_ceiling() {
        let t0 = Instant::now();
        let mut estimator = StageEstimator::default();
        estimator.advance(StageSample::new(Stage::CloudUpload, 0.0), t0);

        let line = estimator.advance(StageSample::new(Stage::CloudUpload, 10.0), t0 + secs(50));
        assert_eq!(line.message, "Uploading to Cloud... 10%");
    }

    #[test]
    fn test_stage_change_discards_rate_history() {
        let t0 = Instant::now();
        let mut estimator = StageEstimator::default();
        estimator.advance(StageSample::new(Stage::OptimizingImage, 0.0), t0);

        // elapsed is zero right after the switch
        let line = estimator.advance(StageSample::new(Stage::CloudUpload, 40.0), t0 + secs(20));
        assert_eq!(line.message, "Uploading to Cloud... 40%");
        assert_eq!(estimator.clock().started_at, Some(t0 + secs(20)));
    }

    #[test]
    fn test_stage_zero_and_full_percent_have_no_eta() {
        let t0 = Instant::now();
        let mut estimator = StageEstimator::default();
        estimator.advance(StageSample::new(Stage::CompressingVideo, 0.0), t0);

        let line = estimator.advance(StageSample::new(Stage::CompressingVideo, 0.0), t0 + secs(30));
        assert_eq!(line.message, "Compressing video... 0%");

        let line = estimator.advance(StageSample::new(Stage::CompressingVideo, 100.0), t0 + secs(60));
        assert_eq!(line.percent, 100.0);
        assert_eq!(line.message, "Compressing video... 100%");
    }

    #[test]
    fn test_lower_percent_is_recomputed_not_clamped() {
        let t0 = Instant::now();
        let mut estimator = StageEstimator::default();
        estimator.advance(StageSample::new(Stage::CloudUpload, 0.0), t0);
        estimator.advance(StageSample::new(Stage::CloudUpload, 60.0), t0 + secs(6));

        let line = estimator.advance(StageSample::new(Stage::CloudUpload, 40.0), t0 + secs(8));
        assert_eq!(line.percent, 40.0);
        // 5%/s, 60% to go
        assert_eq!(line.message, "Uploading to Cloud... 40% • 12s left");
    }

    #[test]
    fn test_transfer_eta_has_no_ceiling() {
        let t0 = Instant::now();
        let mut estimator = TransferEstimator::new();
        estimator.start(t0);

        let line = estimator.advance(TransferSample::new(80, 100), t0 + secs(8));
        assert_eq!(line.percent, 80.0);
        assert_eq!(line.message, "Sending to server... 80% • 2s left");

        let mut slow = TransferEstimator::new();
        slow.start(t0);
        let line = slow.advance(TransferSample::new(1, 100), t0 + secs(10));
        assert_eq!(line.message, "Sending to server... 1% • 16m 30s left");
    }

    #[test]
    fn test_transfer_edges_wait_for_server() {
        let t0 = Instant::now();
        let mut estimator = TransferEstimator::new();
        estimator.start(t0);

        assert_eq!(estimator.advance(TransferSample::new(0, 1000), t0 + secs(1)).message, "Waiting for server...");
        assert_eq!(estimator.advance(TransferSample::new(1000, 1000), t0 + secs(2)).message, "Waiting for server...");
        assert_eq!(estimator.advance(TransferSample::new(0, 0), t0 + secs(3)).percent, 0.0);
    }

    #[test]
    fn test_transfer_zero_elapsed_omits_suffix() {
        let t0 = Instant::now();
        let mut estimator = TransferEstimator::new();
        estimator.start(t0);

        let line = estimator.advance(TransferSample::new(30, 100), t0);
        assert_eq!(line.message, "Sending to server... 30%");
        assert!(!line.message.contains("inf"));
    }

    #[test]
    fn test_transfer_percent_rounds() {
        assert_eq!(TransferSample::new(1, 3).percent(), 33.0);
        assert_eq!(TransferSample::new(2, 3).percent(), 67.0);
        assert_eq!(TransferSample::new(5, 0).percent(), 0.0);
    }
}
