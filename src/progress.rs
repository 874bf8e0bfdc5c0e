//! Progress accounting for a pipeline run
//!
//! Emitters report how much a step advanced their own stage (0-100 within the
//! stage); [`ProgressState`] scales that by the stage weight, clamps so a run
//! never passes 100, and forwards the applied increment to the sink together
//! with a label template.
//!
//! Label templates may contain `{0}`, to be replaced by the presentation layer
//! with the accumulated percentage (see [`render_label`]).

use std::sync::Arc;

/// Progress sink
///
/// Called with:
/// - `delta`: percentage points added to the run total by this step
/// - `label`: human-readable status, possibly containing a `{0}` placeholder
pub type ProgressCallback = Arc<dyn Fn(f64, &str) + Send + Sync>;

/// Substitute the accumulated percentage into a label template
pub fn render_label(template: &str, percent: f64) -> String {
    template.replace("{0}", &format!("{:.2}", percent))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Accumulated progress of one run
pub struct ProgressState {
    /// Exact total, never rounded
    accumulated: f64,
    /// Rounded total already forwarded to the callback
    emitted: f64,
    stage_weight: f64,
    stage_end: f64,
    callback: Option<ProgressCallback>,
}

impl ProgressState {
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            accumulated: 0.0,
            emitted: 0.0,
            stage_weight: 0.0,
            stage_end: 0.0,
            callback,
        }
    }

    /// Back to zero, for a new run
    pub fn reset(&mut self) {
        self.accumulated = 0.0;
        self.emitted = 0.0;
        self.stage_weight = 0.0;
        self.stage_end = 0.0;
    }

    pub fn accumulated(&self) -> f64 {
        self.accumulated
    }

    /// Open a stage worth `weight` percentage points of the run
    pub fn begin_stage(&mut self, weight: f64) {
        self.stage_weight = weight.max(0.0);
        self.stage_end = round2((self.accumulated + self.stage_weight).min(100.0));
    }

    /// Report `delta` percent of the current stage as done
    pub fn report(&mut self, delta: f64, label: &str) {
        let scaled = delta.max(0.0) * self.stage_weight / 100.0;
        self.advance_to(self.accumulated + scaled, label);
    }

    /// Top the current stage up to its full weight
    pub fn finish_stage(&mut self, label: &str) {
        self.advance_to(self.stage_end, label);
    }

    /// Steps smaller than a hundredth accumulate until they add up to one.
    fn advance_to(&mut self, target: f64, label: &str) {
        let target = target.min(self.stage_end);
        if target <= self.accumulated {
            return;
        }
        self.accumulated = target;

        let shown = round2(self.accumulated);
        if shown <= self.emitted {
            return;
        }
        let delta = round2(shown - self.emitted);
        self.emitted = shown;

        if let Some(ref cb) = self.callback {
            cb(delta, label);
        }
    }
}
