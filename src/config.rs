//! Analysis configuration
//!
//! Every heuristic threshold in the pipeline lives here so tuning runs and
//! tests can override them without touching stage code. Defaults are the
//! calibrated values; see individual field docs.

use serde::{Deserialize, Serialize};

/// Tunable knobs for a single analysis run.
///
/// Construct with [`AnalysisOptions::default`] and override via the
/// `with_*` builders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// Minimum total mentions for a name to survive entity filtering
    pub min_mentions: usize,
    /// Same-sentence co-occurrences required before a suffix pair merges
    pub alias_cooccurrence: usize,
    /// Sentence window size for relation co-occurrence
    pub cooccurrence_window: usize,
    /// Divisor inside `tanh(sum / strength_scale)`; calibrated so a single
    /// strong pattern match alone reaches strength >= 0.7
    pub strength_scale: f64,
    /// Importance threshold for main-character classification
    pub main_threshold: f64,
    /// Chapter-presence fraction that also classifies a character as main
    pub main_presence: f64,
    /// Contribution threshold for main-plot membership
    pub main_plot_threshold: f64,
    /// Importance gap required between parent and sub-event
    pub sub_event_gap: f64,
    /// Maximum sentence distance between parent and sub-event
    pub sub_event_span: usize,
    /// Importance floor both events must clear before a causal link forms
    pub causal_importance: f64,
    /// Restart probability for the main-plot random walk
    pub walk_restart: f64,
    /// Convergence tolerance for the main-plot random walk
    pub walk_tolerance: f64,
    /// Standard-deviation multiplier for emotional peak detection
    pub peak_sigma: f64,
    /// Moving-average window for the emotional baseline
    pub emotion_baseline_window: usize,
    /// Absolute per-chapter state delta that emits a transition
    pub state_transition_threshold: f64,
    /// Sentences searched backwards when attaching a location to an event
    pub location_back_window: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            min_mentions: 3,
            alias_cooccurrence: 2,
            cooccurrence_window: 3,
            strength_scale: 2.5,
            main_threshold: 0.5,
            main_presence: 0.6,
            main_plot_threshold: 0.7,
            sub_event_gap: 0.15,
            sub_event_span: 10,
            causal_importance: 0.3,
            walk_restart: 0.15,
            walk_tolerance: 1e-8,
            peak_sigma: 1.0,
            emotion_baseline_window: 3,
            state_transition_threshold: 0.1,
            location_back_window: 5,
        }
    }
}

impl AnalysisOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_mentions(mut self, n: usize) -> Self {
        self.min_mentions = n;
        self
    }

    pub fn with_main_threshold(mut self, theta: f64) -> Self {
        self.main_threshold = theta;
        self
    }

    pub fn with_main_plot_threshold(mut self, theta: f64) -> Self {
        self.main_plot_threshold = theta;
        self
    }

    pub fn with_alias_cooccurrence(mut self, k: usize) -> Self {
        self.alias_cooccurrence = k;
        self
    }

    pub fn with_cooccurrence_window(mut self, sentences: usize) -> Self {
        self.cooccurrence_window = sentences;
        self
    }

    pub fn with_state_transition_threshold(mut self, delta: f64) -> Self {
        self.state_transition_threshold = delta;
        self
    }

    pub fn with_peak_sigma(mut self, sigma: f64) -> Self {
        self.peak_sigma = sigma;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_calibration() {
        let opts = AnalysisOptions::default();
        assert_eq!(opts.min_mentions, 3);
        assert!((opts.main_threshold - 0.5).abs() < f64::EPSILON);
        assert!((opts.main_plot_threshold - 0.7).abs() < f64::EPSILON);
        // A single strong pattern match (base weight 3.0, dominance 3:1)
        // must clear 0.7 after tanh scaling.
        assert!((3.0f64 / opts.strength_scale).tanh() >= 0.7);
    }

    #[test]
    fn builders_override() {
        let opts = AnalysisOptions::new()
            .with_min_mentions(1)
            .with_main_threshold(0.9);
        assert_eq!(opts.min_mentions, 1);
        assert!((opts.main_threshold - 0.9).abs() < f64::EPSILON);
    }
}
