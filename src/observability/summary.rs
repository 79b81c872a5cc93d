//! # Latency Summary
//!
//! A Prometheus summary with quantile objectives. The `prometheus` crate only
//! ships histograms, so quantiles are computed over a bounded window of the
//! most recent samples and rendered in the text exposition format next to the
//! registry output.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::{Mutex, PoisonError};

/// Number of most recent samples quantiles are computed over
const DEFAULT_WINDOW: usize = 1024;

#[derive(Debug, Default)]
struct SummaryState {
    window: VecDeque<f64>,
    count: u64,
    sum: f64,
}

#[derive(Debug)]
pub struct LatencySummary {
    name: String,
    help: String,
    /// (quantile, allowed rank error)
    objectives: Vec<(f64, f64)>,
    max_window: usize,
    state: Mutex<SummaryState>,
}

impl LatencySummary {
    pub fn new(name: &str, help: &str, objectives: &[(f64, f64)]) -> Self {
        Self {
            name: name.to_string(),
            help: help.to_string(),
            objectives: objectives.to_vec(),
            max_window: DEFAULT_WINDOW,
            state: Mutex::new(SummaryState::default()),
        }
    }

    pub fn observe(&self, value: f64) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.window.len() == self.max_window {
            state.window.pop_front();
        }
        state.window.push_back(value);
        state.count += 1;
        state.sum += value;
    }

    pub fn sample_count(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .count
    }

    pub fn sample_sum(&self) -> f64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sum
    }

    /// Quantile over the current window; `None` before the first observation
    pub fn quantile(&self, q: f64) -> Option<f64> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        quantile_of(&state.window, q)
    }

    /// Render the summary in the Prometheus text exposition format
    pub fn encode_text(&self) -> String {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let mut out = String::new();
        let _ = writeln!(out, "# HELP {} {}", self.name, self.help);
        let _ = writeln!(out, "# TYPE {} summary", self.name);
        for (q, _) in &self.objectives {
            let value = quantile_of(&state.window, *q).unwrap_or(f64::NAN);
            let _ = writeln!(
                out,
                "{}{{quantile=\"{}\"}} {}",
                self.name,
                q,
                format_value(value)
            );
        }
        let _ = writeln!(out, "{}_sum {}", self.name, format_value(state.sum));
        let _ = writeln!(out, "{}_count {}", self.name, state.count);
        out
    }
}

fn quantile_of(window: &VecDeque<f64>, q: f64) -> Option<f64> {
    if window.is_empty() {
        return None;
    }
    let mut sorted: Vec<f64> = window.iter().copied().collect();
    sorted.sort_by(f64::total_cmp);

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        reason = "rank is clamped to the window bounds"
    )]
    let rank = ((q * sorted.len() as f64).ceil() as usize).clamp(1, sorted.len()) - 1;
    sorted.get(rank).copied()
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OBJECTIVES: &[(f64, f64)] = &[(0.5, 0.05), (0.9, 0.01), (0.99, 0.001)];

    #[test]
    fn test_quantiles_over_window() {
        let summary = LatencySummary::new("latency", "test", OBJECTIVES);
        for v in 1..=100 {
            summary.observe(f64::from(v));
        }
        assert_eq!(summary.quantile(0.5), Some(50.0));
        assert_eq!(summary.quantile(0.9), Some(90.0));
        assert_eq!(summary.quantile(0.99), Some(99.0));
        assert_eq!(summary.sample_count(), 100);
        assert!((summary.sample_sum() - 5050.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_count_keeps_growing_past_window() {
        let summary = LatencySummary::new("latency", "test", OBJECTIVES);
        for _ in 0..(DEFAULT_WINDOW + 10) {
            summary.observe(1.0);
        }
        assert_eq!(summary.sample_count(), (DEFAULT_WINDOW + 10) as u64);
    }

    #[test]
    fn test_encode_text_before_first_sample() {
        let summary = LatencySummary::new("latency", "Latency of things", OBJECTIVES);
        let text = summary.encode_text();
        assert!(text.contains("# TYPE latency summary"));
        assert!(text.contains("latency{quantile=\"0.5\"} NaN"));
        assert!(text.contains("latency_count 0"));
    }
}
