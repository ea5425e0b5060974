//! Tick budget monitoring
//!
//! Tracks how long host ticks take relative to the tick interval so the
//! host can report and log when the simulation falls behind.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Samples needed before the status moves off `Excellent`
const MIN_SAMPLES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceStatus {
    /// Under 30% of the tick budget
    Excellent,
    Good,
    /// 70-90% of the budget
    Warning,
    /// Over 90% of the budget; ticks are about to be skipped
    Critical,
}

impl PerformanceStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(self, PerformanceStatus::Warning | PerformanceStatus::Critical)
    }

    /// Numeric level for gauges (0 = excellent)
    pub fn level(&self) -> u64 {
        match self {
            PerformanceStatus::Excellent => 0,
            PerformanceStatus::Good => 1,
            PerformanceStatus::Warning => 2,
            PerformanceStatus::Critical => 3,
        }
    }
}

/// Rolling window of tick durations
pub struct PerformanceMonitor {
    tick_durations: VecDeque<Duration>,
    max_samples: usize,
    target_tick_duration: Duration,
    excellent_threshold: f32,
    warning_threshold: f32,
    critical_threshold: f32,
    status: PerformanceStatus,
    tick_start: Option<Instant>,
    last_entity_count: usize,
}

impl PerformanceMonitor {
    pub fn new(tick_rate: u32) -> Self {
        let target_tick_duration = Duration::from_secs_f32(1.0 / tick_rate.max(1) as f32);
        Self {
            tick_durations: VecDeque::with_capacity(120),
            max_samples: 120,
            target_tick_duration,
            excellent_threshold: 0.3,
            warning_threshold: 0.7,
            critical_threshold: 0.9,
            status: PerformanceStatus::Excellent,
            tick_start: None,
            last_entity_count: 0,
        }
    }

    pub fn tick_start(&mut self) {
        self.tick_start = Some(Instant::now());
    }

    /// Stop timing; returns the measured duration
    pub fn tick_end(&mut self, entity_count: usize) -> Option<Duration> {
        let start = self.tick_start.take()?;
        let duration = start.elapsed();
        self.record_tick(duration);
        self.last_entity_count = entity_count;
        Some(duration)
    }

    fn record_tick(&mut self, duration: Duration) {
        self.tick_durations.push_back(duration);
        while self.tick_durations.len() > self.max_samples {
            self.tick_durations.pop_front();
        }
        self.update_status();
    }

    fn update_status(&mut self) {
        if self.tick_durations.len() < MIN_SAMPLES {
            return;
        }
        let ratio = self.budget_ratio();
        self.status = if ratio < self.excellent_threshold {
            PerformanceStatus::Excellent
        } else if ratio < self.warning_threshold {
            PerformanceStatus::Good
        } else if ratio < self.critical_threshold {
            PerformanceStatus::Warning
        } else {
            PerformanceStatus::Critical
        };
    }

    fn budget_ratio(&self) -> f32 {
        self.average_tick_duration().as_secs_f32() / self.target_tick_duration.as_secs_f32()
    }

    pub fn average_tick_duration(&self) -> Duration {
        if self.tick_durations.is_empty() {
            return Duration::ZERO;
        }
        let sum: Duration = self.tick_durations.iter().sum();
        sum / self.tick_durations.len() as u32
    }

    pub fn p95_tick_duration(&self) -> Duration {
        if self.tick_durations.is_empty() {
            return Duration::ZERO;
        }
        let mut sorted: Vec<_> = self.tick_durations.iter().copied().collect();
        sorted.sort();
        let idx = (sorted.len() as f32 * 0.95) as usize;
        sorted.get(idx.min(sorted.len() - 1)).copied().unwrap_or(Duration::ZERO)
    }

    pub fn status(&self) -> PerformanceStatus {
        self.status
    }

    /// Budget usage in percent (may exceed 100)
    pub fn budget_usage_percent(&self) -> f32 {
        self.budget_ratio() * 100.0
    }

    pub fn last_entity_count(&self) -> usize {
        self.last_entity_count
    }

    pub fn status_message(&self) -> String {
        format!(
            "{:?} - {:.1}% budget, {} entities",
            self.status,
            self.budget_usage_percent(),
            self.last_entity_count
        )
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(60)
    }
}
