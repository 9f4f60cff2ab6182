//! Progress reporting for registration runs.
//!
//! The optimizer reports every iteration to a [`ProgressTracker`], which fans
//! the information out to registered callbacks.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Snapshot of a registration run after one iteration.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Resolution level, 0 = coarsest.
    pub level: usize,
    /// Iteration within the level, counted from 1.
    pub iteration: usize,
    /// Iteration budget of the level.
    pub level_iterations: usize,
    /// Summed metric energy.
    pub energy: f64,
    /// Time elapsed since the run started.
    pub elapsed: Duration,
    /// Estimated time left in the level.
    pub estimated_remaining: Option<Duration>,
    pub gradient_step: f64,
    /// Energy of each metric by name.
    pub metrics: Vec<(String, f64)>,
}

impl ProgressInfo {
    pub fn new(level: usize, iteration: usize, level_iterations: usize, energy: f64, elapsed: Duration) -> Self {
        Self {
            level,
            iteration,
            level_iterations,
            energy,
            elapsed,
            estimated_remaining: None,
            gradient_step: 0.0,
            metrics: Vec::new(),
        }
    }

    /// Fraction of the level's budget used, in percent.
    pub fn progress_percent(&self) -> f64 {
        if self.level_iterations == 0 {
            return 100.0;
        }
        self.iteration as f64 / self.level_iterations as f64 * 100.0
    }

    /// Extrapolate the remaining time of the level from `level_elapsed`.
    pub fn estimate_remaining(&mut self, level_elapsed: Duration) {
        if self.iteration > 0 {
            let per_iteration = level_elapsed.as_secs_f64() / self.iteration as f64;
            let left = self.level_iterations.saturating_sub(self.iteration);
            self.estimated_remaining = Some(Duration::from_secs_f64(per_iteration * left as f64));
        }
    }

    pub fn add_metric(&mut self, name: impl Into<String>, value: f64) {
        self.metrics.push((name.into(), value));
    }
}

/// Hooks called by the optimizer.
pub trait ProgressCallback: Send + Sync {
    /// Called after every iteration.
    fn on_progress(&self, info: &ProgressInfo);

    /// Called when a resolution level starts.
    fn on_level_start(&self, _level: usize, _size: &[usize]) {}

    fn on_start(&self) {}

    fn on_complete(&self, _info: &ProgressInfo) {}

    fn on_error(&self, _error: &str) {}
}

/// Logs progress through `tracing`.
#[derive(Debug, Clone)]
pub struct ConsoleProgressCallback {
    /// Log every this many iterations.
    pub log_interval: usize,
}

impl Default for ConsoleProgressCallback {
    fn default() -> Self {
        Self { log_interval: 10 }
    }
}

impl ConsoleProgressCallback {
    pub fn new(log_interval: usize) -> Self {
        Self {
            log_interval: log_interval.max(1),
        }
    }
}

impl ProgressCallback for ConsoleProgressCallback {
    fn on_progress(&self, info: &ProgressInfo) {
        if info.iteration % self.log_interval == 0 || info.iteration == info.level_iterations {
            let remaining = info
                .estimated_remaining
                .map(|d| format!("{:.2}s", d.as_secs_f64()))
                .unwrap_or_else(|| "N/A".to_string());

            tracing::info!(
                "Level {} iter {}/{} ({:.1}%) | Energy: {:.6} | Step: {:.3} | Elapsed: {:.2}s | ETA: {}",
                info.level,
                info.iteration,
                info.level_iterations,
                info.progress_percent(),
                info.energy,
                info.gradient_step,
                info.elapsed.as_secs_f64(),
                remaining
            );
            for (name, value) in &info.metrics {
                tracing::debug!("  {}: {:.6}", name, value);
            }
        }
    }

    fn on_level_start(&self, level: usize, size: &[usize]) {
        tracing::info!("Level {} on grid {:?}", level, size);
    }

    fn on_start(&self) {
        tracing::info!("Registration started");
    }

    fn on_complete(&self, info: &ProgressInfo) {
        tracing::info!(
            "Registration completed in {:.2}s with final energy: {:.6}",
            info.elapsed.as_secs_f64(),
            info.energy
        );
    }

    fn on_error(&self, error: &str) {
        tracing::error!("Registration failed: {}", error);
    }
}

/// Records every progress report.
#[derive(Debug, Clone, Default)]
pub struct HistoryCallback {
    history: Arc<Mutex<Vec<ProgressInfo>>>,
}

impl HistoryCallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_history(&self) -> Vec<ProgressInfo> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn clear(&self) {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl ProgressCallback for HistoryCallback {
    fn on_progress(&self, info: &ProgressInfo) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(info.clone());
    }
}

/// Fans progress out to callbacks and keeps the clocks.
#[derive(Clone, Default)]
pub struct ProgressTracker {
    callbacks: Vec<Arc<dyn ProgressCallback>>,
    start_time: Option<Instant>,
    level_start: Option<Instant>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_callback(&mut self, callback: Arc<dyn ProgressCallback>) {
        self.callbacks.push(callback);
    }

    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
        for callback in &self.callbacks {
            callback.on_start();
        }
    }

    pub fn start_level(&mut self, level: usize, size: &[usize]) {
        self.level_start = Some(Instant::now());
        for callback in &self.callbacks {
            callback.on_level_start(level, size);
        }
    }

    fn elapsed(&self) -> Duration {
        self.start_time.map(|t| t.elapsed()).unwrap_or(Duration::ZERO)
    }

    /// Build the report for one iteration and send it.
    pub fn update(&self, mut info: ProgressInfo) {
        info.elapsed = self.elapsed();
        if let Some(level_start) = self.level_start {
            info.estimate_remaining(level_start.elapsed());
        }
        for callback in &self.callbacks {
            callback.on_progress(&info);
        }
    }

    pub fn complete(&self, level: usize, final_energy: f64) {
        let info = ProgressInfo::new(level, 0, 0, final_energy, self.elapsed());
        for callback in &self.callbacks {
            callback.on_complete(&info);
        }
    }

    pub fn error(&self, error: &str) {
        for callback in &self.callbacks {
            callback.on_error(error);
        }
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("callbacks", &self.callbacks.len())
            .field("start_time", &self.start_time)
            .finish()
    }
}
