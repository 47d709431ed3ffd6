use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for batch runs: progress, per-stage timing and metrics.
///
/// Keeps use cases independent of where the reporting goes.
pub trait PipelineLogger: Send {
    /// `current` of `total` probes finished.
    fn progress(&mut self, current: usize, total: usize);

    /// Record how long a named stage took for one probe.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time measurement (e.g. candidates kept).
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything. Used by tests and library callers that report
/// on their own.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Running {
    count: usize,
    total: f64,
}

impl Running {
    fn push(&mut self, value: f64) {
        self.count += 1;
        self.total += value;
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// Forwards to the `log` facade and keeps running totals for a summary.
///
/// Progress lines are emitted every `throttle` probes and on the last one.
pub struct LogPipelineLogger {
    throttle: usize,
    timings: BTreeMap<String, Running>,
    metrics: BTreeMap<String, Running>,
    started: Instant,
    finished: usize,
}

impl LogPipelineLogger {
    pub fn new(throttle: usize) -> Self {
        Self {
            throttle: throttle.max(1),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            started: Instant::now(),
            finished: 0,
        }
    }

    /// Formatted summary, or `None` before anything was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }
        let elapsed_s = self.started.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Batch summary ({} probes, {elapsed_s:.1}s):",
            self.finished
        )];
        for (stage, t) in &self.timings {
            lines.push(format!(
                "  {stage:12}: avg {:6.1}ms  total {:7.0}ms  ({} runs)",
                t.mean(),
                t.total,
                t.count
            ));
        }
        for (name, m) in &self.metrics {
            lines.push(format!("  {name}: avg {:.1}", m.mean()));
        }
        if self.finished > 0 && elapsed_s > 0.0 {
            lines.push(format!(
                "  Throughput: {:.1} probes/s",
                self.finished as f64 / elapsed_s
            ));
        }
        Some(lines.join("\n"))
    }

    pub fn mean_timing(&self, stage: &str) -> Option<f64> {
        self.timings.get(stage).map(Running::mean)
    }
}

impl Default for LogPipelineLogger {
    fn default() -> Self {
        Self::new(10)
    }
}

impl PipelineLogger for LogPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.finished = current;
        if total > 0 && (current % self.throttle == 0 || current == total) {
            log::info!("Identified {current}/{total} probes");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings.entry(stage.to_string()).or_default().push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().push(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
