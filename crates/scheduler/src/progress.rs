use std::fmt;

use crate::backend::BackendKind;
use crate::run::RunReport;

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Periodic tile count, emitted every `report_every` tiles.
    Tiles { backend: BackendKind, completed: u64 },
    /// Final summary, emitted once per run however it ended.
    Finished(RunReport),
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::Tiles { backend, completed } => {
                write!(f, "{backend} tiles: {completed}")
            }
            ProgressEvent::Finished(report) => {
                write!(f, "{} pass finished: {}", report.backend, report.completed)
            }
        }
    }
}

pub trait ProgressSink {
    fn report(&mut self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: FnMut(&ProgressEvent),
{
    fn report(&mut self, event: &ProgressEvent) {
        self(event)
    }
}

/// Forwards each status line to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Tiles { backend, completed } => {
                tracing::info!(%backend, completed, "{event}");
            }
            ProgressEvent::Finished(report) => {
                tracing::info!(
                    backend = %report.backend,
                    completed = report.completed,
                    total = report.total_tiles,
                    yields = report.yields,
                    reason = ?report.reason,
                    "{event}"
                );
            }
        }
    }
}

/// Throttles tile counts into percentage lines.
///
/// A line is passed on only once progress has moved by more than 1% of
/// `total` since the previous line. The final summary always passes through.
pub struct PercentProgress<S> {
    inner: S,
    total: u64,
    last: u64,
}

impl<S: FnMut(&str)> PercentProgress<S> {
    pub fn new(total: u64, inner: S) -> Self {
        Self {
            inner,
            total,
            last: 0,
        }
    }
}

impl<S: FnMut(&str)> ProgressSink for PercentProgress<S> {
    fn report(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Tiles { completed, .. } => {
                if self.total == 0 {
                    return;
                }
                if (completed.saturating_sub(self.last)) as f64 > self.total as f64 * 0.01 {
                    let percent = completed.saturating_mul(100) / self.total;
                    (self.inner)(&format!("progress: {percent}%"));
                    self.last = *completed;
                }
            }
            ProgressEvent::Finished(_) => (self.inner)(&event.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::{RunState, StopReason};

    fn finished(completed: u64) -> ProgressEvent {
        ProgressEvent::Finished(RunReport {
            backend: BackendKind::Scalar,
            completed,
            total_tiles: completed,
            yields: 0,
            state: RunState::Completed,
            reason: StopReason::FrameExhausted,
        })
    }

    #[test]
    fn lines_match_status_format() {
        let tiles = ProgressEvent::Tiles {
            backend: BackendKind::Parallel,
            completed: 2000,
        };
        assert_eq!(tiles.to_string(), "parallel tiles: 2000");
        assert_eq!(finished(16).to_string(), "scalar pass finished: 16");
    }

    #[test]
    fn closures_are_sinks() {
        let mut seen = Vec::new();
        {
            let mut sink = |event: &ProgressEvent| seen.push(event.to_string());
            sink.report(&finished(3));
        }
        assert_eq!(seen, vec!["scalar pass finished: 3".to_string()]);
    }

    #[test]
    fn percent_lines_skip_small_steps() {
        let mut lines = Vec::new();
        {
            let mut sink = PercentProgress::new(1000, |line: &str| lines.push(line.to_string()));
            for completed in [5, 10, 11, 25, 500] {
                sink.report(&ProgressEvent::Tiles {
                    backend: BackendKind::Scalar,
                    completed,
                });
            }
            sink.report(&finished(1000));
        }
        assert_eq!(
            lines,
            vec![
                "progress: 1%".to_string(),
                "progress: 2%".to_string(),
                "progress: 50%".to_string(),
                "scalar pass finished: 1000".to_string(),
            ]
        );
    }
}
