use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};

use crate::pipeline::batch_executor::{BatchExecutor, Probe, ProbeOutcome, SendError};
use crate::pipeline::identify_use_case::IdentifyUseCase;
use crate::pipeline::pipeline_logger::PipelineLogger;

const DEFAULT_CHANNEL_CAPACITY: usize = 8;

type Done = (usize, ProbeOutcome, f64);

/// Worker pool over crossbeam channels.
///
/// Layout: `main [queue] → N workers [identify] → main [collect]`
///
/// Workers share the use case read-only; the main thread reports
/// progress and restores probe order.
pub struct ThreadedBatchExecutor {
    workers: usize,
    channel_capacity: usize,
}

impl ThreadedBatchExecutor {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// One worker per available core.
    pub fn with_available_parallelism() -> Self {
        Self::new(std::thread::available_parallelism().map_or(1, |n| n.get()))
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Default for ThreadedBatchExecutor {
    fn default() -> Self {
        Self::with_available_parallelism()
    }
}

impl BatchExecutor for ThreadedBatchExecutor {
    fn execute(
        &self,
        use_case: Arc<IdentifyUseCase>,
        probes: &[Probe],
        logger: &mut dyn PipelineLogger,
    ) -> Result<Vec<ProbeOutcome>, Box<dyn std::error::Error>> {
        let total = probes.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let (job_tx, job_rx) = crossbeam_channel::unbounded::<(usize, Probe)>();
        for job in probes.iter().cloned().enumerate() {
            job_tx.send(job)?;
        }
        drop(job_tx);

        let (done_tx, done_rx) = crossbeam_channel::bounded::<Done>(self.channel_capacity);
        let handles: Vec<_> = (0..self.workers.min(total))
            .map(|_| spawn_worker(use_case.clone(), job_rx.clone(), done_tx.clone()))
            .collect();
        drop(done_tx);

        let mut outcomes: Vec<Option<ProbeOutcome>> = (0..total).map(|_| None).collect();
        let mut finished = 0;
        for (index, outcome, elapsed_ms) in done_rx {
            logger.timing("identify", elapsed_ms);
            if let Ok(identification) = &outcome {
                logger.metric("candidates_kept", identification.ranking.len() as f64);
            }
            outcomes[index] = Some(outcome);
            finished += 1;
            logger.progress(finished, total);
        }

        for handle in handles {
            handle.join().map_err(|_| "batch worker panicked")?;
        }

        outcomes
            .into_iter()
            .enumerate()
            .map(|(i, o)| o.ok_or_else(|| format!("probe {i} produced no result").into()))
            .collect()
    }
}

fn spawn_worker(
    use_case: Arc<IdentifyUseCase>,
    jobs: Receiver<(usize, Probe)>,
    done: Sender<Done>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for (index, probe) in jobs {
            let start = Instant::now();
            let outcome = use_case
                .execute_path(&probe.path)
                .map_err(|e| -> SendError { e.to_string().into() });
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
            if done.send((index, outcome, elapsed_ms)).is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::identify_use_case::tests::{
        face_with_eyes, use_case, StubReader, StubRecognizer,
    };
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use rstest::rstest;
    use std::collections::HashMap;
    use std::path::PathBuf;

    struct CountingLogger {
        progress: Vec<(usize, usize)>,
        timings: usize,
    }

    impl PipelineLogger for CountingLogger {
        fn progress(&mut self, current: usize, total: usize) {
            self.progress.push((current, total));
        }
        fn timing(&mut self, _stage: &str, _duration_ms: f64) {
            self.timings += 1;
        }
        fn metric(&mut self, _name: &str, _value: f64) {}
        fn info(&mut self, _message: &str) {}
    }

    /// Probes `p0..pN` on disk; even ones have blue eyes, odd ones yellow.
    fn fixture(dir: &tempfile::TempDir, n: usize) -> (Arc<IdentifyUseCase>, Vec<Probe>) {
        let mut frames = HashMap::new();
        let mut probes = Vec::new();
        let (_, eyes) = face_with_eyes([0, 0, 0]);
        for i in 0..n {
            let path = dir.path().join(format!("p{i}.png"));
            std::fs::write(&path, b"").unwrap();
            let rgb = if i % 2 == 0 { [100, 140, 180] } else { [210, 200, 150] };
            frames.insert(path.clone(), face_with_eyes(rgb).0);
            probes.push(Probe {
                subject_id: 1,
                path,
            });
        }
        let uc = use_case(
            vec![],
            eyes,
            StubRecognizer::new(&[(2, 50.0), (1, 80.0), (3, 90.0)]),
            StubReader(frames),
        );
        (Arc::new(uc), probes)
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(16)]
    fn test_outcomes_in_probe_order(#[case] workers: usize) {
        let dir = tempfile::tempdir().unwrap();
        let (uc, probes) = fixture(&dir, 9);
        let outcomes = ThreadedBatchExecutor::new(workers)
            .execute(uc, &probes, &mut NullPipelineLogger)
            .unwrap();
        assert_eq!(outcomes.len(), 9);
        for (i, outcome) in outcomes.iter().enumerate() {
            let best = outcome.as_ref().unwrap().best().unwrap().subject_id;
            // Blue eyes restrict to {1, 3}; yellow falls back to the raw ranking.
            assert_eq!(best, if i % 2 == 0 { 1 } else { 2 }, "probe {i}");
        }
    }

    #[test]
    fn test_progress_reported_per_probe() {
        let dir = tempfile::tempdir().unwrap();
        let (uc, probes) = fixture(&dir, 5);
        let mut logger = CountingLogger {
            progress: Vec::new(),
            timings: 0,
        };
        ThreadedBatchExecutor::new(2)
            .execute(uc, &probes, &mut logger)
            .unwrap();
        assert_eq!(logger.timings, 5);
        assert_eq!(logger.progress.last(), Some(&(5, 5)));
        assert_eq!(logger.progress.len(), 5);
    }

    #[test]
    fn test_failed_probe_does_not_stop_batch() {
        let dir = tempfile::tempdir().unwrap();
        let (uc, mut probes) = fixture(&dir, 2);
        // Exists on disk but the reader has no image for it.
        let orphan = dir.path().join("orphan.png");
        std::fs::write(&orphan, b"").unwrap();
        probes.insert(
            1,
            Probe {
                subject_id: 9,
                path: orphan,
            },
        );
        let outcomes = ThreadedBatchExecutor::new(2)
            .execute(uc, &probes, &mut NullPipelineLogger)
            .unwrap();
        assert!(outcomes[0].is_ok());
        assert!(outcomes[1].is_err());
        assert!(outcomes[2].is_ok());
    }

    #[test]
    fn test_missing_probe_is_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let (uc, _) = fixture(&dir, 0);
        let probes = vec![Probe {
            subject_id: 1,
            path: PathBuf::from("/nonexistent/p.png"),
        }];
        let outcomes = ThreadedBatchExecutor::new(1)
            .execute(uc, &probes, &mut NullPipelineLogger)
            .unwrap();
        assert!(outcomes[0].as_ref().unwrap().ranking.is_empty());
    }

    #[test]
    fn test_empty_batch() {
        let dir = tempfile::tempdir().unwrap();
        let (uc, _) = fixture(&dir, 0);
        let outcomes = ThreadedBatchExecutor::new(4)
            .execute(uc, &[], &mut NullPipelineLogger)
            .unwrap();
        assert!(outcomes.is_empty());
    }

    #[test]
    fn test_worker_count_at_least_one() {
        assert_eq!(ThreadedBatchExecutor::new(0).workers(), 1);
    }
}
