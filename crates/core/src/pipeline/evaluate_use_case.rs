use std::path::Path;
use std::sync::Arc;

use crate::identification::domain::ranked_result::RankedResult;
use crate::identification::infrastructure::gallery_images::scan_labeled_images;
use crate::pipeline::batch_executor::{BatchExecutor, Probe, ProbeOutcome};
use crate::pipeline::identify_use_case::IdentifyUseCase;
use crate::pipeline::pipeline_logger::PipelineLogger;

/// Rank-1 identification counts over a labelled probe set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EvaluationReport {
    pub probes: usize,
    /// Probes that produced a non-empty ranking.
    pub ranked: usize,
    pub failed: usize,
    /// Correct top candidate with the eye colour filter.
    pub rank1_fused: usize,
    /// Correct top candidate from the recognizer alone.
    pub rank1_unfiltered: usize,
}

impl EvaluationReport {
    fn rate(hits: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    pub fn fused_rate(&self) -> f64 {
        Self::rate(self.rank1_fused, self.probes)
    }

    pub fn unfiltered_rate(&self) -> f64 {
        Self::rate(self.rank1_unfiltered, self.probes)
    }

    fn record(&mut self, probe: &Probe, outcome: &ProbeOutcome) {
        self.probes += 1;
        let identification = match outcome {
            Ok(id) => id,
            Err(e) => {
                self.failed += 1;
                log::warn!("Probe {} failed: {e}", probe.path.display());
                return;
            }
        };
        if identification.ranking.is_empty() {
            return;
        }
        self.ranked += 1;
        let top = |r: &RankedResult| r.best().map(|c| c.subject_id);
        if top(&identification.ranking) == Some(probe.subject_id) {
            self.rank1_fused += 1;
        }
        if top(&identification.unfiltered) == Some(probe.subject_id) {
            self.rank1_unfiltered += 1;
        }
    }
}

/// Labelled probes from a directory with one `s<id>` folder per subject.
pub fn probes_in(dir: &Path) -> std::io::Result<Vec<Probe>> {
    Ok(scan_labeled_images(dir)?
        .into_iter()
        .map(|(subject_id, path)| Probe { subject_id, path })
        .collect())
}

/// Compares identification with and without the eye colour filter.
pub struct EvaluateUseCase {
    use_case: Arc<IdentifyUseCase>,
    executor: Box<dyn BatchExecutor>,
}

impl EvaluateUseCase {
    pub fn new(use_case: Arc<IdentifyUseCase>, executor: Box<dyn BatchExecutor>) -> Self {
        Self { use_case, executor }
    }

    pub fn execute(
        &self,
        probes: &[Probe],
        logger: &mut dyn PipelineLogger,
    ) -> Result<EvaluationReport, Box<dyn std::error::Error>> {
        logger.info(&format!("Evaluating {} probes", probes.len()));
        let outcomes = self.executor.execute(self.use_case.clone(), probes, logger)?;

        let mut report = EvaluationReport::default();
        for (probe, outcome) in probes.iter().zip(&outcomes) {
            report.record(probe, outcome);
        }
        logger.info(&format!(
            "Rank-1: {:.1}% with eye colour, {:.1}% without ({} probes, {} failed)",
            report.fused_rate() * 100.0,
            report.unfiltered_rate() * 100.0,
            report.probes,
            report.failed
        ));
        logger.summary();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::identify_use_case::tests::{
        face_with_eyes, use_case, StubReader, StubRecognizer,
    };
    use crate::pipeline::identify_use_case::Identification;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use approx::assert_relative_eq;
    use std::collections::HashMap;

    /// Runs probes one by one on the calling thread.
    struct InlineExecutor;

    impl BatchExecutor for InlineExecutor {
        fn execute(
            &self,
            use_case: Arc<IdentifyUseCase>,
            probes: &[Probe],
            _logger: &mut dyn PipelineLogger,
        ) -> Result<Vec<ProbeOutcome>, Box<dyn std::error::Error>> {
            Ok(probes
                .iter()
                .map(|p| use_case.execute_path(&p.path).map_err(|e| e.to_string().into()))
                .collect())
        }
    }

    #[test]
    fn test_eye_filter_improves_rank1() {
        let dir = tempfile::tempdir().unwrap();
        let (_, eyes) = face_with_eyes([0, 0, 0]);
        let mut frames = HashMap::new();
        let mut probes = Vec::new();
        // Recognizer always prefers subject 2 (green); probes are blue-eyed subject 1.
        for i in 0..4 {
            let path = dir.path().join(format!("p{i}.png"));
            std::fs::write(&path, b"").unwrap();
            frames.insert(path.clone(), face_with_eyes([100, 140, 180]).0);
            probes.push(Probe {
                subject_id: 1,
                path,
            });
        }
        probes.push(Probe {
            subject_id: 1,
            path: dir.path().join("missing.png"),
        });

        let uc = use_case(
            vec![],
            eyes,
            StubRecognizer::new(&[(2, 50.0), (1, 80.0), (3, 90.0)]),
            StubReader(frames),
        );
        let report = EvaluateUseCase::new(Arc::new(uc), Box::new(InlineExecutor))
            .execute(&probes, &mut NullPipelineLogger)
            .unwrap();

        assert_eq!(report.probes, 5);
        assert_eq!(report.ranked, 4);
        assert_eq!(report.failed, 0);
        assert_eq!(report.rank1_fused, 4);
        assert_eq!(report.rank1_unfiltered, 0);
        assert_relative_eq!(report.fused_rate(), 0.8);
        assert_relative_eq!(report.unfiltered_rate(), 0.0);
    }

    #[test]
    fn test_record_counts_failures() {
        let mut report = EvaluationReport::default();
        let probe = Probe {
            subject_id: 1,
            path: "x.png".into(),
        };
        report.record(&probe, &Err("boom".into()));
        report.record(&probe, &Ok(Identification::empty()));
        assert_eq!(report.probes, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.ranked, 0);
    }

    #[test]
    fn test_empty_report_rates_are_zero() {
        let report = EvaluationReport::default();
        assert_relative_eq!(report.fused_rate(), 0.0);
        assert_relative_eq!(report.unfiltered_rate(), 0.0);
    }

    #[test]
    fn test_probes_in_directory() {
        let root = tempfile::tempdir().unwrap();
        let subject = root.path().join("s05");
        std::fs::create_dir(&subject).unwrap();
        std::fs::write(subject.join("a.png"), b"").unwrap();
        let probes = probes_in(root.path()).unwrap();
        assert_eq!(
            probes,
            vec![Probe {
                subject_id: 5,
                path: subject.join("a.png")
            }]
        );
    }
}
