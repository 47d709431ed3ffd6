use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use crate::alignment::domain::face_aligner::FaceAligner;
use crate::detection::domain::face_locator::{FaceLocator, LocatedFace};
use crate::eye_color::domain::eye_color_classifier::{CandidateColorSet, EyeColorClassifier};
use crate::identification::domain::color_filter::allow_list;
use crate::identification::domain::face_recognizer::FaceRecognizer;
use crate::identification::domain::fusion::fuse;
use crate::identification::domain::gallery_registry::GalleryRegistry;
use crate::identification::domain::ranked_result::{Candidate, RankedResult};
use crate::io::domain::image_reader::ImageReader;
use crate::shared::frame::Frame;

/// Outcome of one identification query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Identification {
    /// Recognizer ranking after the eye colour filter.
    pub ranking: RankedResult,
    /// Recognizer ranking before filtering.
    pub unfiltered: RankedResult,
    /// Candidate colours per located eye, left to right.
    pub eye_colors: Vec<CandidateColorSet>,
    pub allow_list: BTreeSet<u32>,
}

impl Identification {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn best(&self) -> Option<&Candidate> {
        self.ranking.best()
    }
}

/// Candidate colours per located eye, left to right. Eyes whose iris
/// region falls outside the face crop are skipped.
pub fn eye_candidates(located: &LocatedFace, classifier: &EyeColorClassifier) -> Vec<CandidateColorSet> {
    let (w, h) = (located.face.width(), located.face.height());
    located
        .eyes
        .iter()
        .filter_map(|eye| eye.iris_region().clamp_to(w, h))
        .map(|iris| classifier.candidates(&located.face.crop(&iris)))
        .collect()
}

/// Probe image → ranked gallery candidates.
///
/// Holds only read-only collaborators, so one instance can serve many
/// queries concurrently.
pub struct IdentifyUseCase {
    locator: FaceLocator,
    aligner: FaceAligner,
    recognizer: Box<dyn FaceRecognizer>,
    classifier: EyeColorClassifier,
    registry: Arc<GalleryRegistry>,
    reader: Box<dyn ImageReader>,
}

impl IdentifyUseCase {
    pub fn new(
        locator: FaceLocator,
        aligner: FaceAligner,
        recognizer: Box<dyn FaceRecognizer>,
        classifier: EyeColorClassifier,
        registry: Arc<GalleryRegistry>,
        reader: Box<dyn ImageReader>,
    ) -> Self {
        Self {
            locator,
            aligner,
            recognizer,
            classifier,
            registry,
            reader,
        }
    }

    pub fn registry(&self) -> &GalleryRegistry {
        &self.registry
    }

    /// Identifies the face in an image file. A missing file is not an
    /// error: it yields an empty identification.
    pub fn execute_path(&self, path: &Path) -> Result<Identification, Box<dyn std::error::Error>> {
        if !path.exists() {
            log::warn!("Probe {} does not exist; nothing to identify", path.display());
            return Ok(Identification::empty());
        }
        let frame = self.reader.read(path)?;
        self.execute(&frame)
    }

    /// Detect → align → recognise → classify eye colours → filter.
    pub fn execute(&self, frame: &Frame) -> Result<Identification, Box<dyn std::error::Error>> {
        let located = self.locator.locate(frame)?;
        let probe = self.normalized_face(&located);
        let unfiltered = self.recognizer.score(&probe)?;

        let eye_colors = eye_candidates(&located, &self.classifier);
        let allow = allow_list(&eye_colors, &self.registry);
        let ranking = fuse(&unfiltered, &allow, self.registry.gallery_size());

        if let Some(best) = ranking.best() {
            log::debug!(
                "Best match s{} at {:.2} ({} of {} candidates kept)",
                best.subject_id,
                best.distance,
                ranking.len(),
                unfiltered.len()
            );
        }

        Ok(Identification {
            ranking,
            unfiltered,
            eye_colors,
            allow_list: allow,
        })
    }

    /// Aligned face when both eyes are known, else the face crop as is.
    fn normalized_face(&self, located: &LocatedFace) -> Frame {
        let [left, right] = located.eyes.as_slice() else {
            return located.face.clone();
        };
        match self.aligner.align(&located.face, left.center, right.center) {
            Ok(aligned) => aligned,
            Err(e) => {
                log::warn!("Skipping alignment: {e}");
                located.face.clone()
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::alignment::domain::face_aligner::AlignParams;
    use crate::detection::domain::face_locator::tests::FixedDetector;
    use crate::eye_color::domain::eye_color_classifier::DEFAULT_TIE_TOLERANCE;
    use crate::eye_color::domain::palette::{EyeColor, EyePalette};
    use crate::shared::geometry::Rect;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    // ── Stubs ───────────────────────────────────────────────────────

    /// Fixed ranking; records the size of every face it is asked to score.
    pub(crate) struct StubRecognizer {
        scores: Vec<(u32, f64)>,
        seen: Arc<Mutex<Vec<(u32, u32)>>>,
    }

    impl StubRecognizer {
        pub(crate) fn new(scores: &[(u32, f64)]) -> Self {
            Self {
                scores: scores.to_vec(),
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl FaceRecognizer for StubRecognizer {
        fn score(&self, face: &Frame) -> Result<RankedResult, Box<dyn std::error::Error>> {
            self.seen.lock().unwrap().push((face.width(), face.height()));
            Ok(RankedResult::from_scores(self.scores.clone()))
        }
    }

    /// Serves frames from memory keyed by path.
    pub(crate) struct StubReader(pub HashMap<PathBuf, Frame>);

    impl ImageReader for StubReader {
        fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
            self.0
                .get(path)
                .cloned()
                .ok_or_else(|| format!("no stub image for {}", path.display()).into())
        }
    }

    pub(crate) fn registry() -> Arc<GalleryRegistry> {
        Arc::new(GalleryRegistry::parse("0  s1  Blue\n1  s2  Green\n2  s3  Blue\n").unwrap())
    }

    /// 200x200 dark face with two 40x40 eye boxes painted `eye_rgb`.
    pub(crate) fn face_with_eyes(eye_rgb: [u8; 3]) -> (Frame, Vec<Rect>) {
        let eyes = vec![Rect::new(30, 60, 40, 40), Rect::new(130, 60, 40, 40)];
        let mut img = Frame::filled(200, 200, [40, 40, 40]).to_rgb_image();
        for r in &eyes {
            for y in r.y..r.y + r.height {
                for x in r.x..r.x + r.width {
                    img.put_pixel(x as u32, y as u32, image::Rgb(eye_rgb));
                }
            }
        }
        (Frame::from_rgb_image(img), eyes)
    }

    pub(crate) fn use_case(
        faces: Vec<Rect>,
        eyes: Vec<Rect>,
        recognizer: StubRecognizer,
        reader: StubReader,
    ) -> IdentifyUseCase {
        IdentifyUseCase::new(
            FaceLocator::new(Box::new(FixedDetector(faces)), Box::new(FixedDetector(eyes))),
            FaceAligner::new(AlignParams::default()),
            Box::new(recognizer),
            EyeColorClassifier::new(Arc::new(EyePalette::default()), DEFAULT_TIE_TOLERANCE),
            registry(),
            Box::new(reader),
        )
    }

    const RANKED: &[(u32, f64)] = &[(2, 50.0), (1, 80.0), (3, 90.0)];
    const BLUE: [u8; 3] = [100, 140, 180];
    const YELLOW: [u8; 3] = [210, 200, 150];

    fn ids(r: &RankedResult) -> Vec<u32> {
        r.candidates().iter().map(|c| c.subject_id).collect()
    }

    // ── Tests ───────────────────────────────────────────────────────

    #[test]
    fn test_blue_eyes_restrict_ranking() {
        let (frame, eyes) = face_with_eyes(BLUE);
        let uc = use_case(vec![], eyes, StubRecognizer::new(RANKED), StubReader(HashMap::new()));
        let id = uc.execute(&frame).unwrap();

        assert_eq!(id.eye_colors, vec![CandidateColorSet::from([EyeColor::Blue]); 2]);
        assert_eq!(id.allow_list, BTreeSet::from([1, 3]));
        assert_eq!(ids(&id.ranking), vec![1, 3]);
        assert_eq!(ids(&id.unfiltered), vec![2, 1, 3]);
        assert_eq!(id.best().unwrap().distance, 80.0);
    }

    #[test]
    fn test_unmatched_colour_keeps_ranking() {
        let (frame, eyes) = face_with_eyes(YELLOW);
        let uc = use_case(vec![], eyes, StubRecognizer::new(RANKED), StubReader(HashMap::new()));
        let id = uc.execute(&frame).unwrap();

        assert!(id.allow_list.is_empty());
        assert_eq!(id.ranking, id.unfiltered);
    }

    #[test]
    fn test_no_eyes_allows_whole_gallery() {
        let (frame, _) = face_with_eyes(BLUE);
        let uc = use_case(vec![], vec![], StubRecognizer::new(RANKED), StubReader(HashMap::new()));
        let id = uc.execute(&frame).unwrap();

        assert!(id.eye_colors.is_empty());
        assert_eq!(id.allow_list, BTreeSet::from([1, 2, 3]));
        assert_eq!(ids(&id.ranking), vec![2, 1, 3]);
    }

    #[test]
    fn test_single_eye_filters_directly() {
        let (frame, eyes) = face_with_eyes(BLUE);
        let uc = use_case(
            vec![],
            eyes[..1].to_vec(),
            StubRecognizer::new(RANKED),
            StubReader(HashMap::new()),
        );
        let id = uc.execute(&frame).unwrap();
        assert_eq!(id.eye_colors.len(), 1);
        assert_eq!(ids(&id.ranking), vec![1, 3]);
    }

    #[test]
    fn test_two_eyes_are_aligned_before_scoring() {
        let (frame, eyes) = face_with_eyes(BLUE);
        let recognizer = StubRecognizer::new(RANKED);
        let seen = recognizer.seen.clone();
        let uc = use_case(
            vec![Rect::new(0, 0, 200, 180)],
            eyes,
            recognizer,
            StubReader(HashMap::new()),
        );
        uc.execute(&frame).unwrap();
        // The 200x180 face crop comes back at the 200x200 alignment size.
        assert_eq!(*seen.lock().unwrap(), vec![(200, 200)]);
    }

    #[test]
    fn test_unaligned_face_scored_as_cropped() {
        let frame = Frame::filled(300, 240, [40, 40, 40]);
        let recognizer = StubRecognizer::new(RANKED);
        let seen = recognizer.seen.clone();
        let uc = use_case(
            vec![Rect::new(10, 20, 120, 90)],
            vec![],
            recognizer,
            StubReader(HashMap::new()),
        );
        uc.execute(&frame).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![(120, 90)]);
    }

    #[test]
    fn test_missing_probe_yields_empty_identification() {
        let uc = use_case(vec![], vec![], StubRecognizer::new(RANKED), StubReader(HashMap::new()));
        let id = uc
            .execute_path(Path::new("/nonexistent/probe.png"))
            .unwrap();
        assert_eq!(id, Identification::empty());
        assert!(id.best().is_none());
    }

    #[test]
    fn test_execute_path_reads_through_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.png");
        std::fs::write(&path, b"").unwrap();
        let (frame, eyes) = face_with_eyes(BLUE);
        let reader = StubReader(HashMap::from([(path.clone(), frame)]));
        let uc = use_case(vec![], eyes, StubRecognizer::new(RANKED), reader);
        let id = uc.execute_path(&path).unwrap();
        assert_eq!(ids(&id.ranking), vec![1, 3]);
    }

    #[test]
    fn test_eye_candidates_without_recognizer() {
        let (frame, eyes) = face_with_eyes(YELLOW);
        let locator = FaceLocator::new(
            Box::new(FixedDetector(vec![])),
            Box::new(FixedDetector(eyes)),
        );
        let classifier =
            EyeColorClassifier::new(Arc::new(EyePalette::default()), DEFAULT_TIE_TOLERANCE);
        let colors = eye_candidates(&locator.locate(&frame).unwrap(), &classifier);
        assert_eq!(colors, vec![CandidateColorSet::from([EyeColor::Yellow]); 2]);
    }

    #[test]
    fn test_iris_outside_face_is_skipped() {
        let frame = Frame::filled(50, 50, BLUE);
        let located = FaceLocator::new(
            Box::new(FixedDetector(vec![])),
            Box::new(FixedDetector(vec![Rect::new(5, 5, 20, 20), Rect::new(60, 5, 20, 20)])),
        )
        .locate(&frame)
        .unwrap();
        let classifier =
            EyeColorClassifier::new(Arc::new(EyePalette::default()), DEFAULT_TIE_TOLERANCE);
        assert_eq!(eye_candidates(&located, &classifier).len(), 1);
    }
}
