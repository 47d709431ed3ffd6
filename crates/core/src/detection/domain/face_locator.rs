use crate::detection::domain::eye_locator::{locate_eyes, EyePoint};
use crate::detection::domain::region_detector::RegionDetector;
use crate::shared::frame::Frame;
use crate::shared::geometry::Rect;

/// A face crop with its eyes, in crop coordinates.
pub struct LocatedFace {
    /// Face bounds in the source frame.
    pub bounds: Rect,
    /// False when no face was found and the whole frame stands in.
    pub detected: bool,
    pub face: Frame,
    pub eyes: Vec<EyePoint>,
}

/// Runs the face detector, then the eye detector inside the chosen face.
pub struct FaceLocator {
    face_detector: Box<dyn RegionDetector>,
    eye_detector: Box<dyn RegionDetector>,
}

impl FaceLocator {
    pub fn new(face_detector: Box<dyn RegionDetector>, eye_detector: Box<dyn RegionDetector>) -> Self {
        Self {
            face_detector,
            eye_detector,
        }
    }

    /// The largest detected face wins. Probe images are often already
    /// cropped to the face, so with no detection the whole frame is used.
    pub fn locate(&self, frame: &Frame) -> Result<LocatedFace, Box<dyn std::error::Error>> {
        let faces = self.face_detector.detect(frame)?;
        let largest = faces
            .iter()
            .filter_map(|r| r.clamp_to(frame.width(), frame.height()))
            .max_by_key(|r| r.area());

        let (bounds, detected) = match largest {
            Some(r) => (r, true),
            None => {
                log::debug!("No face detected; using the whole {}x{} frame", frame.width(), frame.height());
                (
                    Rect::new(0, 0, frame.width() as i32, frame.height() as i32),
                    false,
                )
            }
        };
        let face = if detected { frame.crop(&bounds) } else { frame.clone() };

        let eyes = locate_eyes(&self.eye_detector.detect(&face)?);
        log::debug!("Face {bounds:?}: {} faces, {} eyes", faces.len(), eyes.len());

        Ok(LocatedFace {
            bounds,
            detected,
            face,
            eyes,
        })
    }
}
