//! Classifying the faces found in a camera frame.
//!
//! Face detection itself is delegated to a [`FaceLocator`]. This module only
//! crops what the locator reports, scales each crop to the model's input
//! size and classifies it. Resizing happens here and nowhere else: the
//! classifier itself rejects images of the wrong size.

use rustface::{Detector, ImageData};
use serde::Serialize;

use crate::classifier::EmotionRecognizer;
use crate::error::{Error, Result};
use crate::frame::{GrayImage, ImageAccess};
use crate::model::FisherModel;
use crate::types::{FaceRegion, Prediction};

/// Finds face rectangles in a grayscale frame.
pub trait FaceLocator {
    fn locate(&mut self, frame: &GrayImage) -> Vec<FaceRegion>;
}

/// [`FaceLocator`] backed by the SeetaFace frontal detector from `rustface`.
pub struct RustfaceLocator {
    detector: Box<dyn Detector>,
}

impl RustfaceLocator {
    /// Load a SeetaFace model (e.g. `seeta_fd_frontal_v1.0.bin`).
    pub fn load(model_path: &str, min_face_size: u32) -> Result<Self> {
        let mut detector = rustface::create_detector(model_path)
            .map_err(|e| Error::Detector(format!("failed to load {}: {}", model_path, e)))?;
        detector.set_min_face_size(min_face_size);
        detector.set_score_thresh(2.0);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);
        Ok(Self { detector })
    }
}

impl FaceLocator for RustfaceLocator {
    fn locate(&mut self, frame: &GrayImage) -> Vec<FaceRegion> {
        let image = ImageData::new(frame.as_raw(), frame.width(), frame.height());
        self.detector
            .detect(&image)
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                FaceRegion::new(bbox.x(), bbox.y(), bbox.width(), bbox.height())
            })
            .collect()
    }
}

/// One classified face.
#[derive(Debug, Clone, Serialize)]
pub struct FaceEmotion {
    pub region: FaceRegion,
    pub prediction: Prediction,
    pub label: String,
}

/// Crop `region` from `frame` and scale it to the model's input size.
pub fn prepare_face(frame: &GrayImage, region: &FaceRegion, model: &FisherModel) -> Option<GrayImage> {
    let dims = model.dimensions();
    frame
        .crop(region)
        .map(|face| face.resized(dims.width, dims.height))
}

/// Locate and classify every face in `frame`.
///
/// Faces that cannot be classified are logged and left out; the frame as a
/// whole only fails when no model is available.
pub fn classify_frame<L: FaceLocator>(
    frame: &GrayImage,
    locator: &mut L,
    recognizer: &EmotionRecognizer,
) -> Result<Vec<FaceEmotion>> {
    let model = recognizer.model()?;
    let regions = locator.locate(frame);
    log::debug!("Located {} face(s)", regions.len());

    let mut faces = Vec::with_capacity(regions.len());
    for region in regions {
        let Some(face) = prepare_face(frame, &region, &model) else {
            log::warn!("Skipping face {:?}: outside the frame", region);
            continue;
        };
        let prediction = match model.classify(&face) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("Skipping face {:?}: {}", region, e);
                continue;
            }
        };
        let label = model.label(&prediction).unwrap_or("unknown").to_string();
        faces.push(FaceEmotion {
            region,
            prediction,
            label,
        });
    }
    Ok(faces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::ImageSample;
    use crate::trainer::SubspaceTrainer;
    use crate::types::{Categories, Dimensions};

    /// Reports fixed rectangles regardless of the frame.
    struct FixedLocator(Vec<FaceRegion>);

    impl FaceLocator for FixedLocator {
        fn locate(&mut self, _frame: &GrayImage) -> Vec<FaceRegion> {
            self.0.clone()
        }
    }

    fn trained_recognizer() -> EmotionRecognizer {
        let samples: Vec<_> = (0..10u32)
            .map(|i| {
                let category = (i % 2) as usize;
                let base = if category == 0 { 20 } else { 230 };
                ImageSample {
                    image: GrayImage::from_fn(4, 4, move |x, y| (base + (x + 2 * y + i) % 4) as u8),
                    category,
                    source: format!("s{i}"),
                }
            })
            .collect();
        let trainer = SubspaceTrainer::new(
            Categories::new(&["dark", "light"]).unwrap(),
            Dimensions::new(4, 4),
        );
        let recognizer = EmotionRecognizer::new();
        recognizer.train(&trainer, &samples).unwrap();
        recognizer
    }

    #[test]
    fn faces_are_cropped_resized_and_labelled() {
        let recognizer = trained_recognizer();
        // Dark left half, light right half
        let frame = GrayImage::from_fn(40, 20, |x, _| if x < 20 { 20 } else { 230 });
        let mut locator = FixedLocator(vec![
            FaceRegion::new(2, 2, 12, 12),
            FaceRegion::new(24, 4, 10, 10),
        ]);

        let faces = classify_frame(&frame, &mut locator, &recognizer).unwrap();
        assert_eq!(faces.len(), 2);
        assert_eq!(faces[0].label, "dark");
        assert_eq!(faces[1].label, "light");
        assert_eq!(faces[1].region, FaceRegion::new(24, 4, 10, 10));
    }

    #[test]
    fn regions_outside_the_frame_are_skipped() {
        let recognizer = trained_recognizer();
        let frame = GrayImage::from_fn(10, 10, |_, _| 20);
        let mut locator = FixedLocator(vec![FaceRegion::new(50, 50, 5, 5), FaceRegion::new(0, 0, 8, 8)]);

        let faces = classify_frame(&frame, &mut locator, &recognizer).unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].region, FaceRegion::new(0, 0, 8, 8));
    }

    #[test]
    fn untrained_recognizer_fails_the_frame() {
        let frame = GrayImage::from_fn(10, 10, |_, _| 0);
        let mut locator = FixedLocator(vec![FaceRegion::new(0, 0, 4, 4)]);
        let result = classify_frame(&frame, &mut locator, &EmotionRecognizer::new());
        assert!(matches!(result, Err(Error::ModelNotTrained)));
    }
}
