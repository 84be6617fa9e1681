//! Inference entry points.
//!
//! [`Classify`] is the seam the evaluator and the frame pipeline depend on.
//! [`EmotionRecognizer`] is the long-lived handle a camera loop keeps: it
//! starts untrained, can be (re)trained or loaded at any time, and hands the
//! current model out by `Arc` so any number of threads classify concurrently.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::corpus::ImageSample;
use crate::error::{Error, Result};
use crate::frame::ImageAccess;
use crate::model::FisherModel;
use crate::trainer::SubspaceTrainer;
use crate::types::{Categories, Dimensions, Prediction};

/// Anything that maps a face image to a category.
pub trait Classify {
    fn classify<I: ImageAccess>(&self, image: &I) -> Result<Prediction>;
}

impl Classify for FisherModel {
    fn classify<I: ImageAccess>(&self, image: &I) -> Result<Prediction> {
        FisherModel::classify(self, image)
    }
}

impl<C: Classify> Classify for Arc<C> {
    fn classify<I: ImageAccess>(&self, image: &I) -> Result<Prediction> {
        C::classify(self, image)
    }
}

#[derive(Debug, Default)]
pub struct EmotionRecognizer {
    model: RwLock<Option<Arc<FisherModel>>>,
    training: Mutex<()>,
}

impl EmotionRecognizer {
    /// An untrained recognizer. Classification fails with
    /// [`Error::ModelNotTrained`] until a model is trained or installed.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(model: FisherModel) -> Self {
        Self {
            model: RwLock::new(Some(Arc::new(model))),
            training: Mutex::new(()),
        }
    }

    /// Load a saved model.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::with_model(FisherModel::load(path)?))
    }

    pub fn is_trained(&self) -> bool {
        self.model
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// The current model.
    pub fn model(&self) -> Result<Arc<FisherModel>> {
        self.model
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(Error::ModelNotTrained)
    }

    pub fn categories(&self) -> Result<Categories> {
        Ok(self.model()?.categories().clone())
    }

    pub fn dimensions(&self) -> Result<Dimensions> {
        Ok(self.model()?.dimensions())
    }

    /// Train a fresh model and make it current.
    ///
    /// Training runs are serialized; readers keep using the previous model
    /// until the new one is swapped in. On failure the previous model stays.
    pub fn train(&self, trainer: &SubspaceTrainer, samples: &[ImageSample]) -> Result<Arc<FisherModel>> {
        let _guard = self.training.lock().unwrap_or_else(PoisonError::into_inner);
        let model = trainer.train(samples)?;
        Ok(self.install(model))
    }

    /// Replace the current model.
    pub fn install(&self, model: FisherModel) -> Arc<FisherModel> {
        let model = Arc::new(model);
        *self.model.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&model));
        model
    }

    /// Classify and return the category name, for display.
    pub fn classify_label<I: ImageAccess>(&self, image: &I) -> Result<String> {
        let model = self.model()?;
        let prediction = model.classify(image)?;
        model
            .label(&prediction)
            .map(str::to_string)
            .ok_or_else(|| Error::InvalidModel(format!("no category {}", prediction.category)))
    }
}

impl Classify for EmotionRecognizer {
    fn classify<I: ImageAccess>(&self, image: &I) -> Result<Prediction> {
        self.model()?.classify(image)
    }
}
