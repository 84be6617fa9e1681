//! Fisherfaces training: PCA followed by LDA.
//!
//! 1. Flatten the training images and subtract the mean image
//! 2. Keep at most `N - C` principal components (N samples, C categories)
//!    so the within-class scatter stays non-singular
//! 3. In that space, find the `C - 1` directions maximising between-class
//!    over within-class scatter
//! 4. Compose both projections and project every training sample to get
//!    the prototypes used for nearest-neighbour prediction

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::corpus::ImageSample;
use crate::error::{Error, Result};
use crate::frame::ImageAccess;
use crate::linalg::{discriminant_axes, principal_components};
use crate::model::FisherModel;
use crate::split::Split;
use crate::types::{Categories, Dimensions};

/// Tunable training parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Upper bound on principal components; `N - C` always applies.
    pub max_components: Option<usize>,
}

/// Builds a [`FisherModel`] from labelled samples.
#[derive(Debug, Clone)]
pub struct SubspaceTrainer {
    categories: Categories,
    dimensions: Dimensions,
    config: TrainConfig,
}

impl SubspaceTrainer {
    pub fn new(categories: Categories, dimensions: Dimensions) -> Self {
        Self {
            categories,
            dimensions,
            config: TrainConfig::default(),
        }
    }

    /// Trainer for the category set and image size of a split.
    pub fn for_split(split: &Split) -> Self {
        Self::new(split.categories().clone(), split.dimensions())
    }

    pub fn with_config(mut self, config: TrainConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_components(mut self, max: usize) -> Self {
        self.config.max_components = Some(max);
        self
    }

    pub fn categories(&self) -> &Categories {
        &self.categories
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Train on `samples`. Deterministic for a given sample order.
    pub fn train(&self, samples: &[ImageSample]) -> Result<FisherModel> {
        let num_classes = self.categories.len();
        self.check_samples(samples)?;

        let n = samples.len();
        let pixels = self.dimensions.pixel_count();
        log::info!(
            "Training Fisherfaces on {} image(s) of {} across {} categories",
            n,
            self.dimensions,
            num_classes
        );

        let mut data = DMatrix::<f64>::zeros(pixels, n);
        for (j, sample) in samples.iter().enumerate() {
            data.set_column(j, &sample.image.intensities());
        }

        let mut mean = DVector::<f64>::zeros(pixels);
        for column in data.column_iter() {
            mean += column;
        }
        mean /= n as f64;
        for mut column in data.column_iter_mut() {
            column -= &mean;
        }

        // Global reduction
        let cap = (n - num_classes).min(self.config.max_components.unwrap_or(usize::MAX));
        let pca = principal_components(&data, cap);
        let k1 = pca.ncols();
        if k1 == 0 {
            return Err(Error::InsufficientData(
                "training images have no variance".into(),
            ));
        }
        log::debug!("Kept {} principal component(s) (cap {})", k1, cap);

        let reduced = pca.tr_mul(&data);
        drop(data);

        // Class separation in the reduced space
        let (between, within) = scatter_matrices(&reduced, samples, num_classes);
        let wanted = (num_classes - 1).min(k1);
        let (eigenvalues, lda) = discriminant_axes(&between, &within, wanted)?;
        log::debug!("Discriminant eigenvalues: {:?}", eigenvalues);

        let projection = &pca * &lda;
        let mut model = FisherModel::new(
            self.categories.clone(),
            self.dimensions,
            mean,
            projection,
            eigenvalues,
        );
        for sample in samples {
            model.add_prototype(&sample.image, sample.category)?;
        }

        log::info!(
            "Trained model with {} discriminant component(s) and {} prototype(s)",
            model.num_components(),
            model.prototypes().len()
        );
        Ok(model)
    }

    fn check_samples(&self, samples: &[ImageSample]) -> Result<()> {
        let num_classes = self.categories.len();
        if num_classes < 2 {
            return Err(Error::InsufficientData(format!(
                "discriminant analysis needs at least 2 categories, got {}",
                num_classes
            )));
        }

        let mut counts = vec![0usize; num_classes];
        for sample in samples {
            if sample.image.dimensions() != self.dimensions {
                return Err(Error::DimensionMismatch {
                    expected: self.dimensions,
                    actual: sample.image.dimensions(),
                });
            }
            match counts.get_mut(sample.category) {
                Some(count) => *count += 1,
                None => {
                    return Err(Error::InvalidConfig(format!(
                        "sample '{}' has unknown category index {}",
                        sample.source, sample.category
                    )))
                }
            }
        }

        if let Some(empty) = counts.iter().position(|&c| c == 0) {
            return Err(Error::InsufficientData(format!(
                "category '{}' has no training samples",
                self.categories.name(empty).unwrap_or("?")
            )));
        }
        if samples.len() <= num_classes {
            return Err(Error::InsufficientData(format!(
                "{} training samples for {} categories; need more samples than categories",
                samples.len(),
                num_classes
            )));
        }
        Ok(())
    }
}

/// Between-class and within-class scatter of the columns of `reduced`.
fn scatter_matrices(
    reduced: &DMatrix<f64>,
    samples: &[ImageSample],
    num_classes: usize,
) -> (DMatrix<f64>, DMatrix<f64>) {
    let k = reduced.nrows();
    let n = reduced.ncols();

    let mut overall = DVector::<f64>::zeros(k);
    let mut class_means = vec![DVector::<f64>::zeros(k); num_classes];
    let mut counts = vec![0usize; num_classes];
    for (column, sample) in reduced.column_iter().zip(samples) {
        overall += column;
        class_means[sample.category] += column;
        counts[sample.category] += 1;
    }
    overall /= n as f64;
    for (m, &c) in class_means.iter_mut().zip(&counts) {
        *m /= c as f64;
    }

    let mut within = DMatrix::<f64>::zeros(k, k);
    for (column, sample) in reduced.column_iter().zip(samples) {
        let d = column - &class_means[sample.category];
        within += &d * d.transpose();
    }

    let mut between = DMatrix::<f64>::zeros(k, k);
    for (m, &c) in class_means.iter().zip(&counts) {
        let d = m - &overall;
        between += (&d * d.transpose()) * c as f64;
    }

    (between, within)
}
