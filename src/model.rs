use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::frame::ImageAccess;
use crate::types::{Categories, Dimensions, Prediction};

/// A projected training sample kept for nearest-neighbour prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Prototype {
    pub category: usize,
    pub vector: DVector<f64>,
}

/// A trained Fisherfaces model.
///
/// The model consists of:
/// - The mean training image (flattened)
/// - The composed PCA x LDA projection from pixel space to discriminant space
/// - Every training sample projected into discriminant space, labelled
///
/// Prediction returns the category of the nearest projected training sample.
/// The model is immutable once built, so it can be shared between threads
/// and classify concurrently.
///
/// # Usage
///
/// ```ignore
/// let model = FisherModel::load("model.bin")?;
/// let prediction = model.classify(&face)?;
/// println!("{}", model.categories().name(prediction.category).unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct FisherModel {
    categories: Categories,
    dimensions: Dimensions,
    mean: DVector<f64>,
    /// pixels x components.
    projection: DMatrix<f64>,
    /// Generalised eigenvalue of each discriminant component.
    eigenvalues: Vec<f64>,
    prototypes: Vec<Prototype>,
}

impl FisherModel {
    /// Assemble a model from a projection. Prototypes are added afterwards
    /// with [`FisherModel::add_prototype`] so they go through [`FisherModel::project`].
    pub(crate) fn new(
        categories: Categories,
        dimensions: Dimensions,
        mean: DVector<f64>,
        projection: DMatrix<f64>,
        eigenvalues: Vec<f64>,
    ) -> Self {
        Self {
            categories,
            dimensions,
            mean,
            projection,
            eigenvalues,
            prototypes: Vec::new(),
        }
    }

    pub(crate) fn add_prototype<I: ImageAccess>(&mut self, image: &I, category: usize) -> Result<()> {
        let vector = self.project(image)?;
        self.prototypes.push(Prototype { category, vector });
        Ok(())
    }

    /// Load a model from a binary file written by [`FisherModel::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let export: ModelExport = bincode::deserialize(&bytes)?;
        Self::from_export(export)
    }

    /// Save the model to a binary file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        let bytes = bincode::serialize(&self.to_export())?;
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }

    /// Write the flat-array form of the model as pretty JSON.
    pub fn export_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.to_export())?;
        writer.flush()?;
        Ok(())
    }

    pub fn categories(&self) -> &Categories {
        &self.categories
    }

    /// Input image size the model was trained on.
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Dimension of the discriminant space.
    pub fn num_components(&self) -> usize {
        self.projection.ncols()
    }

    pub fn eigenvalues(&self) -> &[f64] {
        &self.eigenvalues
    }

    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    pub fn projection(&self) -> &DMatrix<f64> {
        &self.projection
    }

    pub fn prototypes(&self) -> &[Prototype] {
        &self.prototypes
    }

    /// Project an image into discriminant space.
    ///
    /// The image must already have the model's input size; nothing is resized here.
    pub fn project<I: ImageAccess>(&self, image: &I) -> Result<DVector<f64>> {
        let actual = image.dimensions();
        if actual != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual,
            });
        }
        let centered = image.intensities() - &self.mean;
        Ok(self.projection.tr_mul(&centered))
    }

    /// The prototype closest to `point` by Euclidean distance.
    ///
    /// Equal distances resolve to the lowest category index.
    pub fn nearest(&self, point: &DVector<f64>) -> Option<Prediction> {
        let mut best: Option<Prediction> = None;
        for prototype in &self.prototypes {
            let distance = (&prototype.vector - point).norm();
            let closer = match best {
                None => true,
                Some(b) => {
                    distance < b.distance
                        || (distance == b.distance && prototype.category < b.category)
                }
            };
            if closer {
                best = Some(Prediction {
                    category: prototype.category,
                    distance,
                });
            }
        }
        best
    }

    /// Predict the category of a face image.
    pub fn classify<I: ImageAccess>(&self, image: &I) -> Result<Prediction> {
        let point = self.project(image)?;
        self.nearest(&point)
            .ok_or_else(|| Error::InvalidModel("model has no prototypes".into()))
    }

    /// Display name of a predicted category.
    pub fn label(&self, prediction: &Prediction) -> Option<&str> {
        self.categories.name(prediction.category)
    }

    /// Flatten the model into plain numeric arrays.
    pub fn to_export(&self) -> ModelExport {
        let (rows, components) = self.projection.shape();
        ModelExport {
            categories: self.categories.names().map(str::to_string).collect(),
            width: self.dimensions.width,
            height: self.dimensions.height,
            components,
            mean: self.mean.iter().copied().collect(),
            projection: (0..rows)
                .flat_map(|r| (0..components).map(move |c| (r, c)))
                .map(|idx| self.projection[idx])
                .collect(),
            eigenvalues: self.eigenvalues.clone(),
            prototype_labels: self.prototypes.iter().map(|p| p.category).collect(),
            prototypes: self
                .prototypes
                .iter()
                .flat_map(|p| p.vector.iter().copied())
                .collect(),
        }
    }

    /// Rebuild a model from its flat form, checking every array length.
    pub fn from_export(export: ModelExport) -> Result<Self> {
        let categories = Categories::new(&export.categories)
            .map_err(|e| Error::InvalidModel(e.to_string()))?;
        let dimensions = Dimensions::new(export.width, export.height);
        let pixels = (export.width as usize)
            .checked_mul(export.height as usize)
            .ok_or_else(|| Error::InvalidModel(format!("input size {} is too large", dimensions)))?;
        let k = export.components;

        if pixels == 0 || k == 0 {
            return Err(Error::InvalidModel("model has no input pixels or components".into()));
        }
        if export.mean.len() != pixels {
            return Err(Error::InvalidModel(format!(
                "mean has {} values, expected {}",
                export.mean.len(),
                pixels
            )));
        }
        let projection_len = pixels
            .checked_mul(k)
            .ok_or_else(|| Error::InvalidModel(format!("{} components is too many", k)))?;
        if export.projection.len() != projection_len {
            return Err(Error::InvalidModel(format!(
                "projection has {} values, expected {}",
                export.projection.len(),
                projection_len
            )));
        }
        if export.eigenvalues.len() != k {
            return Err(Error::InvalidModel(format!(
                "{} eigenvalues for {} components",
                export.eigenvalues.len(),
                k
            )));
        }
        let count = export.prototype_labels.len();
        if count == 0 || count.checked_mul(k) != Some(export.prototypes.len()) {
            return Err(Error::InvalidModel(format!(
                "{} prototype values for {} labels of {} components",
                export.prototypes.len(),
                count,
                k
            )));
        }
        if let Some(bad) = export.prototype_labels.iter().find(|&&c| c >= categories.len()) {
            return Err(Error::InvalidModel(format!("prototype label {} out of range", bad)));
        }

        let prototypes = export
            .prototype_labels
            .iter()
            .zip(export.prototypes.chunks_exact(k))
            .map(|(&category, values)| Prototype {
                category,
                vector: DVector::from_column_slice(values),
            })
            .collect();

        Ok(Self {
            categories,
            dimensions,
            mean: DVector::from_vec(export.mean),
            projection: DMatrix::from_row_slice(pixels, k, &export.projection),
            eigenvalues: export.eigenvalues,
            prototypes,
        })
    }
}

/// A trained model as fixed-size numeric arrays, for storage and reuse
/// without retraining.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelExport {
    pub categories: Vec<String>,
    pub width: u32,
    pub height: u32,
    /// Discriminant space dimension.
    pub components: usize,
    /// Mean image, row-major, `width * height` values.
    pub mean: Vec<f64>,
    /// Projection matrix, row-major, `(width * height) x components`.
    pub projection: Vec<f64>,
    pub eigenvalues: Vec<f64>,
    /// Category index of each prototype.
    pub prototype_labels: Vec<usize>,
    /// Prototype vectors, one after another, `components` values each.
    pub prototypes: Vec<f64>,
}
