//! # emotion-face
//!
//! Facial emotion classification with Fisherfaces, in pure Rust.
//!
//! This crate provides:
//! - **Corpus loading**: labelled grayscale face crops from `<root>/dataset/<category>/`
//! - **Partitioning**: per-category training / evaluation split with seeded shuffling
//! - **Training**: PCA followed by LDA, the classical Fisherfaces construction
//! - **Classification**: nearest projected training sample in discriminant space
//! - **Evaluation**: accuracy and a confusion matrix over the held-out set
//!
//! ## Algorithm Overview
//!
//! 1. Flatten each training image into a vector and subtract the mean image
//! 2. Keep the top `N - C` principal components (N images, C categories)
//! 3. In that space, solve the generalised eigenproblem of between-class
//!    against within-class scatter and keep `C - 1` discriminant axes
//! 4. Project every training image through both stages
//! 5. Classify a new face by projecting it and returning the category of the
//!    nearest projected training image
//!
//! ## Quick Start
//!
//! ```rust
//! use emotion_face::{
//!     evaluate, partition, Categories, Corpus, Dimensions, GrayImage, ImageSample,
//!     ShufflePolicy, SplitRatio, SubspaceTrainer,
//! };
//!
//! let categories = Categories::new(&["happy", "sad"]).unwrap();
//! let dims = Dimensions::new(4, 4);
//!
//! // Usually `Corpus::load(root, &categories, dims)`; synthetic faces here
//! let samples = (0..20u32)
//!     .map(|i| {
//!         let category = (i % 2) as usize;
//!         let base = if category == 0 { 40 } else { 200 };
//!         ImageSample {
//!             image: GrayImage::from_fn(4, 4, move |x, y| (base + (x * y + i) % 7) as u8),
//!             category,
//!             source: format!("face-{i}"),
//!         }
//!     })
//!     .collect();
//! let corpus = Corpus::from_samples(categories, dims, samples).unwrap();
//!
//! let split = partition(corpus, SplitRatio::default(), ShufflePolicy::Seeded(1));
//! let model = SubspaceTrainer::for_split(&split).train(split.training()).unwrap();
//! let report = evaluate(&model, split.evaluation(), split.categories()).unwrap();
//! println!("accuracy: {:.2}", report.accuracy());
//!
//! let face = GrayImage::from_fn(4, 4, |_, _| 205);
//! let prediction = model.classify(&face).unwrap();
//! assert_eq!(model.label(&prediction), Some("sad"));
//! ```
//!
//! ## Custom Image Types
//!
//! Implement the [`ImageAccess`] trait for your own frame type:
//!
//! ```rust
//! use emotion_face::ImageAccess;
//!
//! struct MyFrame { /* ... */ }
//!
//! impl ImageAccess for MyFrame {
//!     fn get_pixel(&self, x: i32, y: i32) -> u8 {
//!         // Return grayscale intensity at (x, y)
//!         // Return 0 for out-of-bounds
//!         0
//!     }
//!     fn width(&self) -> u32 { 350 }
//!     fn height(&self) -> u32 { 350 }
//! }
//! ```

mod classifier;
mod config;
mod corpus;
mod error;
mod evaluator;
mod frame;
mod linalg;
pub mod locator;
mod model;
mod pipeline;
mod split;
mod trainer;
mod types;

pub use classifier::{Classify, EmotionRecognizer};
pub use config::RecognizerConfig;
pub use corpus::{Corpus, ImageSample, DATASET_DIR};
pub use error::{Error, Result};
pub use evaluator::{evaluate, ConfusionMatrix, EvaluationReport};
pub use frame::{GrayImage, ImageAccess};
pub use model::{FisherModel, ModelExport, Prototype};
pub use pipeline::{train_and_evaluate, train_on_split, TrainingRun};
pub use split::{partition, ShufflePolicy, Split, SplitRatio};
pub use trainer::{SubspaceTrainer, TrainConfig};
pub use types::{Categories, Category, Dimensions, FaceRegion, Prediction, DEFAULT_EMOTIONS};
