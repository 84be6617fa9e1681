//! Partitioning a corpus into training and evaluation sets.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::corpus::{Corpus, ImageSample};
use crate::error::{Error, Result};
use crate::types::{Categories, Dimensions};

/// Fraction of each category assigned to training, strictly between 0 and 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitRatio(f64);

impl SplitRatio {
    pub fn new(ratio: f64) -> Result<Self> {
        if !(ratio > 0.0 && ratio < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "split ratio must lie in (0, 1), got {}",
                ratio
            )));
        }
        Ok(Self(ratio))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Number of training samples out of `n`: `floor(ratio * n)`.
    pub fn training_count(&self, n: usize) -> usize {
        ((self.0 * n as f64).floor() as usize).min(n)
    }
}

impl Default for SplitRatio {
    fn default() -> Self {
        Self(0.8)
    }
}

/// How each category's samples are ordered before the cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShufflePolicy {
    /// Keep load order.
    Preserve,
    /// Shuffle with a generator seeded once per partition call.
    Seeded(u64),
    /// Shuffle from OS entropy.
    #[default]
    Random,
}

/// Training and evaluation samples, concatenated across categories.
#[derive(Debug, Clone)]
pub struct Split {
    categories: Categories,
    dimensions: Dimensions,
    training: Vec<ImageSample>,
    evaluation: Vec<ImageSample>,
}

impl Split {
    pub fn categories(&self) -> &Categories {
        &self.categories
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn training(&self) -> &[ImageSample] {
        &self.training
    }

    pub fn evaluation(&self) -> &[ImageSample] {
        &self.evaluation
    }

    /// `(training, evaluation)` sample counts for one category.
    pub fn counts(&self, category: usize) -> (usize, usize) {
        let count = |set: &[ImageSample]| set.iter().filter(|s| s.category == category).count();
        (count(&self.training), count(&self.evaluation))
    }
}

/// Split every category of `corpus` at `floor(ratio * n)`.
///
/// Each sample lands in exactly one of the two sets; a category with no
/// samples contributes nothing to either.
pub fn partition(corpus: Corpus, ratio: SplitRatio, policy: ShufflePolicy) -> Split {
    let (categories, dimensions, groups) = corpus.into_groups();

    let mut rng = match policy {
        ShufflePolicy::Preserve => None,
        ShufflePolicy::Seeded(seed) => Some(StdRng::seed_from_u64(seed)),
        ShufflePolicy::Random => Some(StdRng::from_entropy()),
    };

    let mut training = Vec::new();
    let mut evaluation = Vec::new();

    for (index, mut samples) in groups.into_iter().enumerate() {
        if let Some(rng) = rng.as_mut() {
            samples.shuffle(rng);
        }

        let cut = ratio.training_count(samples.len());
        let held_out = samples.split_off(cut);
        log::debug!(
            "Category {}: {} training, {} evaluation",
            categories.name(index).unwrap_or("?"),
            samples.len(),
            held_out.len()
        );
        training.extend(samples);
        evaluation.extend(held_out);
    }

    Split {
        categories,
        dimensions,
        training,
        evaluation,
    }
}
